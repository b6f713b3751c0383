#![no_main]
use granite_provider::{LineOutcome, StreamSession};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let mut session = StreamSession::new(false);
        let mut expected = String::new();
        for line in text.split('\n') {
            if let LineOutcome::Fragment(chunk) = session.process_line(line) {
                expected.push_str(chunk.text());
            }
        }
        // Accumulated text is exactly the concatenation of yielded fragments.
        assert_eq!(session.finish(), expected);
    }
});
