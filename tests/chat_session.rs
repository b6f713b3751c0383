//! Workspace-level flow tests: a multi-turn chat against a mock endpoint with
//! logging filtered through a configured severity level.

use futures::StreamExt;
use granite_context::{Conversation, OptimizerSet, ShellCommandOptimizer};
use granite_level::Level;
use granite_provider::{AskOptions, Chunk, Granite, GraniteConfig, GraniteError};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Install a test subscriber at the named level. Later calls are no-ops.
fn init_logging(name: &str) -> Level {
    let level = Level::from_name(name).expect("known level");
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_test_writer()
        .try_init();
    level
}

fn frames(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| serde_json::json!([3, p]).to_string() + "\n")
        .collect()
}

async fn respond_when(server: &MockServer, marker: &str, reply: &[&str]) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains(marker))
        .respond_with(ResponseTemplate::new(200).set_body_string(frames(reply)))
        .expect(1)
        .mount(server)
        .await;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn multi_turn_chat_threads_history() {
    let level = init_logging("debug");
    assert!(level < Level::Warning);

    let server = MockServer::start().await;
    // Registered most-specific first: the follow-up carries the first reply.
    respond_when(&server, "LLM :Rust is a systems language.", &["It is ", "memory safe."]).await;
    respond_when(&server, "User : What is Rust?", &["Rust is ", "a systems language."]).await;

    let config = GraniteConfig {
        intro: Some("You are terse.".into()),
        ..Default::default()
    };
    let mut client = Granite::from_config("key", config).with_base_url(server.uri());

    let mut streamed = String::new();
    {
        let mut stream = std::pin::pin!(
            client
                .chat_stream("What is Rust?", AskOptions::default())
                .expect("prompt should prepare")
        );
        while let Some(text) = stream.next().await {
            streamed.push_str(&text.expect("fragment"));
        }
    }
    assert_eq!(streamed, "Rust is a systems language.");

    let reply = client
        .chat("Is it safe?", AskOptions::default())
        .await
        .expect("follow-up");
    assert_eq!(reply, "It is memory safe.");

    assert_eq!(
        client.conversation().history(),
        "\nUser : What is Rust?\nLLM :Rust is a systems language.\
         \nUser : Is it safe?\nLLM :It is memory safe."
    );
}

#[tokio::test]
async fn failed_turn_leaves_history_untouched() {
    init_logging("error");

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let mut client = Granite::new("key")
        .with_base_url(server.uri())
        .with_conversation(Conversation::new());
    let err = client
        .ask("hello", AskOptions::default())
        .await
        .expect_err("should fail");

    assert!(matches!(
        err,
        GraniteError::RequestFailure { status: 500, ref body } if body == "upstream exploded"
    ));
    assert!(client.conversation().history().is_empty());
    assert!(client.last_response().is_none());
}

#[tokio::test]
async fn injected_optimizers_shape_the_prompt() {
    init_logging("info");

    let server = MockServer::start().await;
    respond_when(
        &server,
        "Provide only fish command for plan9",
        &["ls | wc -l"],
    )
    .await;

    let mut optimizers = OptimizerSet::empty();
    optimizers.register(ShellCommandOptimizer::for_platform("plan9", "fish"));
    let mut client = Granite::new("key")
        .with_base_url(server.uri())
        .with_optimizers(optimizers);

    let reply = client
        .ask(
            "count files",
            AskOptions::default().with_optimizer("shell_command"),
        )
        .await
        .expect("should succeed");
    assert_eq!(
        reply,
        Chunk::Text {
            text: "ls | wc -l".into()
        }
    );

    let err = client
        .ask("again", AskOptions::default().with_optimizer("code"))
        .await
        .expect_err("code is not registered");
    assert!(matches!(err, GraniteError::Context(_)));
}
