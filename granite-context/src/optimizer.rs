//! Prompt optimizers: named rewrites applied to a prompt before it is sent.
//!
//! An [`OptimizerSet`] is handed to the client rather than looked up from a
//! global, so callers decide which transforms are available.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ContextError;

/// A named prompt transform.
pub trait Optimizer: Send + Sync {
    /// Name used to select this optimizer.
    fn name(&self) -> &str;

    /// Rewrite `prompt`.
    fn optimize(&self, prompt: &str) -> String;
}

/// Asks the model for bare code with no prose or markdown.
pub struct CodeOptimizer;

impl Optimizer for CodeOptimizer {
    fn name(&self) -> &str {
        "code"
    }

    fn optimize(&self, prompt: &str) -> String {
        format!(
            "Your Role: Provide only code as output without any description.\n\
             IMPORTANT: Provide only plain text without Markdown formatting.\n\
             IMPORTANT: Do not include markdown formatting.\
             If there is a lack of details, provide most logical solution. \
             You are not allowed to ask for more details.\
             Ignore any potential risk of errors or confusion.\n\n\
             Request: {prompt}\n\
             Code:"
        )
    }
}

/// Asks the model for a single shell command for the host platform.
pub struct ShellCommandOptimizer {
    platform: String,
    shell: String,
}

impl ShellCommandOptimizer {
    /// Target the platform this process runs on.
    pub fn new() -> Self {
        let shell = if cfg!(windows) { "cmd" } else { "bash" };
        Self::for_platform(std::env::consts::OS, shell)
    }

    /// Target an explicit platform and shell.
    pub fn for_platform(platform: impl Into<String>, shell: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            shell: shell.into(),
        }
    }
}

impl Default for ShellCommandOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer for ShellCommandOptimizer {
    fn name(&self) -> &str {
        "shell_command"
    }

    fn optimize(&self, prompt: &str) -> String {
        format!(
            "Your role: Provide only plain text without Markdown formatting. \
             Do not show any warnings or information regarding your capabilities. \
             Do not provide any description. If you need to store any data, \
             assume it will be stored in the chat. Provide only {shell} \
             command for {platform} without any description. If there is \
             a lack of details, provide most logical solution. Ensure the output \
             is a valid shell command. If multiple steps required try to combine \
             them together. Prompt: {prompt}\n\nCommand:",
            shell = self.shell,
            platform = self.platform,
        )
    }
}

/// A set of optimizers addressable by name.
#[derive(Clone, Default)]
pub struct OptimizerSet {
    optimizers: BTreeMap<String, Arc<dyn Optimizer>>,
}

impl OptimizerSet {
    /// A set with no optimizers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The `code` and `shell_command` optimizers.
    pub fn builtin() -> Self {
        let mut set = Self::empty();
        set.register(CodeOptimizer);
        set.register(ShellCommandOptimizer::new());
        set
    }

    /// Add an optimizer, replacing any existing one with the same name.
    pub fn register(&mut self, optimizer: impl Optimizer + 'static) -> &mut Self {
        self.optimizers
            .insert(optimizer.name().to_string(), Arc::new(optimizer));
        self
    }

    /// Look up an optimizer by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Optimizer>> {
        self.optimizers.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.optimizers.keys().cloned().collect()
    }

    /// Apply the optimizer called `name` to `prompt`.
    pub fn apply(&self, name: &str, prompt: &str) -> Result<String, ContextError> {
        let optimizer = self
            .optimizers
            .get(name)
            .ok_or_else(|| ContextError::UnknownOptimizer {
                name: name.to_string(),
                available: self.names(),
            })?;
        Ok(optimizer.optimize(prompt))
    }
}

impl std::fmt::Debug for OptimizerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimizerSet")
            .field("optimizers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Shout;

    impl Optimizer for Shout {
        fn name(&self) -> &str {
            "shout"
        }

        fn optimize(&self, prompt: &str) -> String {
            prompt.to_uppercase()
        }
    }

    #[test]
    fn builtin_names() {
        assert_eq!(OptimizerSet::builtin().names(), vec!["code", "shell_command"]);
    }

    #[test]
    fn code_wraps_request() {
        let out = OptimizerSet::builtin().apply("code", "sort a list").unwrap();
        assert!(out.starts_with("Your Role: Provide only code"));
        assert!(out.ends_with("Request: sort a list\nCode:"));
    }

    #[test]
    fn shell_command_names_platform_and_shell() {
        let optimizer = ShellCommandOptimizer::for_platform("linux", "zsh");
        let out = optimizer.optimize("list files");
        assert!(out.contains("Provide only zsh command for linux"));
        assert!(out.ends_with("Prompt: list files\n\nCommand:"));
    }

    #[test]
    fn unknown_optimizer_lists_available() {
        let err = OptimizerSet::builtin().apply("poem", "x").unwrap_err();
        match err {
            ContextError::UnknownOptimizer { name, available } => {
                assert_eq!(name, "poem");
                assert_eq!(available, vec!["code", "shell_command"]);
            }
        }
    }

    #[test]
    fn register_custom_optimizer() {
        let mut set = OptimizerSet::empty();
        set.register(Shout);
        assert_eq!(set.apply("shout", "hey").unwrap(), "HEY");
        assert!(set.get("code").is_none());
    }

    #[test]
    fn register_replaces_same_name() {
        struct Quiet;
        impl Optimizer for Quiet {
            fn name(&self) -> &str {
                "code"
            }
            fn optimize(&self, prompt: &str) -> String {
                prompt.to_lowercase()
            }
        }

        let mut set = OptimizerSet::builtin();
        set.register(Quiet);
        assert_eq!(set.apply("code", "ABC").unwrap(), "abc");
        assert_eq!(set.names().len(), 2);
    }
}
