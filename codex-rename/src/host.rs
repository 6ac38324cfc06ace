//! Interfaces to the editor hosting the Codex extension.
//!
//! The core never talks to an editor directly. Front-ends implement these traits
//! over whatever bridge they have (a live extension host, a recorded snapshot,
//! a terminal).

use std::path::PathBuf;

/// Failure reported by the host's command registry.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum HostCommandError {
    #[error("command '{0}' is not registered")]
    NotFound(String),
    #[error("command '{command}' failed: {message}")]
    Failed { command: String, message: String },
    #[error("command registry unavailable: {0}")]
    Unavailable(String),
}

impl HostCommandError {
    pub fn failed(command: &str, message: impl Into<String>) -> Self {
        Self::Failed {
            command: command.to_string(),
            message: message.into(),
        }
    }
}

/// The editor's dynamic command registry.
#[async_trait::async_trait]
pub trait CommandRegistry: Send + Sync {
    /// Every command id registered right now. Never cached by callers.
    async fn commands(&self) -> Result<Vec<String>, HostCommandError>;

    /// Run a command. `args` is passed as the single command argument when present.
    async fn execute(
        &self,
        command_id: &str,
        args: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, HostCommandError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("prompt closed before an answer was given")]
    Closed,
}

/// User-facing prompt widgets.
#[async_trait::async_trait]
pub trait Prompter: Send + Sync {
    /// Show a message with optional action buttons. Returns the picked action, if any.
    async fn show_message(
        &self,
        level: MessageLevel,
        message: &str,
        detail: Option<&str>,
        actions: &[&str],
    ) -> Result<Option<String>, PromptError>;

    /// Let the user pick one of `items`. `None` when dismissed.
    async fn quick_pick(
        &self,
        items: &[String],
        placeholder: &str,
    ) -> Result<Option<String>, PromptError>;
}

/// An installed copy of an editor extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstalledExtension {
    /// Published id, `publisher.name`.
    pub id: String,
    /// `"unknown"` when neither the manifest nor the directory name carries one.
    pub version: String,
    pub install_path: PathBuf,
}

impl InstalledExtension {
    /// Compiled entry point, `<install>/out/extension.js`.
    pub fn entry_file(&self) -> PathBuf {
        self.install_path.join("out").join("extension.js")
    }
}

/// Lookup of installed extensions by published id.
pub trait ExtensionCatalog: Send + Sync {
    fn find(&self, extension_id: &str) -> Option<InstalledExtension>;
}
