use anyhow::Context;
use codex_rename_core::flow::{OPEN_SIDEBAR_COMMAND, RELOAD_WINDOW_COMMAND};
use codex_rename_core::{CommandRegistry, HostCommandError};

/// Parse a dump of registered command ids: a JSON array of strings, or one id
/// per line with `#` comments and blank lines ignored.
pub fn parse_command_list(text: &str) -> anyhow::Result<Vec<String>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("command list is not a JSON array of strings");
    }
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// A recorded copy of an editor's command registry.
///
/// Only the editor-level actions the rename flow offers can run from a terminal;
/// they print what the user should do instead.
pub struct SnapshotRegistry {
    commands: Vec<String>,
}

impl SnapshotRegistry {
    pub fn new(commands: Vec<String>) -> Self {
        Self { commands }
    }
}

#[async_trait::async_trait]
impl CommandRegistry for SnapshotRegistry {
    async fn commands(&self) -> Result<Vec<String>, HostCommandError> {
        Ok(self.commands.clone())
    }

    async fn execute(
        &self,
        command_id: &str,
        _args: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, HostCommandError> {
        match command_id {
            RELOAD_WINDOW_COMMAND => {
                eprintln!("Run \"Developer: Reload Window\" in the editor to load the patched extension.");
                Ok(serde_json::Value::Null)
            }
            OPEN_SIDEBAR_COMMAND => {
                eprintln!("Open the Codex sidebar in the editor and rename the thread from there.");
                Ok(serde_json::Value::Null)
            }
            id if !self.commands.iter().any(|c| c == id) => {
                Err(HostCommandError::NotFound(id.to_string()))
            }
            id => {
                tracing::debug!(command = %id, "snapshot command cannot run outside the editor");
                Err(HostCommandError::failed(
                    id,
                    "editor commands cannot be executed from a snapshot",
                ))
            }
        }
    }
}
