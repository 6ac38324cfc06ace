use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;

use crate::context::ConversationId;
use crate::host::{CommandRegistry, HostCommandError};

/// Rename command older Codex builds registered. Takes `{conversationId}`.
pub const LEGACY_RENAME_COMMAND: &str = "chatgpt.renameThread";

/// Commands tried before anything discovered dynamically, in this order.
pub const KNOWN_RENAME_CANDIDATES: &[&str] = &[
    LEGACY_RENAME_COMMAND,
    "workbench.action.chat.renameSession",
    "workbench.action.chatSession.rename",
    "chat.renameSession",
];

const RENAME_TOKENS: &[&str] = &["rename", "title"];
const CHAT_TOKENS: &[&str] = &["chat", "codex", "thread", "session"];

/// Whether a registered command id looks like a chat rename command.
///
/// Both a rename token and a chat token are required, so `editor.action.rename`
/// and friends never qualify.
pub fn is_rename_candidate(command_id: &str) -> bool {
    let lower = command_id.to_lowercase();
    RENAME_TOKENS.iter().any(|t| lower.contains(t)) && CHAT_TOKENS.iter().any(|t| lower.contains(t))
}

/// Ordered, deduplicated candidate list for a registry snapshot.
///
/// Known commands come first in declared order, then discovered ones sorted.
/// Only ids present in `registered` survive.
pub fn rename_candidates(registered: &[String]) -> Vec<String> {
    let available: HashSet<&str> = registered.iter().map(String::as_str).collect();

    let mut discovered: Vec<&str> = registered
        .iter()
        .map(String::as_str)
        .filter(|id| is_rename_candidate(id))
        .collect();
    discovered.sort_unstable();

    let mut ordered: Vec<&str> = KNOWN_RENAME_CANDIDATES.to_vec();
    ordered.extend(discovered);

    let mut seen = HashSet::new();
    ordered
        .into_iter()
        .filter(|id| available.contains(id) && seen.insert(*id))
        .map(str::to_string)
        .collect()
}

/// Argument passed to a candidate. Only the legacy command has a known payload shape.
pub fn rename_args(
    command_id: &str,
    conversation_id: Option<&ConversationId>,
) -> Option<serde_json::Value> {
    match conversation_id {
        Some(id) if command_id == LEGACY_RENAME_COMMAND => {
            Some(json!({ "conversationId": id.as_str() }))
        }
        _ => None,
    }
}

pub async fn execute_rename_command(
    registry: &dyn CommandRegistry,
    command_id: &str,
    conversation_id: Option<&ConversationId>,
) -> Result<(), HostCommandError> {
    registry
        .execute(command_id, rename_args(command_id, conversation_id))
        .await
        .map(|_| ())
}

/// Result of walking the candidate list.
#[derive(Clone, Debug)]
pub struct Resolution {
    pub success: bool,
    pub command_id: Option<String>,
    /// Every candidate considered, in execution order.
    pub attempted: Vec<String>,
    /// Last failure seen. `None` on success or when there was nothing to try.
    pub error: Option<HostCommandError>,
}

pub struct CommandResolver {
    registry: Arc<dyn CommandRegistry>,
}

impl CommandResolver {
    pub fn new(registry: Arc<dyn CommandRegistry>) -> Self {
        Self { registry }
    }

    pub async fn resolve(&self, conversation_id: Option<&ConversationId>) -> Resolution {
        let registered = match self.registry.commands().await {
            Ok(commands) => commands,
            Err(e) => {
                tracing::warn!(error = %e, "could not enumerate commands");
                return Resolution {
                    success: false,
                    command_id: None,
                    attempted: Vec::new(),
                    error: Some(e),
                };
            }
        };

        let candidates = rename_candidates(&registered);
        tracing::debug!(count = candidates.len(), ?candidates, "rename candidates");

        let mut last_error = None;
        for command_id in &candidates {
            match execute_rename_command(self.registry.as_ref(), command_id, conversation_id).await
            {
                Ok(()) => {
                    tracing::info!(command = %command_id, "rename command succeeded");
                    return Resolution {
                        success: true,
                        command_id: Some(command_id.clone()),
                        attempted: candidates.clone(),
                        error: None,
                    };
                }
                Err(e) => {
                    tracing::debug!(command = %command_id, error = %e, "rename candidate failed");
                    last_error = Some(e);
                }
            }
        }

        Resolution {
            success: false,
            command_id: None,
            attempted: candidates,
            error: last_error,
        }
    }
}
