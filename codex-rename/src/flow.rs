//! The user-facing "rename current thread" action.
//!
//! Try whatever rename command the host exposes; failing that, patch the
//! extension on disk and ask for a reload; failing that, leave the user with a
//! sidebar shortcut or a manual command picker.

use std::sync::Arc;

use crate::context::{ActiveContext, ConversationId};
use crate::host::{CommandRegistry, HostCommandError, MessageLevel, PromptError, Prompter};
use crate::patch::{PatchApplicationOutcome, PatchApplier, PatchError};
use crate::resolver::{CommandResolver, execute_rename_command};

pub const RELOAD_WINDOW_COMMAND: &str = "workbench.action.reloadWindow";
pub const OPEN_SIDEBAR_COMMAND: &str = "chatgpt.openSidebar";

pub const RELOAD_ACTION: &str = "Reload Window";
pub const OPEN_SIDEBAR_ACTION: &str = "Open Codex Sidebar";
pub const SHOW_CANDIDATES_ACTION: &str = "Show Candidates";

pub const FALLBACK_MESSAGE: &str =
    "Could not trigger a compatible Codex rename command automatically.";
pub const FLOW_FAILED_MESSAGE: &str = "Could not trigger Codex rename flow.";
const NO_COMMAND_DETAIL: &str = "No compatible rename command found.";

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error(transparent)]
    Patch(#[from] PatchError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error(transparent)]
    Command(#[from] HostCommandError),
    #[error("patch task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// What the user ended up with after the fallback prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FallbackChoice {
    OpenedSidebar,
    RanCandidate(String),
    Dismissed,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FlowOutcome {
    /// A host command handled the rename.
    Renamed { command_id: String },
    /// The bundle on disk carries the rename command; waiting on a reload.
    PatchReady {
        outcome: PatchApplicationOutcome,
        reloaded: bool,
    },
    /// Nothing worked automatically; the user got the fallback prompt.
    Fallback {
        attempted: Vec<String>,
        patch: PatchApplicationOutcome,
        choice: FallbackChoice,
    },
    /// An unexpected error, already reported to the user.
    Failed { message: String },
}

pub struct RenameFlow {
    registry: Arc<dyn CommandRegistry>,
    prompter: Arc<dyn Prompter>,
    resolver: CommandResolver,
    applier: PatchApplier,
}

impl RenameFlow {
    pub fn new(
        registry: Arc<dyn CommandRegistry>,
        prompter: Arc<dyn Prompter>,
        applier: PatchApplier,
    ) -> Self {
        Self {
            resolver: CommandResolver::new(registry.clone()),
            registry,
            prompter,
            applier,
        }
    }

    /// Run the action. Errors are reported through the prompter, never returned.
    pub async fn run(&self, context: &ActiveContext) -> FlowOutcome {
        let conversation_id = context.conversation_id();
        match self.try_run(conversation_id.as_ref()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let message = e.to_string();
                tracing::error!(error = %message, "rename flow failed");
                if let Err(prompt_err) = self
                    .prompter
                    .show_message(MessageLevel::Error, FLOW_FAILED_MESSAGE, Some(&message), &[])
                    .await
                {
                    tracing::warn!(error = %prompt_err, "could not report rename failure");
                }
                FlowOutcome::Failed { message }
            }
        }
    }

    async fn try_run(
        &self,
        conversation_id: Option<&ConversationId>,
    ) -> Result<FlowOutcome, FlowError> {
        let resolution = self.resolver.resolve(conversation_id).await;
        if resolution.success
            && let Some(command_id) = resolution.command_id.clone()
        {
            return Ok(FlowOutcome::Renamed { command_id });
        }

        let applier = self.applier.clone();
        let patch = tokio::task::spawn_blocking(move || applier.apply()).await??;

        if patch.needs_reload() {
            let reloaded = self.offer_reload(&patch).await?;
            return Ok(FlowOutcome::PatchReady {
                outcome: patch,
                reloaded,
            });
        }

        let detail = match &resolution.error {
            Some(e) => e.to_string(),
            None => NO_COMMAND_DETAIL.to_string(),
        };
        let detail = match patch_detail(&patch, self.applier.extension_id()) {
            Some(extra) => format!("{detail} | {extra}"),
            None => detail,
        };

        let selection = self
            .prompter
            .show_message(
                MessageLevel::Error,
                FALLBACK_MESSAGE,
                Some(&detail),
                &[OPEN_SIDEBAR_ACTION, SHOW_CANDIDATES_ACTION],
            )
            .await?;

        let choice = match selection.as_deref() {
            Some(OPEN_SIDEBAR_ACTION) => {
                self.registry.execute(OPEN_SIDEBAR_COMMAND, None).await?;
                FallbackChoice::OpenedSidebar
            }
            Some(SHOW_CANDIDATES_ACTION) => {
                let picked = self
                    .prompter
                    .quick_pick(&resolution.attempted, "Select a command to execute manually")
                    .await?;
                match picked {
                    Some(command_id) => {
                        execute_rename_command(self.registry.as_ref(), &command_id, conversation_id)
                            .await?;
                        FallbackChoice::RanCandidate(command_id)
                    }
                    None => FallbackChoice::Dismissed,
                }
            }
            _ => FallbackChoice::Dismissed,
        };

        Ok(FlowOutcome::Fallback {
            attempted: resolution.attempted,
            patch,
            choice,
        })
    }

    async fn offer_reload(&self, patch: &PatchApplicationOutcome) -> Result<bool, FlowError> {
        let version = patch.extension_version().unwrap_or("unknown");
        let message = match patch {
            PatchApplicationOutcome::Patched { .. } => format!(
                "Patched Codex runtime ({version}). Reload VS Code to enable rename."
            ),
            _ => format!(
                "Codex runtime already patched on disk ({version}). Reload VS Code to load it."
            ),
        };

        let picked = self
            .prompter
            .show_message(MessageLevel::Info, &message, None, &[RELOAD_ACTION])
            .await?;
        if picked.as_deref() != Some(RELOAD_ACTION) {
            return Ok(false);
        }
        self.registry.execute(RELOAD_WINDOW_COMMAND, None).await?;
        Ok(true)
    }
}

/// Second half of the fallback detail line.
fn patch_detail(patch: &PatchApplicationOutcome, extension_id: &str) -> Option<String> {
    match patch {
        PatchApplicationOutcome::NotInstalled => {
            Some(format!("{extension_id} extension not found."))
        }
        PatchApplicationOutcome::ExtensionFileMissing { extension_file, .. } => Some(format!(
            "Codex runtime file not found: {}",
            extension_file.display()
        )),
        PatchApplicationOutcome::UnsupportedLayout { .. } => Some(
            "Codex runtime layout changed and auto-patch pattern did not match.".to_string(),
        ),
        _ => None,
    }
}
