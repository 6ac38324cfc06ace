pub mod config;
pub mod context;
pub mod extension;
pub mod flow;
pub mod host;
pub mod patch;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use config::{ConfigError, RenameConfig};
pub use context::{ActiveContext, ConversationId, ResourceUri, conversation_id_from_str};
pub use extension::{CODEX_EXTENSION_ID, FsExtensionCatalog, default_extension_roots};
pub use flow::{FallbackChoice, FlowError, FlowOutcome, RenameFlow};
pub use host::{
    CommandRegistry, ExtensionCatalog, HostCommandError, InstalledExtension, MessageLevel,
    PromptError, Prompter,
};
pub use patch::{
    LayoutMismatch, MatchOutcome, PatchApplicationOutcome, PatchApplier, PatchError, PatchMatch,
    PatchResult, ensure_patch_applied, match_layout,
};
pub use resolver::{CommandResolver, Resolution, rename_candidates};
