//! On-disk patching of the Codex extension bundle.
//!
//! The bundle is minified JavaScript with no stable API, so everything here keys
//! off a handful of structural landmarks. Matching refuses on any doubt: a wrong
//! splice corrupts someone else's artifact.

mod apply;
mod matcher;
mod snippet;

use std::borrow::Cow;

pub use apply::{PatchApplicationOutcome, PatchApplier, PatchError, backup_path_for};
pub use matcher::{LayoutMismatch, MatchOutcome, PatchMatch, match_layout};
pub use snippet::{SnippetError, SnippetVars, render_rename_snippet};

/// Text whose presence means the rename command is already registered.
pub const RENAME_REGISTRATION_SIGNATURE: &str = r#"registerCommand("chatgpt.renameThread""#;

/// Fixed tail of every backup file name.
pub const BACKUP_SUFFIX: &str = "codex-rename-thread";

/// Outcome of patching a source string in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchResult<'a> {
    AlreadyPatched { source: Cow<'a, str> },
    Patched { source: Cow<'a, str> },
    UnsupportedLayout {
        source: Cow<'a, str>,
        reason: LayoutMismatch,
    },
}

impl PatchResult<'_> {
    pub fn status(&self) -> &'static str {
        match self {
            PatchResult::AlreadyPatched { .. } => "already_patched",
            PatchResult::Patched { .. } => "patched",
            PatchResult::UnsupportedLayout { .. } => "unsupported_layout",
        }
    }

    pub fn source(&self) -> &str {
        match self {
            PatchResult::AlreadyPatched { source }
            | PatchResult::Patched { source }
            | PatchResult::UnsupportedLayout { source, .. } => source,
        }
    }
}

/// Match `source` and, when the layout is recognized, splice in the rename command.
pub fn ensure_patch_applied(source: &str) -> PatchResult<'_> {
    let found = match match_layout(source) {
        MatchOutcome::AlreadyPatched => {
            return PatchResult::AlreadyPatched {
                source: Cow::Borrowed(source),
            };
        }
        MatchOutcome::Unsupported(reason) => {
            return PatchResult::UnsupportedLayout {
                source: Cow::Borrowed(source),
                reason,
            };
        }
        MatchOutcome::Matched(found) => found,
    };

    let snippet = match render_rename_snippet(&found.snippet_vars()) {
        Ok(snippet) => snippet,
        Err(e) => {
            // Captures are identifier-shaped, so this only trips on a matcher bug.
            tracing::warn!(error = %e, "refusing to render rename snippet");
            return PatchResult::UnsupportedLayout {
                source: Cow::Borrowed(source),
                reason: LayoutMismatch::InvalidIdentifier {
                    name: e.identifier().to_string(),
                },
            };
        }
    };

    let at = found.insertion_point;
    let mut patched = String::with_capacity(source.len() + snippet.len());
    patched.push_str(&source[..at]);
    patched.push_str(&snippet);
    patched.push_str(&source[at..]);

    PatchResult::Patched {
        source: Cow::Owned(patched),
    }
}

/// JavaScript identifier, ASCII subset: `[A-Za-z_$][A-Za-z0-9_$]*`.
pub(crate) fn is_js_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// A miniature of the compiled bundle containing every landmark the matcher needs.
#[cfg(test)]
pub(crate) mod fixtures {
    /// The "new chat via webview" registration the snippet is spliced after.
    pub(crate) const NEW_CHAT_REGISTRATION: &str = "e.push(lt.commands.registerCommand(Xa,async()=>{await Lo(),pe.triggerNewChatViaWebview()})),";

    /// First statement after the registration.
    pub(crate) const NEXT_STATEMENT: &str = "e.push(lt.commands.registerCommand(Ya,";

    pub(crate) fn bundle() -> String {
        [
            r#""use strict";var lt=require("vscode");async function Lo(){}function J(){return console}"#,
            r#"function activate(e){let Bt=e.globalState,Kt={SHOW_COPILOT_LOGIN_FIRST:"showCopilotLoginFirst",THREAD_TITLES:"thread-titles"},Qn=new ConversationProvider(e);"#,
            "let pe=new cs(e,Bt,Kt,Qn??void 0,lt.window);",
            NEW_CHAT_REGISTRATION,
            "e.push(lt.commands.registerCommand(Ya,async()=>{await Bt.update(Kt.SHOW_COPILOT_LOGIN_FIRST,!0),pe.createNewPanel()}));}",
            "module.exports={activate};",
        ]
        .concat()
    }
}
