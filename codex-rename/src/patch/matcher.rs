use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::RENAME_REGISTRATION_SIGNATURE;
use super::snippet::SnippetVars;

/// ASCII JavaScript identifier, as emitted by the minifier.
const IDENT: &str = r"[A-Za-z_$][A-Za-z0-9_$]*";

/// `await G.update(C.SHOW_COPILOT_LOGIN_FIRST,!0),P.createNewPanel()`
static LOGIN_STATE_UPDATE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = [
        r"await\s+(",
        IDENT,
        r")\.update\((",
        IDENT,
        r")\.SHOW_COPILOT_LOGIN_FIRST,!0\),(",
        IDENT,
        r")\.createNewPanel\(\)",
    ]
    .concat();
    Regex::new(&pattern).expect("login state pattern is valid")
});

/// `e.push(lt.commands.registerCommand(X,async()=>{await Lo(),N.triggerNewChatViaWebview()})),`
static NEW_CHAT_REGISTRATION: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = [
        r"e\.push\(lt\.commands\.registerCommand\(",
        IDENT,
        r",async\(\)=>\{await Lo\(\),(",
        IDENT,
        r")\.triggerNewChatViaWebview\(\)\}\)\),",
    ]
    .concat();
    Regex::new(&pattern).expect("new chat registration pattern is valid")
});

/// `let N=new cs(...,S??void 0,` for a known `N`.
fn session_provider_pattern(new_chat_var: &str) -> Option<Regex> {
    let pattern = [
        r"let\s+",
        &regex::escape(new_chat_var),
        r"=new\s+cs\([^)]*?,(",
        IDENT,
        r")\?\?void 0,",
    ]
    .concat();
    Regex::new(&pattern).ok()
}

/// Landmarks extracted from a recognized bundle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PatchMatch {
    /// Extension global state store (`get`/`update`).
    pub global_state_var: String,
    /// Holder of storage keys such as `THREAD_TITLES`.
    pub constants_var: String,
    /// Object whose `createNewPanel()` follows the login-flag update.
    pub panel_creation_var: String,
    /// Object whose `triggerNewChatViaWebview()` backs the new-chat command.
    pub new_chat_var: String,
    /// Provider handed to the new-chat object's constructor; owns the conversation loader.
    pub chat_session_provider_var: String,
    /// Byte offset right after the new-chat registration statement.
    pub insertion_point: usize,
}

impl PatchMatch {
    pub fn snippet_vars(&self) -> SnippetVars<'_> {
        SnippetVars {
            global_state: &self.global_state_var,
            constants: &self.constants_var,
            webview_provider: &self.new_chat_var,
            chat_session_provider: &self.chat_session_provider_var,
        }
    }
}

/// Which structural gate rejected the bundle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutMismatch {
    MissingLoginStateUpdate,
    MissingNewChatRegistration,
    PanelVariableMismatch {
        panel_creation_var: String,
        new_chat_var: String,
    },
    MissingSessionProvider {
        new_chat_var: String,
    },
    InvalidIdentifier {
        name: String,
    },
}

impl fmt::Display for LayoutMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutMismatch::MissingLoginStateUpdate => {
                f.write_str("login state update before createNewPanel() not found")
            }
            LayoutMismatch::MissingNewChatRegistration => {
                f.write_str("new chat webview command registration not found")
            }
            LayoutMismatch::PanelVariableMismatch {
                panel_creation_var,
                new_chat_var,
            } => write!(
                f,
                "panel variable '{panel_creation_var}' differs from new chat variable '{new_chat_var}'"
            ),
            LayoutMismatch::MissingSessionProvider { new_chat_var } => write!(
                f,
                "session provider argument in construction of '{new_chat_var}' not found"
            ),
            LayoutMismatch::InvalidIdentifier { name } => {
                write!(f, "extracted name '{name}' is not an identifier")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchOutcome {
    AlreadyPatched,
    Matched(PatchMatch),
    Unsupported(LayoutMismatch),
}

/// Locate every landmark the rename snippet depends on.
///
/// The first structurally valid match wins; any failed gate rejects the whole
/// bundle.
pub fn match_layout(source: &str) -> MatchOutcome {
    if source.contains(RENAME_REGISTRATION_SIGNATURE) {
        return MatchOutcome::AlreadyPatched;
    }

    let Some(state) = LOGIN_STATE_UPDATE.captures(source) else {
        return MatchOutcome::Unsupported(LayoutMismatch::MissingLoginStateUpdate);
    };
    let Some(registration) = NEW_CHAT_REGISTRATION.captures(source) else {
        return MatchOutcome::Unsupported(LayoutMismatch::MissingNewChatRegistration);
    };

    let global_state_var = state[1].to_string();
    let constants_var = state[2].to_string();
    let panel_creation_var = state[3].to_string();
    let new_chat_var = registration[1].to_string();
    let insertion_point = registration
        .get(0)
        .map(|m| m.end())
        .unwrap_or_default();

    if panel_creation_var != new_chat_var {
        return MatchOutcome::Unsupported(LayoutMismatch::PanelVariableMismatch {
            panel_creation_var,
            new_chat_var,
        });
    }

    let Some(provider) =
        session_provider_pattern(&new_chat_var).and_then(|re| re.captures(source).map(|c| c[1].to_string()))
    else {
        return MatchOutcome::Unsupported(LayoutMismatch::MissingSessionProvider { new_chat_var });
    };

    MatchOutcome::Matched(PatchMatch {
        global_state_var,
        constants_var,
        panel_creation_var,
        new_chat_var,
        chat_session_provider_var: provider,
        insertion_point,
    })
}
