use std::fmt;

/// URI scheme the Codex extension uses for its conversation editors.
pub const CODEX_URI_SCHEME: &str = "openai-codex";

/// Identifier of a single Codex thread, taken from an `openai-codex://` resource.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConversationId(String);

impl ConversationId {
    /// Wrap a raw id. Returns `None` for blank input.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return None;
        }
        Some(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A resource identifier split into `scheme://authority/path`.
///
/// Any `?query` or `#fragment` is dropped while parsing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceUri {
    pub scheme: String,
    pub authority: String,
    pub path: String,
}

impl ResourceUri {
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let (scheme, rest) = input.split_once(':')?;
        if scheme.is_empty()
            || !scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        {
            return None;
        }

        let rest = rest.split_once('#').map_or(rest, |(r, _)| r);
        let rest = rest.split_once('?').map_or(rest, |(r, _)| r);

        let (authority, path) = match rest.strip_prefix("//") {
            Some(after) => match after.find('/') {
                Some(idx) => (&after[..idx], &after[idx..]),
                None => (after, ""),
            },
            None => ("", rest),
        };

        Some(Self {
            scheme: scheme.to_ascii_lowercase(),
            authority: authority.to_string(),
            path: path.to_string(),
        })
    }

    /// Non-empty path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|s| !s.is_empty())
    }
}

/// Extract the conversation id from `openai-codex://route/{local|remote}/{id}`.
pub fn extract_conversation_id(uri: &ResourceUri) -> Option<ConversationId> {
    if uri.scheme != CODEX_URI_SCHEME {
        return None;
    }
    let segments: Vec<&str> = uri.segments().collect();
    let [scope, conversation_id] = segments.as_slice() else {
        return None;
    };
    if !matches!(*scope, "local" | "remote") {
        return None;
    }
    ConversationId::new(*conversation_id)
}

/// Parse-and-extract convenience for raw URI strings.
pub fn conversation_id_from_str(uri: &str) -> Option<ConversationId> {
    ResourceUri::parse(uri).and_then(|uri| extract_conversation_id(&uri))
}

/// Snapshot of what the editor has focused when the user triggers rename.
#[derive(Clone, Debug, Default)]
pub struct ActiveContext {
    /// URI of the active text editor's document.
    pub editor_uri: Option<String>,
    /// URI of the active tab's custom-editor input (webview panels).
    pub tab_input_uri: Option<String>,
}

impl ActiveContext {
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self {
            editor_uri: Some(uri.into()),
            tab_input_uri: None,
        }
    }

    /// Editor document first, then the active tab.
    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.editor_uri
            .as_deref()
            .and_then(conversation_id_from_str)
            .or_else(|| {
                self.tab_input_uri
                    .as_deref()
                    .and_then(conversation_id_from_str)
            })
    }
}
