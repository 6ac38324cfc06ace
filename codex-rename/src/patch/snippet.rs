use super::is_js_identifier;

/// Names from the host bundle the rename command is wired to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SnippetVars<'a> {
    /// Global state store: `get(key)` / `update(key, value)`.
    pub global_state: &'a str,
    /// Storage key holder; must expose `THREAD_TITLES`.
    pub constants: &'a str,
    /// Webview provider with `broadcastToAllViews(message)`.
    pub webview_provider: &'a str,
    /// Session provider exposing `conversationLoader.requestThreadList(...)`.
    pub chat_session_provider: &'a str,
}

#[derive(Debug, thiserror::Error)]
pub enum SnippetError {
    #[error("'{0}' is not a valid JavaScript identifier")]
    InvalidIdentifier(String),
}

impl SnippetError {
    pub fn identifier(&self) -> &str {
        match self {
            SnippetError::InvalidIdentifier(name) => name,
        }
    }
}

// `@{name}` marks a substitution. Everything else is emitted verbatim and
// relies only on names the host module already has in scope: `e` (subscriptions),
// `lt` (vscode), `Lo` (state refresh), `J` (logger).
const RENAME_COMMAND_TEMPLATE: &str = concat!(
    r#"e.push(lt.commands.registerCommand("chatgpt.renameThread",async we=>{"#,
    r#"let opts=we&&typeof we==="object"?we:{},"#,
    r#"directConversationId=typeof opts.conversationId==="string"&&opts.conversationId.trim().length>0?opts.conversationId.trim():null,"#,
    r#"skipQuickPick=!!opts.skipQuickPick,"#,
    r#"coerceTitles=raw=>{if(raw&&typeof raw==="object")return{titles:raw.titles&&typeof raw.titles==="object"?raw.titles:{},order:Array.isArray(raw.order)?raw.order:[]};return{titles:{},order:[]}},"#,
    r#"readThreadTitles=async()=>{try{return coerceTitles(await @{global_state}.get(@{constants}.THREAD_TITLES))}catch{return{titles:{},order:[]}}},"#,
    r#"persistAndBroadcast=async(conversationId,title)=>{"#,
    r#"let cid=typeof conversationId==="string"?conversationId.trim():"",newTitle=typeof title==="string"?title.trim():"";"#,
    r#"if(!cid)return;"#,
    r#"if(!newTitle){lt.window.showWarningMessage("Title cannot be empty.");return}"#,
    r#"try{let cur=await readThreadTitles(),nextTitles={...cur.titles,[cid]:newTitle},nextOrder=(cur.order||[]).filter(x=>x!==cid);"#,
    r#"nextOrder.unshift(cid),await @{global_state}.update(@{constants}.THREAD_TITLES,{titles:nextTitles,order:nextOrder})}"#,
    r#"catch(err){J().warning("Failed to persist thread title from command",{safe:{conversationId:cid,error:err instanceof Error?err.message:String(err)},sensitive:{}})}"#,
    r#"try{await Lo()}catch{}"#,
    r#"try{@{webview_provider}.broadcastToAllViews({type:"thread-title-updated",hostId:"local",conversationId:cid,title:newTitle})}catch{}"#,
    r#"lt.window.showInformationMessage("Codex thread title updated.")};"#,
    r#"if(directConversationId){"#,
    r#"let title=typeof opts.title==="string"&&opts.title.trim().length>0?opts.title:await lt.window.showInputBox({title:"Rename Codex Thread",prompt:"Enter a new title",value:"",ignoreFocusOut:!0});"#,
    r#"if(typeof title!=="string")return;"#,
    r#"await persistAndBroadcast(directConversationId,title);return}"#,
    r#"if(skipQuickPick)throw new Error("No conversationId provided while skipQuickPick=true.");"#,
    r#"let threads=[];"#,
    r#"try{let provider=@{chat_session_provider};"#,
    r#"if(!provider||!provider.conversationLoader||typeof provider.conversationLoader.requestThreadList!=="function")throw new Error("Conversation loader is unavailable.");"#,
    r#"let useCopilotInference=!1;"#,
    r#"try{useCopilotInference=!!provider.modelProxyManager?.isUserUsingCopilotInference?.()}catch{}"#,
    r#"let result=await provider.conversationLoader.requestThreadList(useCopilotInference);"#,
    r#"threads=Array.isArray(result?.data)?result.data:[]}"#,
    r#"catch(err){J().warning("Failed to fetch conversation list for rename",{safe:{error:err instanceof Error?err.message:String(err)},sensitive:{}}),threads=[]}"#,
    r#"if(threads.length===0){lt.window.showInformationMessage("No Codex threads available to rename.");return}"#,
    r#"let titleCache=await readThreadTitles(),items=threads.map(t=>{"#,
    r#"let id=typeof t?.id==="string"?t.id:typeof t?.conversationId==="string"?t.conversationId:String(t?.id??t?.conversationId??"");"#,
    r#"let cachedTitle=titleCache.titles[id],preview=typeof cachedTitle==="string"?cachedTitle:typeof t?.preview==="string"?t.preview:"",label=(preview&&preview.trim().length>0?preview.trim():id).slice(0,120);"#,
    r#"return{label,description:id,conversationId:id}}).filter(t=>typeof t.conversationId==="string"&&t.conversationId.trim().length>0);"#,
    r#"if(items.length===0){lt.window.showInformationMessage("No Codex threads available to rename.");return}"#,
    r#"let picked=await lt.window.showQuickPick(items,{title:"Rename Codex Thread",placeHolder:"Select a thread to rename",matchOnDescription:!0,ignoreFocusOut:!0});"#,
    r#"if(!picked)return;"#,
    r#"let defaultTitle=titleCache.titles[picked.conversationId]??picked.label??"",newTitle=await lt.window.showInputBox({title:"Rename Codex Thread",prompt:"Enter a new title",value:defaultTitle,ignoreFocusOut:!0});"#,
    r#"if(typeof newTitle!=="string")return;"#,
    r#"await persistAndBroadcast(picked.conversationId,newTitle);})),"#,
);

/// Render the `chatgpt.renameThread` registration statement.
///
/// The result is a single comma-terminated expression, ready to be spliced into
/// the comma chain of `e.push(...)` registrations in the host's `activate`.
pub fn render_rename_snippet(vars: &SnippetVars<'_>) -> Result<String, SnippetError> {
    for name in [
        vars.global_state,
        vars.constants,
        vars.webview_provider,
        vars.chat_session_provider,
    ] {
        if !is_js_identifier(name) {
            return Err(SnippetError::InvalidIdentifier(name.to_string()));
        }
    }

    let mut out = String::with_capacity(RENAME_COMMAND_TEMPLATE.len() + 64);
    let mut rest = RENAME_COMMAND_TEMPLATE;
    while let Some(start) = rest.find("@{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        match lookup(vars, &after[..end]) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 1]),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn lookup<'a>(vars: &SnippetVars<'a>, placeholder: &str) -> Option<&'a str> {
    match placeholder {
        "global_state" => Some(vars.global_state),
        "constants" => Some(vars.constants),
        "webview_provider" => Some(vars.webview_provider),
        "chat_session_provider" => Some(vars.chat_session_provider),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: SnippetVars<'static> = SnippetVars {
        global_state: "Bt",
        constants: "Kt",
        webview_provider: "pe",
        chat_session_provider: "Qn",
    };

    /// Brackets balance outside of double-quoted strings.
    fn balanced(code: &str) -> bool {
        let mut stack = Vec::new();
        let mut in_string = false;
        let mut escaped = false;
        for c in code.chars() {
            if in_string {
                match c {
                    _ if escaped => escaped = false,
                    '\\' => escaped = true,
                    '"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match c {
                '"' => in_string = true,
                '(' | '[' | '{' => stack.push(c),
                ')' => {
                    if stack.pop() != Some('(') {
                        return false;
                    }
                }
                ']' => {
                    if stack.pop() != Some('[') {
                        return false;
                    }
                }
                '}' => {
                    if stack.pop() != Some('{') {
                        return false;
                    }
                }
                _ => {}
            }
        }
        stack.is_empty() && !in_string
    }

    #[test]
    fn renders_one_registration_statement() {
        let snippet = render_rename_snippet(&VARS).unwrap();
        assert!(snippet.starts_with(r#"e.push(lt.commands.registerCommand("chatgpt.renameThread","#));
        assert!(snippet.ends_with("})),"));
        assert!(!snippet.contains("@{"));
        assert!(balanced(&snippet));
    }

    #[test]
    fn substitutes_every_name() {
        let snippet = render_rename_snippet(&VARS).unwrap();
        assert!(snippet.contains("await Bt.get(Kt.THREAD_TITLES)"));
        assert!(snippet.contains("await Bt.update(Kt.THREAD_TITLES,{titles:nextTitles,order:nextOrder})"));
        assert!(snippet.contains("try{pe.broadcastToAllViews({type:\"thread-title-updated\""));
        assert!(snippet.contains("let provider=Qn;"));
    }

    #[test]
    fn carries_payload_and_storage_contract() {
        let snippet = render_rename_snippet(&VARS).unwrap();
        for needle in [
            "opts.conversationId",
            "opts.skipQuickPick",
            "opts.title",
            "nextOrder.unshift(cid)",
            "conversationLoader.requestThreadList",
            "showQuickPick(items",
            "J().warning(\"Failed to persist thread title from command\"",
        ] {
            assert!(snippet.contains(needle), "missing {needle}");
        }
    }

    #[test]
    fn rejects_non_identifiers() {
        let vars = SnippetVars {
            chat_session_provider: "a);evil(",
            ..VARS
        };
        let err = render_rename_snippet(&vars).unwrap_err();
        assert_eq!(err.identifier(), "a);evil(");
    }

    #[test]
    fn dollar_names_survive() {
        let vars = SnippetVars {
            webview_provider: "$e",
            ..VARS
        };
        let snippet = render_rename_snippet(&vars).unwrap();
        assert!(snippet.contains("try{$e.broadcastToAllViews("));
    }
}
