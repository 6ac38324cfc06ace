//! In-memory host doubles shared by the unit tests.

use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::Mutex;

use crate::host::{
    CommandRegistry, ExtensionCatalog, HostCommandError, InstalledExtension, MessageLevel,
    PromptError, Prompter,
};

pub(crate) struct FakeRegistry {
    registered: Vec<String>,
    failing: HashSet<String>,
    calls: Mutex<Vec<(String, Option<serde_json::Value>)>>,
}

impl FakeRegistry {
    pub(crate) fn new(registered: &[&str]) -> Self {
        Self {
            registered: registered.iter().map(|s| s.to_string()).collect(),
            failing: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(mut self, ids: &[&str]) -> Self {
        self.failing.extend(ids.iter().map(|s| s.to_string()));
        self
    }

    pub(crate) fn calls(&self) -> Vec<(String, Option<serde_json::Value>)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn called_ids(&self) -> Vec<String> {
        self.calls().into_iter().map(|(id, _)| id).collect()
    }
}

#[async_trait::async_trait]
impl CommandRegistry for FakeRegistry {
    async fn commands(&self) -> Result<Vec<String>, HostCommandError> {
        Ok(self.registered.clone())
    }

    async fn execute(
        &self,
        command_id: &str,
        args: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, HostCommandError> {
        self.calls
            .lock()
            .unwrap()
            .push((command_id.to_string(), args));
        if !self.registered.iter().any(|id| id == command_id) {
            return Err(HostCommandError::NotFound(command_id.to_string()));
        }
        if self.failing.contains(command_id) {
            return Err(HostCommandError::failed(command_id, "handler threw"));
        }
        Ok(serde_json::Value::Null)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ShownMessage {
    pub(crate) level: MessageLevel,
    pub(crate) message: String,
    pub(crate) detail: Option<String>,
    pub(crate) actions: Vec<String>,
}

/// Answers prompts from queued responses; `None` once a queue runs dry.
#[derive(Default)]
pub(crate) struct FakePrompter {
    message_answers: Mutex<VecDeque<Option<String>>>,
    pick_answers: Mutex<VecDeque<Option<String>>>,
    shown: Mutex<Vec<ShownMessage>>,
    picks_offered: Mutex<Vec<Vec<String>>>,
}

impl FakePrompter {
    pub(crate) fn answer_message(self, answer: Option<&str>) -> Self {
        self.message_answers
            .lock()
            .unwrap()
            .push_back(answer.map(str::to_string));
        self
    }

    pub(crate) fn answer_pick(self, answer: Option<&str>) -> Self {
        self.pick_answers
            .lock()
            .unwrap()
            .push_back(answer.map(str::to_string));
        self
    }

    pub(crate) fn shown(&self) -> Vec<ShownMessage> {
        self.shown.lock().unwrap().clone()
    }

    pub(crate) fn picks_offered(&self) -> Vec<Vec<String>> {
        self.picks_offered.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Prompter for FakePrompter {
    async fn show_message(
        &self,
        level: MessageLevel,
        message: &str,
        detail: Option<&str>,
        actions: &[&str],
    ) -> Result<Option<String>, PromptError> {
        self.shown.lock().unwrap().push(ShownMessage {
            level,
            message: message.to_string(),
            detail: detail.map(str::to_string),
            actions: actions.iter().map(|a| a.to_string()).collect(),
        });
        Ok(self.message_answers.lock().unwrap().pop_front().flatten())
    }

    async fn quick_pick(
        &self,
        items: &[String],
        _placeholder: &str,
    ) -> Result<Option<String>, PromptError> {
        self.picks_offered.lock().unwrap().push(items.to_vec());
        Ok(self.pick_answers.lock().unwrap().pop_front().flatten())
    }
}

pub(crate) struct FakeCatalog(pub(crate) Option<InstalledExtension>);

impl FakeCatalog {
    pub(crate) fn installed_at(path: &Path, version: &str) -> Self {
        Self(Some(InstalledExtension {
            id: "openai.chatgpt".into(),
            version: version.into(),
            install_path: path.to_path_buf(),
        }))
    }

    pub(crate) fn empty() -> Self {
        Self(None)
    }
}

impl ExtensionCatalog for FakeCatalog {
    fn find(&self, extension_id: &str) -> Option<InstalledExtension> {
        self.0.clone().filter(|ext| ext.id == extension_id)
    }
}
