//! In-memory collaborators for tests and the QA runner.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use pigeon_client::{BotReply, ChatBackend, ClientError, ClientResult};

use crate::chat::{Fragment, MessageSurface, NodeId, RenderedNode};
use crate::voice::{
    CapabilityProvider, RecognitionRequest, TranscriptCallback, Utterance, VoiceBackend,
    VoiceError,
};

/// Surface that records appended nodes. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    nodes: Rc<RefCell<Vec<RenderedNode>>>,
    scrolls: Rc<Cell<usize>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fragments(&self) -> Vec<Fragment> {
        self.nodes
            .borrow()
            .iter()
            .map(|node| node.fragment.clone())
            .collect()
    }

    pub fn typing_count(&self) -> usize {
        self.nodes
            .borrow()
            .iter()
            .filter(|node| node.fragment == Fragment::Typing)
            .count()
    }

    pub fn scroll_count(&self) -> usize {
        self.scrolls.get()
    }

    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }
}

impl MessageSurface for RecordingSurface {
    fn append(&mut self, node: RenderedNode) {
        self.nodes.borrow_mut().push(node);
    }

    fn remove(&mut self, id: NodeId) {
        self.nodes.borrow_mut().retain(|node| node.id != id);
    }

    fn clear(&mut self) {
        self.nodes.borrow_mut().clear();
    }

    fn scroll_to_latest(&mut self) {
        self.scrolls.set(self.scrolls.get() + 1);
    }
}

/// A queued backend answer.
pub enum ScriptedReply {
    Ready(ClientResult<Vec<BotReply>>),
    /// Resolves when the paired sender fires; lets tests reorder responses.
    Deferred(oneshot::Receiver<ClientResult<Vec<BotReply>>>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Greeting,
    Chat(String),
    Reset,
}

/// Backend that answers from queues and records every call.
#[derive(Default)]
pub struct ScriptedBackend {
    greetings: RefCell<VecDeque<ScriptedReply>>,
    chats: RefCell<VecDeque<ScriptedReply>>,
    reset_failures: Cell<bool>,
    calls: RefCell<Vec<BackendCall>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_greeting(&self, replies: Vec<BotReply>) {
        self.greetings
            .borrow_mut()
            .push_back(ScriptedReply::Ready(Ok(replies)));
    }

    pub fn push_greeting_failure(&self) {
        self.greetings
            .borrow_mut()
            .push_back(ScriptedReply::Ready(Err(scripted_failure("greeting", 503))));
    }

    pub fn push_chat(&self, replies: Vec<BotReply>) {
        self.chats
            .borrow_mut()
            .push_back(ScriptedReply::Ready(Ok(replies)));
    }

    pub fn push_chat_failure(&self) {
        self.chats
            .borrow_mut()
            .push_back(ScriptedReply::Ready(Err(scripted_failure("chat", 500))));
    }

    /// Queues a chat answer delivered through the returned sender.
    pub fn push_deferred_chat(&self) -> oneshot::Sender<ClientResult<Vec<BotReply>>> {
        let (sender, receiver) = oneshot::channel();
        self.chats
            .borrow_mut()
            .push_back(ScriptedReply::Deferred(receiver));
        sender
    }

    pub fn fail_resets(&self, fail: bool) {
        self.reset_failures.set(fail);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.borrow().clone()
    }

    pub fn greeting_calls(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| **call == BackendCall::Greeting)
            .count()
    }

    fn answer(
        queue: &RefCell<VecDeque<ScriptedReply>>,
        endpoint: &'static str,
    ) -> LocalBoxFuture<'static, ClientResult<Vec<BotReply>>> {
        match queue.borrow_mut().pop_front() {
            Some(ScriptedReply::Ready(result)) => futures::future::ready(result).boxed_local(),
            Some(ScriptedReply::Deferred(receiver)) => async move {
                receiver
                    .await
                    .unwrap_or_else(|_| Err(scripted_failure(endpoint, 504)))
            }
            .boxed_local(),
            None => futures::future::ready(Err(scripted_failure(endpoint, 404))).boxed_local(),
        }
    }
}

impl ChatBackend for ScriptedBackend {
    fn greeting(&self) -> LocalBoxFuture<'_, ClientResult<Vec<BotReply>>> {
        self.calls.borrow_mut().push(BackendCall::Greeting);
        Self::answer(&self.greetings, "greeting")
    }

    fn chat(&self, message: String) -> LocalBoxFuture<'_, ClientResult<Vec<BotReply>>> {
        self.calls.borrow_mut().push(BackendCall::Chat(message));
        Self::answer(&self.chats, "chat")
    }

    fn reset(&self) -> LocalBoxFuture<'_, ClientResult<()>> {
        self.calls.borrow_mut().push(BackendCall::Reset);
        let result = if self.reset_failures.get() {
            Err(scripted_failure("reset", 500))
        } else {
            Ok(())
        };
        futures::future::ready(result).boxed_local()
    }
}

fn scripted_failure(endpoint: &'static str, status: u16) -> ClientError {
    ClientError::Status {
        stage: "scripted-backend",
        url: format!("scripted://{endpoint}"),
        status,
    }
}

/// Speech engine double with configurable capabilities.
#[derive(Default)]
pub struct ScriptedVoice {
    voice_input: bool,
    voice_output: bool,
    voices: Vec<String>,
    transcript: Option<String>,
    spoken: RefCell<Vec<Utterance>>,
    recognitions: RefCell<Vec<RecognitionRequest>>,
    alerts: RefCell<Vec<String>>,
}

impl ScriptedVoice {
    pub fn supported() -> Self {
        Self {
            voice_input: true,
            voice_output: true,
            ..Self::default()
        }
    }

    pub fn unsupported() -> Self {
        Self::default()
    }

    pub fn with_voices(mut self, voices: &[&str]) -> Self {
        self.voices = voices.iter().map(|voice| voice.to_string()).collect();
        self
    }

    /// Transcript handed back synchronously by the next recognition session.
    pub fn with_transcript(mut self, transcript: impl Into<String>) -> Self {
        self.transcript = Some(transcript.into());
        self
    }

    pub fn spoken(&self) -> Vec<Utterance> {
        self.spoken.borrow().clone()
    }

    pub fn recognitions(&self) -> Vec<RecognitionRequest> {
        self.recognitions.borrow().clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.borrow().clone()
    }
}

impl CapabilityProvider for ScriptedVoice {
    fn supports_voice_input(&self) -> bool {
        self.voice_input
    }

    fn supports_voice_output(&self) -> bool {
        self.voice_output
    }
}

impl VoiceBackend for ScriptedVoice {
    fn voice_names(&self) -> Vec<String> {
        self.voices.clone()
    }

    fn speak(&self, utterance: Utterance) {
        self.spoken.borrow_mut().push(utterance);
    }

    fn recognize(
        &self,
        request: RecognitionRequest,
        on_transcript: TranscriptCallback,
    ) -> Result<(), VoiceError> {
        self.recognitions.borrow_mut().push(request);
        if let Some(transcript) = self.transcript.clone() {
            on_transcript(transcript);
        }
        Ok(())
    }

    fn alert(&self, message: &str) {
        self.alerts.borrow_mut().push(message.to_string());
    }
}
