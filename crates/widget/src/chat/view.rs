use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pigeon_client::{BotReply, ChatBackend};
use pigeon_storage::{ChatEntry, KeyValueStore, TranscriptStore};

use crate::chat::message_list::{MessageList, MessageSurface};
use crate::chat::reply::entry_from_reply;
use crate::chat::request::{RequestTracker, Settlement};
use crate::settings::WidgetSettings;
use crate::voice::{TranscriptCallback, VoiceBackend, VoiceService};

/// Coordinator between the renderer, the transcript store and the chat backend.
///
/// All methods take `&self`; state sits in cells so host callbacks can share one
/// `Rc<ChatWidget>`. No cell borrow is held across an await.
pub struct ChatWidget {
    list: RefCell<MessageList>,
    backend: Rc<dyn ChatBackend>,
    requests: RefCell<RequestTracker>,
    greeting_in_flight: Cell<bool>,
    fallback_message: String,
}

impl ChatWidget {
    pub fn new(
        settings: &WidgetSettings,
        backend: Rc<dyn ChatBackend>,
        surface: Box<dyn MessageSurface>,
        storage: Box<dyn KeyValueStore>,
        voice: Rc<dyn VoiceBackend>,
    ) -> Self {
        let transcript = TranscriptStore::new(storage, settings.transcript_keys());
        let list = MessageList::new(
            surface,
            transcript,
            VoiceService::new(voice, settings),
            settings.session_config(),
        );

        Self {
            list: RefCell::new(list),
            backend,
            requests: RefCell::new(RequestTracker::new()),
            greeting_in_flight: Cell::new(false),
            fallback_message: settings.fallback_message.clone(),
        }
    }

    /// Snapshot of the visible transcript.
    pub fn entries(&self) -> Vec<ChatEntry> {
        self.list.borrow().entries().to_vec()
    }

    pub fn is_typing(&self) -> bool {
        self.list.borrow().is_typing()
    }

    pub fn read_aloud(&self) -> bool {
        self.list.borrow().session().read_aloud
    }

    /// Replays stored history, then delivers the greeting if it was never sent.
    pub async fn start(&self) {
        {
            let mut list = self.list.borrow_mut();
            let history = list.transcript().load();
            tracing::debug!("replaying {} stored chat entries", history.len());
            list.replay(history);
        }

        self.check_greeting().await;
    }

    /// Fetches the greeting unless it was already delivered; returns whether a fetch ran.
    pub async fn check_greeting(&self) -> bool {
        if self.list.borrow().transcript().greeting_sent() {
            tracing::debug!("greeting already delivered, skipping fetch");
            return false;
        }

        self.fetch_greeting().await
    }

    /// Sends typed input. Input that is blank after trimming is ignored.
    pub async fn submit(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }

        self.send_as_user(text.to_string()).await;
    }

    /// Sends the text of a clicked dropdown option or reply button.
    pub async fn select_choice(&self, choice: &str) {
        self.send_as_user(choice.to_string()).await;
    }

    /// Clears local and server history, then fetches a fresh greeting.
    ///
    /// Returns true when the server acknowledged the reset.
    pub async fn reset(&self) -> bool {
        {
            let mut list = self.list.borrow_mut();
            list.clear();
            list.transcript().clear();
        }
        self.requests.borrow_mut().abandon();

        match self.backend.reset().await {
            Ok(()) => {
                self.fetch_greeting().await;
                true
            }
            Err(error) => {
                tracing::error!("failed to reset chat history on server: {error}");
                false
            }
        }
    }

    pub fn toggle_read_aloud(&self) -> bool {
        self.list.borrow_mut().session_mut().toggle_read_aloud()
    }

    /// Starts voice input; the final transcript is handed to `on_transcript`.
    pub fn start_voice_input(&self, on_transcript: TranscriptCallback) -> bool {
        let voice = self.list.borrow().voice().clone();
        voice.listen(on_transcript)
    }

    async fn send_as_user(&self, message: String) {
        self.list
            .borrow_mut()
            .render(ChatEntry::user_text(message.clone()), true);

        let token = self.requests.borrow_mut().begin();
        self.list.borrow_mut().show_typing();

        let result = self.backend.chat(message).await;

        if self.requests.borrow_mut().settle(token) == Settlement::Stale {
            tracing::warn!("dropping superseded chat response {token:?}");
            return;
        }

        let mut list = self.list.borrow_mut();
        list.hide_typing();
        match result {
            Ok(replies) => render_replies(&mut list, replies),
            Err(error) => {
                tracing::error!("chat request failed: {error}");
                list.render(ChatEntry::bot_text(self.fallback_message.clone()), true);
            }
        }
    }

    async fn fetch_greeting(&self) -> bool {
        if self.greeting_in_flight.replace(true) {
            tracing::debug!("greeting fetch already in flight");
            return false;
        }

        let result = self.backend.greeting().await;
        self.greeting_in_flight.set(false);

        match result {
            Ok(replies) => {
                let mut list = self.list.borrow_mut();
                render_replies(&mut list, replies);
                list.transcript().mark_greeting_sent();
            }
            Err(error) => tracing::error!("failed to fetch greeting: {error}"),
        }
        true
    }
}

fn render_replies(list: &mut MessageList, replies: Vec<BotReply>) {
    for reply in replies {
        list.render(entry_from_reply(reply), true);
    }
}

#[cfg(test)]
mod tests {
    use pigeon_storage::{
        DEFAULT_GREETING_KEY, DEFAULT_HISTORY_KEY, EntryKind, MemoryStore, TranscriptKeys,
    };

    use super::*;
    use crate::chat::Fragment;
    use crate::settings::DEFAULT_FALLBACK_MESSAGE;
    use crate::testing::{BackendCall, RecordingSurface, ScriptedBackend, ScriptedVoice};

    struct Harness {
        widget: ChatWidget,
        backend: Rc<ScriptedBackend>,
        surface: RecordingSurface,
        store: MemoryStore,
        voice: Rc<ScriptedVoice>,
    }

    fn harness_with(store: MemoryStore, voice: ScriptedVoice) -> Harness {
        let backend = Rc::new(ScriptedBackend::new());
        let surface = RecordingSurface::new();
        let voice = Rc::new(voice);
        let widget = ChatWidget::new(
            &WidgetSettings::default(),
            backend.clone(),
            Box::new(surface.clone()),
            Box::new(store.clone()),
            voice.clone(),
        );

        Harness {
            widget,
            backend,
            surface,
            store,
            voice,
        }
    }

    fn harness() -> Harness {
        harness_with(MemoryStore::new(), ScriptedVoice::supported())
    }

    fn persisted(store: &MemoryStore) -> Vec<ChatEntry> {
        TranscriptStore::new(Box::new(store.clone()), TranscriptKeys::default()).load()
    }

    #[tokio::test]
    async fn sending_hi_renders_and_persists_both_entries() {
        let harness = harness();
        harness
            .backend
            .push_chat(vec![BotReply::text("hello!")]);

        harness.widget.submit("hi").await;

        let expected = vec![ChatEntry::user_text("hi"), ChatEntry::bot_text("hello!")];
        assert_eq!(harness.widget.entries(), expected);
        assert_eq!(persisted(&harness.store), expected);
        assert_eq!(harness.surface.typing_count(), 0);
        assert_eq!(
            harness.backend.calls(),
            vec![BackendCall::Chat("hi".to_string())]
        );
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let harness = harness();

        harness.widget.submit("   ").await;

        assert!(harness.widget.entries().is_empty());
        assert!(harness.backend.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_chat_renders_fallback_and_clears_typing() {
        let harness = harness();
        harness.backend.push_chat_failure();

        harness.widget.submit("hi").await;

        assert_eq!(
            harness.widget.entries(),
            vec![
                ChatEntry::user_text("hi"),
                ChatEntry::bot_text(DEFAULT_FALLBACK_MESSAGE)
            ]
        );
        assert_eq!(harness.surface.typing_count(), 0);
        assert!(!harness.widget.is_typing());
    }

    #[tokio::test]
    async fn array_reply_fans_out_in_order() {
        let harness = harness();
        harness.backend.push_chat(vec![
            BotReply::text("Here you go"),
            BotReply::text("https://cdn.example/cat.png").with_kind("image"),
            BotReply::text("Anything else?")
                .with_kind("buttons")
                .with_buttons(vec!["Yes".to_string(), "No".to_string()]),
        ]);

        harness.widget.submit("cat please").await;

        let entries = harness.widget.entries();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[2].kind(), &EntryKind::Image);
        assert_eq!(
            entries[3].kind(),
            &EntryKind::Buttons {
                buttons: vec!["Yes".to_string(), "No".to_string()]
            }
        );
    }

    #[tokio::test]
    async fn greeting_is_fetched_once_per_persisted_session() {
        let harness = harness();
        harness
            .backend
            .push_greeting(vec![BotReply::text("Welcome!")]);

        assert!(harness.widget.check_greeting().await);
        assert!(!harness.widget.check_greeting().await);

        assert_eq!(harness.backend.greeting_calls(), 1);
        assert!(harness.store.contains(DEFAULT_GREETING_KEY));
        assert_eq!(harness.widget.entries(), vec![ChatEntry::bot_text("Welcome!")]);
    }

    #[tokio::test]
    async fn concurrent_greeting_checks_share_one_fetch() {
        let harness = harness();
        harness
            .backend
            .push_greeting(vec![BotReply::text("Welcome!")]);

        let (first, second) = futures::join!(
            harness.widget.check_greeting(),
            harness.widget.check_greeting()
        );

        assert!(first);
        assert!(!second);
        assert_eq!(harness.backend.greeting_calls(), 1);
    }

    #[tokio::test]
    async fn failed_greeting_leaves_flag_unset_for_retry() {
        let harness = harness();
        harness.backend.push_greeting_failure();

        harness.widget.check_greeting().await;

        assert!(!harness.store.contains(DEFAULT_GREETING_KEY));
        assert!(harness.widget.entries().is_empty());

        harness
            .backend
            .push_greeting(vec![BotReply::text("Welcome!")]);
        harness.widget.check_greeting().await;
        assert_eq!(harness.backend.greeting_calls(), 2);
    }

    #[tokio::test]
    async fn start_replays_history_and_skips_delivered_greeting() {
        let store = MemoryStore::new();
        {
            let first = harness_with(store.clone(), ScriptedVoice::supported());
            first
                .backend
                .push_greeting(vec![BotReply::text("Welcome!")]);
            first.backend.push_chat(vec![
                BotReply::text("Pick one")
                    .with_kind("dropdown")
                    .with_options(vec!["Tea".to_string(), "Coffee".to_string()]),
            ]);
            first.widget.start().await;
            first.widget.submit("drinks").await;
        }

        let second = harness_with(store, ScriptedVoice::supported());
        second.widget.start().await;

        assert_eq!(second.backend.greeting_calls(), 0);
        assert_eq!(second.widget.entries().len(), 3);
        assert_eq!(
            second.surface.fragments()[2],
            Fragment::Dropdown {
                message: "Pick one".to_string(),
                options: vec!["Tea".to_string(), "Coffee".to_string()],
            }
        );
    }

    #[tokio::test]
    async fn choice_click_reenters_pipeline_as_user_message() {
        let harness = harness();
        harness.backend.push_chat(vec![BotReply::text("Tea it is")]);

        harness.widget.select_choice("Tea").await;

        assert_eq!(
            harness.widget.entries(),
            vec![ChatEntry::user_text("Tea"), ChatEntry::bot_text("Tea it is")]
        );
    }

    #[tokio::test]
    async fn superseded_response_is_dropped() {
        let harness = harness();
        let first_reply = harness.backend.push_deferred_chat();
        let second_reply = harness.backend.push_deferred_chat();

        futures::join!(
            harness.widget.submit("first"),
            harness.widget.submit("second"),
            async {
                let _ = second_reply.send(Ok(vec![BotReply::text("answer to second")]));
                let _ = first_reply.send(Ok(vec![BotReply::text("answer to first")]));
            }
        );

        assert_eq!(
            harness.widget.entries(),
            vec![
                ChatEntry::user_text("first"),
                ChatEntry::user_text("second"),
                ChatEntry::bot_text("answer to second"),
            ]
        );
        assert_eq!(harness.surface.typing_count(), 0);
    }

    #[tokio::test]
    async fn reset_clears_everything_and_greets_again() {
        let harness = harness();
        harness
            .backend
            .push_greeting(vec![BotReply::text("Welcome!")]);
        harness.backend.push_chat(vec![BotReply::text("hello!")]);
        harness.widget.start().await;
        harness.widget.submit("hi").await;

        harness
            .backend
            .push_greeting(vec![BotReply::text("Welcome back!")]);
        assert!(harness.widget.reset().await);

        assert_eq!(
            harness.widget.entries(),
            vec![ChatEntry::bot_text("Welcome back!")]
        );
        assert_eq!(harness.backend.greeting_calls(), 2);
        assert_eq!(harness.surface.len(), 1);
    }

    #[tokio::test]
    async fn failed_server_reset_still_clears_local_state() {
        let harness = harness();
        harness.backend.push_chat(vec![BotReply::text("hello!")]);
        harness.widget.submit("hi").await;
        harness.backend.fail_resets(true);

        assert!(!harness.widget.reset().await);

        assert!(harness.surface.is_empty());
        assert!(!harness.store.contains(DEFAULT_HISTORY_KEY));
        assert!(!harness.store.contains(DEFAULT_GREETING_KEY));

        harness
            .backend
            .push_greeting(vec![BotReply::text("Welcome!")]);
        assert!(harness.widget.check_greeting().await);
    }

    #[tokio::test]
    async fn read_aloud_toggle_controls_bot_speech() {
        let harness = harness();
        harness.backend.push_chat(vec![BotReply::text("spoken")]);
        harness.backend.push_chat(vec![BotReply::text("silent")]);

        assert!(!harness.widget.read_aloud());
        assert!(harness.widget.toggle_read_aloud());
        assert!(harness.widget.read_aloud());
        harness.widget.submit("one").await;
        assert!(!harness.widget.toggle_read_aloud());
        harness.widget.submit("two").await;

        let spoken = harness.voice.spoken();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].text, "spoken");
    }

    #[tokio::test]
    async fn voice_input_hands_transcript_to_host() {
        let harness = harness_with(
            MemoryStore::new(),
            ScriptedVoice::supported().with_transcript("hello there"),
        );
        let heard = Rc::new(RefCell::new(Vec::new()));
        let sink = heard.clone();

        let started = harness
            .widget
            .start_voice_input(Box::new(move |text| sink.borrow_mut().push(text)));

        assert!(started);
        assert_eq!(*heard.borrow(), vec!["hello there".to_string()]);
        assert!(harness.voice.alerts().is_empty());
        assert!(harness.widget.entries().is_empty());
    }
}
