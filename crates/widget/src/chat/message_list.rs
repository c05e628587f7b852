use pigeon_storage::{ChatEntry, EntryKind, Sender, TranscriptStore};

use crate::chat::fragment::{Fragment, NodeId, RenderedNode};
use crate::settings::SessionConfig;
use crate::voice::VoiceService;

/// Host-side visible log (a DOM container in the browser).
pub trait MessageSurface {
    fn append(&mut self, node: RenderedNode);
    fn remove(&mut self, id: NodeId);
    fn clear(&mut self);
    fn scroll_to_latest(&mut self);
}

/// Renders chat entries onto a surface and keeps the authoritative typed transcript.
///
/// Every render persists the full list, so storage always mirrors what is visible.
pub struct MessageList {
    surface: Box<dyn MessageSurface>,
    transcript: TranscriptStore,
    voice: VoiceService,
    session: SessionConfig,
    entries: Vec<ChatEntry>,
    typing: Option<NodeId>,
    next_node_id: u64,
}

impl MessageList {
    pub fn new(
        surface: Box<dyn MessageSurface>,
        transcript: TranscriptStore,
        voice: VoiceService,
        session: SessionConfig,
    ) -> Self {
        Self {
            surface,
            transcript,
            voice,
            session,
            entries: Vec::new(),
            typing: None,
            next_node_id: 0,
        }
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn transcript(&self) -> &TranscriptStore {
        &self.transcript
    }

    pub fn session(&self) -> &SessionConfig {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionConfig {
        &mut self.session
    }

    pub fn voice(&self) -> &VoiceService {
        &self.voice
    }

    /// Appends one entry, persists the transcript and optionally reads it aloud.
    pub fn render(&mut self, entry: ChatEntry, speak: bool) {
        self.append_node(&entry);
        self.entries.push(entry);
        self.transcript.save(&self.entries);

        if speak && self.session.read_aloud {
            self.speak_latest();
        }
    }

    /// Renders stored entries silently and persists once at the end.
    pub fn replay(&mut self, entries: Vec<ChatEntry>) {
        if entries.is_empty() {
            return;
        }

        for entry in &entries {
            self.append_node(entry);
        }
        self.entries.extend(entries);
        self.transcript.save(&self.entries);
    }

    pub fn is_typing(&self) -> bool {
        self.typing.is_some()
    }

    /// Shows the typing placeholder; a second call while shown is a no-op.
    pub fn show_typing(&mut self) {
        if self.typing.is_some() {
            return;
        }

        let id = self.allocate_node_id();
        self.surface.append(RenderedNode {
            id,
            sender: Sender::Bot,
            fragment: Fragment::Typing,
        });
        self.surface.scroll_to_latest();
        self.typing = Some(id);
    }

    pub fn hide_typing(&mut self) {
        if let Some(id) = self.typing.take() {
            self.surface.remove(id);
        }
    }

    /// Empties the visible log and the in-memory transcript; storage is left to the caller.
    pub fn clear(&mut self) {
        self.surface.clear();
        self.entries.clear();
        self.typing = None;
    }

    fn append_node(&mut self, entry: &ChatEntry) {
        let id = self.allocate_node_id();
        self.surface.append(RenderedNode {
            id,
            sender: entry.sender(),
            fragment: Fragment::from_entry(entry),
        });
        self.surface.scroll_to_latest();
    }

    fn speak_latest(&mut self) {
        let Some(entry) = self.entries.last() else {
            return;
        };

        match (entry.kind(), entry.sender()) {
            (EntryKind::Text, Sender::Bot) | (EntryKind::Youtube, _) => {
                let text = entry.message().to_string();
                self.voice.speak(&text, &mut self.session);
            }
            _ => {}
        }
    }

    fn allocate_node_id(&mut self) -> NodeId {
        self.next_node_id += 1;
        NodeId::new(self.next_node_id)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use pigeon_storage::{MemoryStore, TranscriptKeys};

    use super::*;
    use crate::settings::WidgetSettings;
    use crate::testing::{RecordingSurface, ScriptedVoice};

    struct Fixture {
        list: MessageList,
        surface: RecordingSurface,
        store: MemoryStore,
        voice: Rc<ScriptedVoice>,
    }

    fn fixture(read_aloud: bool) -> Fixture {
        let surface = RecordingSurface::new();
        let store = MemoryStore::new();
        let voice = Rc::new(ScriptedVoice::supported());
        let list = MessageList::new(
            Box::new(surface.clone()),
            TranscriptStore::new(Box::new(store.clone()), TranscriptKeys::default()),
            VoiceService::new(voice.clone(), &WidgetSettings::default()),
            SessionConfig {
                read_aloud,
                selected_voice: None,
            },
        );

        Fixture {
            list,
            surface,
            store,
            voice,
        }
    }

    fn reload(store: &MemoryStore) -> Vec<ChatEntry> {
        TranscriptStore::new(Box::new(store.clone()), TranscriptKeys::default()).load()
    }

    #[test]
    fn render_appends_one_node_scrolls_and_persists() {
        let mut fixture = fixture(false);

        fixture.list.render(ChatEntry::user_text("hi"), true);
        fixture.list.render(ChatEntry::bot_text("hello!"), true);

        assert_eq!(fixture.surface.len(), 2);
        assert_eq!(fixture.surface.scroll_count(), 2);
        assert_eq!(
            reload(&fixture.store),
            vec![ChatEntry::user_text("hi"), ChatEntry::bot_text("hello!")]
        );
    }

    #[test]
    fn bot_text_is_spoken_only_when_enabled_and_requested() {
        let mut fixture = fixture(true);

        fixture.list.render(ChatEntry::user_text("hi"), true);
        fixture.list.render(ChatEntry::bot_text("hello!"), true);
        fixture.list.render(ChatEntry::bot_text("quiet"), false);
        fixture
            .list
            .render(ChatEntry::new("a.png", Sender::Bot, EntryKind::Image), true);

        let spoken = fixture.voice.spoken();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].text, "hello!");

        let mut muted = self::fixture(false);
        muted.list.render(ChatEntry::bot_text("hello!"), true);
        assert!(muted.voice.spoken().is_empty());
    }

    #[test]
    fn youtube_entries_speak_the_raw_url() {
        let mut fixture = fixture(true);
        let url = "https://www.youtube.com/watch?v=abc";

        fixture
            .list
            .render(ChatEntry::new(url, Sender::Bot, EntryKind::Youtube), true);

        assert_eq!(fixture.voice.spoken()[0].text, url);
        assert_eq!(
            fixture.surface.fragments(),
            vec![Fragment::Embed {
                src: "https://www.youtube.com/embed/abc".to_string()
            }]
        );
    }

    #[test]
    fn typing_indicator_is_transient_and_never_persisted() {
        let mut fixture = fixture(false);
        fixture.list.render(ChatEntry::user_text("hi"), true);

        fixture.list.show_typing();
        fixture.list.show_typing();
        assert_eq!(fixture.surface.typing_count(), 1);

        fixture.list.hide_typing();
        assert_eq!(fixture.surface.typing_count(), 0);
        assert_eq!(reload(&fixture.store), vec![ChatEntry::user_text("hi")]);
    }

    #[test]
    fn replay_restores_choice_controls_without_speaking() {
        let mut fixture = fixture(true);
        let entries = vec![
            ChatEntry::bot_text("Welcome"),
            ChatEntry::new(
                "Pick a topic",
                Sender::Bot,
                EntryKind::Dropdown {
                    options: vec!["Billing".to_string(), "Shipping".to_string()],
                },
            ),
        ];

        fixture.list.replay(entries.clone());

        assert!(fixture.voice.spoken().is_empty());
        assert_eq!(fixture.list.entries(), entries.as_slice());
        assert_eq!(
            fixture.surface.fragments()[1].choices(),
            &["Billing".to_string(), "Shipping".to_string()]
        );
    }

    #[test]
    fn clear_empties_surface_and_entries() {
        let mut fixture = fixture(false);
        fixture.list.render(ChatEntry::user_text("hi"), true);
        fixture.list.show_typing();

        fixture.list.clear();

        assert!(fixture.surface.is_empty());
        assert!(fixture.list.entries().is_empty());
        assert!(!fixture.list.is_typing());
    }
}
