use serde::{Deserialize, Serialize};

/// Key holding the serialized transcript.
pub const DEFAULT_HISTORY_KEY: &str = "chatHistory";
/// Key marking that the greeting was delivered for this browsing context.
pub const DEFAULT_GREETING_KEY: &str = "greetingSent";
/// Value written under the greeting key.
pub const GREETING_SENT_VALUE: &str = "true";

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }
}

/// Payload category of an entry, with the choice lists interactive kinds carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Text,
    Image,
    Video,
    Youtube,
    Dropdown { options: Vec<String> },
    Buttons { buttons: Vec<String> },
}

impl EntryKind {
    pub fn tag(&self) -> KindTag {
        match self {
            Self::Text => KindTag::Text,
            Self::Image => KindTag::Image,
            Self::Video => KindTag::Video,
            Self::Youtube => KindTag::Youtube,
            Self::Dropdown { .. } => KindTag::Dropdown,
            Self::Buttons { .. } => KindTag::Buttons,
        }
    }
}

/// Flat wire name of an [`EntryKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindTag {
    Image,
    Video,
    Youtube,
    Dropdown,
    Buttons,
    // Unknown tags in stored or received payloads render as plain text.
    #[default]
    #[serde(other)]
    Text,
}

impl KindTag {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "image" => Self::Image,
            "video" => Self::Video,
            "youtube" => Self::Youtube,
            "dropdown" => Self::Dropdown,
            "buttons" => Self::Buttons,
            _ => Self::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Youtube => "youtube",
            Self::Dropdown => "dropdown",
            Self::Buttons => "buttons",
        }
    }

    /// Builds the full kind, attaching whichever choice list the tag uses.
    pub fn into_kind(self, options: Vec<String>, buttons: Vec<String>) -> EntryKind {
        match self {
            Self::Text => EntryKind::Text,
            Self::Image => EntryKind::Image,
            Self::Video => EntryKind::Video,
            Self::Youtube => EntryKind::Youtube,
            Self::Dropdown => EntryKind::Dropdown { options },
            Self::Buttons => EntryKind::Buttons { buttons },
        }
    }
}

/// One transcript record. The kind is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "EntryRecord", into = "EntryRecord")]
pub struct ChatEntry {
    message: String,
    sender: Sender,
    kind: EntryKind,
}

impl ChatEntry {
    pub fn new(message: impl Into<String>, sender: Sender, kind: EntryKind) -> Self {
        Self {
            message: message.into(),
            sender,
            kind,
        }
    }

    pub fn user_text(message: impl Into<String>) -> Self {
        Self::new(message, Sender::User, EntryKind::Text)
    }

    pub fn bot_text(message: impl Into<String>) -> Self {
        Self::new(message, Sender::Bot, EntryKind::Text)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn kind(&self) -> &EntryKind {
        &self.kind
    }
}

/// Persisted shape of a [`ChatEntry`], compatible with the browser widget's history blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    #[serde(default)]
    pub message: String,
    pub sender: Sender,
    #[serde(rename = "type", default)]
    pub kind: KindTag,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<String>,
}

impl From<EntryRecord> for ChatEntry {
    fn from(record: EntryRecord) -> Self {
        Self {
            message: record.message,
            sender: record.sender,
            kind: record.kind.into_kind(record.options, record.buttons),
        }
    }
}

impl From<ChatEntry> for EntryRecord {
    fn from(entry: ChatEntry) -> Self {
        let kind = entry.kind.tag();
        let (options, buttons) = match entry.kind {
            EntryKind::Dropdown { options } => (options, Vec::new()),
            EntryKind::Buttons { buttons } => (Vec::new(), buttons),
            EntryKind::Text | EntryKind::Image | EntryKind::Video | EntryKind::Youtube => {
                (Vec::new(), Vec::new())
            }
        };

        Self {
            message: entry.message,
            sender: entry.sender,
            kind,
            options,
            buttons,
        }
    }
}

/// Storage key names used by the transcript store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptKeys {
    pub history: String,
    pub greeting: String,
}

impl TranscriptKeys {
    pub fn new(history: impl Into<String>, greeting: impl Into<String>) -> Self {
        Self {
            history: history.into(),
            greeting: greeting.into(),
        }
    }
}

impl Default for TranscriptKeys {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_KEY, DEFAULT_GREETING_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_history_blob_without_choice_lists_parses() {
        let raw = r#"[
            {"message":"hi","sender":"user","type":"text"},
            {"message":"https://cdn.example/cat.png","sender":"bot","type":"image"},
            {"message":"<b>hello</b>","sender":"bot"}
        ]"#;

        let entries: Vec<ChatEntry> = serde_json::from_str(raw).unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], ChatEntry::user_text("hi"));
        assert_eq!(entries[1].kind(), &EntryKind::Image);
        assert_eq!(entries[2], ChatEntry::bot_text("<b>hello</b>"));
    }

    #[test]
    fn unknown_kind_tag_falls_back_to_text() {
        let raw = r#"{"message":"x","sender":"bot","type":"carousel"}"#;
        let entry: ChatEntry = serde_json::from_str(raw).unwrap();
        assert_eq!(entry.kind(), &EntryKind::Text);
        assert_eq!(KindTag::parse("carousel"), KindTag::Text);
        assert_eq!(
            serde_json::from_str::<KindTag>(r#""carousel""#).unwrap(),
            KindTag::Text
        );
        assert_eq!(
            serde_json::from_str::<KindTag>(r#""buttons""#).unwrap(),
            KindTag::Buttons
        );
    }

    #[test]
    fn choice_lists_are_written_only_for_their_kind() {
        let dropdown = ChatEntry::new(
            "Pick one",
            Sender::Bot,
            EntryKind::Dropdown {
                options: vec!["Tea".to_string(), "Coffee".to_string()],
            },
        );

        let value = serde_json::to_value(&dropdown).unwrap();

        assert_eq!(value["type"], "dropdown");
        assert_eq!(value["options"][1], "Coffee");
        assert!(value.get("buttons").is_none());

        let plain = serde_json::to_value(ChatEntry::user_text("hi")).unwrap();
        assert!(plain.get("options").is_none());
    }
}
