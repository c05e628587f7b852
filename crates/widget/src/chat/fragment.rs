use pigeon_storage::{ChatEntry, EntryKind, Sender};

/// Alt text used for image entries.
pub const IMAGE_ALT: &str = "Image";
/// Label of the control that opens a dropdown entry's option list.
pub const OPTIONS_TOGGLE_LABEL: &str = "☰";

const WATCH_MARKER: &str = "watch?v=";
const EMBED_MARKER: &str = "embed/";

/// Identifies one node in the visible log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl NodeId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Host-independent description of what a log node displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Text entries, inserted as rich content for either sender.
    Markup(String),
    Image { src: String, alt: String },
    Video { src: String },
    Embed { src: String },
    Dropdown { message: String, options: Vec<String> },
    Buttons { message: String, buttons: Vec<String> },
    Typing,
}

impl Fragment {
    pub fn from_entry(entry: &ChatEntry) -> Self {
        let message = entry.message().to_string();

        match entry.kind() {
            // Stored history may hold entity-escaped markup for either sender.
            EntryKind::Text => Self::Markup(message),
            EntryKind::Image => Self::Image {
                src: message,
                alt: IMAGE_ALT.to_string(),
            },
            EntryKind::Video => Self::Video { src: message },
            EntryKind::Youtube => Self::Embed {
                src: youtube_embed_url(&message),
            },
            EntryKind::Dropdown { options } => Self::Dropdown {
                message,
                options: options.clone(),
            },
            EntryKind::Buttons { buttons } => Self::Buttons {
                message,
                buttons: buttons.clone(),
            },
        }
    }

    /// Choices that re-enter the pipeline as user messages when clicked.
    pub fn choices(&self) -> &[String] {
        match self {
            Self::Dropdown { options, .. } => options,
            Self::Buttons { buttons, .. } => buttons,
            _ => &[],
        }
    }
}

/// One node appended to the visible log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNode {
    pub id: NodeId,
    pub sender: Sender,
    pub fragment: Fragment,
}

/// Rewrites a canonical watch link into its embeddable form.
pub fn youtube_embed_url(url: &str) -> String {
    url.replacen(WATCH_MARKER, EMBED_MARKER, 1)
}
