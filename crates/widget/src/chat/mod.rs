/// Host-independent node descriptions for each entry kind.
pub mod fragment;
pub mod message_list;
pub mod reply;
/// Correlation tokens that keep only the newest chat response.
pub mod request;
pub mod view;

pub use fragment::{
    Fragment, IMAGE_ALT, NodeId, OPTIONS_TOGGLE_LABEL, RenderedNode, youtube_embed_url,
};
pub use message_list::{MessageList, MessageSurface};
pub use reply::entry_from_reply;
pub use request::{RequestToken, RequestTracker, Settlement};
pub use view::ChatWidget;
