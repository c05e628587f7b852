//! Browser chat widget core.
//!
//! Rendering, transcript persistence and request coordination live here behind
//! small host seams (`MessageSurface`, `KeyValueStore`, `VoiceBackend`,
//! `ChatBackend`) so the same pipeline runs in the browser and in native tests.

#![deny(unsafe_code)]

/// Message rendering, request tracking and the chat controller.
pub mod chat;
/// Widget configuration and per-session preferences.
pub mod settings;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod voice;

pub use chat::{ChatWidget, Fragment, MessageSurface, NodeId, RenderedNode};
pub use settings::{SessionConfig, WidgetSettings};
pub use voice::{CapabilityProvider, VoiceBackend, VoiceService};
