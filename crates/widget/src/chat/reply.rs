use pigeon_client::BotReply;
use pigeon_storage::{ChatEntry, KindTag, Sender};

/// Maps one backend reply into a bot transcript entry.
///
/// A missing or unrecognized `type` renders as text; missing choice lists become empty.
pub fn entry_from_reply(reply: BotReply) -> ChatEntry {
    let tag = reply
        .kind
        .as_deref()
        .map(KindTag::parse)
        .unwrap_or_default();
    let kind = tag.into_kind(
        reply.options.unwrap_or_default(),
        reply.buttons.unwrap_or_default(),
    );

    ChatEntry::new(reply.message, Sender::Bot, kind)
}
