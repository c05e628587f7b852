use std::rc::Rc;

mod backend;
mod http;

pub use backend::{
    BotReply, ChatBackend, ChatRequest, ClientConfig, ClientError, ClientResult, DEFAULT_ENDPOINT,
    ReplyPayload, parse_reply_payload,
};
pub use http::HttpChatBackend;

pub fn create_backend(config: ClientConfig) -> ClientResult<Rc<dyn ChatBackend>> {
    Ok(Rc::new(HttpChatBackend::new(config)?))
}
