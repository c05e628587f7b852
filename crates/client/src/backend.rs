use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

/// Origin the widget talks to when no override is configured.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub endpoint: String,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim().trim_end_matches('/').to_string(),
        }
    }

    /// Joins `path` onto the configured origin.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

/// One bot reply object as returned by `/greeting` and `/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BotReply {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Vec<String>>,
}

impl BotReply {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: Some("text".to_string()),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_buttons(mut self, buttons: Vec<String>) -> Self {
        self.buttons = Some(buttons);
        self
    }
}

/// A reply body is either a single object or an ordered array of objects.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ReplyPayload {
    Many(Vec<BotReply>),
    One(BotReply),
}

impl ReplyPayload {
    pub fn into_replies(self) -> Vec<BotReply> {
        match self {
            Self::Many(replies) => replies,
            Self::One(reply) => vec![reply],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
}

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ClientError {
    #[snafu(display("failed to build http client on `{stage}`: {source}"))]
    BuildHttpClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("request to {url} failed on `{stage}`: {source}"))]
    Request {
        stage: &'static str,
        url: String,
        source: reqwest::Error,
    },
    #[snafu(display("endpoint {url} returned status {status}"))]
    Status {
        stage: &'static str,
        url: String,
        status: u16,
    },
    #[snafu(display("failed to read response body from {url}: {source}"))]
    ReadBody {
        stage: &'static str,
        url: String,
        source: reqwest::Error,
    },
    #[snafu(display("failed to parse reply payload on `{stage}`: {source}"))]
    ReplyPayloadParse {
        stage: &'static str,
        source: serde_json::Error,
    },
}

/// Remote chatbot collaborator.
///
/// Futures are not `Send`: the widget drives them on the browser's single thread.
pub trait ChatBackend {
    fn greeting(&self) -> LocalBoxFuture<'_, ClientResult<Vec<BotReply>>>;
    fn chat(&self, message: String) -> LocalBoxFuture<'_, ClientResult<Vec<BotReply>>>;
    fn reset(&self) -> LocalBoxFuture<'_, ClientResult<()>>;
}

/// Decodes a `/greeting` or `/chat` body into its ordered replies.
pub fn parse_reply_payload(body: &str) -> ClientResult<Vec<BotReply>> {
    let payload: ReplyPayload = serde_json::from_str(body).context(ReplyPayloadParseSnafu {
        stage: "parse-reply-payload",
    })?;
    Ok(payload.into_replies())
}
