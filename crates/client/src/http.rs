use futures::FutureExt;
use futures::future::LocalBoxFuture;
use snafu::{ResultExt, ensure};

use super::backend::{
    BuildHttpClientSnafu, BotReply, ChatBackend, ChatRequest, ClientConfig, ClientResult,
    ReadBodySnafu, RequestSnafu, StatusSnafu, parse_reply_payload,
};

const GREETING_PATH: &str = "greeting";
const CHAT_PATH: &str = "chat";
const RESET_PATH: &str = "reset";

/// JSON-over-HTTP backend. Uses the browser's fetch when compiled to wasm.
pub struct HttpChatBackend {
    config: ClientConfig,
    client: reqwest::Client,
}

impl HttpChatBackend {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context(BuildHttpClientSnafu {
                stage: "http-backend-new",
            })?;

        Ok(Self { config, client })
    }

    async fn fetch_greeting(&self) -> ClientResult<Vec<BotReply>> {
        let url = self.config.url(GREETING_PATH);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context(RequestSnafu {
                stage: "greeting-send",
                url: url.clone(),
            })?;

        read_replies(response, url, "greeting-read-body").await
    }

    async fn post_chat(&self, message: String) -> ClientResult<Vec<BotReply>> {
        let url = self.config.url(CHAT_PATH);
        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { message: &message })
            .send()
            .await
            .context(RequestSnafu {
                stage: "chat-send",
                url: url.clone(),
            })?;

        read_replies(response, url, "chat-read-body").await
    }

    async fn post_reset(&self) -> ClientResult<()> {
        let url = self.config.url(RESET_PATH);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .context(RequestSnafu {
                stage: "reset-send",
                url: url.clone(),
            })?;

        let status = response.status();
        ensure!(
            status.is_success(),
            StatusSnafu {
                stage: "reset-status",
                url,
                status: status.as_u16(),
            }
        );

        tracing::info!("chat history reset on server");
        Ok(())
    }
}

// The reply body is decoded regardless of status; only an undecodable body is a failure.
async fn read_replies(
    response: reqwest::Response,
    url: String,
    stage: &'static str,
) -> ClientResult<Vec<BotReply>> {
    let status = response.status();
    let body = response.text().await.context(ReadBodySnafu {
        stage,
        url: url.clone(),
    })?;

    if !status.is_success() {
        tracing::warn!("{url} answered {status}; decoding body anyway");
    }

    parse_reply_payload(&body)
}

impl ChatBackend for HttpChatBackend {
    fn greeting(&self) -> LocalBoxFuture<'_, ClientResult<Vec<BotReply>>> {
        self.fetch_greeting().boxed_local()
    }

    fn chat(&self, message: String) -> LocalBoxFuture<'_, ClientResult<Vec<BotReply>>> {
        self.post_chat(message).boxed_local()
    }

    fn reset(&self) -> LocalBoxFuture<'_, ClientResult<()>> {
        self.post_reset().boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};

    use super::*;
    use crate::backend::ClientError;

    fn backend_for(server: &Server) -> HttpChatBackend {
        HttpChatBackend::new(ClientConfig::new(server.url())).unwrap()
    }

    #[tokio::test]
    async fn chat_posts_json_message_and_fans_out_array_reply() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat")
            .match_header("content-type", "application/json")
            .match_body(Matcher::JsonString(r#"{"message":"hi"}"#.to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"message":"hello!","type":"text"},
                    {"message":"Pick one","type":"buttons","buttons":["A","B"]}]"#,
            )
            .create_async()
            .await;

        let replies = backend_for(&server).chat("hi".to_string()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0], BotReply::text("hello!"));
        assert_eq!(
            replies[1].buttons.as_deref(),
            Some(&["A".to_string(), "B".to_string()][..])
        );
    }

    #[tokio::test]
    async fn greeting_is_fetched_with_get() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/greeting")
            .with_status(200)
            .with_body(r#"{"message":"Welcome!"}"#)
            .create_async()
            .await;

        let replies = backend_for(&server).greeting().await.unwrap();

        mock.assert_async().await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].message, "Welcome!");
        assert_eq!(replies[0].kind, None);
    }

    #[tokio::test]
    async fn error_status_body_is_still_decoded() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat")
            .with_status(500)
            .with_body(r#"{"message":"backend hiccup","type":"text"}"#)
            .create_async()
            .await;

        let replies = backend_for(&server).chat("hi".to_string()).await.unwrap();

        assert_eq!(replies, vec![BotReply::text("backend hiccup")]);
    }

    #[tokio::test]
    async fn undecodable_body_is_an_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat")
            .with_status(502)
            .with_body("<html>Bad Gateway</html>")
            .create_async()
            .await;

        let result = backend_for(&server).chat("hi".to_string()).await;

        assert!(matches!(
            result,
            Err(ClientError::ReplyPayloadParse { .. })
        ));
    }

    #[tokio::test]
    async fn reset_succeeds_on_success_status() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/reset")
            .with_status(204)
            .create_async()
            .await;

        assert!(backend_for(&server).reset().await.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn reset_fails_on_server_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/reset")
            .with_status(500)
            .create_async()
            .await;

        let result = backend_for(&server).reset().await;

        assert!(matches!(
            result,
            Err(ClientError::Status { status: 500, .. })
        ));
    }
}
