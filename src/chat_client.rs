use async_trait::async_trait;
use eyre::{Result, eyre};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::cli::chat::conversation_state::ChatTurn;

const CHAT_PATH: &str = "/api/chat";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,
    #[serde(default)]
    pub sources: Option<Vec<String>>,
}

impl ChatResponse {
    pub fn sources(&self) -> &[String] {
        self.sources.as_deref().unwrap_or_default()
    }
}

/// A failed chat request. Callers treat both variants the same way.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("request failed with status {0}")]
    Status(StatusCode),
}

#[async_trait]
pub trait ChatTransport {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError>;
}

pub struct ChatClient {
    endpoint: Url,
    client: reqwest::Client,
}

impl ChatClient {
    pub fn new(server_url: &Url) -> Result<Self> {
        let endpoint = server_url
            .join(CHAT_PATH)
            .map_err(|e| eyre!("Invalid chat endpoint for {}: {}", server_url, e))?;

        Ok(Self {
            endpoint,
            client: reqwest::Client::new(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for ChatClient {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        debug!(
            endpoint = %self.endpoint,
            history = request.history.len(),
            "Sending chat request"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Chat request failed with response: {}", error_text);
            return Err(ChatError::Status(status));
        }

        let chat_response: ChatResponse = response.json().await?;
        debug!(
            sources = chat_response.sources().len(),
            "Received chat response"
        );

        Ok(chat_response)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;
    use crate::cli::chat::conversation_state::Role;

    /// Answers one request with `status` and `body`, returning the request
    /// body it received.
    async fn one_shot_server(status: &'static str, body: &'static str) -> (Url, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];

            let request_body = loop {
                let n = socket.read(&mut buf).await.unwrap();
                assert!(n > 0, "connection closed before request completed");
                received.extend_from_slice(&buf[..n]);

                let text = String::from_utf8_lossy(&received).into_owned();
                let Some(header_end) = text.find("\r\n\r\n") else {
                    continue;
                };
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                let body_start = header_end + 4;
                if received.len() >= body_start + content_length {
                    break String::from_utf8_lossy(&received[body_start..body_start + content_length])
                        .into_owned();
                }
            };

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request_body
        });

        (url, handle)
    }

    fn request() -> ChatRequest {
        ChatRequest {
            message: "What can I make with gin?".to_string(),
            history: vec![ChatTurn {
                role: Role::User,
                content: "What can I make with gin?".to_string(),
            }],
        }
    }

    #[test]
    fn endpoint_is_absolute_chat_path() {
        let client = ChatClient::new(&Url::parse("http://localhost:8000/app/").unwrap()).unwrap();
        assert_eq!(client.endpoint().as_str(), "http://localhost:8000/api/chat");
    }

    #[test]
    fn missing_or_null_sources_mean_none() {
        let absent: ChatResponse = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        let null: ChatResponse = serde_json::from_str(r#"{"message":"hi","sources":null}"#).unwrap();
        assert!(absent.sources().is_empty());
        assert!(null.sources().is_empty());
    }

    #[tokio::test]
    async fn posts_json_and_parses_reply() {
        let (url, server) = one_shot_server(
            "200 OK",
            r#"{"message":"A Negroni.","sources":["Negroni","Gimlet"]}"#,
        )
        .await;
        let client = ChatClient::new(&url).unwrap();

        let response = client.send(&request()).await.unwrap();
        assert_eq!(response.message, "A Negroni.");
        assert_eq!(response.sources(), ["Negroni".to_string(), "Gimlet".to_string()]);

        let sent: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(
            sent,
            serde_json::json!({
                "message": "What can I make with gin?",
                "history": [{ "role": "user", "content": "What can I make with gin?" }]
            })
        );
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (url, server) =
            one_shot_server("500 Internal Server Error", r#"{"detail":"boom"}"#).await;
        let client = ChatClient::new(&url).unwrap();

        let err = client.send(&request()).await.unwrap_err();
        assert!(matches!(err, ChatError::Status(StatusCode::INTERNAL_SERVER_ERROR)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_server_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();
        drop(listener);

        let client = ChatClient::new(&url).unwrap();
        let err = client.send(&request()).await.unwrap_err();
        assert!(matches!(err, ChatError::Transport(_)));
    }
}
