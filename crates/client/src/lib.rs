//! HTTP client for a sift deployment: chunked chat streaming, single-shot
//! classification, chat settings and history hydration.

use std::pin::Pin;

use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde::de::DeserializeOwned;

pub mod error;
pub mod types;

pub use error::ClientError;
pub use types::{
    ChatRequest, ContextPayload, HistoryMessage, HistorySender, Reference, TextClassification,
    TokenClassification,
};

/// Chat response body, decoded into text chunks as they arrive.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, ClientError>> + Send>>;

#[derive(Deserialize)]
struct Wrapped<T> {
    data: T,
}

#[derive(Deserialize)]
struct ChatHistoryData {
    chat_history: Vec<HistoryMessage>,
}

#[derive(Clone)]
pub struct DeploymentClient {
    http: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl DeploymentClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: None,
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorize(self.http.get(format!("{}{}", self.base_url, path)))
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorize(self.http.post(format!("{}{}", self.base_url, path)))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Status { status, body })
    }

    async fn decode_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let response = Self::check_status(response).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// `POST /chat`. The response body is a plain-text stream; answer text
    /// and the trailing context blob are split downstream by the caller.
    pub async fn stream_chat(&self, request: &ChatRequest) -> Result<ChunkStream, ClientError> {
        tracing::debug!(provider = %request.provider, "opening chat stream");
        let response = self.post("/chat").json(request).send().await?;
        let response = Self::check_status(response).await?;
        Ok(text_chunks(response))
    }

    /// `GET /predict` against a token classification deployment.
    pub async fn predict_tokens(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<TokenClassification, ClientError> {
        let top_k = top_k.to_string();
        let response = self
            .get("/predict")
            .query(&[("query", query), ("top_k", top_k.as_str())])
            .send()
            .await?;
        Self::decode_json(response).await
    }

    /// `GET /predict` against a text classification deployment.
    pub async fn predict_classes(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<TextClassification, ClientError> {
        let top_k = top_k.to_string();
        let response = self
            .get("/predict")
            .query(&[("query", query), ("top_k", top_k.as_str())])
            .send()
            .await?;
        Self::decode_json(response).await
    }

    /// `POST /update-chat-settings`. Selects the chat provider for the
    /// session; must be called before hydrating history.
    pub async fn set_chat(&self, provider: &str) -> Result<(), ClientError> {
        let response = self
            .post("/update-chat-settings")
            .json(&serde_json::json!({ "provider": provider }))
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    /// `POST /get-chat-history`. Returns prior turns, including any
    /// persisted per-message reference lists.
    pub async fn chat_history(&self, provider: &str) -> Result<Vec<HistoryMessage>, ClientError> {
        let response = self
            .post("/get-chat-history")
            .json(&serde_json::json!({ "provider": provider }))
            .send()
            .await?;
        let wrapped: Wrapped<ChatHistoryData> = Self::decode_json(response).await?;
        Ok(wrapped.data.chat_history)
    }
}

/// Decode a chunked response body into UTF-8 text chunks. Multi-byte
/// sequences split across chunk boundaries are carried over to the next
/// chunk instead of being emitted mangled.
fn text_chunks(response: reqwest::Response) -> ChunkStream {
    Box::pin(async_stream::try_stream! {
        let mut bytes = Box::pin(response.bytes_stream());
        let mut carry: Vec<u8> = Vec::new();
        while let Some(next) = bytes.next().await {
            let chunk = next?;
            carry.extend_from_slice(&chunk);
            let valid_len = match std::str::from_utf8(&carry) {
                Ok(_) => carry.len(),
                Err(split) => split.valid_up_to(),
            };
            if valid_len > 0 {
                let text = String::from_utf8_lossy(&carry[..valid_len]).into_owned();
                carry.drain(..valid_len);
                yield text;
            }
        }
        if !carry.is_empty() {
            // Truncated sequence at end of stream; surface it lossily rather
            // than dropping the bytes.
            yield String::from_utf8_lossy(&carry).into_owned();
        }
    })
}
