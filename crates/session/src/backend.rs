use std::collections::HashMap;
use std::pin::Pin;

use anyhow::Result;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use sift_client::{
    ChatRequest, DeploymentClient, HistoryMessage, TextClassification, TokenClassification,
};

pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// The single seam between the session core and the deployment backend.
/// Production code talks to [`DeploymentClient`]; tests script this trait.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn stream_chat(
        &self,
        query: &str,
        provider: &str,
        constraints: &HashMap<String, String>,
    ) -> Result<ChunkStream>;

    async fn predict_tokens(&self, query: &str, top_k: usize) -> Result<TokenClassification>;

    async fn predict_classes(&self, query: &str, top_k: usize) -> Result<TextClassification>;

    async fn set_chat(&self, provider: &str) -> Result<()>;

    async fn chat_history(&self, provider: &str) -> Result<Vec<HistoryMessage>>;
}

#[async_trait]
impl ChatBackend for DeploymentClient {
    async fn stream_chat(
        &self,
        query: &str,
        provider: &str,
        constraints: &HashMap<String, String>,
    ) -> Result<ChunkStream> {
        let request = ChatRequest {
            user_input: query.to_string(),
            provider: provider.to_string(),
            session_id: None,
            constraints: constraints.clone(),
        };
        let stream = DeploymentClient::stream_chat(self, &request).await?;
        Ok(Box::pin(stream.map(|item| item.map_err(anyhow::Error::from))))
    }

    async fn predict_tokens(&self, query: &str, top_k: usize) -> Result<TokenClassification> {
        Ok(DeploymentClient::predict_tokens(self, query, top_k).await?)
    }

    async fn predict_classes(&self, query: &str, top_k: usize) -> Result<TextClassification> {
        Ok(DeploymentClient::predict_classes(self, query, top_k).await?)
    }

    async fn set_chat(&self, provider: &str) -> Result<()> {
        Ok(DeploymentClient::set_chat(self, provider).await?)
    }

    async fn chat_history(&self, provider: &str) -> Result<Vec<HistoryMessage>> {
        Ok(DeploymentClient::chat_history(self, provider).await?)
    }
}
