mod openai;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::Serialize;
use std::path::Path;
use std::pin::Pin;

use crate::error::UpstreamError;
use crate::web::models::ChatMessage;

pub use openai::OpenAiClient;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, UpstreamError>> + Send>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub size: String,
    pub response_format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub stream: bool,
}

#[async_trait]
pub trait Upstream: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<String, UpstreamError>;

    async fn create_image(&self, request: &ImageRequest) -> Result<Vec<String>, UpstreamError>;

    async fn stream_chat_completion(
        &self,
        messages: &[ChatMessage],
    ) -> Result<ByteStream, UpstreamError>;

    async fn stream_completion(
        &self,
        request: &CompletionRequest,
    ) -> Result<ByteStream, UpstreamError>;
}
