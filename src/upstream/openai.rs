use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, info};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio_util::io::ReaderStream;

use super::{ByteStream, CompletionRequest, ImageRequest, Upstream};
use crate::config::Settings;
use crate::error::UpstreamError;
use crate::web::models::ChatMessage;

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    chat_model: String,
    transcription_model: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    url: Option<String>,
}

impl OpenAiClient {
    pub fn new(settings: &Settings) -> Self {
        info!("Using upstream API at: {}", settings.base_url);

        Self {
            client: Client::new(),
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.clone(),
            chat_model: settings.chat_model.clone(),
            transcription_model: settings.transcription_model.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, UpstreamError> {
        let response = request.bearer_auth(&self.api_key).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::from_response(status, &body));
        }

        Ok(response)
    }

    fn into_byte_stream(response: Response) -> ByteStream {
        Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(UpstreamError::from)),
        )
    }
}

#[async_trait]
impl Upstream for OpenAiClient {
    async fn transcribe(&self, audio: &Path) -> Result<String, UpstreamError> {
        let file = tokio::fs::File::open(audio).await?;
        let length = file.metadata().await?.len();
        let file_name = audio
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("audio")
            .to_string();

        debug!("Streaming {} ({} bytes) for transcription", file_name, length);

        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let form = Form::new()
            .text("model", self.transcription_model.clone())
            .text("response_format", "text")
            .part("file", Part::stream_with_length(body, length).file_name(file_name));

        let response = self
            .send(self.client.post(self.url("audio/transcriptions")).multipart(form))
            .await?;
        let transcript = response.text().await?;

        info!("Transcript length: {} characters", transcript.len());
        Ok(transcript)
    }

    async fn create_image(&self, request: &ImageRequest) -> Result<Vec<String>, UpstreamError> {
        let response = self
            .send(self.client.post(self.url("images/generations")).json(request))
            .await?;

        let images: ImagesResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::InvalidResponse(e.to_string()))?;

        Ok(images.data.into_iter().filter_map(|image| image.url).collect())
    }

    async fn stream_chat_completion(
        &self,
        messages: &[ChatMessage],
    ) -> Result<ByteStream, UpstreamError> {
        let payload = ChatCompletionRequest {
            model: &self.chat_model,
            messages,
            stream: true,
        };

        debug!("Starting chat completion with {} messages", messages.len());
        let response = self
            .send(self.client.post(self.url("chat/completions")).json(&payload))
            .await?;

        Ok(Self::into_byte_stream(response))
    }

    async fn stream_completion(
        &self,
        request: &CompletionRequest,
    ) -> Result<ByteStream, UpstreamError> {
        debug!(
            "Starting {} completion with max_tokens: {}",
            request.model, request.max_tokens
        );
        let response = self
            .send(self.client.post(self.url("completions")).json(request))
            .await?;

        Ok(Self::into_byte_stream(response))
    }
}
