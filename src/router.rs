use log::{error, info};

use crate::error::{RelayError, UpstreamError};
use crate::forwarder::ChunkSchema;
use crate::upstream::{ByteStream, CompletionRequest, ImageRequest, Upstream};
use crate::web::models::{ModelSelector, PromptRequest};

pub const IMAGE_SIZE: &str = "512x512";
pub const MARKDOWN_INSTRUCTION: &str = "Please reply below question in markdown format.";

pub enum PromptReply {
    ImageUrl(String),
    Stream(ByteStream, ChunkSchema),
}

pub fn legacy_prompt(content: &str) -> String {
    format!("{}\n {}", MARKDOWN_INSTRUCTION, content)
}

pub async fn route_prompt(
    upstream: &dyn Upstream,
    request: &PromptRequest,
) -> Result<PromptReply, RelayError> {
    let prompt = request.prompt().ok_or(RelayError::MissingPrompt)?;
    let selector = ModelSelector::parse(&request.model);

    info!(
        "Prompt request with {} messages routed to {:?}",
        request.chat_history.len(),
        selector
    );

    let reply = match selector {
        ModelSelector::Image => {
            let image = ImageRequest {
                prompt: prompt.to_string(),
                size: IMAGE_SIZE.to_string(),
                response_format: "url".to_string(),
            };
            upstream.create_image(&image).await.and_then(|urls| {
                urls.into_iter().next().map(PromptReply::ImageUrl).ok_or_else(|| {
                    UpstreamError::InvalidResponse("image generation returned no URL".to_string())
                })
            })
        }
        ModelSelector::ChatGpt => upstream
            .stream_chat_completion(&request.chat_history)
            .await
            .map(|stream| PromptReply::Stream(stream, ChunkSchema::Chat)),
        ModelSelector::Gpt | ModelSelector::Code => {
            let completion = CompletionRequest {
                model: selector.completion_model().to_string(),
                prompt: legacy_prompt(prompt),
                max_tokens: selector.max_tokens(),
                stream: true,
            };
            upstream
                .stream_completion(&completion)
                .await
                .map(|stream| PromptReply::Stream(stream, ChunkSchema::Legacy))
        }
    };

    reply.map_err(|e| {
        error!("Upstream call for {:?} failed: {}", selector, e);
        RelayError::Upstream(e)
    })
}
