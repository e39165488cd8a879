use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use futures::StreamExt;
use log::{error, info, warn};
use serde_json::json;
use std::convert::Infallible;

use crate::error::RelayError;
use crate::forwarder;
use crate::router::{self, PromptReply};
use crate::web::models::PromptRequest;
use crate::web::upload;
use crate::AppState;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

// Health check endpoint
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

// Audio transcription endpoint
pub async fn transcribe(
    data: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, RelayError> {
    let settings = &data.settings;
    let audio = upload::receive_audio(payload, &settings.upload_dir, settings.max_upload_bytes)
        .await
        .map_err(|e| {
            warn!("Rejected upload: {}", e);
            RelayError::from(e)
        })?;

    // `audio` lives until the end of this function, so the scratch file is
    // removed on every return path below.
    match data.upstream.transcribe(audio.path()).await {
        Ok(transcript) => Ok(HttpResponse::Ok().content_type(TEXT_PLAIN).body(transcript)),
        Err(e) => {
            error!("Transcription failed: {}", e);
            Err(RelayError::Transcription(e))
        }
    }
}

// Prompt endpoint: image URL or streamed completion text
pub async fn get_prompt_result(
    data: web::Data<AppState>,
    req: web::Json<PromptRequest>,
) -> Result<HttpResponse, RelayError> {
    let request = req.into_inner();

    match router::route_prompt(data.upstream.as_ref(), &request).await? {
        PromptReply::ImageUrl(url) => {
            info!("Image generated: {}", url);
            Ok(HttpResponse::Ok().content_type(TEXT_PLAIN).body(url))
        }
        PromptReply::Stream(upstream, schema) => {
            let body = forwarder::forward(upstream, schema).map(Ok::<_, Infallible>);
            Ok(HttpResponse::Ok().content_type(TEXT_PLAIN).streaming(body))
        }
    }
}
