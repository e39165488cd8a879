use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::{json, Value};

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No audio file was uploaded")]
    MissingFile,
    #[error("Unexpected field: {0}")]
    UnexpectedField(String),
    #[error("Invalid file type: {0}")]
    InvalidFileType(String),
    #[error("File too large, limit is {limit} bytes")]
    TooLarge { limit: usize },
    #[error("Failed to read multipart: {0}")]
    Multipart(String),
    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("Upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Upstream returned {status}: {message}")]
    Api {
        status: u16,
        message: String,
        payload: Option<Value>,
    },
    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),
    #[error("Failed to read audio file: {0}")]
    Io(#[from] std::io::Error),
}

impl UpstreamError {
    // Error bodies look like {"error": {"message": ..., "type": ...}}
    pub fn from_response(status: u16, body: &str) -> Self {
        let payload = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| value.get("error").cloned());

        let message = payload
            .as_ref()
            .and_then(|error| error.get("message"))
            .and_then(|message| message.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| body.trim().to_string());

        UpstreamError::Api {
            status,
            message,
            payload,
        }
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            UpstreamError::Api { payload, .. } => payload.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Prompt is missing in the request")]
    MissingPrompt,
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("{0}")]
    Transcription(UpstreamError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl ResponseError for RelayError {
    fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MissingPrompt | RelayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::Upload(UploadError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::Upload(_) => StatusCode::BAD_REQUEST,
            RelayError::Transcription(_) | RelayError::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::build(self.status_code());
        match self {
            RelayError::MissingPrompt | RelayError::BadRequest(_) => {
                response.json(json!({ "error": self.to_string() }))
            }
            RelayError::Upstream(e) => match e.payload() {
                Some(payload) => response.json(payload),
                None => response
                    .content_type("text/plain; charset=utf-8")
                    .body(e.to_string()),
            },
            _ => response
                .content_type("text/plain; charset=utf-8")
                .body(self.to_string()),
        }
    }
}
