use actix_web::{error, web, HttpRequest};

use crate::error::RelayError;
use crate::web::handlers;

pub const JSON_LIMIT: usize = 1024 * 1024;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_LIMIT)
            .error_handler(json_error),
    )
    .route("/transcribe", web::post().to(handlers::transcribe))
    .route("/get-prompt-result", web::post().to(handlers::get_prompt_result))
    .route("/health", web::get().to(handlers::health_check));
}

fn json_error(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    log::warn!("Invalid JSON body: {}", err);
    RelayError::BadRequest(err.to_string()).into()
}
