#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use actix_web::http::StatusCode;
use actix_web::{test, web::Data, App};
use bytes::Bytes;
use futures::stream::{self, StreamExt};

use chat_relay::config::{Settings, MAX_UPLOAD_BYTES};
use chat_relay::error::UpstreamError;
use chat_relay::upstream::{ByteStream, CompletionRequest, ImageRequest, Upstream};
use chat_relay::web::models::ChatMessage;
use chat_relay::web::routes;
use chat_relay::AppState;

pub const BOUNDARY: &str = "relay-test-boundary";

/// Upstream double that records every call and replays canned answers.
#[derive(Default)]
pub struct StubUpstream {
    pub calls: AtomicUsize,
    pub transcript: String,
    pub image_urls: Vec<String>,
    pub chunks: Vec<&'static str>,
    pub stay_open: bool,
    /// When set, every operation fails with this status and body.
    pub failure: Option<(u16, &'static str)>,
    pub uploads: Mutex<Vec<(PathBuf, Vec<u8>)>>,
    pub image_requests: Mutex<Vec<ImageRequest>>,
    pub completion_requests: Mutex<Vec<CompletionRequest>>,
    pub chat_requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl StubUpstream {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) -> Result<(), UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failure {
            Some((status, body)) => Err(UpstreamError::from_response(status, body)),
            None => Ok(()),
        }
    }

    fn byte_stream(&self) -> ByteStream {
        let chunks: Vec<Result<Bytes, UpstreamError>> = self
            .chunks
            .iter()
            .map(|chunk| Ok(Bytes::from_static(chunk.as_bytes())))
            .collect();
        if self.stay_open {
            Box::pin(stream::iter(chunks).chain(stream::pending()))
        } else {
            Box::pin(stream::iter(chunks))
        }
    }
}

#[async_trait::async_trait]
impl Upstream for StubUpstream {
    async fn transcribe(&self, audio: &Path) -> Result<String, UpstreamError> {
        let contents = std::fs::read(audio).unwrap_or_default();
        self.uploads
            .lock()
            .unwrap()
            .push((audio.to_path_buf(), contents));
        self.record_call()?;
        Ok(self.transcript.clone())
    }

    async fn create_image(&self, request: &ImageRequest) -> Result<Vec<String>, UpstreamError> {
        self.image_requests.lock().unwrap().push(request.clone());
        self.record_call()?;
        Ok(self.image_urls.clone())
    }

    async fn stream_chat_completion(
        &self,
        messages: &[ChatMessage],
    ) -> Result<ByteStream, UpstreamError> {
        self.chat_requests.lock().unwrap().push(messages.to_vec());
        self.record_call()?;
        Ok(self.byte_stream())
    }

    async fn stream_completion(
        &self,
        request: &CompletionRequest,
    ) -> Result<ByteStream, UpstreamError> {
        self.completion_requests.lock().unwrap().push(request.clone());
        self.record_call()?;
        Ok(self.byte_stream())
    }
}

pub fn test_settings(upload_dir: &Path) -> Settings {
    Settings {
        api_key: "sk-test".to_string(),
        base_url: "http://upstream.invalid/v1".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        upload_dir: upload_dir.to_path_buf(),
        client_dir: PathBuf::from("client"),
        chat_model: "gpt-3.5-turbo".to_string(),
        transcription_model: "whisper-1".to_string(),
        max_upload_bytes: MAX_UPLOAD_BYTES,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: String,
    pub body: Bytes,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).unwrap()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

/// Runs one request through the relay routes backed by `stub`.
pub async fn send(
    stub: Arc<StubUpstream>,
    settings: Settings,
    request: test::TestRequest,
) -> TestResponse {
    let upstream: Arc<dyn Upstream> = stub;
    let app = test::init_service(
        App::new()
            .app_data(Data::new(AppState { settings, upstream }))
            .configure(routes::configure),
    )
    .await;

    let response = test::call_service(&app, request.to_request()).await;
    let status = response.status();
    let content_type = response
        .headers()
        .get(actix_web::http::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = test::read_body(response).await;

    TestResponse {
        status,
        content_type,
        body,
    }
}

/// A form part: field name, optional file name, contents.
pub type FormPart<'a> = (&'a str, Option<&'a str>, &'a [u8]);

pub fn multipart_request(parts: &[FormPart<'_>]) -> test::TestRequest {
    let mut body = Vec::new();
    for (name, filename, contents) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                    name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            ),
        }
        body.extend_from_slice(contents);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    test::TestRequest::post()
        .uri("/transcribe")
        .insert_header((
            actix_web::http::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(body)
}

pub fn prompt_request(body: serde_json::Value) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/get-prompt-result")
        .set_json(body)
}

pub fn scratch_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
