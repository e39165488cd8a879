pub mod config;
pub mod error;
pub mod forwarder;
pub mod router;
pub mod upstream;
pub mod web;

use std::sync::Arc;

use config::Settings;
use upstream::Upstream;

// App state structure, shared read-only by every request
pub struct AppState {
    pub settings: Settings,
    pub upstream: Arc<dyn Upstream>,
}
