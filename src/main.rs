use actix_cors::Cors;
use actix_files as fs;
use actix_web::{middleware::Logger, web::Data, App, HttpServer};
use dotenv::dotenv;
use log::{error, info};
use std::sync::Arc;

use chat_relay::config::Settings;
use chat_relay::upstream::{OpenAiClient, Upstream};
use chat_relay::web::routes;
use chat_relay::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting chat relay");

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = std::fs::create_dir_all(&settings.upload_dir) {
        error!(
            "Failed to create upload directory {}: {}",
            settings.upload_dir.display(),
            e
        );
        std::process::exit(1);
    }

    let upstream: Arc<dyn Upstream> = Arc::new(OpenAiClient::new(&settings));
    let bind = (settings.host.clone(), settings.port);
    let client_dir = settings.client_dir.clone();

    let app_state = Data::new(AppState { settings, upstream });

    info!("Listening on {}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(Logger::default())
            .app_data(app_state.clone())
            .configure(routes::configure)
            .service(fs::Files::new("/", &client_dir).index_file("index.html"))
    })
    .bind(bind)?
    .run()
    .await
}
