pub mod api;
pub mod auth;
pub mod config;
pub mod content;
pub mod error;
pub mod media;
pub mod state;
pub mod storage;

use tracing_subscriber::{EnvFilter, fmt::time::ChronoLocal};

use config::Config;
use media::{MediaRelocator, SupabaseStorage};
use state::AppState;

pub async fn run() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
        .with_env_filter(EnvFilter::from_env("GECKO_LOG"))
        .init();

    let config = Config::load().unwrap_or_else(|e| panic!("Failed to load config: {e}"));

    let object_storage = SupabaseStorage::new(
        &config.storage_url,
        &config.storage_key,
        config.fetch_timeout(),
    );
    let media = MediaRelocator::new(
        object_storage,
        &config.image_bucket,
        &config.audio_bucket,
        config.fetch_timeout(),
    );

    let app = AppState::new(storage::init_db_from_env().await, media);

    api::run_server(app, &config.bind, &config.route_prefix).await
}
