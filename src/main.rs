//! Road segment map - Axum server
//!
//! Run with: cargo run -- --dataset jalan-kp.json
//! Then open: http://localhost:7860/?ruasId=242

use std::io;
use std::sync::Arc;

use clap::Parser;
use tower_http::services::ServeDir;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ruas_map::api::{self, AppState};
use ruas_map::config::Config;
use ruas_map::console;
use ruas_map::demo_data;
use ruas_map::domain::Dataset;
use ruas_map::routing::OsrmClient;

#[tokio::main]
async fn main() -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ruas_map=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::parse();
    console::print_banner();

    let dataset = if config.demo {
        let dataset = demo_data::generate();
        console::print_dataset_loaded(std::path::Path::new("<demo>"), &dataset);
        Some(dataset)
    } else {
        match Dataset::load(&config.dataset).await {
            Ok(dataset) => {
                console::print_dataset_loaded(&config.dataset, &dataset);
                Some(dataset)
            }
            Err(e) => {
                error!(path = %config.dataset.display(), "Gagal load GeoJSON Jalan: {}", e);
                console::print_dataset_failed(&config.dataset, &e);
                if config.require_dataset {
                    return Err(io::Error::new(io::ErrorKind::InvalidData, e));
                }
                None
            }
        }
    };

    let routes = OsrmClient::new(config.osrm_url.clone(), config.routing_timeout())
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    let state = Arc::new(
        AppState::new(dataset, Arc::new(routes), config.osrm_url.clone()).with_max_sessions(config.max_sessions),
    );

    let app = api::create_router(state).fallback_service(ServeDir::new(&config.static_dir));

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    console::print_listening(addr, &config.osrm_url);
    info!(%addr, static_dir = %config.static_dir.display(), "Server started");

    axum::serve(listener, app).await
}
