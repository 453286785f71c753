//! Server configuration from command-line flags and `RUAS_MAP_*`
//! environment variables.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::routing::{DEFAULT_OSRM_URL, DEFAULT_TIMEOUT};
use crate::session::DEFAULT_MAX_SESSIONS;

#[derive(Debug, Clone, Parser)]
#[command(name = "ruas-map", version, about = "Road segment map server")]
pub struct Config {
    /// Address to bind.
    #[arg(long, env = "RUAS_MAP_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    #[arg(long, env = "RUAS_MAP_PORT", default_value_t = 7860)]
    pub port: u16,

    /// GeoJSON FeatureCollection of road segments.
    #[arg(long, env = "RUAS_MAP_DATASET", default_value = "jalan-kp.json")]
    pub dataset: PathBuf,

    /// Serve the built-in demo dataset instead of reading `--dataset`.
    #[arg(long, env = "RUAS_MAP_DEMO")]
    pub demo: bool,

    /// Exit when the dataset cannot be loaded instead of serving 503s.
    #[arg(long, env = "RUAS_MAP_REQUIRE_DATASET")]
    pub require_dataset: bool,

    /// Base URL of the OSRM server.
    #[arg(long, env = "RUAS_MAP_OSRM_URL", default_value = DEFAULT_OSRM_URL)]
    pub osrm_url: String,

    /// Per-request routing timeout in seconds.
    #[arg(long, env = "RUAS_MAP_ROUTING_TIMEOUT", default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub routing_timeout_secs: u64,

    /// Map sessions kept before the oldest is evicted.
    #[arg(long, env = "RUAS_MAP_MAX_SESSIONS", default_value_t = DEFAULT_MAX_SESSIONS)]
    pub max_sessions: usize,

    /// Directory of the web frontend.
    #[arg(long, env = "RUAS_MAP_STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,
}

impl Config {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn routing_timeout(&self) -> Duration {
        Duration::from_secs(self.routing_timeout_secs)
    }
}
