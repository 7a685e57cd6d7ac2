use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use crate::service::playback_driver::DriverConfig;
use crate::service::spotify::{self, SpotifyConfig};

/// Server configuration, from flags or the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "jamroom-server", version, about = "Shared listening rooms with a fair play queue")]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "JAMROOM_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    #[arg(long, env = "SPOTIFY_ID", hide_env_values = true)]
    pub spotify_client_id: String,

    #[arg(long, env = "SPOTIFY_SECRET", hide_env_values = true)]
    pub spotify_client_secret: String,

    #[arg(long, env = "SPOTIFY_ACCOUNTS_URL", default_value = spotify::DEFAULT_ACCOUNTS_URL)]
    pub spotify_accounts_url: String,

    #[arg(long, env = "SPOTIFY_API_URL", default_value = spotify::DEFAULT_API_URL)]
    pub spotify_api_url: String,

    /// Upper bound on a single catalog request
    #[arg(long, env = "JAMROOM_CATALOG_TIMEOUT_SECS", default_value_t = 10)]
    pub catalog_timeout_secs: u64,

    /// How often rooms are checked for finished tracks
    #[arg(
        long,
        env = "JAMROOM_TICK_MS",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(100..)
    )]
    pub tick_ms: u64,

    /// Evict rooms with nothing playing after this many idle seconds (0 = never)
    #[arg(long, env = "JAMROOM_ROOM_IDLE_SECS", default_value_t = 86_400)]
    pub room_idle_secs: u64,
}

impl Config {
    pub fn spotify(&self) -> SpotifyConfig {
        SpotifyConfig {
            client_id: self.spotify_client_id.clone(),
            client_secret: self.spotify_client_secret.clone(),
            accounts_url: self.spotify_accounts_url.trim_end_matches('/').to_string(),
            api_url: self.spotify_api_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(self.catalog_timeout_secs),
        }
    }

    pub fn driver(&self) -> DriverConfig {
        DriverConfig {
            tick: Duration::from_millis(self.tick_ms),
            room_idle: (self.room_idle_secs > 0).then(|| Duration::from_secs(self.room_idle_secs)),
        }
    }
}
