use common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// TOML profile with the algorithms and hardware to rank for
    pub profile_path: PathBuf,
    /// Fetch all sources once before serving
    pub refresh_on_start: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            profile_path: PathBuf::from("api/profile.toml"),
            refresh_on_start: true,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("API_HOST").unwrap_or(defaults.host);
        let port = std::env::var("API_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);
        let profile_path = std::env::var("PROFILE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.profile_path);
        let refresh_on_start = std::env::var("REFRESH_ON_START")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.refresh_on_start);

        Self {
            host,
            port,
            profile_path,
            refresh_on_start,
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::ConfigError(format!("Invalid listen address {}:{}: {}", self.host, self.port, e)))
    }
}
