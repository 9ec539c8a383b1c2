use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Startup settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the browser client bundle.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl ServerConfig {
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            log::debug!("No .env file loaded: {}", e);
        }
        envy::from_env::<ServerConfig>().map_err(ConfigError::Env)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Env(envy::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Env(e) => write!(f, "invalid environment configuration: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

fn default_bind_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    3000
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}
