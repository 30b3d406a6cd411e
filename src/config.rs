//! Layered runtime configuration.
//!
//! Sources, lowest precedence first:
//! - built-in defaults
//! - `config.toml` in the working directory (optional)
//! - environment variables prefixed `EAR_`, sections split by `__`
//!   (e.g. `EAR_WEBSERVER__INIT_PASSWORD=...`)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::error::TrainerError;

pub const CONFIG_FILE: &str = "config.toml";
pub const ENV_PREFIX: &str = "EAR_";
pub const DEFAULT_INIT_PASSWORD: &str = "changeme";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub basic: BasicConfig,
    pub database: DatabaseConfig,
    pub webserver: WebserverConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicConfig {
    pub listen_addr: String,
    pub port: u16,
    pub loglevel: String,
    /// Drop the `Secure` flag on the session cookie (plain-HTTP deployments).
    pub insecure_cookie: bool,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_string(),
            port: 8000,
            loglevel: "info".to_string(),
            insecure_cookie: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/ear_trainer.sqlite".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebserverConfig {
    /// Password given to the `admin` account on first run only.
    pub init_password: String,
    pub session_ttl_secs: i64,
    pub remember_ttl_secs: i64,
}

impl Default for WebserverConfig {
    fn default() -> Self {
        Self {
            init_password: DEFAULT_INIT_PASSWORD.to_string(),
            session_ttl_secs: 12 * 60 * 60,
            remember_ttl_secs: 365 * 24 * 60 * 60,
        }
    }
}

impl Config {
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load() -> Result<Self, TrainerError> {
        Ok(Self::figment().extract()?)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.basic.listen_addr, self.basic.port)
    }
}
