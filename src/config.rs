use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;

/// Environment variable prefix for every configuration key.
pub const ENV_PREFIX: &str = "DBINIT_";

/// Character set applied to every application database.
pub const APP_DATABASE_CHARSET: &str = "utf8mb4";

/// Runtime configuration, loaded once from defaults and `DBINIT_*` variables.
pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    Config::load().unwrap_or_else(|e| {
        eprintln!("invalid {ENV_PREFIX}* configuration, using defaults: {e}");
        Config::default()
    })
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub loglevel: String,
    /// Port used when the event carries no `databasePort`.
    pub database_port: u16,
    pub connect_timeout_secs: u64,
    pub response_connect_timeout_secs: u64,
    pub response_timeout_secs: u64,
    pub response_max_retries: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            loglevel: "info".to_string(),
            database_port: 3306,
            connect_timeout_secs: 10,
            response_connect_timeout_secs: 5,
            response_timeout_secs: 15,
            response_max_retries: 3,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn response_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.response_connect_timeout_secs)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }
}
