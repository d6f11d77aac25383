use crate::{
    constants::{
        DEFAULT_REVIEWS_DEPTH_SECS, DEFAULT_SCHEDULER_DELAY_SECS, DEFAULT_UPSTREAM_TIMEOUT_SECS,
        DEFAULT_WORKERS_NUM,
    },
    models::AppId,
    Result, GatewayError,
};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub scheduler: SchedulerConfig,
    pub storage: StorageConfig,
    pub upstream: UpstreamConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub prefix: String,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    pub workers_num: usize,
    /// Freshness window in seconds; pages older than this stop pagination.
    pub reviews_depth_secs: i64,
}

impl PollingConfig {
    pub fn reviews_depth(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.reviews_depth_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub delay_secs: u64,
}

impl SchedulerConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Apps seeded on startup (idempotent).
    pub initial_app_ids: Vec<AppId>,
    /// Persistence file; `None` keeps the store in memory only.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub rss_host: String,
    pub timeout_secs: u64,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file
        match dotenv() {
            Ok(path) => tracing::info!("Loaded .env file from: {:?}", path),
            Err(e) => tracing::debug!("Could not load .env file: {}", e),
        }

        let api = ApiConfig {
            host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("API_PORT", 8000)?,
            prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            cors_origins: parse_list(
                &env::var("API_CORS_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            ),
        };

        let polling = PollingConfig {
            workers_num: parse_var("POLLING_WORKERS_NUM", DEFAULT_WORKERS_NUM)?,
            reviews_depth_secs: parse_var("POLLING_REVIEWS_DEPTH", DEFAULT_REVIEWS_DEPTH_SECS)?,
        };
        if polling.workers_num == 0 {
            return Err(GatewayError::ConfigurationError(
                "POLLING_WORKERS_NUM must be at least 1".to_string(),
            ));
        }

        let scheduler = SchedulerConfig {
            enabled: parse_var("SCHEDULER_ENABLED", false)?,
            delay_secs: parse_var("SCHEDULER_DELAY", DEFAULT_SCHEDULER_DELAY_SECS)?,
        };

        let storage = StorageConfig {
            initial_app_ids: match env::var("STORAGE_INITIAL_APP_IDS") {
                Ok(raw) => parse_app_ids(&raw)?,
                // SkyScanner, Tab, Qantas
                Err(_) => vec![415458524, 595068606, 640437525],
            },
            path: env::var("STORAGE_PATH").ok().map(PathBuf::from),
        };

        let upstream = UpstreamConfig {
            rss_host: env::var("HTTP_EXTERNAL_RSS_HOST")
                .unwrap_or_else(|_| "https://itunes.apple.com/us/rss/customerreviews".to_string()),
            timeout_secs: parse_var("HTTP_EXTERNAL_RSS_TIMEOUT", DEFAULT_UPSTREAM_TIMEOUT_SECS)?,
        };

        Ok(Config {
            api,
            polling,
            scheduler,
            storage,
            upstream,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| {
            GatewayError::ConfigurationError(format!("{name} has an invalid value: {raw:?}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_app_ids(raw: &str) -> Result<Vec<AppId>> {
    parse_list(raw)
        .iter()
        .map(|s| {
            s.parse().map_err(|_| {
                GatewayError::ConfigurationError(format!(
                    "STORAGE_INITIAL_APP_IDS has an invalid app id: {s:?}"
                ))
            })
        })
        .collect()
}
