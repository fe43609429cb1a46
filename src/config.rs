use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub fetcher: FetcherConfig,
    pub run: RunConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the workbook sheets. Required for `run`/`watch`.
    pub workbook: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub retry: u32,
    pub backoff_ms: u64,
    pub chrome_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Minimum absolute price delta (won) for a change to be significant.
    pub price_threshold: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Six-field cron expression (with seconds) for `watch` firings.
    pub cron: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .set_default("store.workbook", "")?
            .set_default("fetcher.user_agent", DEFAULT_USER_AGENT)?
            .set_default("fetcher.timeout_secs", 12)?
            .set_default("fetcher.retry", 2)?
            .set_default("fetcher.backoff_ms", 600)?
            .set_default("run.price_threshold", 500)?
            .set_default("scheduler.cron", "0 0 * * * *")?
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Add environment-specific config
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add local config (ignored by git)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with prefix "PRICEWATCH_"
            .add_source(Environment::with_prefix("PRICEWATCH").separator("__"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        if config.fetcher.chrome_path.is_none() {
            config.fetcher.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetcher.timeout_secs == 0 {
            return Err(ConfigError::Message("Fetcher timeout_secs must be greater than 0".into()));
        }

        if self.fetcher.user_agent.trim().is_empty() {
            return Err(ConfigError::Message("Fetcher user_agent must not be empty".into()));
        }

        if self.run.price_threshold < 0 {
            return Err(ConfigError::Message("price_threshold must not be negative".into()));
        }

        if !self.is_valid_cron(&self.scheduler.cron) {
            return Err(ConfigError::Message("Invalid cron expression in scheduler.cron".into()));
        }

        Ok(())
    }

    /// The workbook path is only mandatory for commands that touch the store.
    pub fn require_workbook(&self) -> Result<&str, ConfigError> {
        if self.store.workbook.trim().is_empty() {
            return Err(ConfigError::Message(
                "store.workbook is not set (export PRICEWATCH_STORE__WORKBOOK or edit config/default.toml)".into(),
            ));
        }
        Ok(&self.store.workbook)
    }

    fn is_valid_cron(&self, cron_expr: &str) -> bool {
        let parts: Vec<&str> = cron_expr.split_whitespace().collect();
        // Seconds field required; year field optional.
        if parts.len() != 6 && parts.len() != 7 {
            return false;
        }

        for part in parts {
            if part.is_empty() {
                return false;
            }
            // Allow numbers, ranges, lists, and wildcards
            if !part.chars().all(|c| c.is_ascii_digit() || c == '*' || c == '-' || c == ',' || c == '/') {
                return false;
            }
        }

        true
    }
}
