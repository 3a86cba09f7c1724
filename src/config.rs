use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, de::DeserializeOwned};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// The env vars read for a run. Every key is optional.
#[derive(Debug, Deserialize)]
pub struct ScrapingEnv {
    #[serde(default = "default_database_url")]
    database_url: String,
    #[serde(default = "default_comparison_html_path")]
    comparison_html_path: String,
    #[serde(default = "default_export_path")]
    export_path: String,
    #[serde(default = "default_politeness_delay_ms")]
    politeness_delay_ms: u64,
    #[serde(default = "default_fetch_max_attempts")]
    fetch_max_attempts: u32,
    #[serde(default = "default_fetch_timeout_ms")]
    fetch_timeout_ms: u64,
    #[serde(default = "default_fetch_backoff_base_ms")]
    fetch_backoff_base_ms: u64,
    #[serde(default = "default_user_agent")]
    user_agent: String,
    #[serde(default)]
    disabled_banks: Vec<String>,
    #[serde(default)]
    log_file: Option<String>,
}

fn default_database_url() -> String {
    "sqlite:austrian_banks.db".to_string()
}

fn default_comparison_html_path() -> String {
    "bank_comparison.html".to_string()
}

fn default_export_path() -> String {
    "austrian_banks_data.csv".to_string()
}

fn default_politeness_delay_ms() -> u64 {
    2_000
}

fn default_fetch_max_attempts() -> u32 {
    3
}

fn default_fetch_timeout_ms() -> u64 {
    10_000
}

fn default_fetch_backoff_base_ms() -> u64 {
    1_000
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub max_attempts: u32,
    pub timeout: Duration,
    pub backoff_base: Duration,
    pub user_agent: String,
}

impl FetchConfig {
    /// Delay before retry number `attempt` (1-based): base * 2^(attempt - 1).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_fetch_max_attempts(),
            timeout: Duration::from_millis(default_fetch_timeout_ms()),
            backoff_base: Duration::from_millis(default_fetch_backoff_base_ms()),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrapingConfig {
    pub database_url: String,
    pub comparison_html_path: String,
    pub export_path: String,
    pub politeness_delay: Duration,
    pub fetch: FetchConfig,
    pub disabled_banks: Vec<String>,
    /// Log lines are appended here as well as written to stderr.
    pub log_file: Option<String>,
}

impl ScrapingConfig {
    pub fn new() -> anyhow::Result<Self> {
        let scraping_env = ScrapingEnv::load_from_env()?;
        Ok(Self::from(scraping_env))
    }
}

impl From<ScrapingEnv> for ScrapingConfig {
    fn from(env: ScrapingEnv) -> Self {
        Self {
            database_url: env.database_url,
            comparison_html_path: env.comparison_html_path,
            export_path: env.export_path,
            politeness_delay: Duration::from_millis(env.politeness_delay_ms),
            fetch: FetchConfig {
                max_attempts: env.fetch_max_attempts.max(1),
                timeout: Duration::from_millis(env.fetch_timeout_ms.max(1)),
                backoff_base: Duration::from_millis(env.fetch_backoff_base_ms),
                user_agent: env.user_agent,
            },
            disabled_banks: env
                .disabled_banks
                .into_iter()
                .map(|bank| bank.trim().to_lowercase())
                .filter(|bank| !bank.is_empty())
                .collect(),
            log_file: env.log_file.filter(|path| !path.trim().is_empty()),
        }
    }
}

// Extension trait.
pub trait LoadFromEnv: DeserializeOwned {
    fn load_from_env() -> anyhow::Result<Self> {
        // Don't throw an error if .env file doesn't exist.
        let _ = dotenv::dotenv();
        let config =
            envy::from_env::<Self>().context("failed to load env variables into config struct")?;
        Ok(config)
    }
}

impl<T: DeserializeOwned> LoadFromEnv for T {}
