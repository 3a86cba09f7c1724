use anyhow::Context;

use crate::{
    config::ScrapingConfig,
    patterns::PatternTable,
    ratelimit::RateLimiter,
    registry::SourceRegistry,
    requests::RequestClient,
    store::RecordStore,
};

/// Resources shared by one run. Built once, passed explicitly, and released
/// with [`ScrapingContext::close`] whatever the outcome of the run.
pub struct ScrapingContext {
    pub scraping_config: ScrapingConfig,
    pub registry: SourceRegistry,
    pub patterns: PatternTable,
    pub request_client: RequestClient,
    pub rate_limiter: RateLimiter,
    pub store: RecordStore,
}

impl ScrapingContext {
    pub async fn new(scraping_config: ScrapingConfig) -> anyhow::Result<Self> {
        let registry = SourceRegistry::builtin().context("invalid source registry")?;
        let patterns = PatternTable::builtin().context("invalid pattern table")?;
        let request_client = RequestClient::new(scraping_config.fetch.clone())?;
        let rate_limiter = RateLimiter::new(scraping_config.politeness_delay);
        let store = RecordStore::connect(&scraping_config.database_url)
            .await
            .with_context(|| format!("failed to open {}", scraping_config.database_url))?;
        Ok(ScrapingContext {
            scraping_config,
            registry,
            patterns,
            request_client,
            rate_limiter,
            store,
        })
    }

    pub async fn close(self) {
        self.store.close().await;
    }
}
