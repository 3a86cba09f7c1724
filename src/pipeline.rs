use chrono::Utc;
use log::{error, info, warn};

use crate::{
    errors::{BankRunError, OutputStepError},
    export::export_csv,
    extractor::extract,
    fetcher::ContentFetcher,
    record::ExtractionRecord,
    registry::SourceDescriptor,
    renderer::{render, write_comparison},
    scraping_context::ScrapingContext,
};

#[derive(Debug, Default)]
pub struct RunSummary {
    pub stored: Vec<String>,
    pub failed: Vec<(String, String)>,
    pub skipped: Vec<String>,
}

/// Scrapes every enabled bank one after another, then exports and renders
/// whatever is stored. A failing bank is logged and skipped; it never stops
/// the others or the final output step.
pub async fn run(ctx: &ScrapingContext, fetcher: &impl ContentFetcher) -> RunSummary {
    let mut summary = RunSummary::default();
    let disabled = &ctx.scraping_config.disabled_banks;

    for source in ctx.registry.all().iter().filter(|s| !s.is_enabled(disabled)) {
        info!("{}: scraping disabled, skipping", source.bank_id);
        summary.skipped.push(source.bank_id.clone());
    }

    for source in ctx.registry.enabled(disabled) {
        ctx.rate_limiter.wait_until_ready().await;
        info!("{}: starting scrape of {}", source.bank_id, source.content_url);

        match scrape_bank(ctx, fetcher, source).await {
            Ok(record) => {
                let missing = record.fields.missing();
                if !missing.is_empty() {
                    warn!(
                        "{}: stored record without {}",
                        source.bank_id,
                        missing.iter().map(|f| f.name()).collect::<Vec<_>>().join(", ")
                    );
                }
                info!(
                    "{}: stored {}/6 fields",
                    source.bank_id,
                    record.fields.populated_count()
                );
                summary.stored.push(source.bank_id.clone());
            }
            Err(e) => {
                error!("{}: scrape failed: {e}", source.bank_id);
                summary.failed.push((source.bank_id.clone(), e.to_string()));
            }
        }
    }

    if let Err(e) = export(ctx).await {
        error!("export to {} failed: {e}", ctx.scraping_config.export_path);
    }
    if let Err(e) = render_comparison(ctx).await {
        error!(
            "rendering {} failed: {e}",
            ctx.scraping_config.comparison_html_path
        );
    }
    summary
}

/// Fetch, extract and store one bank's representative example.
pub async fn scrape_bank(
    ctx: &ScrapingContext,
    fetcher: &impl ContentFetcher,
    source: &SourceDescriptor,
) -> Result<ExtractionRecord, BankRunError> {
    let patterns = ctx.patterns.patterns_for(&source.bank_id)?;
    patterns.check_mode(source.mode)?;

    let fetched = fetcher.fetch(source).await?;
    let fields = extract(&fetched.content, fetched.mode, patterns)?;
    let record = ExtractionRecord {
        bank_id: source.bank_id.clone(),
        product_name: source.product_name.clone(),
        observed_at: Utc::now(),
        source_url: fetched.source_url,
        fields,
        raw_text: fetched.content,
    };
    ctx.store.append(&record).await?;
    Ok(record)
}

pub async fn export(ctx: &ScrapingContext) -> Result<(), OutputStepError> {
    let rows = ctx.store.all_rows().await?;
    export_csv(&rows, &ctx.scraping_config.export_path)?;
    info!(
        "exported {} rows to {}",
        rows.len(),
        ctx.scraping_config.export_path
    );
    Ok(())
}

pub async fn render_comparison(ctx: &ScrapingContext) -> Result<(), OutputStepError> {
    let latest = ctx.store.latest_per_bank().await?;
    let html = render(&latest, Utc::now());
    write_comparison(&ctx.scraping_config.comparison_html_path, &html)?;
    info!(
        "comparison of {} bank(s) written to {}",
        latest.len(),
        ctx.scraping_config.comparison_html_path
    );
    Ok(())
}
