use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use env_logger::Target;
use kreditvergleich::{HttpFetcher, ScrapingConfig, ScrapingContext, pipeline};
use log::{LevelFilter, info, warn};

#[derive(Parser, Debug)]
#[command(about = "Collects representative consumer-loan examples from Austrian banks")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape every enabled bank, then export and render.
    Run,
    /// Regenerate the comparison page from stored records.
    Render,
    /// Regenerate the bulk export from stored records.
    Export,
}

/// Writes every log line to stderr and to the log file.
struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

fn init_logging(log_file: Option<&str>) -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Info).parse_default_env();
    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {path}"))?;
        builder.target(Target::Pipe(Box::new(Tee { file })));
    }
    builder.init();
    Ok(())
}

async fn run_command(ctx: &ScrapingContext, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Run => {
            let fetcher = HttpFetcher::new(&ctx.request_client);
            let summary = pipeline::run(ctx, &fetcher).await;
            info!(
                "run finished: {} stored, {} failed, {} skipped",
                summary.stored.len(),
                summary.failed.len(),
                summary.skipped.len()
            );
            for (bank, reason) in &summary.failed {
                warn!("{bank}: {reason}");
            }
        }
        Command::Render => pipeline::render_comparison(ctx)
            .await
            .context("failed to render comparison page")?,
        Command::Export => pipeline::export(ctx)
            .await
            .context("failed to export records")?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    let config = ScrapingConfig::new()?;
    init_logging(config.log_file.as_deref())?;

    let ctx = ScrapingContext::new(config).await?;
    let result = run_command(&ctx, cli.command.unwrap_or(Command::Run)).await;
    ctx.close().await;
    result
}
