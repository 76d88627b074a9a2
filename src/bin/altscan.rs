//! altscan CLI.
//!
//! Renders a page to a scroll-stabilized snapshot, asks the configured model
//! for a WCAG 1.1.1 non-text content inventory, and prints the validated
//! findings as indented JSON (non-ASCII left unescaped).
//!
//! Usage examples:
//!   $ MODEL_API_KEY=... altscan https://example.com/
//!   $ ALTSCAN_CHROME_BIN=/usr/bin/chromium MODEL_API_KEY=... \
//!     altscan --classified -v https://example.com/news

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use altscan::checker::NonTextChecker;
use altscan::config::{CheckerConfig, TemplateVariant};
use altscan::logging::{LogCallback, LogLevel, Verbosity};
use anyhow::{Context, Result};
use clap::Parser;

#[derive(Parser)]
#[command(
    name = "altscan",
    author,
    version,
    about = "Inventory a page's non-text content for WCAG 1.1.1 review"
)]
struct Cli {
    /// Target page URL (absolute).
    url: String,

    /// Use the six-situation classified template instead of plain extraction.
    #[arg(long)]
    classified: bool,

    /// Show the launched browser window.
    #[arg(long)]
    show_browser: bool,

    /// Path to the Chrome/Chromium binary (overrides ALTSCAN_CHROME_BIN).
    #[arg(long)]
    chrome_bin: Option<PathBuf>,

    /// Maximum scroll-stabilization rounds.
    #[arg(long)]
    max_rounds: Option<u32>,

    /// Settle delay between scrolls, in milliseconds.
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Print the full report (page summary and metrics) instead of the
    /// findings envelope only.
    #[arg(long)]
    full_report: bool,

    /// Increase log verbosity (pass twice for DEBUG).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_env_logger();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = CheckerConfig::from_env().context("failed to load configuration")?;
    config.verbose = verbosity_from_count(cli.verbose);
    config.logger = Some(make_logger_callback());

    if cli.classified {
        config.template = TemplateVariant::Classified;
    }
    if cli.show_browser {
        config.headless = false;
    }
    if let Some(path) = cli.chrome_bin {
        config.chrome_executable = Some(path);
    }
    if let Some(rounds) = cli.max_rounds {
        config.max_scroll_rounds = rounds;
    }
    if let Some(settle_ms) = cli.settle_ms {
        config.settle_delay_ms = settle_ms;
    }

    let checker = NonTextChecker::with_chromium(config).context("failed to construct checker")?;

    let report = checker
        .check(&cli.url)
        .await
        .with_context(|| format!("analysis of {} failed", cli.url))?;

    // serde_json leaves non-ASCII characters unescaped, which keeps
    // descriptions in any language readable.
    let rendered = if cli.full_report {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string_pretty(&report.report)
    }
    .context("failed to render report")?;

    println!("{rendered}");
    Ok(())
}

/// Bridge the checker's structured records into the `log` facade.
fn make_logger_callback() -> LogCallback {
    Arc::new(|record| {
        let category = record.category.as_deref().unwrap_or("checker");
        match record.level {
            LogLevel::Error => log::error!("[{category}] {}", record.message),
            LogLevel::Info => log::info!("[{category}] {}", record.message),
            LogLevel::Debug => log::debug!("[{category}] {}", record.message),
        }
        if let Some(aux) = &record.auxiliary {
            log::debug!("[{category}] {aux}");
        }
    })
}

fn verbosity_from_count(count: u8) -> Verbosity {
    match count {
        0 => Verbosity::Medium,
        _ => Verbosity::Detailed,
    }
}

fn init_env_logger() {
    if env::var("RUST_LOG").is_err() {
        unsafe {
            env::set_var("RUST_LOG", "info");
        }
    }

    let _ = env_logger::Builder::from_env(env_logger::Env::default())
        .format_timestamp_secs()
        .try_init();
}
