//! Smoke test for the chromiumoxide runtime against a real browser.
//!
//! Skipped unless `ALTSCAN_CHROME_BIN` points at a Chrome/Chromium binary, so
//! the default test run stays offline. No model key is needed: only the
//! stabilizer is exercised, against an inline data: URL.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use altscan::config::CheckerConfig;
use altscan::logging::{CheckerLogger, Verbosity};
use altscan::runtime::ChromiumRuntime;
use altscan::stabilize::{SettleOutcome, Stabilizer};

fn chrome_bin() -> Option<PathBuf> {
    match env::var("ALTSCAN_CHROME_BIN") {
        Ok(value) if !value.trim().is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

#[tokio::test]
#[serial_test::serial]
async fn stabilizer_snapshots_a_static_page() -> Result<()> {
    let Some(chrome_bin) = chrome_bin() else {
        eprintln!("skipping chromium smoke test: ALTSCAN_CHROME_BIN not set");
        return Ok(());
    };

    if !chrome_bin.exists() {
        eprintln!(
            "skipping chromium smoke test: chrome executable not found at {}",
            chrome_bin.display()
        );
        return Ok(());
    }

    let mut config = CheckerConfig::default();
    config.chrome_executable = Some(chrome_bin);
    config.headless = true;
    // A static page settles immediately; no reason to wait the full default.
    config.settle_delay_ms = 100;

    let stabilizer = Stabilizer::new(
        &config,
        ChromiumRuntime::new(),
        Arc::new(CheckerLogger::new(Verbosity::Minimal)),
    );

    // Attribute-free markup keeps the data: URL free of spaces and quotes.
    let url = "data:text/html,<h1>static-marker</h1>";
    let page = stabilizer.fetch(url).await?;

    assert_eq!(page.outcome, SettleOutcome::Settled);
    assert!(page.rounds >= 1);
    assert!(page.html.contains("static-marker"));

    Ok(())
}
