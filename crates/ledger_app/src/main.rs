mod input;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use ledger_engine::{
    CancellationToken, Crawler, CrawlerDeps, FetchSettings, FileStateStore, HookRegistry,
    HttpPageSource, JsonLinesSink,
};
use ledger_logging::{ledger_info, ledger_warn, LevelFilter, LogDestination};

const STORAGE_DIR: &str = "./storage";
const DATASET_FILE: &str = "dataset.jsonl";
const STATE_DIR: &str = "state";
/// Overrides the log level, e.g. `LEDGER_LOG=debug`.
const LOG_LEVEL_VAR: &str = "LEDGER_LOG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let level = std::env::var(LOG_LEVEL_VAR)
        .ok()
        .and_then(|value| value.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);
    ledger_logging::initialize(LogDestination::default(), level);

    let input_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(input::DEFAULT_INPUT));
    let input = input::load_input(&input_path)?;

    let storage = PathBuf::from(STORAGE_DIR);
    let sink = JsonLinesSink::open(storage.join(DATASET_FILE))
        .with_context(|| format!("opening {}", storage.join(DATASET_FILE).display()))?;
    let source = HttpPageSource::new(FetchSettings::default()).context("building HTTP client")?;

    let crawler = Crawler::new(
        &input,
        CrawlerDeps {
            source: Arc::new(source),
            store: Arc::new(FileStateStore::new(storage.join(STATE_DIR))),
            sink: Arc::new(sink),
            registry: HookRegistry::with_builtins(),
        },
    )?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ledger_warn!("Ctrl-C received, stopping crawl");
            on_signal.cancel();
        }
    });

    let summary = crawler.run(cancel).await?;
    ledger_info!(
        "Done: {} records, {} dropped, {} rejected addresses{}",
        summary.emitted,
        summary.dropped,
        summary.rejected_addresses.len(),
        if summary.cancelled { " (interrupted)" } else { "" }
    );
    Ok(())
}
