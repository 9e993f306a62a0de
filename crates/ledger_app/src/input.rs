//! Reads the crawl input document.

use std::fs;
use std::path::Path;

use anyhow::Context;
use ledger_engine::CrawlInput;
use ledger_logging::ledger_info;

/// Input read when no path is given on the command line.
pub(crate) const DEFAULT_INPUT: &str = "INPUT.json";

/// Parse `path` as RON when it has a `.ron` extension, JSON otherwise.
pub(crate) fn load_input(path: &Path) -> anyhow::Result<CrawlInput> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading input from {}", path.display()))?;

    let is_ron = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ron"));
    let input: CrawlInput = if is_ron {
        ron::from_str(&content).with_context(|| format!("parsing {}", path.display()))?
    } else {
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))?
    };

    ledger_info!(
        "Loaded {} addresses from {}",
        input.addresses.len(),
        path.display()
    );
    Ok(input)
}
