//! Ledger engine: fetching, extraction, extension hooks and the crawl loop.
mod config;
mod crawler;
mod decode;
mod extract;
mod fetch;
mod frontier;
mod hooks;
mod persist;
mod pipeline;
mod sink;
mod source;
mod types;

pub use config::{
    CrawlInput, DEFAULT_MAX_CONCURRENCY, OUTPUT_FUNCTION_KEY, SCRAPER_FUNCTION_KEY,
};
pub use crawler::{
    Clock, CrawlError, CrawlOptions, CrawlSummary, Crawler, CrawlerDeps, PageRecord,
};
pub use decode::decode_page;
pub use extract::{BlockchainComExtractor, EtherscanExtractor, Extractor};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use frontier::{Frontier, MemoryFrontier, QueuedRequest, Reclaim, DEFAULT_MAX_REQUEST_RETRIES};
pub use hooks::{
    Hook, HookCapabilities, HookContext, HookError, HookRegistry, HookScope, NoCapabilities,
    ATTACH_CUSTOM_DATA, IDENTITY, LOG_LABEL, SKIP_EMPTY_HISTORY,
};
pub use persist::{
    ensure_output_dir, load_snapshot, save_snapshot, AtomicFileWriter, FileStateStore,
    MemoryStateStore, PersistError, StateStore, ADDRESSES_KEY, TRANSACTIONS_KEY,
};
pub use pipeline::{ExtendBuilder, ExtendFunction, Mapped, PipelineError};
pub use sink::{JsonLinesSink, MemorySink, RecordSink};
pub use source::{HttpPageSource, PageSource};
pub use tokio_util::sync::CancellationToken;
pub use types::{ExplorerPage, FailureKind, FetchError, FetchOutput, RequestId};
