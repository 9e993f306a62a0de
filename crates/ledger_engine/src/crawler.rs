//! Coordinates one crawl: frontier, page handlers, pipelines and state.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use ledger_core::{
    normalize, update, AddressInfo, BaseSnapshot, CanonicalOutput, ConfigError, CrawlBook,
    CrawlCursor, DedupEngine, Effect, ExplorerUrls, Msg,
};
use ledger_logging::{ledger_debug, ledger_error, ledger_info, ledger_warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::{CrawlInput, OUTPUT_FUNCTION_KEY, SCRAPER_FUNCTION_KEY};
use crate::frontier::{Frontier, MemoryFrontier, QueuedRequest, Reclaim};
use crate::hooks::{HookCapabilities, HookContext, HookError, HookRegistry};
use crate::persist::{load_snapshot, save_snapshot, PersistError, StateStore};
use crate::pipeline::{ExtendBuilder, ExtendFunction, Mapped, PipelineError};
use crate::sink::RecordSink;
use crate::source::PageSource;
use crate::ExplorerPage;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("crawl state: {0}")]
    State(#[from] PersistError),
}

/// Raw value of the output extension point: one address summary plus at
/// most one transaction, with the request it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub request: CrawlCursor,
    #[serde(flatten)]
    pub info: AddressInfo,
}

/// Collaborators a crawl talks to.
pub struct CrawlerDeps {
    pub source: Arc<dyn PageSource>,
    pub store: Arc<dyn StateStore>,
    pub sink: Arc<dyn RecordSink>,
    pub registry: HookRegistry,
}

#[derive(Clone)]
pub struct CrawlOptions {
    pub urls: ExplorerUrls,
    /// Source of `scrapedAt` timestamps and of "now" for relative date bounds.
    pub clock: Clock,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            urls: ExplorerUrls::default(),
            clock: Arc::new(Utc::now),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub emitted: usize,
    pub dropped: usize,
    pub pages: usize,
    pub failed_requests: usize,
    pub rejected_addresses: Vec<String>,
    pub cancelled: bool,
}

/// Pagination book plus the frontier it feeds. Page handlers and hooks
/// both push messages through here.
struct Frontline {
    book: Mutex<CrawlBook>,
    frontier: Arc<dyn Frontier>,
}

impl Frontline {
    fn apply(&self, msg: Msg) -> Vec<Effect> {
        let effects = {
            let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
            let (next, effects) = update(std::mem::take(&mut *book), msg);
            *book = next;
            effects
        };
        for effect in &effects {
            match effect {
                Effect::Enqueue(request) => {
                    if self.frontier.enqueue(request.clone()).is_none() {
                        ledger_debug!("{} already queued", request.url);
                    }
                }
                Effect::RejectAddress { address } => {
                    ledger_warn!("Address is invalid: {address}");
                }
                Effect::AddressDone { address, reason } => {
                    ledger_debug!("Address {address} done: {reason:?}");
                }
            }
        }
        effects
    }

    fn rejected(&self) -> Vec<String> {
        self.book
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .rejected()
            .to_vec()
    }
}

impl HookCapabilities for Frontline {
    fn add_address(&self, address: &str) -> bool {
        queued_any(&self.apply(Msg::AddressesSubmitted(vec![address.to_string()])))
    }

    fn enqueue_page(&self, address: &str, page: u32) -> bool {
        queued_any(&self.apply(Msg::PageRequested {
            address: address.to_string(),
            page,
        }))
    }
}

fn queued_any(effects: &[Effect]) -> bool {
    effects
        .iter()
        .any(|effect| matches!(effect, Effect::Enqueue(_)))
}

#[derive(Debug, Default)]
struct Counters {
    emitted: AtomicUsize,
    dropped: AtomicUsize,
    pages: AtomicUsize,
    failed: AtomicUsize,
}

/// The output pipeline together with the counters it feeds.
struct Emitter {
    output: ExtendFunction<PageRecord, CanonicalOutput>,
    counters: Arc<Counters>,
}

impl Emitter {
    fn emit(&self, record: &PageRecord) -> usize {
        match self.output.call(record, &request_args(&record.request)) {
            Ok(emitted) => {
                self.counters.emitted.fetch_add(emitted, Ordering::Relaxed);
                emitted
            }
            Err(err) => {
                ledger_warn!("Dropping record of {}: {err}", record.request.address);
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                0
            }
        }
    }
}

/// What scraper hooks may do: everything output hooks may, plus emitting
/// extra records. Output hooks cannot emit, the output pipeline is not
/// reentrant.
struct ScraperCapabilities {
    frontline: Arc<Frontline>,
    emitter: Arc<Emitter>,
}

impl HookCapabilities for ScraperCapabilities {
    fn add_address(&self, address: &str) -> bool {
        self.frontline.add_address(address)
    }

    fn enqueue_page(&self, address: &str, page: u32) -> bool {
        self.frontline.enqueue_page(address, page)
    }

    fn emit(&self, record: Value) -> Result<usize, HookError> {
        let record: PageRecord = serde_json::from_value(record)
            .map_err(|err| HookError(format!("not a page record: {err}")))?;
        Ok(self.emitter.emit(&record))
    }
}

struct Shared {
    frontline: Arc<Frontline>,
    engine: Arc<DedupEngine>,
    source: Arc<dyn PageSource>,
    store: Arc<dyn StateStore>,
    emitter: Arc<Emitter>,
    scraper: ExtendFunction<Value, Value>,
    counters: Arc<Counters>,
}

pub struct Crawler {
    shared: Arc<Shared>,
    addresses: Vec<String>,
    max_concurrency: usize,
}

impl Crawler {
    pub fn new(input: &CrawlInput, deps: CrawlerDeps) -> Result<Self, CrawlError> {
        Self::with_options(input, deps, CrawlOptions::default())
    }

    /// Validate the input, restore saved state and build both pipelines.
    /// Nothing is fetched until [`Crawler::run`].
    pub fn with_options(
        input: &CrawlInput,
        deps: CrawlerDeps,
        options: CrawlOptions,
    ) -> Result<Self, CrawlError> {
        input.validate()?;
        let range = input.date_range((options.clock)())?;
        let snapshot = load_snapshot(deps.store.as_ref())?;
        let engine = Arc::new(DedupEngine::from_snapshot(input.quota(), range, &snapshot));
        ledger_debug!(
            "Restored {} addresses and {} identities",
            snapshot.addresses.len(),
            snapshot.transactions.len()
        );

        let frontline = Arc::new(Frontline {
            book: Mutex::new(CrawlBook::with_urls(options.urls.clone())),
            frontier: Arc::new(MemoryFrontier::new(input.max_request_retries)),
        });

        let clock = options.clock.clone();
        let accept = Arc::clone(&engine);
        let sink = Arc::clone(&deps.sink);
        let output = ExtendBuilder::<PageRecord, PageRecord>::new(OUTPUT_FUNCTION_KEY)
            .map(move |raw: &PageRecord, _: &HookContext| {
                normalize(raw.request.address_type, &raw.request.address, &raw.info, clock())
                    .map(Mapped::One)
            })
            .filter(move |_: &PageRecord, record: &CanonicalOutput, _: &HookContext| {
                accept.accept(record)
            })
            .output(move |value, _| {
                sink.push(value).map_err(|err| PipelineError::Runtime {
                    key: OUTPUT_FUNCTION_KEY.to_string(),
                    message: err.to_string(),
                })
            })
            .helper("minDate", bound(engine.range().min()))
            .helper("maxDate", bound(engine.range().max()))
            .helper("maxTransactions", json!(input.max_transactions))
            .custom_data(input.custom_data.clone())
            .capabilities(frontline.clone())
            .build(&deps.registry, input.hook_name(OUTPUT_FUNCTION_KEY))?;

        let counters = Arc::new(Counters::default());
        let emitter = Arc::new(Emitter {
            output,
            counters: Arc::clone(&counters),
        });

        let scraper = ExtendBuilder::<Value, Value>::new(SCRAPER_FUNCTION_KEY)
            .helper("minDate", bound(engine.range().min()))
            .helper("maxDate", bound(engine.range().max()))
            .helper("maxTransactions", json!(input.max_transactions))
            .custom_data(input.custom_data.clone())
            .capabilities(Arc::new(ScraperCapabilities {
                frontline: Arc::clone(&frontline),
                emitter: Arc::clone(&emitter),
            }))
            .build(&deps.registry, input.hook_name(SCRAPER_FUNCTION_KEY))?;

        Ok(Self {
            shared: Arc::new(Shared {
                frontline,
                engine,
                source: deps.source,
                store: deps.store,
                emitter,
                scraper,
                counters,
            }),
            addresses: input.addresses.clone(),
            max_concurrency: input.max_concurrency.max(1),
        })
    }

    pub fn engine(&self) -> Arc<DedupEngine> {
        Arc::clone(&self.shared.engine)
    }

    /// Crawl until the frontier drains or `cancel` fires. State is saved in
    /// both cases.
    pub async fn run(self, cancel: CancellationToken) -> Result<CrawlSummary, CrawlError> {
        let Crawler {
            shared,
            addresses,
            max_concurrency,
        } = self;

        shared.lifecycle("SETUP", Value::Null, None);
        shared.frontline.apply(Msg::AddressesSubmitted(addresses));

        let mut tasks = JoinSet::new();
        let mut cancelled = false;
        loop {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            while tasks.len() < max_concurrency {
                let Some(queued) = shared.frontline.frontier.next() else {
                    break;
                };
                let worker = Arc::clone(&shared);
                tasks.spawn(async move { worker.handle(queued).await });
            }
            if tasks.is_empty() {
                break;
            }
            tokio::select! {
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                joined = tasks.join_next() => {
                    if let Some(Err(err)) = joined {
                        ledger_error!("Page handler stopped: {err}");
                    }
                }
            }
        }

        if cancelled {
            ledger_warn!("Crawl interrupted, saving state");
            shared.checkpoint()?;
            tasks.shutdown().await;
        } else {
            shared.lifecycle("FINISH", Value::Null, None);
        }
        shared.checkpoint()?;

        let counters = &shared.counters;
        let summary = CrawlSummary {
            emitted: counters.emitted.load(Ordering::Relaxed),
            dropped: counters.dropped.load(Ordering::Relaxed),
            pages: counters.pages.load(Ordering::Relaxed),
            failed_requests: counters.failed.load(Ordering::Relaxed),
            rejected_addresses: shared.frontline.rejected(),
            cancelled,
        };
        ledger_info!(
            "Crawl finished: {} records from {} pages, {} failed requests",
            summary.emitted,
            summary.pages,
            summary.failed_requests
        );
        Ok(summary)
    }
}

impl Shared {
    async fn handle(&self, queued: QueuedRequest) {
        let cursor = queued.request.cursor.clone();
        if cursor.is_root {
            ledger_info!("Scraping {} address {} balances", cursor.address_type, cursor.address);
        } else {
            ledger_info!(
                "Scraping {} address {}, transaction page {}",
                cursor.address_type,
                cursor.address,
                cursor.page
            );
        }

        match self.source.load(&queued.request).await {
            Ok(page) => {
                self.frontline.frontier.complete(queued.id);
                self.counters.pages.fetch_add(1, Ordering::Relaxed);
                self.handle_page(&cursor, page);
                self.lifecycle("HANDLE", Value::Null, Some(&cursor));
            }
            Err(err) => {
                ledger_debug!("{} failed: {err}", queued.request.url);
                match self.frontline.frontier.reclaim(queued) {
                    Reclaim::Retrying { retry_count } => {
                        ledger_debug!("Retry {retry_count} for address {}", cursor.address);
                    }
                    Reclaim::GaveUp { retry_count } => {
                        ledger_warn!(
                            "{} address {} failed {} times",
                            cursor.address_type,
                            cursor.address,
                            retry_count
                        );
                        self.counters.failed.fetch_add(1, Ordering::Relaxed);
                        self.frontline.apply(Msg::RequestFailed {
                            address: cursor.address.clone(),
                        });
                    }
                }
            }
        }
    }

    fn handle_page(&self, cursor: &CrawlCursor, page: ExplorerPage) {
        let address = cursor.address.clone();
        match page {
            ExplorerPage::NoEntries if cursor.page <= 1 => {
                ledger_warn!("No transactions on {address}");
                self.emit(
                    cursor,
                    AddressInfo {
                        base: BaseSnapshot::empty(),
                        transaction: None,
                    },
                );
                self.frontline.apply(Msg::NoEntries { address });
            }
            ExplorerPage::NoEntries => {
                ledger_debug!("No entries past page {} of {address}", cursor.page - 1);
                self.frontline.apply(Msg::NoEntries { address });
            }
            ExplorerPage::Summary(base) if cursor.is_root => {
                self.frontline.apply(Msg::RootFetched {
                    cursor: cursor.clone(),
                    base,
                });
            }
            ExplorerPage::Transactions {
                transactions,
                signal,
            } if !cursor.is_root => {
                let base = cursor.base_or_default();
                if transactions.is_empty() && cursor.page == 1 {
                    ledger_warn!("No transactions on {address}");
                    self.emit(
                        cursor,
                        AddressInfo {
                            base: base.clone(),
                            transaction: None,
                        },
                    );
                }
                for transaction in &transactions {
                    self.emit(
                        cursor,
                        AddressInfo {
                            base: base.clone(),
                            transaction: Some(transaction.clone()),
                        },
                    );
                }
                let data = serde_json::to_value(&transactions).unwrap_or(Value::Null);
                self.lifecycle("TRANSACTIONS", data, Some(cursor));

                self.frontline.apply(Msg::PageHandled {
                    cursor: cursor.clone(),
                    has_more: signal.has_more(cursor.page),
                    quota_reached: self.engine.quota_reached(&address),
                });
            }
            other => {
                ledger_warn!(
                    "Unexpected {} page for {} address {address}",
                    other.kind(),
                    cursor.address_type
                );
                self.frontline.apply(Msg::RequestFailed { address });
            }
        }
    }

    fn emit(&self, cursor: &CrawlCursor, info: AddressInfo) {
        self.emitter.emit(&PageRecord {
            request: cursor.clone(),
            info,
        });
    }

    /// Run the scraper extension point for a lifecycle event.
    fn lifecycle(&self, label: &str, data: Value, cursor: Option<&CrawlCursor>) {
        let args = match cursor {
            Some(cursor) => request_args(cursor),
            None => HookContext::new(),
        }
        .with("label", label);
        if let Err(err) = self.scraper.call(&data, &args) {
            ledger_warn!("{label}: {err}");
        }
    }

    fn checkpoint(&self) -> Result<(), PersistError> {
        save_snapshot(self.store.as_ref(), &self.engine.checkpoint())
    }
}

/// A resolved date bound as an RFC 3339 string, `null` when open.
fn bound(instant: Option<DateTime<Utc>>) -> Value {
    json!(instant.map(|instant| instant.to_rfc3339_opts(SecondsFormat::Millis, true)))
}

fn request_args(cursor: &CrawlCursor) -> HookContext {
    HookContext::new().with("request", serde_json::to_value(cursor).unwrap_or(Value::Null))
}
