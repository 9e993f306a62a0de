use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use ledger_core::CrawlRequest;
use url::Url;

use crate::RequestId;

/// Retries a failed request gets before the frontier gives up on it.
pub const DEFAULT_MAX_REQUEST_RETRIES: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedRequest {
    pub id: RequestId,
    pub request: CrawlRequest,
    pub retry_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reclaim {
    /// Put back at the end of the queue.
    Retrying { retry_count: u32 },
    /// Retries exhausted; the request is dropped.
    GaveUp { retry_count: u32 },
}

/// Pending fetch requests. Requests are deduplicated by URL for the lifetime
/// of the frontier, so a page is handed out at most once unless reclaimed.
pub trait Frontier: Send + Sync {
    /// `None` when the URL was enqueued before.
    fn enqueue(&self, request: CrawlRequest) -> Option<RequestId>;
    fn next(&self) -> Option<QueuedRequest>;
    fn complete(&self, id: RequestId);
    fn reclaim(&self, request: QueuedRequest) -> Reclaim;
    /// No request is waiting to be handed out.
    fn is_empty(&self) -> bool;
}

#[derive(Debug, Default)]
struct FrontierState {
    next_id: RequestId,
    queue: VecDeque<QueuedRequest>,
    seen: HashSet<String>,
    handled: usize,
}

#[derive(Debug)]
pub struct MemoryFrontier {
    max_retries: u32,
    state: Mutex<FrontierState>,
}

impl MemoryFrontier {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            state: Mutex::new(FrontierState::default()),
        }
    }

    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    /// Requests completed or given up on.
    pub fn handled(&self) -> usize {
        self.lock().handled
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryFrontier {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUEST_RETRIES)
    }
}

impl Frontier for MemoryFrontier {
    fn enqueue(&self, request: CrawlRequest) -> Option<RequestId> {
        let key = dedupe_key(&request.url);
        let mut state = self.lock();
        if !state.seen.insert(key) {
            return None;
        }
        state.next_id += 1;
        let id = state.next_id;
        state.queue.push_back(QueuedRequest {
            id,
            request,
            retry_count: 0,
        });
        Some(id)
    }

    fn next(&self) -> Option<QueuedRequest> {
        self.lock().queue.pop_front()
    }

    fn complete(&self, _id: RequestId) {
        self.lock().handled += 1;
    }

    fn reclaim(&self, mut request: QueuedRequest) -> Reclaim {
        let mut state = self.lock();
        if request.retry_count >= self.max_retries {
            state.handled += 1;
            return Reclaim::GaveUp {
                retry_count: request.retry_count,
            };
        }
        request.retry_count += 1;
        let retry_count = request.retry_count;
        state.queue.push_back(request);
        Reclaim::Retrying { retry_count }
    }

    fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }
}

fn dedupe_key(url: &str) -> String {
    match Url::parse(url.trim()) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use ledger_core::{AddressType, CrawlCursor, ExplorerUrls};

    use super::{Frontier, MemoryFrontier, Reclaim};

    fn root_request(address: &str) -> ledger_core::CrawlRequest {
        ExplorerUrls::default().request(CrawlCursor::root(AddressType::Ethereum, address))
    }

    #[test]
    fn same_url_is_enqueued_once() {
        let frontier = MemoryFrontier::new(3);
        assert!(frontier.enqueue(root_request("0xabc")).is_some());
        let mut again = root_request("0xabc");
        again.url = format!("{}#fragment", again.url.replace("etherscan.io", "EtherScan.io"));
        assert_eq!(frontier.enqueue(again), None);
        assert_eq!(frontier.pending(), 1);
    }

    #[test]
    fn gives_up_after_max_retries() {
        let frontier = MemoryFrontier::new(2);
        frontier.enqueue(root_request("0xabc"));

        let mut outcomes = Vec::new();
        while let Some(queued) = frontier.next() {
            outcomes.push(frontier.reclaim(queued));
        }
        assert_eq!(
            outcomes,
            vec![
                Reclaim::Retrying { retry_count: 1 },
                Reclaim::Retrying { retry_count: 2 },
                Reclaim::GaveUp { retry_count: 2 },
            ]
        );
        assert!(frontier.is_empty());
        assert_eq!(frontier.handled(), 1);
    }
}
