use std::collections::BTreeMap;

use crate::{BaseSnapshot, CrawlCursor, CrawlRequest, ExplorerUrls};

/// Where an address stands in its crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressPhase {
    /// Waiting for the balance/summary page.
    Root,
    /// Waiting for transaction page `n`.
    Paging(u32),
    Done,
}

/// Per-address pagination state for one crawl.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CrawlBook {
    urls: ExplorerUrls,
    addresses: BTreeMap<String, AddressPhase>,
    bases: BTreeMap<String, BaseSnapshot>,
    rejected: Vec<String>,
}

impl CrawlBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_urls(urls: ExplorerUrls) -> Self {
        Self {
            urls,
            ..Self::default()
        }
    }

    pub fn phase(&self, address: &str) -> Option<AddressPhase> {
        self.addresses.get(address).copied()
    }

    /// Summary captured from the address's root page, once it was read.
    pub fn base(&self, address: &str) -> Option<&BaseSnapshot> {
        self.bases.get(address)
    }

    pub fn is_done(&self, address: &str) -> bool {
        self.phase(address) == Some(AddressPhase::Done)
    }

    /// Addresses still waiting on a root or transaction page.
    pub fn active_count(&self) -> usize {
        self.addresses
            .values()
            .filter(|phase| **phase != AddressPhase::Done)
            .count()
    }

    pub fn done_count(&self) -> usize {
        self.addresses.len() - self.active_count()
    }

    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }

    pub(crate) fn set_phase(&mut self, address: &str, phase: AddressPhase) {
        self.addresses.insert(address.to_string(), phase);
    }

    pub(crate) fn set_base(&mut self, address: &str, base: BaseSnapshot) {
        self.bases.insert(address.to_string(), base);
    }

    pub(crate) fn reject(&mut self, address: &str) {
        self.rejected.push(address.to_string());
    }

    pub(crate) fn request(&self, cursor: CrawlCursor) -> CrawlRequest {
        self.urls.request(cursor)
    }
}
