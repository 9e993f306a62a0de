use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{CanonicalOutput, DateRange};

/// Records emitted per address when `maxTransactions` is not given.
pub const DEFAULT_QUOTA: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quota {
    Unlimited,
    Limited(u32),
}

impl Quota {
    /// `None` falls back to [`DEFAULT_QUOTA`]; `Some(0)` disables the limit.
    pub fn from_max_transactions(max: Option<u32>) -> Self {
        match max.unwrap_or(DEFAULT_QUOTA) {
            0 => Quota::Unlimited,
            n => Quota::Limited(n),
        }
    }

    pub fn allows(self, emitted: u32) -> bool {
        match self {
            Quota::Unlimited => true,
            Quota::Limited(limit) => emitted < limit,
        }
    }

    fn cap(self, count: u32) -> u32 {
        match self {
            Quota::Unlimited => count,
            Quota::Limited(limit) => count.min(limit),
        }
    }
}

/// Persistable form of the engine state: ordered pair and value lists.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub addresses: Vec<(String, u32)>,
    pub transactions: Vec<String>,
}

#[derive(Debug, Default)]
struct DedupState {
    counts: HashMap<String, u32>,
    seen: HashSet<String>,
}

/// Decides whether a canonical record is emitted.
///
/// Shared by every page handler of a crawl. Both the per-address counters
/// and the identity set sit behind one mutex, so two concurrent `accept`
/// calls can never both claim the same identity or the last quota slot.
#[derive(Debug)]
pub struct DedupEngine {
    quota: Quota,
    range: DateRange,
    state: Mutex<DedupState>,
}

impl DedupEngine {
    pub fn new(quota: Quota, range: DateRange) -> Self {
        Self {
            quota,
            range,
            state: Mutex::new(DedupState::default()),
        }
    }

    pub fn from_snapshot(quota: Quota, range: DateRange, snapshot: &StateSnapshot) -> Self {
        let engine = Self::new(quota, range);
        engine.merge(snapshot);
        engine
    }

    pub fn quota(&self) -> Quota {
        self.quota
    }

    pub fn range(&self) -> &DateRange {
        &self.range
    }

    /// Accept a record and count it, or reject it without side effects.
    pub fn accept(&self, record: &CanonicalOutput) -> bool {
        if !self.range.admits(record.date.as_deref()) {
            return false;
        }
        let identity = composite_identity(record);

        let mut state = self.lock();
        let emitted = state.counts.get(&record.address).copied().unwrap_or(0);
        if !self.quota.allows(emitted) || state.seen.contains(&identity) {
            return false;
        }
        state.seen.insert(identity);
        state.counts.insert(record.address.clone(), emitted + 1);
        true
    }

    pub fn emitted(&self, address: &str) -> u32 {
        self.lock().counts.get(address).copied().unwrap_or(0)
    }

    pub fn quota_reached(&self, address: &str) -> bool {
        !self.quota.allows(self.emitted(address))
    }

    pub fn checkpoint(&self) -> StateSnapshot {
        let state = self.lock();
        let mut addresses: Vec<(String, u32)> = state
            .counts
            .iter()
            .map(|(address, count)| (address.clone(), *count))
            .collect();
        addresses.sort();
        let mut transactions: Vec<String> = state.seen.iter().cloned().collect();
        transactions.sort();
        StateSnapshot {
            addresses,
            transactions,
        }
    }

    /// Fold a snapshot into the live state. Counts keep the larger value,
    /// capped at the quota; identities are unioned.
    pub fn merge(&self, snapshot: &StateSnapshot) {
        let mut state = self.lock();
        for (address, count) in &snapshot.addresses {
            let capped = self.quota.cap(*count);
            let entry = state.counts.entry(address.clone()).or_insert(0);
            *entry = (*entry).max(capped);
        }
        state.seen.extend(snapshot.transactions.iter().cloned());
    }

    fn lock(&self) -> MutexGuard<'_, DedupState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Key of a record for duplicate detection: tx id, recipients, senders and
/// amount, hashed. Records without a tx id use the crawled address instead
/// so distinct empty-history records never collide.
pub fn composite_identity(record: &CanonicalOutput) -> String {
    let tx = match record.tx.as_deref() {
        Some(tx) => tx.to_string(),
        None => format!("address:{}", record.address),
    };

    let to = record.to.join(",");
    let from = record.from.join(",");

    let mut hasher = Sha256::new();
    for part in [
        tx.as_str(),
        to.as_str(),
        from.as_str(),
        record.amount.as_deref().unwrap_or(""),
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]);
    }

    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
