use crate::{BaseSnapshot, CrawlCursor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Addresses from the input list, or added later by a hook.
    AddressesSubmitted(Vec<String>),
    /// The summary page of an address was read.
    RootFetched {
        cursor: CrawlCursor,
        base: BaseSnapshot,
    },
    /// Every record of a transaction page went through the output pipeline.
    PageHandled {
        cursor: CrawlCursor,
        has_more: bool,
        quota_reached: bool,
    },
    /// A hook asked for one specific transaction page of a known address.
    PageRequested { address: String, page: u32 },
    /// The explorer reported no entries for the address.
    NoEntries { address: String },
    /// The frontier gave up on a request for the address.
    RequestFailed { address: String },
    NoOp,
}
