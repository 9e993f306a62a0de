use crate::CrawlRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Enqueue(CrawlRequest),
    RejectAddress { address: String },
    AddressDone { address: String, reason: DoneReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneReason {
    LastPage,
    QuotaReached,
    NoEntries,
    Failed,
}
