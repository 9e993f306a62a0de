use std::fmt;

use ledger_core::{BaseSnapshot, PageSignal, RawTransaction};

pub type RequestId = u64;

/// What the fetch/extract collaborator read from one explorer page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplorerPage {
    /// Root page: balance, name tag and transaction count.
    Summary(BaseSnapshot),
    /// One page of the transaction list.
    Transactions {
        transactions: Vec<RawTransaction>,
        signal: PageSignal,
    },
    /// The explorer shows "no matching entries" for the address.
    NoEntries,
}

impl ExplorerPage {
    pub fn kind(&self) -> &'static str {
        match self {
            ExplorerPage::Summary(_) => "summary",
            ExplorerPage::Transactions { .. } => "transactions",
            ExplorerPage::NoEntries => "no-entries",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub final_url: String,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    /// The page loaded but did not have the expected layout.
    Extraction,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::Extraction => write!(f, "unexpected page layout"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
