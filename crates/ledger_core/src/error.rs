use thiserror::Error;

use crate::AddressType;

/// Fatal problems detected before any crawling starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing \"addresses\" array parameter")]
    MissingAddresses,
    #[error("minimum date {min} needs to be less than max date {max}")]
    InvalidRange { min: String, max: String },
    #[error("unrecognised date expression \"{0}\"")]
    InvalidDate(String),
    #[error("\"{key}\" parameter must name a registered hook, got \"{name}\"")]
    UnknownHook { key: String, name: String },
}

/// A raw transaction that cannot be mapped to a canonical record.
///
/// Only the offending record is dropped; the crawl continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed {chain} transaction for {address}: {reason}")]
pub struct DataShapeError {
    pub chain: AddressType,
    pub address: String,
    pub reason: String,
}

impl DataShapeError {
    pub(crate) fn new(chain: AddressType, address: &str, reason: impl Into<String>) -> Self {
        Self {
            chain,
            address: address.to_string(),
            reason: reason.into(),
        }
    }
}
