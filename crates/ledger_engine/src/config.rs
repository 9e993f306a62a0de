use chrono::{DateTime, Utc};
use ledger_core::{ConfigError, DateRange, Quota};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::frontier::DEFAULT_MAX_REQUEST_RETRIES;

/// Extension point fed with every canonical record.
pub const OUTPUT_FUNCTION_KEY: &str = "extendOutputFunction";
/// Extension point observing crawl lifecycle events.
pub const SCRAPER_FUNCTION_KEY: &str = "extendScraperFunction";

pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Input document of a crawl run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlInput {
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub min_date: Option<String>,
    #[serde(default)]
    pub max_date: Option<String>,
    /// Records per address; `0` means unlimited.
    #[serde(default)]
    pub max_transactions: Option<u32>,
    /// Hook name for the output extension point.
    #[serde(default)]
    pub extend_output_function: Option<String>,
    /// Hook name for the scraper extension point.
    #[serde(default)]
    pub extend_scraper_function: Option<String>,
    #[serde(default)]
    pub custom_data: Option<Map<String, Value>>,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_max_request_retries")]
    pub max_request_retries: u32,
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_max_request_retries() -> u32 {
    DEFAULT_MAX_REQUEST_RETRIES
}

impl Default for CrawlInput {
    fn default() -> Self {
        Self {
            addresses: Vec::new(),
            min_date: None,
            max_date: None,
            max_transactions: None,
            extend_output_function: None,
            extend_scraper_function: None,
            custom_data: None,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_request_retries: DEFAULT_MAX_REQUEST_RETRIES,
        }
    }
}

impl CrawlInput {
    pub fn with_addresses<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            addresses: addresses.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Checks that need no clock; date bounds are checked by [`Self::date_range`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.addresses.iter().all(|address| address.trim().is_empty()) {
            return Err(ConfigError::MissingAddresses);
        }
        Ok(())
    }

    pub fn quota(&self) -> Quota {
        Quota::from_max_transactions(self.max_transactions)
    }

    pub fn date_range(&self, now: DateTime<Utc>) -> Result<DateRange, ConfigError> {
        DateRange::resolve(self.min_date.as_deref(), self.max_date.as_deref(), now)
    }

    /// Hook name configured for an extension point.
    pub fn hook_name(&self, key: &str) -> Option<&str> {
        match key {
            OUTPUT_FUNCTION_KEY => self.extend_output_function.as_deref(),
            SCRAPER_FUNCTION_KEY => self.extend_scraper_function.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CrawlInput;

    #[test]
    fn camel_case_input_with_defaults() {
        let input: CrawlInput = serde_json::from_str(
            r#"{"addresses":["0xabc"],"maxTransactions":0,"extendOutputFunction":"skip_empty_history","customData":{"run":7}}"#,
        )
        .unwrap();
        assert_eq!(input.max_transactions, Some(0));
        assert_eq!(input.max_concurrency, 10);
        assert_eq!(input.max_request_retries, 3);
        assert_eq!(input.hook_name("extendOutputFunction"), Some("skip_empty_history"));
        assert_eq!(input.hook_name("extendScraperFunction"), None);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn blank_address_list_is_missing() {
        let input = CrawlInput::with_addresses(["  "]);
        assert_eq!(
            input.validate(),
            Err(ledger_core::ConfigError::MissingAddresses)
        );
    }
}
