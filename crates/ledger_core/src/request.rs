use serde::{Deserialize, Serialize};

use crate::{AddressType, BaseSnapshot};

pub const BLOCKCHAIN_COM: &str = "https://www.blockchain.com";
pub const ETHERSCAN: &str = "https://etherscan.io";

/// Opaque per-request user data handed to the frontier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlCursor {
    pub address_type: AddressType,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<BaseSnapshot>,
    /// 1-based transaction page; 0 for the root page.
    pub page: u32,
    pub is_root: bool,
}

impl CrawlCursor {
    pub fn root(address_type: AddressType, address: impl Into<String>) -> Self {
        Self {
            address_type,
            address: address.into(),
            base: None,
            page: 0,
            is_root: true,
        }
    }

    /// First transaction page, carrying the summary captured at the root.
    pub fn first_page(&self, base: BaseSnapshot) -> Self {
        Self {
            address_type: self.address_type,
            address: self.address.clone(),
            base: Some(base),
            page: 1,
            is_root: false,
        }
    }

    /// Transaction page `page` of an address whose summary is known.
    pub fn transaction_page(
        address_type: AddressType,
        address: impl Into<String>,
        base: BaseSnapshot,
        page: u32,
    ) -> Self {
        Self {
            address_type,
            address: address.into(),
            base: Some(base),
            page,
            is_root: false,
        }
    }

    pub fn next_page(&self) -> Self {
        let mut next = self.clone();
        next.page += 1;
        next.is_root = false;
        next
    }

    /// Summary for records built from this cursor.
    pub fn base_or_default(&self) -> BaseSnapshot {
        self.base.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlRequest {
    pub url: String,
    pub cursor: CrawlCursor,
}

/// Explorer hosts, overridable so crawls can target mirrors or test servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorerUrls {
    pub bitcoin: String,
    pub ethereum: String,
}

impl Default for ExplorerUrls {
    fn default() -> Self {
        Self {
            bitcoin: BLOCKCHAIN_COM.to_string(),
            ethereum: ETHERSCAN.to_string(),
        }
    }
}

impl ExplorerUrls {
    pub fn request(&self, cursor: CrawlCursor) -> CrawlRequest {
        CrawlRequest {
            url: self.url_for(&cursor),
            cursor,
        }
    }

    pub fn url_for(&self, cursor: &CrawlCursor) -> String {
        let address = &cursor.address;
        match (cursor.address_type, cursor.is_root) {
            (AddressType::Bitcoin, true) => {
                format!("{}/btc/address/{address}", self.bitcoin.trim_end_matches('/'))
            }
            (AddressType::Bitcoin, false) => format!(
                "{}/btc/address/{address}?page={}",
                self.bitcoin.trim_end_matches('/'),
                cursor.page
            ),
            (_, true) => format!("{}/address/{address}", self.ethereum.trim_end_matches('/')),
            (_, false) => format!(
                "{}/txs?a={address}&p={}",
                self.ethereum.trim_end_matches('/'),
                cursor.page
            ),
        }
    }
}

/// Chain-specific "more pages" evidence reported by a transaction page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSignal {
    /// Number from the explorer's "Last" pagination link, if one is shown.
    LastPage(Option<u32>),
    /// Transactions returned against the explorer's page size.
    PageSize {
        returned: usize,
        page_size: Option<usize>,
    },
}

impl PageSignal {
    pub fn has_more(self, page: u32) -> bool {
        match self {
            PageSignal::LastPage(last) => last.is_some_and(|last| page < last),
            PageSignal::PageSize {
                returned,
                page_size,
            } => page_size.is_some_and(|size| size > 0 && returned == size),
        }
    }
}
