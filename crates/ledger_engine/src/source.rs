use std::sync::Arc;

use ledger_core::{AddressType, CrawlRequest};

use crate::decode::decode_page;
use crate::extract::{BlockchainComExtractor, EtherscanExtractor, Extractor};
use crate::fetch::{FetchSettings, Fetcher, ReqwestFetcher};
use crate::{ExplorerPage, FailureKind, FetchError};

/// Loads the page behind a crawl request.
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    async fn load(&self, request: &CrawlRequest) -> Result<ExplorerPage, FetchError>;
}

/// Fetch, decode, then extract with the explorer matching the address type.
pub struct HttpPageSource {
    fetcher: Arc<dyn Fetcher>,
    bitcoin: Box<dyn Extractor>,
    ethereum: Box<dyn Extractor>,
}

impl HttpPageSource {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        Ok(Self::with_fetcher(Arc::new(ReqwestFetcher::new(settings)?)))
    }

    pub fn with_fetcher(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            bitcoin: Box::new(BlockchainComExtractor),
            ethereum: Box::new(EtherscanExtractor),
        }
    }
}

#[async_trait::async_trait]
impl PageSource for HttpPageSource {
    async fn load(&self, request: &CrawlRequest) -> Result<ExplorerPage, FetchError> {
        let extractor = match request.cursor.address_type {
            AddressType::Bitcoin => &self.bitcoin,
            AddressType::Ethereum => &self.ethereum,
            AddressType::Invalid => {
                return Err(FetchError::new(
                    FailureKind::InvalidUrl,
                    format!("no explorer for address {}", request.cursor.address),
                ))
            }
        };
        let output = self.fetcher.fetch(&request.url).await?;
        let html = decode_page(&output.bytes, output.content_type.as_deref())?;
        extractor.extract(&request.cursor, &html)
    }
}
