use serde::{Deserialize, Serialize};

use crate::AddressType;

/// Address summary captured once from the root page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BaseSnapshot {
    pub balance: Option<String>,
    pub tag: Option<String>,
    pub count: Option<String>,
}

impl BaseSnapshot {
    /// Summary used when an explorer reports no entries at all.
    pub fn empty() -> Self {
        Self {
            balance: Some("0".to_string()),
            tag: None,
            count: Some("0".to_string()),
        }
    }
}

/// One weighted party of a UTXO transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedParty {
    pub address: Option<String>,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BitcoinTransaction {
    pub txid: Option<String>,
    pub block_height: Option<u64>,
    /// Unix seconds.
    pub time: Option<i64>,
    /// Satoshis.
    pub fee: Option<i64>,
    pub inputs: Vec<WeightedParty>,
    pub outputs: Vec<WeightedParty>,
}

/// A row of an account-ledger transaction list. Counterparts are display
/// labels: either a hex address or a human name tag.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EthereumTransaction {
    pub hash: Option<String>,
    pub method: Option<String>,
    pub block: Option<String>,
    pub date: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub amount: Option<String>,
    pub fee: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "chain", rename_all = "lowercase")]
pub enum RawTransaction {
    Bitcoin(BitcoinTransaction),
    Ethereum(EthereumTransaction),
}

impl RawTransaction {
    pub fn address_type(&self) -> AddressType {
        match self {
            RawTransaction::Bitcoin(_) => AddressType::Bitcoin,
            RawTransaction::Ethereum(_) => AddressType::Ethereum,
        }
    }
}

/// Input to the output pipeline: the cached summary plus at most one
/// transaction. `transaction: None` yields the empty-history record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInfo {
    pub base: BaseSnapshot,
    pub transaction: Option<RawTransaction>,
}

/// The unified emitted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalOutput {
    #[serde(rename = "type")]
    pub address_type: AddressType,
    pub address: String,
    pub tx: Option<String>,
    pub block: Option<String>,
    pub date: Option<String>,
    pub from: Vec<String>,
    pub to: Vec<String>,
    pub amount: Option<String>,
    pub fee: Option<String>,
    pub balance: String,
    pub tag: Option<String>,
    pub count: Option<String>,
    pub scraped_at: String,
}
