use chrono::{DateTime, SecondsFormat, Utc};

use crate::clean::{normalize_date, strip_non_numeric};
use crate::{
    AddressInfo, AddressType, BaseSnapshot, BitcoinTransaction, CanonicalOutput, DataShapeError,
    EthereumTransaction, RawTransaction, WeightedParty,
};

/// Map the pipeline input for one address into a canonical record,
/// dispatching on the transaction's chain.
pub fn normalize(
    address_type: AddressType,
    address: &str,
    info: &AddressInfo,
    scraped_at: DateTime<Utc>,
) -> Result<CanonicalOutput, DataShapeError> {
    match (&info.transaction, address_type) {
        (None, _) => Ok(empty_history(address_type, address, &info.base, scraped_at)),
        (Some(RawTransaction::Bitcoin(tx)), AddressType::Bitcoin) => {
            normalize_bitcoin(tx, address, &info.base, scraped_at)
        }
        (Some(RawTransaction::Ethereum(tx)), AddressType::Ethereum) => {
            normalize_ethereum(tx, address, &info.base, scraped_at)
        }
        (Some(other), _) => Err(DataShapeError::new(
            address_type,
            address,
            format!("{} transaction on a {} address", other.address_type(), address_type),
        )),
    }
}

/// The terminal record of an address with no transactions.
pub fn empty_history(
    address_type: AddressType,
    address: &str,
    base: &BaseSnapshot,
    scraped_at: DateTime<Utc>,
) -> CanonicalOutput {
    CanonicalOutput {
        address_type,
        address: address.to_string(),
        tx: None,
        block: None,
        date: None,
        from: Vec::new(),
        to: Vec::new(),
        amount: None,
        fee: None,
        balance: base
            .balance
            .as_deref()
            .map(strip_non_numeric)
            .filter(|balance| !balance.is_empty())
            .unwrap_or_else(|| "0".to_string()),
        tag: base.tag.clone(),
        count: base.count.clone(),
        scraped_at: scraped_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

/// UTXO ledger: amount is the sum of input values, counterparts are the
/// input and output addresses.
pub fn normalize_bitcoin(
    tx: &BitcoinTransaction,
    address: &str,
    base: &BaseSnapshot,
    scraped_at: DateTime<Utc>,
) -> Result<CanonicalOutput, DataShapeError> {
    let shape_error = |reason: &str| DataShapeError::new(AddressType::Bitcoin, address, reason);

    let txid = non_empty(tx.txid.as_deref()).ok_or_else(|| shape_error("missing txid"))?;
    let amount = tx
        .inputs
        .iter()
        .try_fold(0i64, |acc, party| acc.checked_add(party.value))
        .filter(|sum| *sum >= 0)
        .ok_or_else(|| shape_error("input values do not sum to a valid amount"))?;
    let fee = tx
        .fee
        .filter(|fee| *fee >= 0)
        .ok_or_else(|| shape_error("missing fee"))?;

    let mut record = empty_history(AddressType::Bitcoin, address, base, scraped_at);
    record.tx = Some(txid.to_string());
    record.block = tx.block_height.map(|height| height.to_string());
    record.date = tx.time.and_then(|time| normalize_date(&time.to_string()));
    record.from = collapse_self(party_addresses(&tx.inputs), address, base.tag.as_deref());
    record.to = collapse_self(party_addresses(&tx.outputs), address, base.tag.as_deref());
    record.amount = Some(amount.to_string());
    record.fee = Some(fee.to_string());
    Ok(record)
}

/// Account ledger: one sender and one receiver label per row.
pub fn normalize_ethereum(
    tx: &EthereumTransaction,
    address: &str,
    base: &BaseSnapshot,
    scraped_at: DateTime<Utc>,
) -> Result<CanonicalOutput, DataShapeError> {
    let shape_error = |reason: String| DataShapeError::new(AddressType::Ethereum, address, reason);

    let hash = non_empty(tx.hash.as_deref())
        .ok_or_else(|| shape_error("missing transaction hash".to_string()))?;
    let numeric = |value: Option<&str>, field: &str| -> Result<String, DataShapeError> {
        let cleaned = value.map(strip_non_numeric).unwrap_or_default();
        if cleaned.chars().any(|c| c.is_ascii_digit()) {
            Ok(cleaned)
        } else {
            Err(shape_error(format!("{field} is not numeric: {value:?}")))
        }
    };
    let amount = numeric(tx.amount.as_deref(), "amount")?;
    let fee = numeric(tx.fee.as_deref(), "fee")?;

    let label = |value: Option<&str>| -> Vec<String> {
        non_empty(value).map(str::to_string).into_iter().collect()
    };

    let mut record = empty_history(AddressType::Ethereum, address, base, scraped_at);
    record.tx = Some(hash.to_string());
    record.block = non_empty(tx.block.as_deref()).map(str::to_string);
    record.date = tx.date.as_deref().and_then(normalize_date);
    record.from = collapse_self(label(tx.from.as_deref()), address, base.tag.as_deref());
    record.to = collapse_self(label(tx.to.as_deref()), address, base.tag.as_deref());
    record.amount = Some(amount);
    record.fee = Some(fee);
    Ok(record)
}

/// Replace a counterpart list with `[address]` when every party in it is the
/// crawled address itself, either by address or by its name tag.
pub fn collapse_self(parties: Vec<String>, address: &str, tag: Option<&str>) -> Vec<String> {
    let is_self = |label: &String| {
        label.eq_ignore_ascii_case(address)
            || tag.is_some_and(|tag| !tag.is_empty() && tag == label.as_str())
    };
    if !parties.is_empty() && parties.iter().all(is_self) {
        vec![address.to_string()]
    } else {
        parties
    }
}

fn party_addresses(parties: &[WeightedParty]) -> Vec<String> {
    parties
        .iter()
        .filter_map(|party| non_empty(party.address.as_deref()))
        .map(str::to_string)
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
