use chrono::{TimeZone, Utc};
use ledger_core::{
    is_clean_numeric, normalize, normalize_date, strip_non_numeric, AddressInfo, AddressType,
    BaseSnapshot, BitcoinTransaction, CanonicalOutput, EthereumTransaction, RawTransaction,
    WeightedParty,
};
use pretty_assertions::assert_eq;

const ETH_ADDRESS: &str = "0xde0B295669a9FD93d5F28D9Ec85E40f4cb697BAe";
const BTC_ADDRESS: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

fn scraped_at() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap()
}

fn eth_base() -> BaseSnapshot {
    BaseSnapshot {
        balance: Some("1,024.5 Ether".to_string()),
        tag: Some("Ethereum Foundation".to_string()),
        count: Some("2".to_string()),
    }
}

fn eth_row() -> EthereumTransaction {
    EthereumTransaction {
        hash: Some("0xfeed".to_string()),
        method: Some("Transfer".to_string()),
        block: Some("17000000".to_string()),
        date: Some("2023-04-05 7:08:09".to_string()),
        from: Some("0x1111111111111111111111111111111111111111".to_string()),
        to: Some("Ethereum Foundation".to_string()),
        amount: Some("12.5 Ether".to_string()),
        fee: Some("0.00042".to_string()),
    }
}

#[test]
fn strip_keeps_digits_and_first_dot() {
    assert_eq!(strip_non_numeric("1,234.56 Ether"), "1234.56");
    assert_eq!(strip_non_numeric("$0.1.2"), "0.12");
    assert_eq!(strip_non_numeric("n/a"), "");
    assert!(is_clean_numeric(&strip_non_numeric("≈ 9,999.000 BTC (v2.0)")));
}

#[test]
fn date_clock_is_padded_then_rendered_as_iso() {
    assert_eq!(
        normalize_date("2023-04-05 7:8:9").as_deref(),
        Some("2023-04-05T07:08:09.000Z")
    );
    assert_eq!(
        normalize_date("Apr-05-2023 11:08:09 PM +UTC").as_deref(),
        Some("2023-04-05T23:08:09.000Z")
    );
    assert_eq!(
        normalize_date("Apr-05-2023 1:08:09 PM +UTC").as_deref(),
        Some("2023-04-05T13:08:09.000Z")
    );
}

#[test]
fn date_with_clock_that_does_not_parse_is_none() {
    assert_eq!(normalize_date("sometime 1:08:09 ago"), None);
    assert_eq!(normalize_date("2023-13-45 07:08:09"), None);
}

#[test]
fn date_unix_seconds_become_iso() {
    assert_eq!(
        normalize_date("1231006505").as_deref(),
        Some("2009-01-03T18:15:05.000Z")
    );
    assert_eq!(normalize_date("0"), None);
    assert_eq!(normalize_date("-5"), None);
    assert_eq!(normalize_date("yesterday-ish"), None);
    assert_eq!(normalize_date(""), None);
}

#[test]
fn ethereum_row_maps_to_canonical_record() {
    let info = AddressInfo {
        base: eth_base(),
        transaction: Some(RawTransaction::Ethereum(eth_row())),
    };

    let record = normalize(AddressType::Ethereum, ETH_ADDRESS, &info, scraped_at()).unwrap();

    assert_eq!(
        record,
        CanonicalOutput {
            address_type: AddressType::Ethereum,
            address: ETH_ADDRESS.to_string(),
            tx: Some("0xfeed".to_string()),
            block: Some("17000000".to_string()),
            date: Some("2023-04-05T07:08:09.000Z".to_string()),
            from: vec!["0x1111111111111111111111111111111111111111".to_string()],
            to: vec![ETH_ADDRESS.to_string()],
            amount: Some("12.5".to_string()),
            fee: Some("0.00042".to_string()),
            balance: "1024.5".to_string(),
            tag: Some("Ethereum Foundation".to_string()),
            count: Some("2".to_string()),
            scraped_at: "2024-05-01T08:30:00.000Z".to_string(),
        }
    );
}

#[test]
fn explorer_locale_label_never_reaches_the_record() {
    let mut row = eth_row();
    row.date = Some("Apr-05-2023 1:08:09 PM +UTC".to_string());
    let info = AddressInfo {
        base: eth_base(),
        transaction: Some(RawTransaction::Ethereum(row)),
    };

    let record = normalize(AddressType::Ethereum, ETH_ADDRESS, &info, scraped_at()).unwrap();

    assert_eq!(record.date.as_deref(), Some("2023-04-05T13:08:09.000Z"));
}

#[test]
fn sender_equal_to_crawled_address_collapses() {
    let mut row = eth_row();
    row.from = Some(ETH_ADDRESS.to_lowercase());
    row.to = Some("0x2222222222222222222222222222222222222222".to_string());
    let info = AddressInfo {
        base: BaseSnapshot::default(),
        transaction: Some(RawTransaction::Ethereum(row)),
    };

    let record = normalize(AddressType::Ethereum, ETH_ADDRESS, &info, scraped_at()).unwrap();

    assert_eq!(record.from, vec![ETH_ADDRESS.to_string()]);
    assert_eq!(
        record.to,
        vec!["0x2222222222222222222222222222222222222222".to_string()]
    );
}

#[test]
fn bitcoin_keeps_multi_party_lists_and_sums_inputs() {
    let tx = BitcoinTransaction {
        txid: Some("abcd".to_string()),
        block_height: Some(800_000),
        time: Some(1_700_000_000),
        fee: Some(1_500),
        inputs: vec![
            WeightedParty {
                address: Some(BTC_ADDRESS.to_string()),
                value: 40_000,
            },
            WeightedParty {
                address: Some("3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy".to_string()),
                value: 60_000,
            },
        ],
        outputs: vec![WeightedParty {
            address: Some(BTC_ADDRESS.to_string()),
            value: 98_500,
        }],
    };
    let info = AddressInfo {
        base: BaseSnapshot {
            balance: Some("98500".to_string()),
            tag: None,
            count: Some("7".to_string()),
        },
        transaction: Some(RawTransaction::Bitcoin(tx)),
    };

    let record = normalize(AddressType::Bitcoin, BTC_ADDRESS, &info, scraped_at()).unwrap();

    assert_eq!(record.amount.as_deref(), Some("100000"));
    assert_eq!(record.fee.as_deref(), Some("1500"));
    assert_eq!(record.block.as_deref(), Some("800000"));
    assert_eq!(record.date.as_deref(), Some("2023-11-14T22:13:20.000Z"));
    assert_eq!(
        record.from,
        vec![
            BTC_ADDRESS.to_string(),
            "3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy".to_string()
        ]
    );
    assert_eq!(record.to, vec![BTC_ADDRESS.to_string()]);
}

#[test]
fn missing_transaction_yields_empty_history_record() {
    let info = AddressInfo {
        base: BaseSnapshot::empty(),
        transaction: None,
    };

    let record = normalize(AddressType::Ethereum, ETH_ADDRESS, &info, scraped_at()).unwrap();

    assert_eq!(record.balance, "0");
    assert_eq!(record.count.as_deref(), Some("0"));
    assert_eq!(record.tx, None);
    assert_eq!(record.date, None);
    assert_eq!(record.amount, None);
    assert!(record.from.is_empty());
    assert!(record.to.is_empty());
}

#[test]
fn malformed_rows_are_data_shape_errors() {
    let mut row = eth_row();
    row.hash = None;
    let info = AddressInfo {
        base: BaseSnapshot::default(),
        transaction: Some(RawTransaction::Ethereum(row)),
    };
    let err = normalize(AddressType::Ethereum, ETH_ADDRESS, &info, scraped_at()).unwrap_err();
    assert_eq!(err.chain, AddressType::Ethereum);
    assert!(err.reason.contains("hash"));

    let mut row = eth_row();
    row.amount = Some("pending".to_string());
    let info = AddressInfo {
        base: BaseSnapshot::default(),
        transaction: Some(RawTransaction::Ethereum(row)),
    };
    assert!(normalize(AddressType::Ethereum, ETH_ADDRESS, &info, scraped_at()).is_err());

    let info = AddressInfo {
        base: BaseSnapshot::default(),
        transaction: Some(RawTransaction::Ethereum(eth_row())),
    };
    let err = normalize(AddressType::Bitcoin, BTC_ADDRESS, &info, scraped_at()).unwrap_err();
    assert!(err.reason.contains("ETH transaction on a BTC address"));
}

#[test]
fn canonical_output_serializes_with_wire_names() {
    let info = AddressInfo {
        base: BaseSnapshot::empty(),
        transaction: None,
    };
    let record = normalize(AddressType::Bitcoin, BTC_ADDRESS, &info, scraped_at()).unwrap();
    let json = serde_json::to_value(&record).unwrap();

    assert_eq!(json["type"], "BTC");
    assert_eq!(json["scrapedAt"], "2024-05-01T08:30:00.000Z");
    assert!(json["tx"].is_null());
    assert_eq!(json["from"], serde_json::json!([]));
}
