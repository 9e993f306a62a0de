use ledger_core::{
    AddressType, BaseSnapshot, BitcoinTransaction, CrawlCursor, EthereumTransaction, PageSignal,
    RawTransaction, WeightedParty,
};
use ledger_engine::{BlockchainComExtractor, EtherscanExtractor, ExplorerPage, Extractor};
use pretty_assertions::assert_eq;

const ETH: &str = "0x52908400098527886e0f7030069857d2e4169ee7";

const ETHERSCAN_SUMMARY: &str = r#"
<html><body>
<div id="ContentPlaceHolder1_divSummary">
  <div class="card">
    <div class="card-header">
      <span class="u-label u-label--secondary">Binance 7</span>
    </div>
    <div class="card-body">
      <div class="row align-items-center">
        <div class="col-md-4">Balance:</div>
        <div class="col-md-8">1,234.5 Ether</div>
      </div>
    </div>
  </div>
</div>
<div id="transactions">
  <a href="/txs?a=0x52908400098527886e0f7030069857d2e4169ee7">1,024</a>
</div>
</body></html>
"#;

const ETHERSCAN_PAGE: &str = r#"
<html><body>
<div id="paywall_mask">
<table><tbody>
  <tr>
    <td><a class="js-txnAdditional-1"></a></td>
    <td style="display: none">hidden</td>
    <td><a href="/tx/0xdead">0xdead</a></td>
    <td><span data-original-title="Transfer">Transfer</span></td>
    <td>12345</td>
    <td><span data-original-title="2021-05-04 12:31:22">1 day ago</span></td>
    <td><a data-original-title="Coinbase 3 (0x1111111111111111111111111111111111111111)">Coinbase 3</a></td>
    <td><span>IN</span></td>
    <td><span><span title="0x52908400098527886e0f7030069857d2e4169ee7">0x5290...</span></span></td>
    <td>2.5 Ether</td>
    <td>0.000441</td>
  </tr>
</tbody></table>
</div>
<ul class="pagination">
  <li><a class="page-link" href="txs?a=0x52908400098527886e0f7030069857d2e4169ee7&amp;p=2">Next</a></li>
  <li><a class="page-link" href="txs?a=0x52908400098527886e0f7030069857d2e4169ee7&amp;p=7"><span>Last</span></a></li>
</ul>
</body></html>
"#;

fn eth_cursor() -> CrawlCursor {
    CrawlCursor::root(AddressType::Ethereum, ETH)
}

#[test]
fn etherscan_summary_card() {
    let page = EtherscanExtractor.extract(&eth_cursor(), ETHERSCAN_SUMMARY).unwrap();
    assert_eq!(
        page,
        ExplorerPage::Summary(BaseSnapshot {
            balance: Some("1,234.5 Ether".to_string()),
            tag: Some("Binance 7".to_string()),
            count: Some("1,024".to_string()),
        })
    );
}

#[test]
fn etherscan_transaction_rows_skip_hidden_cells() {
    let cursor = eth_cursor().first_page(BaseSnapshot::default());
    let page = EtherscanExtractor.extract(&cursor, ETHERSCAN_PAGE).unwrap();
    assert_eq!(
        page,
        ExplorerPage::Transactions {
            transactions: vec![RawTransaction::Ethereum(EthereumTransaction {
                hash: Some("0xdead".to_string()),
                method: Some("Transfer".to_string()),
                block: Some("12345".to_string()),
                date: Some("2021-05-04 12:31:22".to_string()),
                from: Some("0x1111111111111111111111111111111111111111".to_string()),
                to: Some(ETH.to_string()),
                amount: Some("2.5 Ether".to_string()),
                fee: Some("0.000441".to_string()),
            })],
            signal: PageSignal::LastPage(Some(7)),
        }
    );
}

#[test]
fn etherscan_no_entries_marker() {
    let html = "<html><body><div>There are no matching entries</div></body></html>";
    assert_eq!(
        EtherscanExtractor.extract(&eth_cursor(), html).unwrap(),
        ExplorerPage::NoEntries
    );
}

const BLOCKCHAIN_ROOT: &str = r#"
<html><body>
<script id="__NEXT_DATA__" type="application/json">
{"props":{"initialProps":{"pageProps":{"addressBalance":{"confirmed":6880000000,"txs":2},"pageSize":10}}}}
</script>
</body></html>
"#;

const BLOCKCHAIN_PAGE: &str = r#"
<html><body>
<script id="__NEXT_DATA__" type="application/json">
{"props":{"initialProps":{"pageProps":{
  "pageSize":2,
  "addressTransactions":[
    {"txid":"f4184fc5","time":1231731025,"fee":0,"block":{"height":170},
     "inputs":[{"address":"12cbQLTFMXRnSzktFkuoG3eHoMeFtpTu3S","value":5000000000}],
     "outputs":[{"address":"1Q2TWHE3GMdB6BZKafqwxXtWAWgFt5Jvm3","value":1000000000},
                {"address":"12cbQLTFMXRnSzktFkuoG3eHoMeFtpTu3S","value":4000000000}]},
    {"txid":"broken","inputs":"nope"}
  ]}}}}
</script>
</body></html>
"#;

fn btc_cursor() -> CrawlCursor {
    CrawlCursor::root(AddressType::Bitcoin, "12cbQLTFMXRnSzktFkuoG3eHoMeFtpTu3S")
}

#[test]
fn blockchain_com_summary_from_next_data() {
    let page = BlockchainComExtractor
        .extract(&btc_cursor(), BLOCKCHAIN_ROOT)
        .unwrap();
    assert_eq!(
        page,
        ExplorerPage::Summary(BaseSnapshot {
            balance: Some("6880000000".to_string()),
            tag: None,
            count: Some("2".to_string()),
        })
    );
}

#[test]
fn blockchain_com_transactions_keep_unreadable_entries_for_the_normalizer() {
    let cursor = btc_cursor().first_page(BaseSnapshot::default());
    let page = BlockchainComExtractor.extract(&cursor, BLOCKCHAIN_PAGE).unwrap();

    let ExplorerPage::Transactions {
        transactions,
        signal,
    } = page
    else {
        panic!("expected a transaction page");
    };
    assert_eq!(
        signal,
        PageSignal::PageSize {
            returned: 2,
            page_size: Some(2),
        }
    );
    assert_eq!(
        transactions,
        vec![
            RawTransaction::Bitcoin(BitcoinTransaction {
                txid: Some("f4184fc5".to_string()),
                block_height: Some(170),
                time: Some(1_231_731_025),
                fee: Some(0),
                inputs: vec![WeightedParty {
                    address: Some("12cbQLTFMXRnSzktFkuoG3eHoMeFtpTu3S".to_string()),
                    value: 5_000_000_000,
                }],
                outputs: vec![
                    WeightedParty {
                        address: Some("1Q2TWHE3GMdB6BZKafqwxXtWAWgFt5Jvm3".to_string()),
                        value: 1_000_000_000,
                    },
                    WeightedParty {
                        address: Some("12cbQLTFMXRnSzktFkuoG3eHoMeFtpTu3S".to_string()),
                        value: 4_000_000_000,
                    },
                ],
            }),
            RawTransaction::Bitcoin(BitcoinTransaction::default()),
        ]
    );
}

#[test]
fn blockchain_com_page_without_next_data_is_an_extraction_error() {
    let err = BlockchainComExtractor
        .extract(&btc_cursor(), "<html><body>captcha</body></html>")
        .unwrap_err();
    assert_eq!(err.kind, ledger_engine::FailureKind::Extraction);
}
