use ledger_core::{
    BaseSnapshot, BitcoinTransaction, CrawlCursor, EthereumTransaction, PageSignal,
    RawTransaction, WeightedParty, ETHERSCAN,
};
use ledger_logging::ledger_debug;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::{ExplorerPage, FailureKind, FetchError};

/// Turns one decoded explorer page into an [`ExplorerPage`].
pub trait Extractor: Send + Sync {
    fn extract(&self, cursor: &CrawlCursor, html: &str) -> Result<ExplorerPage, FetchError>;
}

const NO_ENTRIES: &str = "There are no matching entries";

/// blockchain.com address pages: all data sits in the `#__NEXT_DATA__` JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockchainComExtractor;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageProps {
    address_balance: Option<AddressBalance>,
    #[serde(default)]
    address_transactions: Vec<Value>,
    page_size: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct AddressBalance {
    confirmed: Option<Value>,
    txs: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct NextTransaction {
    txid: Option<String>,
    time: Option<i64>,
    fee: Option<i64>,
    block: Option<NextBlock>,
    #[serde(default)]
    inputs: Vec<NextParty>,
    #[serde(default)]
    outputs: Vec<NextParty>,
}

#[derive(Debug, Deserialize)]
struct NextBlock {
    height: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct NextParty {
    address: Option<String>,
    #[serde(default)]
    value: i64,
}

impl From<NextTransaction> for BitcoinTransaction {
    fn from(tx: NextTransaction) -> Self {
        let parties = |parties: Vec<NextParty>| {
            parties
                .into_iter()
                .map(|party| WeightedParty {
                    address: party.address,
                    value: party.value,
                })
                .collect()
        };
        BitcoinTransaction {
            txid: tx.txid,
            block_height: tx.block.and_then(|block| block.height),
            time: tx.time,
            fee: tx.fee,
            inputs: parties(tx.inputs),
            outputs: parties(tx.outputs),
        }
    }
}

impl Extractor for BlockchainComExtractor {
    fn extract(&self, cursor: &CrawlCursor, html: &str) -> Result<ExplorerPage, FetchError> {
        let doc = Html::parse_document(html);
        let script = doc
            .select(&css("script#__NEXT_DATA__")?)
            .next()
            .ok_or_else(|| layout("missing #__NEXT_DATA__ script"))?;
        let next_data: Value = serde_json::from_str(&script.text().collect::<String>())
            .map_err(|err| layout(format!("#__NEXT_DATA__ is not JSON: {err}")))?;
        let props = next_data
            .pointer("/props/initialProps/pageProps")
            .cloned()
            .ok_or_else(|| layout("missing props.initialProps.pageProps"))?;
        let props: PageProps = serde_json::from_value(props)
            .map_err(|err| layout(format!("unexpected pageProps: {err}")))?;

        if cursor.is_root {
            let balance = props
                .address_balance
                .ok_or_else(|| layout("missing addressBalance"))?;
            return Ok(ExplorerPage::Summary(BaseSnapshot {
                balance: balance.confirmed.as_ref().and_then(scalar_text),
                tag: None,
                count: balance.txs.as_ref().and_then(scalar_text),
            }));
        }

        let returned = props.address_transactions.len();
        let transactions = props
            .address_transactions
            .into_iter()
            .map(|raw| match serde_json::from_value::<NextTransaction>(raw) {
                Ok(tx) => BitcoinTransaction::from(tx),
                Err(err) => {
                    ledger_debug!("unreadable transaction on {}: {err}", cursor.address);
                    BitcoinTransaction::default()
                }
            })
            .map(RawTransaction::Bitcoin)
            .collect();

        Ok(ExplorerPage::Transactions {
            transactions,
            signal: PageSignal::PageSize {
                returned,
                page_size: props.page_size,
            },
        })
    }
}

/// Etherscan address and transaction-list pages.
#[derive(Debug, Default, Clone, Copy)]
pub struct EtherscanExtractor;

impl Extractor for EtherscanExtractor {
    fn extract(&self, cursor: &CrawlCursor, html: &str) -> Result<ExplorerPage, FetchError> {
        let doc = Html::parse_document(html);
        if has_no_entries_marker(&doc)? {
            return Ok(ExplorerPage::NoEntries);
        }
        if cursor.is_root {
            return summary(&doc).map(ExplorerPage::Summary);
        }

        let row_sel = css("#paywall_mask table tbody tr")?;
        let td_sel = css("td")?;
        let mut transactions = Vec::new();
        for row in doc.select(&row_sel) {
            let cells: Vec<ElementRef<'_>> = row.select(&td_sel).filter(|td| !is_hidden(td)).collect();
            if cells.len() < 2 {
                continue;
            }
            transactions.push(RawTransaction::Ethereum(transaction_row(&cells)?));
        }

        Ok(ExplorerPage::Transactions {
            transactions,
            signal: PageSignal::LastPage(last_page(&doc)?),
        })
    }
}

fn summary(doc: &Html) -> Result<BaseSnapshot, FetchError> {
    let balance = doc
        .select(&css("#ContentPlaceHolder1_divSummary div[class*=\"row\"]")?)
        .find(|row| inner_text(row).contains("Balance:"))
        .and_then(|row| child_divs(row).nth(1))
        .map(|div| inner_text(&div));
    let tag = first_text(
        doc,
        "#ContentPlaceHolder1_divSummary div[class*=\"card-header\"] span[class*=\"u-label--secondary\"]",
    )?;
    let count = first_text(doc, "#transactions a[href^=\"/txs?a\"]")?;

    Ok(BaseSnapshot {
        balance: balance.filter(|text| !text.is_empty()),
        tag,
        count,
    })
}

fn transaction_row(cells: &[ElementRef<'_>]) -> Result<EthereumTransaction, FetchError> {
    let text = |index: usize| cells.get(index).map(inner_text).filter(|t| !t.is_empty());
    let span_title = |index: usize| -> Result<Option<String>, FetchError> {
        let Some(cell) = cells.get(index) else {
            return Ok(None);
        };
        let span = cell.select(&css("span")?).next();
        Ok(span.and_then(|span| title_of(&span)))
    };
    let counterpart = |index: usize, selector: &str| -> Result<Option<String>, FetchError> {
        match cells.get(index) {
            Some(cell) => parse_counterpart(cell, &css(selector)?),
            None => Ok(None),
        }
    };

    Ok(EthereumTransaction {
        hash: text(1),
        method: span_title(2)?,
        block: text(3),
        date: span_title(4)?.or_else(|| text(4)),
        from: counterpart(5, "a[data-original-title], span.text-truncate")?,
        to: counterpart(7, "span > span")?,
        amount: text(8),
        fee: text(9),
    })
}

/// Counterpart labels are titles like `"Binance 7 (0x3f5c…)"`; the part in
/// parentheses is the address. A title without parentheses is used whole.
fn parse_counterpart(cell: &ElementRef<'_>, selector: &Selector) -> Result<Option<String>, FetchError> {
    let title = cell
        .select(selector)
        .next()
        .and_then(|el| title_of(&el))
        .unwrap_or_default();
    let label = match (title.find('('), title.find(')')) {
        (Some(open), Some(close)) if open < close => title[open + 1..close].trim().to_string(),
        _ => title.trim().to_string(),
    };
    Ok(Some(label).filter(|label| !label.is_empty()))
}

fn last_page(doc: &Html) -> Result<Option<u32>, FetchError> {
    let href = doc
        .select(&css("a.page-link")?)
        .find(|link| inner_text(link).contains("Last"))
        .and_then(|link| link.value().attr("href").map(str::to_string));
    let Some(href) = href else {
        return Ok(None);
    };
    let page = Url::parse(ETHERSCAN)
        .and_then(|base| base.join(&href))
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(name, _)| name == "p")
                .and_then(|(_, value)| value.parse::<u32>().ok())
        });
    Ok(page)
}

fn has_no_entries_marker(doc: &Html) -> Result<bool, FetchError> {
    Ok(doc
        .select(&css("div")?)
        .any(|div| inner_text(&div) == NO_ENTRIES))
}

fn is_hidden(cell: &ElementRef<'_>) -> bool {
    cell.value().attr("style").is_some_and(|style| {
        let compact: String = style.chars().filter(|c| !c.is_whitespace()).collect();
        compact.to_ascii_lowercase().contains("display:none")
    })
}

fn title_of(el: &ElementRef<'_>) -> Option<String> {
    let value = el.value();
    value
        .attr("data-original-title")
        .or_else(|| value.attr("data-bs-title"))
        .or_else(|| value.attr("title"))
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_string)
}

fn first_text(doc: &Html, selector: &str) -> Result<Option<String>, FetchError> {
    Ok(doc
        .select(&css(selector)?)
        .next()
        .map(|el| inner_text(&el))
        .filter(|text| !text.is_empty()))
}

fn child_divs<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    el.children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "div")
}

fn inner_text(el: &ElementRef<'_>) -> String {
    el.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn css(selector: &str) -> Result<Selector, FetchError> {
    Selector::parse(selector)
        .map_err(|err| FetchError::new(FailureKind::Extraction, format!("{selector}: {err}")))
}

fn layout(message: impl Into<String>) -> FetchError {
    FetchError::new(FailureKind::Extraction, message)
}
