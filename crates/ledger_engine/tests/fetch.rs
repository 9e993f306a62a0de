use std::sync::Arc;
use std::time::Duration;

use ledger_core::{AddressType, CrawlCursor, ExplorerUrls};
use ledger_engine::{
    ExplorerPage, FailureKind, FetchSettings, Fetcher, HttpPageSource, PageSource,
    ReqwestFetcher,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher() -> ReqwestFetcher {
    ReqwestFetcher::new(FetchSettings::default()).expect("client")
}

#[tokio::test]
async fn fetcher_returns_body_and_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/address/0xabc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html>ok</html>", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let url = format!("{}/address/0xabc", server.uri());
    let output = fetcher().fetch(&url).await.expect("fetch ok");
    assert_eq!(output.final_url, url);
    assert!(output.content_type.unwrap().starts_with("text/html"));
    assert_eq!(output.bytes, b"<html>ok</html>");
}

#[tokio::test]
async fn fetcher_maps_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = fetcher()
        .fetch(&format!("{}/txs", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(429));
}

#[tokio::test]
async fn fetcher_rejects_unsupported_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .mount(&server)
        .await;

    let err = fetcher().fetch(&server.uri()).await.unwrap_err();
    assert!(matches!(err.kind, FailureKind::UnsupportedContentType { .. }));
}

#[tokio::test]
async fn fetcher_enforces_size_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![b'a'; 64], "text/html"))
        .mount(&server)
        .await;

    let settings = FetchSettings {
        max_bytes: 16,
        ..FetchSettings::default()
    };
    let err = ReqwestFetcher::new(settings)
        .unwrap()
        .fetch(&server.uri())
        .await
        .unwrap_err();
    assert!(matches!(err.kind, FailureKind::TooLarge { max_bytes: 16, .. }));
}

#[tokio::test]
async fn fetcher_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html></html>", "text/html")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(50),
        ..FetchSettings::default()
    };
    let err = ReqwestFetcher::new(settings)
        .unwrap()
        .fetch(&server.uri())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn http_source_reads_an_etherscan_page_from_a_mirror() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/txs"))
        .and(query_param("a", "0xabc"))
        .and(query_param("p", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<html><body><div>There are no matching entries</div></body></html>",
            "text/html",
        ))
        .mount(&server)
        .await;

    let urls = ExplorerUrls {
        bitcoin: server.uri(),
        ethereum: server.uri(),
    };
    let cursor = CrawlCursor::root(AddressType::Ethereum, "0xabc")
        .first_page(Default::default())
        .next_page();
    let source = HttpPageSource::with_fetcher(Arc::new(fetcher()));

    let page = source.load(&urls.request(cursor)).await.unwrap();
    assert_eq!(page, ExplorerPage::NoEntries);
}
