//! Reconciliation-phase tests against a mocked result-document server.

use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bid_harvester::application::{EnrichmentSinks, ReconciliationDispatcher};
use bid_harvester::infrastructure::{CsvSink, DetailParser, HttpClient, HttpClientConfig};

const RESULT_URL_PATTERN: &str = "(?i)bid[_-]?results?";

const DETAIL_HTML: &str = r#"
<html><body>
    <div class="block">
        <p><strong>Bid Number:</strong><span>GEM/2024/B/1</span></p>
        <p><strong>Total Quantity:</strong><span>25</span></p>
    </div>
    <table>
        <tr>
            <th>Seller Name</th><th>Offered Item</th>
            <th>Participated On</th><th>MSE</th><th>Status</th>
        </tr>
        <tr><td>Acme Ltd</td><td>Desktop</td><td>Yes</td><td>No</td><td>Accepted</td></tr>
    </table>
    <table>
        <tr><th>Seller</th><th>Offered Price</th><th>Rank</th></tr>
        <tr><td>Acme Ltd</td><td>₹10,000</td><td>L1</td></tr>
        <tr><td>Zen Corp</td><td>₹11,500</td><td>L2</td></tr>
    </table>
</body></html>
"#;

fn write_listing(listing: &Path, rows: &[[&str; 8]]) {
    let mut writer = csv::Writer::from_path(listing).unwrap();
    writer
        .write_record([
            "serial",
            "bid_no",
            "bid_url",
            "ra_no",
            "ra_url",
            "status",
            "bid_result_url",
            "ra_result_url",
        ])
        .unwrap();
    for row in rows {
        writer.write_record(row.iter()).unwrap();
    }
    writer.flush().unwrap();
}

fn dispatcher(dir: &tempfile::TempDir) -> ReconciliationDispatcher {
    let http = HttpClient::with_config(HttpClientConfig {
        timeout_seconds: 5,
        user_agent: "Mozilla/5.0".to_string(),
    })
    .unwrap();
    let sinks = EnrichmentSinks {
        basic_info: CsvSink::new(dir.path().join("bid_info.csv")),
        technical: CsvSink::new(dir.path().join("technical.csv")),
        financial: CsvSink::new(dir.path().join("financial.csv")),
    };
    ReconciliationDispatcher::new(http, DetailParser::new().unwrap(), sinks, 8, RESULT_URL_PATTERN)
        .unwrap()
}

fn read_rows(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect()
}

#[tokio::test]
async fn only_records_with_usable_result_urls_are_processed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/showbidresults/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DETAIL_HTML))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let listing = dir.path().join("main_rowdata.csv");
    let result_url = format!("{}/showbidresults/1", server.uri());
    write_listing(
        &listing,
        &[
            ["1", "GEM/2024/B/1", "", "", "", "Evaluation", &result_url, ""],
            // No result affordance: never eligible.
            ["2", "GEM/2024/B/2", "", "", "", "Ongoing", "", ""],
            // Captured URL outside the result-view path shape.
            ["3", "GEM/2024/B/3", "", "", "", "Ongoing", "https://example.com/other/3", ""],
        ],
    );

    let summary = dispatcher(&dir).run(&listing).await.unwrap();
    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.skipped, 0);

    let basic = read_rows(&dir.path().join("bid_info.csv"));
    assert_eq!(basic.len(), 2);
    assert_eq!(basic[0], ["bid_no", "bid number", "total quantity"]);
    assert_eq!(basic[1], ["GEM/2024/B/1", "GEM/2024/B/1", "25"]);

    let technical = read_rows(&dir.path().join("technical.csv"));
    assert_eq!(technical.len(), 2);
    assert_eq!(technical[0][0], "bid_no");
    assert_eq!(technical[1][0], "GEM/2024/B/1");
    assert_eq!(technical[1][1], "Acme Ltd");

    let financial = read_rows(&dir.path().join("financial.csv"));
    // Header gains the synthetic Winner column, rows stay narrower.
    assert_eq!(
        financial[0],
        ["bid_no", "Seller", "Offered Price", "Rank", "Winner"]
    );
    assert_eq!(financial.len(), 3);
    assert_eq!(financial[1].len(), 4);
}

#[tokio::test]
async fn fetch_failures_skip_the_task_without_stopping_siblings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/showbidresults/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DETAIL_HTML))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/showbidresults/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let listing = dir.path().join("main_rowdata.csv");
    let ok_url = format!("{}/showbidresults/ok", server.uri());
    let gone_url = format!("{}/showbidresults/gone", server.uri());
    write_listing(
        &listing,
        &[
            ["1", "GEM/2024/B/1", "", "", "", "Evaluation", &gone_url, ""],
            ["2", "GEM/2024/B/2", "", "", "", "Evaluation", &ok_url, ""],
        ],
    );

    let summary = dispatcher(&dir).run(&listing).await.unwrap();
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.skipped, 1);

    // The failed record produced no rows; the successful one did.
    let basic = read_rows(&dir.path().join("bid_info.csv"));
    assert_eq!(basic.len(), 2);
    assert_eq!(basic[1][0], "GEM/2024/B/2");
}

#[tokio::test]
async fn concurrent_tasks_share_sinks_without_corruption() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/showbidresults/any"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DETAIL_HTML))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let listing = dir.path().join("main_rowdata.csv");
    let url = format!("{}/showbidresults/any", server.uri());

    let mut writer = csv::Writer::from_path(&listing).unwrap();
    writer
        .write_record([
            "serial",
            "bid_no",
            "bid_url",
            "ra_no",
            "ra_url",
            "status",
            "bid_result_url",
            "ra_result_url",
        ])
        .unwrap();
    let workers = 20;
    for i in 1..=workers {
        writer
            .write_record([
                &i.to_string(),
                &format!("GEM/2024/B/{i}"),
                "",
                "",
                "",
                "Evaluation",
                &url,
                "",
            ])
            .unwrap();
    }
    writer.flush().unwrap();

    let summary = dispatcher(&dir).run(&listing).await.unwrap();
    assert_eq!(summary.succeeded, workers);

    let basic = read_rows(&dir.path().join("bid_info.csv"));
    assert_eq!(basic.len(), workers + 1);
    assert_eq!(
        basic
            .iter()
            .filter(|row| row[0] == "bid_no")
            .count(),
        1
    );

    // Two financial rows per document, one header line in total.
    let financial = read_rows(&dir.path().join("financial.csv"));
    assert_eq!(financial.len(), workers * 2 + 1);
}

#[tokio::test]
async fn cancellation_prevents_new_task_starts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/showbidresults/any"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DETAIL_HTML))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let listing = dir.path().join("main_rowdata.csv");
    let url = format!("{}/showbidresults/any", server.uri());
    write_listing(
        &listing,
        &[
            ["1", "GEM/2024/B/1", "", "", "", "Evaluation", &url, ""],
            ["2", "GEM/2024/B/2", "", "", "", "Evaluation", &url, ""],
        ],
    );

    let dispatcher = dispatcher(&dir);
    dispatcher.cancellation_token().cancel();

    let summary = dispatcher.run(&listing).await.unwrap();
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.skipped, 2);
    assert!(!dir.path().join("bid_info.csv").exists());
}
