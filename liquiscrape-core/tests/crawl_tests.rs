// Tests for crawl execution

use liquiscrape_core::config::Settings;
use liquiscrape_core::crawl::{
    CrawlOptions, acquire_proxies, execute_crawl, generate_crawl_summary, short_name,
};
use liquiscrape_scanner::result::{CrawlResults, FailedJob};
use liquiscrape_scanner::{CrawlJob, ProxyAddress, ProxySet, RetryPolicy};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

fn player_page(name: &str) -> String {
    format!(
        r#"<html><body>
        <h1 id="firstHeading">{name}</h1>
        <div class="infobox-image"><a class="image"><img src="/images/{name}.png"></a></div>
        <div class="infobox-cell-2">Team:</div><div class="infobox-cell-2">TeamX</div>
        </body></html>"#
    )
}

fn options_for(server: &MockServer, seeds: Vec<CrawlJob>, image_dir: Option<PathBuf>) -> CrawlOptions {
    let proxies =
        ProxySet::from_addresses(&[ProxyAddress::new("127.0.0.1", server.address().port())]).unwrap();
    CrawlOptions {
        seeds,
        proxies,
        threads: 2,
        image_threads: 1,
        image_dir,
        page_timeout: Duration::from_secs(5),
        image_timeout: Duration::from_secs(5),
        min_image_bytes: 500,
        retry: RetryPolicy::immediate(2),
        show_progress_bars: false,
    }
}

// ============================================================================
// Short Name Tests
// ============================================================================

#[test]
fn test_short_name_last_segment() {
    assert_eq!(short_name("https://liquipedia.net/valorant/PlayerA"), "PlayerA");
}

#[test]
fn test_short_name_falls_back_to_url() {
    assert_eq!(short_name("not a url"), "not a url");
    assert_eq!(short_name("https://liquipedia.net/"), "https://liquipedia.net/");
}

// ============================================================================
// Summary Tests
// ============================================================================

#[test]
fn test_summary_lists_failures_and_files() {
    colored::control::set_override(false);
    let results = CrawlResults {
        crawled: vec!["https://a/1".to_string()],
        failed: vec![FailedJob {
            url: "https://a/2".to_string(),
            error: "Gave up".to_string(),
        }],
        ..Default::default()
    };
    let summary = generate_crawl_summary(&results, &[PathBuf::from("/out/scraped.csv")]);

    assert!(summary.contains("Profiles crawled: 1"));
    assert!(summary.contains("Failed: 1"));
    assert!(summary.contains("https://a/2"));
    assert!(summary.contains("/out/scraped.csv"));
}

// ============================================================================
// Proxy Acquisition Tests
// ============================================================================

#[tokio::test]
async fn test_static_proxies_skip_discovery() {
    let settings = Settings::from_json(
        r#"{
            "thread_num": 1, "input_file_path": "a", "output_file_path": "b", "image_dir": "c",
            "proxy": { "static_proxies": ["127.0.0.1:3128", "10.0.0.1:8080"],
                       "listing_url": "http://127.0.0.1:1/unreachable" }
        }"#,
    )
    .unwrap();

    let proxies = acquire_proxies(&settings, None, false).await.unwrap();
    assert_eq!(proxies.len(), 2);
}

#[tokio::test]
async fn test_malformed_static_proxy_rejected() {
    let settings = Settings::from_json(
        r#"{
            "thread_num": 1, "input_file_path": "a", "output_file_path": "b", "image_dir": "c",
            "proxy": { "static_proxies": ["no-port"] }
        }"#,
    )
    .unwrap();

    assert!(acquire_proxies(&settings, None, false).await.is_err());
}

// ============================================================================
// Crawl Execution Tests
// ============================================================================

#[tokio::test]
async fn test_execute_crawl_collects_profiles() {
    let server = MockServer::start().await;
    for name in ["PlayerA", "PlayerB"] {
        Mock::given(method("GET"))
            .and(path(format!("/{}", name)))
            .respond_with(ResponseTemplate::new(200).set_body_string(player_page(name)))
            .mount(&server)
            .await;
    }

    let seeds = vec![
        CrawlJob::new(format!("{}/PlayerA", server.uri())),
        CrawlJob::new(format!("{}/PlayerB", server.uri())),
    ];
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = messages.clone();
    let callback = Arc::new(move |msg: String| sink.lock().unwrap().push(msg));

    let results = execute_crawl(options_for(&server, seeds, None), Some(callback))
        .await
        .unwrap();

    assert_eq!(results.profiles.len(), 2);
    assert!(results.failed.is_empty());
    assert!(results.images.is_empty());
    assert_eq!(messages.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_execute_crawl_downloads_images() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/PlayerA"))
        .respond_with(ResponseTemplate::new(200).set_body_string(player_page("PlayerA")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/images/PlayerA.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 2048]))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let seeds = vec![CrawlJob::new(format!("{}/PlayerA", server.uri()))];
    let results = execute_crawl(options_for(&server, seeds, Some(dir.path().to_path_buf())), None)
        .await
        .unwrap();

    assert_eq!(results.images.len(), 1);
    assert!(dir.path().join("PlayerA.png").exists());
}

#[tokio::test]
async fn test_execute_crawl_rejects_empty_seeds() {
    let server = MockServer::start().await;
    let result = execute_crawl(options_for(&server, Vec::new(), None), None).await;
    assert!(result.is_err());
}
