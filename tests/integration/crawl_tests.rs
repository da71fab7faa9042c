//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and exercise the
//! full crawl cycle end-to-end: seeding, dispatch, politeness, the page
//! cap, persistence, and interrupt handling.

use saunter::config::{Config, CrawlerConfig, UserAgentConfig};
use saunter::crawler::run_crawl;
use saunter::storage::{RunStatus, SqliteStore, Store};
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration around a temp database
fn test_config(db_path: &str, seeds: Vec<String>, max_urls: usize, request_delay_ms: u64) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_urls,
            max_workers: 4,
            request_delay_ms,
            fetch_timeout_secs: 5,
            shutdown_grace_secs: 5,
            database_path: db_path.to_string(),
            seeds,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
    }
}

fn temp_db(dir: &TempDir) -> String {
    dir.path().join("crawler.db").to_string_lossy().into_owned()
}

fn page_with_links(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|link| format!(r#"<a href="{}">link</a>"#, link))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body>{}</body></html>",
        title, anchors
    )
}

fn plain_page(title: &str, body: &str) -> String {
    format!(
        "<html><head><title>{}</title></head><body><p>{}</p></body></html>",
        title, body
    )
}

#[tokio::test]
async fn test_crawl_visits_seed_and_discovered_links() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(page_with_links("Home", &["/x", "/y"])),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/x"))
        .respond_with(ResponseTemplate::new(200).set_body_string(plain_page("X", "x content")))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/y"))
        .respond_with(ResponseTemplate::new(200).set_body_string(plain_page("Y", "y content")))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = temp_db(&dir);
    let config = test_config(&db_path, vec![format!("{}/", base_url)], 3, 100);

    run_crawl(config, "test-hash", false, CancellationToken::new())
        .await
        .expect("Crawl failed");

    let store = SqliteStore::new(Path::new(&db_path)).expect("Failed to open DB");

    // Exactly the seed and its two links, nothing queued afterward
    assert_eq!(store.count_visits().unwrap(), 3);
    assert_eq!(store.count_frontier().unwrap(), 0);

    let root = store
        .get_visit(&format!("{}/", base_url))
        .unwrap()
        .expect("seed has no visit record");
    assert_eq!(root.status, 200);
    assert_eq!(root.title, Some("Home".to_string()));
    assert_eq!(
        root.links,
        vec![format!("{}/x", base_url), format!("{}/y", base_url)]
    );

    let x = store
        .get_visit(&format!("{}/x", base_url))
        .unwrap()
        .expect("/x has no visit record");
    assert_eq!(x.status, 200);
    assert_eq!(x.title, Some("X".to_string()));
    assert!(x.links.is_empty());

    assert!(store
        .get_visit(&format!("{}/y", base_url))
        .unwrap()
        .is_some());

    let run = store.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_page_cap_leaves_rest_in_frontier() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(page_with_links("Hub", &["/a", "/b", "/c", "/d", "/e"])),
        )
        .mount(&mock_server)
        .await;
    // Only the first discovered link fits under the cap
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string(plain_page("A", "a")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = temp_db(&dir);
    let config = test_config(&db_path, vec![format!("{}/", base_url)], 2, 100);

    run_crawl(config, "test-hash", false, CancellationToken::new())
        .await
        .expect("Crawl failed");

    let store = SqliteStore::new(Path::new(&db_path)).expect("Failed to open DB");

    assert_eq!(store.count_visits().unwrap(), 2);
    assert!(store.get_visit(&format!("{}/", base_url)).unwrap().is_some());
    assert!(store
        .get_visit(&format!("{}/a", base_url))
        .unwrap()
        .is_some());

    // The four unfetched links survive in the persisted frontier
    assert_eq!(store.count_frontier().unwrap(), 4);
    let pending = store.load_frontier().unwrap();
    assert_eq!(pending[0].0, format!("{}/b", base_url));
}

#[tokio::test]
async fn test_failure_recorded_once_without_retry() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // expect(1) verifies the fetch is never retried
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = temp_db(&dir);
    let config = test_config(&db_path, vec![format!("{}/gone", base_url)], 10, 100);

    run_crawl(config, "test-hash", false, CancellationToken::new())
        .await
        .expect("Crawl failed");

    let store = SqliteStore::new(Path::new(&db_path)).expect("Failed to open DB");

    assert_eq!(store.count_visits().unwrap(), 1);
    assert_eq!(store.status_breakdown().unwrap(), vec![(404, 1)]);

    let record = store
        .get_visit(&format!("{}/gone", base_url))
        .unwrap()
        .unwrap();
    assert!(record.title.is_none());
    assert!(record.text.is_none());
    assert!(record.links.is_empty());

    let run = store.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_requests_to_one_host_are_spaced() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(page_with_links("Home", &["/x", "/y"])),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/x"))
        .respond_with(ResponseTemplate::new(200).set_body_string(plain_page("X", "x")))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/y"))
        .respond_with(ResponseTemplate::new(200).set_body_string(plain_page("Y", "y")))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = temp_db(&dir);
    let delay_ms = 300;
    let config = test_config(&db_path, vec![format!("{}/", base_url)], 10, delay_ms);

    let start = Instant::now();
    run_crawl(config, "test-hash", false, CancellationToken::new())
        .await
        .expect("Crawl failed");
    let elapsed = start.elapsed();

    // Three contacts to one host span at least two full delay windows
    assert!(
        elapsed >= Duration::from_millis(2 * delay_ms),
        "crawl finished too fast for the configured delay: {:?}",
        elapsed
    );

    let store = SqliteStore::new(Path::new(&db_path)).expect("Failed to open DB");
    assert_eq!(store.count_visits().unwrap(), 3);
}

#[tokio::test]
async fn test_resumption_dispatches_pending_not_visited() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Pending addresses are fetched exactly once each
    for pending in ["/p1", "/p2", "/p3"] {
        Mock::given(method("GET"))
            .and(path(pending))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(page_with_links("Pending", &["/done1"])),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
    }
    // Already-visited addresses must never be contacted again, even when
    // rediscovered as links
    for done in ["/done1", "/done2"] {
        Mock::given(method("GET"))
            .and(path(done))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;
    }
    // A persisted frontier wins over configured seeds
    Mock::given(method("GET"))
        .and(path("/never"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = temp_db(&dir);

    {
        let mut store = SqliteStore::new(Path::new(&db_path)).unwrap();
        store
            .save_visit_record(&format!("{}/done1", base_url), Some("Done"), None, &[], 200)
            .unwrap();
        store
            .save_visit_record(&format!("{}/done2", base_url), None, None, &[], 200)
            .unwrap();
        store
            .upsert_frontier_entry(&format!("{}/p1", base_url), 1)
            .unwrap();
        store
            .upsert_frontier_entry(&format!("{}/p2", base_url), 2)
            .unwrap();
        store
            .upsert_frontier_entry(&format!("{}/p3", base_url), 2)
            .unwrap();
    }

    let config = test_config(&db_path, vec![format!("{}/never", base_url)], 10, 100);
    run_crawl(config, "test-hash", false, CancellationToken::new())
        .await
        .expect("Crawl failed");

    let store = SqliteStore::new(Path::new(&db_path)).expect("Failed to open DB");

    // Two old records plus the three pending fetches
    assert_eq!(store.count_visits().unwrap(), 5);
    assert_eq!(store.count_frontier().unwrap(), 0);

    let run = store.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_interrupt_flushes_pending_work() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // The seed answers slowly enough that cancellation lands mid-fetch
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(page_with_links("Slow Home", &["/x", "/y"]))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/x"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/y"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = temp_db(&dir);
    let config = test_config(&db_path, vec![format!("{}/", base_url)], 10, 100);

    let cancel = CancellationToken::new();
    let crawl_cancel = cancel.clone();
    let crawl =
        tokio::spawn(async move { run_crawl(config, "test-hash", false, crawl_cancel).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();
    crawl.await.unwrap().expect("Crawl failed");

    let store = SqliteStore::new(Path::new(&db_path)).expect("Failed to open DB");

    // The in-flight seed finished within the grace period; its links were
    // flushed instead of dispatched
    assert_eq!(store.count_visits().unwrap(), 1);
    assert_eq!(store.count_frontier().unwrap(), 2);

    let run = store.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Interrupted);
}

#[tokio::test]
async fn test_abandoned_fetch_returns_to_frontier() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(page_with_links("Home", &["/slow", "/other"])),
        )
        .mount(&mock_server)
        .await;
    // Answers far too late for the grace period, so the worker fetching it
    // gets abandoned at shutdown
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(plain_page("Slow", "late"))
                .set_delay(Duration::from_secs(8)),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/other"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = temp_db(&dir);
    let mut config = test_config(&db_path, vec![format!("{}/", base_url)], 10, 100);
    // One worker: the slow fetch holds the pool while /other stays queued
    config.crawler.max_workers = 1;
    config.crawler.shutdown_grace_secs = 1;

    let cancel = CancellationToken::new();
    let crawl_cancel = cancel.clone();
    let crawl =
        tokio::spawn(async move { run_crawl(config, "test-hash", false, crawl_cancel).await });

    tokio::time::sleep(Duration::from_millis(500)).await;
    cancel.cancel();
    crawl.await.unwrap().expect("Crawl failed");

    let store = SqliteStore::new(Path::new(&db_path)).expect("Failed to open DB");

    // Only the seed produced a visit record; the abandoned fetch left none
    assert_eq!(store.count_visits().unwrap(), 1);
    assert!(store
        .get_visit(&format!("{}/slow", base_url))
        .unwrap()
        .is_none());

    // Both unfinished addresses survive the flush, the abandoned one
    // included, so the next run picks them up
    let pending: Vec<String> = store
        .load_frontier()
        .unwrap()
        .into_iter()
        .map(|(address, _)| address)
        .collect();
    assert!(pending.contains(&format!("{}/slow", base_url)));
    assert!(pending.contains(&format!("{}/other", base_url)));

    let run = store.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Interrupted);
}
