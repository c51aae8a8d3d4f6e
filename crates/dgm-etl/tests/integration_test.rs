//! Integration tests for the fetch → load → index flow.
//!
//! Pages are served by a throwaway local HTTP server so no real site is
//! contacted.

use std::path::PathBuf;

use dgm_core::model::DgmId;
use dgm_core::schema::Database;
use dgm_etl::{build_pipeline, load_directory, Config, LoadReport, PageFetcher, ScrapeJob, ScrapeRange};
use dgm_search::{rebuild_index, FtsIndex, QueryService};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use treadle::WorkItem;

const PAGE: &str = include_str!("fixtures/show.html");

/// Answer every request with the page for the requested id: ids listed in
/// `shows` get the fixture with that venue, everything else a 404.
async fn serve_site(shows: Vec<(u32, &'static str)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap_or(0);
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            let id: u32 = request
                .split_whitespace()
                .nth(1)
                .and_then(|path| path.rsplit('/').next())
                .and_then(|id| id.parse().ok())
                .unwrap_or(0);

            let (status, body) = match shows.iter().find(|(show_id, _)| *show_id == id) {
                Some((_, venue)) => (200, PAGE.replace("Royal Albert Hall", venue)),
                None => (404, "<html><body><h1>404 :(</h1></body></html>".to_string()),
            };
            let response = format!(
                "HTTP/1.1 {status} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap_or_default();
            socket.shutdown().await.unwrap_or_default();
        }
    });

    format!("http://{addr}/tour-dates/")
}

fn test_config(dir: &TempDir, base_url: String) -> Config {
    Config {
        database_path: dir.path().join("dgm.db"),
        index_path: dir.path().join("search.db"),
        html_dir: dir.path().join("html"),
        base_url,
        requests_per_second: 0,
        first_id: 1,
        last_id: 4,
        ..Config::default()
    }
}

#[tokio::test]
async fn test_fetch_load_index_search() {
    let base = serve_site(vec![(2, "Royal Albert Hall"), (4, "Paradiso")]).await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, base);

    let fetcher = PageFetcher::new(&config).unwrap();
    let fetched = fetcher.fetch_range(config.first_id, config.last_id, false).await.unwrap();
    assert_eq!(fetched.fetched, 2);
    assert_eq!(fetched.not_found, 2);

    let db = Database::open(&config.database_path).unwrap();
    let report = load_directory(&db, &config.html_dir).unwrap();
    assert_eq!(
        report,
        LoadReport {
            loaded: 2,
            not_found: 2,
            failed: 0,
        }
    );

    let index = FtsIndex::open(&config.index_path).unwrap();
    assert_eq!(rebuild_index(&db, &index).unwrap(), 2);

    let hits = QueryService::new(&index, &db).search("Paradiso").unwrap();
    assert_eq!(hits.total, 1);
    assert_eq!(hits.shows[0].dgm_id, DgmId::new(4));

    let members = db.members_for_show(hits.shows[0].id).unwrap();
    assert_eq!(members.len(), 3);
}

#[tokio::test]
async fn test_second_fetch_uses_cache() {
    let base = serve_site(vec![(1, "Royal Albert Hall")]).await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, base);
    let fetcher = PageFetcher::new(&config).unwrap();

    fetcher.fetch_range(1, 2, false).await.unwrap();
    let again = fetcher.fetch_range(1, 2, false).await.unwrap();
    assert_eq!(again.cached, 2);
    assert_eq!(again.fetched, 0);

    let forced = fetcher.fetch_range(1, 2, true).await.unwrap();
    assert_eq!(forced.fetched, 1);
    assert_eq!(forced.not_found, 1);
}

#[test]
fn test_shared_instrument_rows() {
    let dir = TempDir::new().unwrap();
    let html = dir.path().join("html");
    std::fs::create_dir(&html).unwrap();
    std::fs::write(html.join("1.html"), PAGE).unwrap();
    std::fs::write(html.join("2.html"), PAGE.replace("Royal Albert Hall", "Beacon Theatre")).unwrap();

    let db = Database::open(dir.path().join("dgm.db")).unwrap();
    load_directory(&db, &html).unwrap();

    // Guitar, Soundscapes, Vocals, Bass and Stick, once each.
    assert_eq!(db.count_instruments().unwrap(), 5);
    assert_eq!(db.shows_with_instrument("Guitar").unwrap().len(), 2);
}

#[tokio::test]
async fn test_pipeline_construction() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, "http://127.0.0.1:9/".to_string());

    let result = build_pipeline(&config, ScrapeRange::from_config(&config));
    assert!(result.is_ok(), "Pipeline should build successfully");
}

#[test]
fn test_scrape_job_work_item() {
    let job = ScrapeJob::new("scrape-test", PathBuf::from("/data/html"));
    assert_eq!(job.id(), "scrape-test");
}
