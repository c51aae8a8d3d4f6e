//! Downloading show pages into the local page cache.

use std::path::{Path, PathBuf};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use reqwest::{Client, StatusCode};

use dgm_core::model::DgmId;

use crate::config::Config;
use crate::error::{FetchError, FetchResult};
use crate::extract::NOT_FOUND_MARKER;
use crate::resilience::RateLimiter;

/// What happened to one id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A show page was downloaded and cached.
    Fetched,

    /// The site has no show with this id; the not-found page was cached.
    NotFound,

    /// A cached page already existed and was kept.
    Cached,
}

/// Totals for a range fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub fetched: usize,
    pub not_found: usize,
    pub cached: usize,
    pub failed: usize,
}

impl FetchReport {
    fn record(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Fetched => self.fetched += 1,
            FetchOutcome::NotFound => self.not_found += 1,
            FetchOutcome::Cached => self.cached += 1,
        }
    }
}

/// HTTP client for show pages.
///
/// Requests are paced by a [`RateLimiter`] and transient failures (server
/// errors, 429, timeouts, refused connections) are retried with
/// exponential backoff. Pages land in `<html_dir>/<id>.html`.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    http: Client,
    base_url: String,
    html_dir: PathBuf,
    rate_limiter: RateLimiter,
    backoff: ExponentialBuilder,
}

impl PageFetcher {
    /// Create a fetcher from the loaded configuration.
    pub fn new(config: &Config) -> FetchResult<Self> {
        Self::with_settings(
            config.base_url.clone(),
            config.html_dir.clone(),
            config.requests_per_second,
        )
    }

    pub fn with_settings(
        base_url: impl Into<String>,
        html_dir: impl Into<PathBuf>,
        requests_per_second: u32,
    ) -> FetchResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!(
                "dgm-bot/",
                env!("CARGO_PKG_VERSION"),
                " (https://github.com/JakeStanger/DGM-Fetcher)"
            ))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            html_dir: html_dir.into(),
            rate_limiter: RateLimiter::new(requests_per_second),
            backoff: ExponentialBuilder::default().with_max_times(3),
        })
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_backoff(mut self, backoff: ExponentialBuilder) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn html_dir(&self) -> &Path {
        &self.html_dir
    }

    /// Cache location of a page.
    pub fn page_path(&self, id: DgmId) -> PathBuf {
        self.html_dir.join(format!("{id}.html"))
    }

    fn url(&self, id: DgmId) -> String {
        format!("{}{}", self.base_url, id)
    }

    async fn request(&self, id: DgmId) -> FetchResult<(StatusCode, String)> {
        self.rate_limiter.acquire().await;

        let response = self.http.get(self.url(id)).send().await?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok((status, response.text().await?));
        }

        Err(FetchError::Http {
            id: id.get(),
            status: status.as_u16(),
        })
    }

    /// Download one page, retrying transient failures.
    ///
    /// A 404 answer is not an error: its body is returned, and replaced by
    /// the not-found marker if it does not already carry it.
    pub async fn fetch_page(&self, id: DgmId) -> FetchResult<String> {
        let (status, body) = (|| self.request(id))
            .retry(self.backoff)
            .sleep(tokio::time::sleep)
            .when(FetchError::is_transient)
            .notify(|err: &FetchError, dur: Duration| {
                log::warn!("Fetching show {} failed ({}), retrying in {:?}", id, err, dur);
            })
            .await?;

        if status == StatusCode::NOT_FOUND && !body.contains(NOT_FOUND_MARKER) {
            return Ok(NOT_FOUND_MARKER.to_string());
        }
        Ok(body)
    }

    /// Download one page into the cache unless it is already there.
    pub async fn fetch_to_cache(&self, id: DgmId, force: bool) -> FetchResult<FetchOutcome> {
        let path = self.page_path(id);
        if !force && path.exists() {
            log::debug!("Show {} already cached at {}", id, path.display());
            return Ok(FetchOutcome::Cached);
        }

        let body = self.fetch_page(id).await?;
        tokio::fs::write(&path, &body).await?;

        if body.contains(NOT_FOUND_MARKER) {
            log::debug!("Show {} does not exist", id);
            Ok(FetchOutcome::NotFound)
        } else {
            log::debug!("Fetched show {}", id);
            Ok(FetchOutcome::Fetched)
        }
    }

    /// Fetch every id in `from..=to`, in order.
    ///
    /// A failing id is logged and counted; only an unusable cache
    /// directory stops the run.
    pub async fn fetch_range(&self, from: u32, to: u32, force: bool) -> FetchResult<FetchReport> {
        tokio::fs::create_dir_all(&self.html_dir).await?;

        let mut report = FetchReport::default();
        for raw in from..=to {
            let id = DgmId::new(raw);
            match self.fetch_to_cache(id, force).await {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    log::warn!("Failed to fetch show {}: {}", id, e);
                    report.failed += 1;
                }
            }
        }

        log::info!(
            "Fetch complete: {} fetched, {} not found, {} cached, {} failed",
            report.fetched,
            report.not_found,
            report.cached,
            report.failed
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve canned responses, one per connection, in order. Returns the
    /// base URL and a counter of requests served.
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let served = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&served);

        tokio::spawn(async move {
            for (status, body) in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = [0u8; 4096];
                let mut request = Vec::new();
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }
                counter.fetch_add(1, Ordering::SeqCst);
                let response = format!(
                    "HTTP/1.1 {status} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap_or_default();
            }
        });

        (format!("http://{addr}/tour-dates/"), served)
    }

    fn fast_backoff() -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(1))
            .with_max_times(2)
    }

    fn fetcher(base_url: &str, dir: &TempDir) -> PageFetcher {
        PageFetcher::with_settings(base_url, dir.path(), 0)
            .unwrap()
            .with_backoff(fast_backoff())
    }

    #[test]
    fn test_page_path() {
        let dir = TempDir::new().unwrap();
        let fetcher = fetcher("http://localhost/", &dir);
        assert_eq!(fetcher.page_path(DgmId::new(42)), dir.path().join("42.html"));
        assert_eq!(fetcher.url(DgmId::new(42)), "http://localhost/42");
    }

    #[tokio::test]
    async fn test_fetch_writes_cache() {
        let (base, _) = serve(vec![(200, "<html>show</html>")]).await;
        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&base, &dir);

        let outcome = fetcher.fetch_to_cache(DgmId::new(7), false).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Fetched);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("7.html")).unwrap(),
            "<html>show</html>"
        );
    }

    #[tokio::test]
    async fn test_http_404_caches_marker() {
        let (base, _) = serve(vec![(404, "gone")]).await;
        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&base, &dir);

        let outcome = fetcher.fetch_to_cache(DgmId::new(8), false).await.unwrap();
        assert_eq!(outcome, FetchOutcome::NotFound);
        let cached = std::fs::read_to_string(dir.path().join("8.html")).unwrap();
        assert!(cached.contains(NOT_FOUND_MARKER));
    }

    #[tokio::test]
    async fn test_existing_page_is_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("9.html"), "cached").unwrap();
        // Nothing listens here; a request would fail.
        let fetcher = fetcher("http://127.0.0.1:9/", &dir);

        let outcome = fetcher.fetch_to_cache(DgmId::new(9), false).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Cached);
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let (base, served) = serve(vec![(503, "busy"), (200, "<html>ok</html>")]).await;
        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&base, &dir);

        let body = fetcher.fetch_page(DgmId::new(1)).await.unwrap();
        assert_eq!(body, "<html>ok</html>");
        assert_eq!(served.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let (base, served) = serve(vec![(403, "no"), (200, "unused")]).await;
        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&base, &dir);

        let err = fetcher.fetch_page(DgmId::new(1)).await.unwrap_err();
        assert!(matches!(err, FetchError::Http { status: 403, .. }));
        assert_eq!(served.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_range_counts_outcomes() {
        let (base, _) = serve(vec![(200, "<html>a</html>"), (404, "x")]).await;
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("1.html"), "cached").unwrap();
        let fetcher = fetcher(&base, &dir);

        let report = fetcher.fetch_range(1, 3, false).await.unwrap();
        assert_eq!(
            report,
            FetchReport {
                fetched: 1,
                not_found: 1,
                cached: 1,
                failed: 0,
            }
        );
    }
}
