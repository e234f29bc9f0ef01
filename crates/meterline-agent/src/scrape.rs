//! Memory probe backed by a text metrics endpoint
//!
//! The sidecar exposes a Prometheus-style text document; the heap figure is
//! the trailing field of the first parsable line starting with the metric
//! key, in bytes.

use std::time::Duration;

use async_trait::async_trait;
use meterline_common::{MeterlineError, Result};
use tracing::{debug, warn};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Source of the current memory figure for one function instance
#[async_trait]
pub trait MemoryProbe: Send + Sync {
    /// Memory in MB. Never fails: any problem yields 0.
    async fn memory_mb(&self) -> f64;
}

/// Scrapes a metrics endpoint over HTTP
pub struct HttpMemoryScraper {
    http: reqwest::Client,
    url: String,
    metric_key: String,
}

impl HttpMemoryScraper {
    pub fn new(url: &str, metric_key: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MeterlineError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url: url.to_string(),
            metric_key: metric_key.to_string(),
        })
    }

    async fn fetch(&self) -> reqwest::Result<String> {
        self.http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl MemoryProbe for HttpMemoryScraper {
    async fn memory_mb(&self) -> f64 {
        let document = match self.fetch().await {
            Ok(document) => document,
            Err(e) => {
                warn!(url = %self.url, "Failed to scrape metrics: {}", e);
                return 0.0;
            }
        };

        match parse_memory_mb(&document, &self.metric_key) {
            Some(mb) => {
                debug!(key = %self.metric_key, mem_mb = mb, "Scraped memory");
                mb
            }
            None => {
                warn!(key = %self.metric_key, "Memory metric not found in scrape");
                0.0
            }
        }
    }
}

/// Extract the memory figure (MB) from a text metrics document
pub fn parse_memory_mb(document: &str, metric_key: &str) -> Option<f64> {
    document
        .lines()
        .filter(|line| line.starts_with(metric_key))
        .find_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 2 {
                return None;
            }
            fields[fields.len() - 1].parse::<f64>().ok()
        })
        .map(|bytes| bytes / BYTES_PER_MB)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "revision_go_heap_alloc";

    #[test]
    fn test_parse_memory_from_labelled_line() {
        let document = "\
# HELP revision_go_heap_alloc Heap bytes
# TYPE revision_go_heap_alloc gauge
revision_go_gc_count 12
revision_go_heap_alloc{revision=\"hello-00001\"} 10485760
";
        assert_eq!(parse_memory_mb(document, KEY), Some(10.0));
    }

    #[test]
    fn test_parse_skips_unparsable_match() {
        let document = "revision_go_heap_alloc NaNish\nrevision_go_heap_alloc 2097152\n";
        assert_eq!(parse_memory_mb(document, KEY), Some(2.0));
    }

    #[test]
    fn test_parse_missing_metric() {
        assert_eq!(parse_memory_mb("other_metric 1\n", KEY), None);
        assert_eq!(parse_memory_mb("revision_go_heap_alloc\n", KEY), None);
        assert_eq!(parse_memory_mb("", KEY), None);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_yields_zero() {
        // Port 1 on loopback has no listener
        let scraper =
            HttpMemoryScraper::new("http://127.0.0.1:1/metrics", KEY, Duration::from_millis(500))
                .unwrap();
        assert_eq!(scraper.memory_mb().await, 0.0);
    }

    #[tokio::test]
    async fn test_scrapes_live_endpoint() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let body = "revision_go_heap_alloc 5242880\n";
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        });

        let url = format!("http://{}/metrics", addr);
        let scraper = HttpMemoryScraper::new(&url, KEY, Duration::from_secs(2)).unwrap();
        assert_eq!(scraper.memory_mb().await, 5.0);
    }
}
