use anyhow::{anyhow, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                                      (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub markup: String,
    /// URL after redirects.
    pub final_url: String,
}

/// Plain HTTP fetch of a job page. Pages that need a login (Handshake) won't
/// work here; use pasted text for those.
#[derive(Debug)]
pub struct PageFetcher {
    client: reqwest::blocking::Client,
}

impl PageFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    pub fn fetch(&self, url: &str) -> Result<FetchedPage> {
        tracing::info!(url, "fetching job page");
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Failed to fetch {}", url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Fetching {} failed with status {}", url, status));
        }

        let final_url = response.url().to_string();
        let markup = response
            .text()
            .with_context(|| format!("Failed to read response body from {}", url))?;
        tracing::debug!(final_url = %final_url, bytes = markup.len(), "fetched");

        Ok(FetchedPage { markup, final_url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_with_custom_agent() {
        assert!(PageFetcher::new("jobclip-test/1.0", Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_unreachable_host_is_an_error() {
        let fetcher = PageFetcher::new(DEFAULT_USER_AGENT, Duration::from_millis(200)).unwrap();
        // Port 9 on loopback: nothing listens there
        assert!(fetcher.fetch("http://127.0.0.1:9/job").is_err());
    }

    #[test]
    #[ignore] // needs network
    fn test_fetch_live_page() {
        let fetcher = PageFetcher::new(DEFAULT_USER_AGENT, Duration::from_secs(15)).unwrap();
        let page = fetcher.fetch("https://example.com/").unwrap();
        assert!(page.markup.contains("Example Domain"));
        assert!(page.final_url.starts_with("https://example.com"));
    }
}
