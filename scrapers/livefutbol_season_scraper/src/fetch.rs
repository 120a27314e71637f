use headless_chrome::{Browser, LaunchOptions};
use std::{thread, time::Duration};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ScraperConfig;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(reqwest::StatusCode),
    #[error("browser fallback failed: {0}")]
    Browser(String),
    #[error("all fetch strategies exhausted for {url}")]
    Exhausted { url: String },
}

/// Downloads rendered HTML. A plain GET is tried first; if it errors or the
/// response does not contain a required fragment, the page is rendered in a
/// headless browser. One attempt per strategy, no retry loop.
pub struct Fetcher {
    client: reqwest::blocking::Client,
    settle_delay: Duration,
}

impl Fetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(&config.scraping.user_agent)
            .timeout(Duration::from_secs(config.scraping.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            settle_delay: Duration::from_secs(config.scraping.browser_settle_secs),
        })
    }

    pub fn fetch(&self, url: &str, require: Option<&str>) -> Result<String, FetchError> {
        match self.fetch_http(url) {
            Ok(html) => {
                if let Some(fragment) = require {
                    if !html.contains(fragment) {
                        info!(
                            "Response for {} is missing '{}', rendering in browser",
                            url, fragment
                        );
                        return self.browser_or_exhausted(url);
                    }
                }
                Ok(html)
            }
            Err(e) => {
                warn!("GET {} failed ({}), trying browser fallback", url, e);
                self.browser_or_exhausted(url)
            }
        }
    }

    fn fetch_http(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        Ok(response.text()?)
    }

    fn browser_or_exhausted(&self, url: &str) -> Result<String, FetchError> {
        self.fetch_browser(url).map_err(|e| {
            warn!("Browser fallback for {} failed: {}", url, e);
            FetchError::Exhausted {
                url: url.to_string(),
            }
        })
    }

    fn fetch_browser(&self, url: &str) -> Result<String, FetchError> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .build()
            .map_err(|e| FetchError::Browser(e.to_string()))?;

        let browser = Browser::new(options).map_err(|e| FetchError::Browser(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| FetchError::Browser(e.to_string()))?;

        tab.navigate_to(url)
            .map_err(|e| FetchError::Browser(e.to_string()))?;
        tab.wait_for_element("body")
            .map_err(|e| FetchError::Browser(e.to_string()))?;
        thread::sleep(self.settle_delay);

        tab.get_content()
            .map_err(|e| FetchError::Browser(e.to_string()))
    }
}
