use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteConfig {
    pub base_url: String,
    pub season_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.livefutbol.com".to_string(),
            season_url: "https://www.livefutbol.com/competition/co97/espana-primera-division/se74771/2024-2025/all-matches/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimits {
    pub requests_per_second: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            requests_per_second: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScrapingConfig {
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub browser_settle_secs: u64,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (compatible; LivefutbolScraper/1.0)".to_string(),
            request_timeout_secs: 15,
            browser_settle_secs: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputConfig {
    pub data_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScraperConfig {
    pub site: SiteConfig,
    pub rate_limits: RateLimits,
    pub scraping: ScrapingConfig,
    pub output: OutputConfig,
}

impl ScraperConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = env::var("SEASON_URL") {
            config.site.season_url = url;
        }
        if let Ok(url) = env::var("BASE_URL") {
            config.site.base_url = url;
        }
        if let Ok(dir) = env::var("OUTPUT_DIR") {
            config.output.data_dir = dir;
        }
        if let Ok(user_agent) = env::var("SCRAPER_USER_AGENT") {
            config.scraping.user_agent = user_agent;
        }
        if let Ok(Some(timeout)) = env::var("SCRAPER_TIMEOUT_SECS")
            .map_or(Ok(None), |t| t.parse::<u64>().map(Some))
        {
            config.scraping.request_timeout_secs = timeout;
        }
        if let Ok(Some(settle)) = env::var("BROWSER_SETTLE_SECS")
            .map_or(Ok(None), |t| t.parse::<u64>().map(Some))
        {
            config.scraping.browser_settle_secs = settle;
        }
        if let Ok(Some(rps)) = env::var("RATE_LIMIT_RPS")
            .map_or(Ok(None), |r| r.parse::<u32>().map(Some))
        {
            config.rate_limits.requests_per_second = rps;
        }

        config
    }
}
