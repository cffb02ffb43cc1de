use crate::error::{AppError, Result};

/// Market recorded for chat offers that don't name one (`... no <market>`).
pub const DEFAULT_CHAT_MARKET: &str = "Grupo WhatsApp";

/// Currency marker expected in front of chat amounts.
pub const CURRENCY_MARKER: &str = "R$";

/// Unit recorded when a source doesn't report one.
pub const DEFAULT_UNIT: &str = "un";

/// How many of the newest observations feed a recommendation.
pub const RECENT_LIMIT: usize = 500;

/// Per-request timeout for JSON price feeds (seconds).
pub const FEED_TIMEOUT_SECS: u64 = 20;

pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; PriceScout/1.0)";

const DEFAULT_WISHLIST: &str = "Café Melitta 500g; Arroz 5kg; Leite 1L";

/// A configured JSON price feed: market name and search endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    /// SQLite file (DB_PATH). Empty selects the in-memory store.
    pub db_path: String,
    pub api_port: u16,
    /// Area / CEP tag stamped on every collected batch (AREA)
    pub area: Option<String>,
    /// Default shopping list names (WISHLIST, `;`-separated)
    pub wishlist: Vec<String>,
    /// Snapshot size for recommendations (RECENT_LIMIT)
    pub recent_limit: usize,
    /// JSON feed adapters (PRICE_FEEDS, `Name=url,Name=url`)
    pub feeds: Vec<FeedConfig>,
    pub feed_timeout_secs: u64,
    /// Currency marker in front of chat amounts (CHAT_CURRENCY)
    pub chat_currency: String,
    /// Market for chat offers without " no <market>" (CHAT_DEFAULT_MARKET)
    pub chat_default_market: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "prices.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            area: std::env::var("AREA")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            wishlist: parse_wishlist(
                &std::env::var("WISHLIST").unwrap_or_else(|_| DEFAULT_WISHLIST.to_string()),
            ),
            recent_limit: std::env::var("RECENT_LIMIT")
                .unwrap_or_else(|_| RECENT_LIMIT.to_string())
                .parse::<usize>()
                .unwrap_or(RECENT_LIMIT),
            feeds: parse_feeds(&std::env::var("PRICE_FEEDS").unwrap_or_default())?,
            feed_timeout_secs: std::env::var("FEED_TIMEOUT_SECS")
                .unwrap_or_else(|_| FEED_TIMEOUT_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(FEED_TIMEOUT_SECS),
            chat_currency: std::env::var("CHAT_CURRENCY")
                .unwrap_or_else(|_| CURRENCY_MARKER.to_string()),
            chat_default_market: std::env::var("CHAT_DEFAULT_MARKET")
                .unwrap_or_else(|_| DEFAULT_CHAT_MARKET.to_string()),
        })
    }
}

pub fn parse_wishlist(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `Mercado A=https://a.example/search,Mercado B=https://b.example/api`
pub fn parse_feeds(raw: &str) -> Result<Vec<FeedConfig>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let (name, url) = entry.split_once('=').ok_or_else(|| {
                AppError::Config(format!("PRICE_FEEDS entry '{entry}' must be Name=url"))
            })?;
            let (name, url) = (name.trim(), url.trim());
            if name.is_empty() || url.is_empty() {
                return Err(AppError::Config(format!(
                    "PRICE_FEEDS entry '{entry}' has an empty name or url"
                )));
            }
            Ok(FeedConfig { name: name.to_string(), url: url.to_string() })
        })
        .collect()
}
