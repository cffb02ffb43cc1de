use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::{FeedConfig, CURRENCY_MARKER, DEFAULT_UNIT, USER_AGENT};
use crate::error::{AppError, Result};
use crate::ingest::amount::parse_amount;
use crate::types::RawPriceRow;

/// A web price source. One implementation per site or API.
#[async_trait]
pub trait ScrapeAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// Look up `query`, optionally narrowed to an area / CEP.
    async fn search(&self, query: &str, area: Option<&str>) -> Result<Vec<RawPriceRow>>;
}

// ---------------------------------------------------------------------------
// JSON price feed
// ---------------------------------------------------------------------------

/// Market search endpoint answering `GET <url>?q=<query>[&area=<area>]` with
/// a JSON array (or `{"items": [...]}`) of products. Every row is attributed
/// to the feed's configured market name.
pub struct JsonFeedAdapter {
    name: String,
    url: String,
    client: reqwest::Client,
}

impl JsonFeedAdapter {
    pub fn new(feed: &FeedConfig, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { name: feed.name.clone(), url: feed.url.clone(), client })
    }
}

#[async_trait]
impl ScrapeAdapter for JsonFeedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, query: &str, area: Option<&str>) -> Result<Vec<RawPriceRow>> {
        let mut params = vec![("q", query)];
        if let Some(area) = area {
            params.push(("area", area));
        }

        let resp: serde_json::Value = self
            .client
            .get(&self.url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let rows = parse_feed_response(&self.name, &resp)?;
        debug!(feed = %self.name, query, rows = rows.len(), "feed search done");
        Ok(rows)
    }
}

/// Turn a feed response into rows. Products without a usable name or price are dropped.
pub fn parse_feed_response(market: &str, resp: &serde_json::Value) -> Result<Vec<RawPriceRow>> {
    let items = match resp.as_array().or_else(|| resp.get("items").and_then(|i| i.as_array())) {
        Some(a) => a,
        None => {
            return Err(AppError::Source(format!(
                "{market}: feed response was not an array"
            )))
        }
    };

    Ok(items.iter().filter_map(|item| parse_feed_item(market, item)).collect())
}

fn parse_feed_item(market: &str, v: &serde_json::Value) -> Option<RawPriceRow> {
    let name = v
        .get("item")
        .or_else(|| v.get("name"))
        .and_then(|n| n.as_str())
        .map(str::trim)
        .filter(|n| !n.is_empty())?;

    let price = match v.get("price")? {
        serde_json::Value::String(s) => parse_amount(s, CURRENCY_MARKER)?,
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string()).ok()?,
        _ => return None,
    };

    let text = |key: &str| {
        v.get(key)
            .and_then(|s| s.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    Some(RawPriceRow {
        item: name.to_string(),
        brand: text("brand"),
        market: market.to_string(),
        price,
        unit: text("unit").unwrap_or_else(|| DEFAULT_UNIT.to_string()),
        url: text("url"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_array_with_text_and_number_prices() {
        let resp = json!([
            { "item": "Café Melitta 500g", "price": "R$ 16,90", "url": "https://m.test/cafe" },
            { "name": "Leite 1L", "brand": "Piracanjuba", "price": 4.79, "unit": "L" }
        ]);
        let rows = parse_feed_response("Mercado Exemplo", &resp).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].price, Decimal::new(1690, 2));
        assert_eq!(rows[0].market, "Mercado Exemplo");
        assert_eq!(rows[0].unit, "un");
        assert_eq!(rows[0].url.as_deref(), Some("https://m.test/cafe"));
        assert_eq!(rows[1].price, Decimal::new(479, 2));
        assert_eq!(rows[1].brand.as_deref(), Some("Piracanjuba"));
        assert_eq!(rows[1].unit, "L");
    }

    #[test]
    fn accepts_items_envelope() {
        let resp = json!({ "items": [ { "item": "Arroz 5kg", "price": "24.90" } ] });
        let rows = parse_feed_response("M", &resp).unwrap();
        assert_eq!(rows[0].price, Decimal::new(2490, 2));
    }

    #[test]
    fn one_fraction_digit_price_keeps_its_scale() {
        let resp = json!([
            { "item": "Arroz", "price": "24.9" },
            { "item": "Sal", "price": "1.2345" }
        ]);
        let rows = parse_feed_response("M", &resp).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].price, Decimal::new(249, 1));
    }

    #[test]
    fn drops_rows_without_name_or_price() {
        let resp = json!([
            { "item": "", "price": "1,00" },
            { "item": "Pão" },
            { "item": "Sal", "price": "consulte" },
            { "item": "Açúcar", "price": true },
            { "item": "Óleo", "price": "7,99" }
        ]);
        let rows = parse_feed_response("M", &resp).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].item, "Óleo");
    }

    #[test]
    fn non_array_response_is_a_source_error() {
        let resp = json!({ "error": "rate limited" });
        assert!(matches!(parse_feed_response("M", &resp), Err(AppError::Source(_))));
    }

    #[test]
    fn adapter_reports_configured_name() {
        let feed = FeedConfig { name: "Mercado Exemplo 1".to_string(), url: "https://example.com/busca".to_string() };
        let adapter = JsonFeedAdapter::new(&feed, 5).unwrap();
        assert_eq!(adapter.name(), "Mercado Exemplo 1");
    }
}
