use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_UNIT;
use crate::error::{AppError, Result};

// ---------------------------------------------------------------------------
// Origin
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Web,
    Chat,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Origin::Web => "web",
            Origin::Chat => "chat",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Origin {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "web" => Ok(Origin::Web),
            "chat" => Ok(Origin::Chat),
            other => Err(AppError::InvalidObservation(format!("unknown origin '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Batch context
// ---------------------------------------------------------------------------

/// Values stamped on every row of one collection batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchContext {
    pub area: Option<String>,
    pub observed_at: DateTime<Utc>,
}

impl BatchContext {
    pub fn new(area: Option<String>, observed_at: DateTime<Utc>) -> Self {
        Self { area, observed_at }
    }

    pub fn now(area: Option<String>) -> Self {
        Self::new(area, Utc::now())
    }
}

// ---------------------------------------------------------------------------
// Price rows
// ---------------------------------------------------------------------------

/// A row as reported by a source, before origin/area/timestamp are known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPriceRow {
    pub item: String,
    pub brand: Option<String>,
    pub market: String,
    pub price: Decimal,
    pub unit: String,
    pub url: Option<String>,
}

impl RawPriceRow {
    pub fn new(item: impl Into<String>, market: impl Into<String>, price: Decimal) -> Self {
        Self {
            item: item.into(),
            brand: None,
            market: market.into(),
            price,
            unit: DEFAULT_UNIT.to_string(),
            url: None,
        }
    }

    pub fn into_observation(self, origin: Origin, ctx: &BatchContext) -> PriceObservation {
        PriceObservation {
            item: self.item,
            brand: self.brand,
            market: self.market,
            price: self.price,
            unit: self.unit,
            url: self.url,
            origin,
            area: ctx.area.clone(),
            observed_at: ctx.observed_at,
        }
    }
}

/// One reported price at one point in time. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub item: String,
    pub brand: Option<String>,
    pub market: String,
    pub price: Decimal,
    pub unit: String,
    pub url: Option<String>,
    pub origin: Origin,
    pub area: Option<String>,
    pub observed_at: DateTime<Utc>,
}

/// Uniqueness key of a stored observation. A missing brand equals a missing brand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObservationKey {
    pub item: String,
    pub brand: String,
    pub market: String,
    pub observed_at: DateTime<Utc>,
    pub origin: Origin,
}

impl PriceObservation {
    pub fn key(&self) -> ObservationKey {
        ObservationKey {
            item: self.item.clone(),
            brand: self.brand.clone().unwrap_or_default(),
            market: self.market.clone(),
            observed_at: self.observed_at,
            origin: self.origin,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.price < Decimal::ZERO {
            return Err(AppError::InvalidObservation(format!(
                "negative price {} for '{}' at '{}'",
                self.price, self.item, self.market
            )));
        }
        if self.item.trim().is_empty() {
            return Err(AppError::InvalidObservation("empty item name".to_string()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Wishlist and recommendation output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistEntry {
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    /// Not used by matching.
    #[serde(default)]
    pub category: Option<String>,
}

impl WishlistEntry {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), brand: None, category: None }
    }
}

/// Cheapest observation satisfying one wishlist entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    /// Wishlist name that produced this match.
    pub wanted: String,
    /// Item name of the chosen observation.
    pub item: String,
    pub market: String,
    pub price: Decimal,
    pub origin: Origin,
    pub url: Option<String>,
}

/// Total cost of the matched items bought at one market.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketRanking {
    pub market: String,
    pub total: Decimal,
    pub items: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Recommendation {
    pub matches: Vec<MatchResult>,
    pub ranking: Vec<MarketRanking>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ctx() -> BatchContext {
        BatchContext::new(Some("01310-100".to_string()), Utc.with_ymd_and_hms(2025, 9, 12, 12, 0, 0).unwrap())
    }

    #[test]
    fn raw_row_is_stamped_with_batch_context() {
        let obs = RawPriceRow::new("Leite 1L", "Mercado A", Decimal::new(499, 2))
            .into_observation(Origin::Web, &ctx());
        assert_eq!(obs.origin, Origin::Web);
        assert_eq!(obs.area.as_deref(), Some("01310-100"));
        assert_eq!(obs.observed_at, ctx().observed_at);
        assert_eq!(obs.unit, "un");
    }

    #[test]
    fn negative_price_fails_validation() {
        let obs = RawPriceRow::new("Leite 1L", "Mercado A", Decimal::new(-1, 2))
            .into_observation(Origin::Web, &ctx());
        assert!(matches!(obs.validate(), Err(AppError::InvalidObservation(_))));
    }

    #[test]
    fn zero_price_is_valid() {
        let obs = RawPriceRow::new("Brinde", "Mercado A", Decimal::ZERO).into_observation(Origin::Chat, &ctx());
        assert!(obs.validate().is_ok());
    }

    #[test]
    fn missing_brand_keys_equal_empty_brand() {
        let a = RawPriceRow::new("Leite", "A", Decimal::ONE).into_observation(Origin::Chat, &ctx());
        let mut b = a.clone();
        b.price = Decimal::TWO;
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn origin_round_trips_through_text() {
        assert_eq!("chat".parse::<Origin>().unwrap(), Origin::Chat);
        assert_eq!(Origin::Web.to_string(), "web");
        assert!("whatsapp".parse::<Origin>().is_err());
    }
}
