//! Row type of the `prices` table (see migrations/0001_prices.sql).
use std::str::FromStr;

use chrono::DateTime;
use rust_decimal::Decimal;

use crate::error::AppError;
use crate::types::{Origin, PriceObservation};

#[derive(Debug, sqlx::FromRow)]
pub struct PriceRow {
    pub id: i64,
    pub item: String,
    pub brand: Option<String>,
    pub market: String,
    pub price: String,
    pub unit: String,
    pub url: Option<String>,
    pub origin: String,
    pub area: Option<String>,
    pub observed_at: i64,
}

impl TryFrom<PriceRow> for PriceObservation {
    type Error = AppError;

    fn try_from(row: PriceRow) -> Result<Self, Self::Error> {
        let price = Decimal::from_str(&row.price).map_err(|e| {
            AppError::InvalidObservation(format!("row {}: bad price '{}': {e}", row.id, row.price))
        })?;
        let observed_at = DateTime::from_timestamp_micros(row.observed_at).ok_or_else(|| {
            AppError::InvalidObservation(format!("row {}: bad timestamp {}", row.id, row.observed_at))
        })?;
        Ok(PriceObservation {
            item: row.item,
            brand: row.brand,
            market: row.market,
            price,
            unit: row.unit,
            url: row.url,
            origin: Origin::from_str(&row.origin)?,
            area: row.area,
            observed_at,
        })
    }
}
