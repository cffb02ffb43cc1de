use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{info, warn};

use crate::db::models::PriceRow;
use crate::error::Result;
use crate::state::PriceStore;
use crate::types::PriceObservation;

/// SQLite-backed price history. Duplicates are rejected by the
/// `uq_price_snapshot` index and surface as `append() == false`.
#[derive(Clone)]
pub struct SqlitePriceStore {
    pool: sqlx::SqlitePool,
}

impl SqlitePriceStore {
    /// Open (creating if needed) the database file and run migrations.
    pub async fn connect(db_path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        let store = Self::from_pool(pool).await?;
        info!("Database ready at {db_path}");
        Ok(store)
    }

    /// Single-connection in-memory database; each `sqlite::memory:` connection is its own database.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: sqlx::SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl PriceStore for SqlitePriceStore {
    async fn append(&self, obs: &PriceObservation) -> Result<bool> {
        let price = obs.price.to_string();
        let origin = obs.origin.to_string();
        let observed_at = obs.observed_at.timestamp_micros();

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO prices (item, brand, market, price, unit, url, origin, area, observed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&obs.item)
        .bind(&obs.brand)
        .bind(&obs.market)
        .bind(price)
        .bind(&obs.unit)
        .bind(&obs.url)
        .bind(origin)
        .bind(&obs.area)
        .bind(observed_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<PriceObservation>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, PriceRow>(
            r#"
            SELECT id, item, brand, market, price, unit, url, origin, area, observed_at
            FROM prices
            ORDER BY observed_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        // A corrupt row must not hide the rest of the history.
        Ok(rows
            .into_iter()
            .filter_map(|row| match PriceObservation::try_from(row) {
                Ok(obs) => Some(obs),
                Err(e) => {
                    warn!("Skipping unreadable price row: {e}");
                    None
                }
            })
            .collect())
    }
}
