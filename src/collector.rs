use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::fetcher::ScrapeAdapter;
use crate::ingest::ChatParser;
use crate::recommender::Recommender;
use crate::state::PriceStore;
use crate::types::{BatchContext, Origin, PriceObservation, Recommendation, WishlistEntry};

/// One (adapter, query) pair that failed during web collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub adapter: String,
    pub query: String,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct CollectReport {
    pub rows: Vec<PriceObservation>,
    pub failures: Vec<SourceFailure>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PersistStats {
    pub saved: usize,
    pub duplicates: usize,
    pub invalid: usize,
}

/// Ties the sources, the store and the recommender together.
/// Area and timestamp always arrive through a [`BatchContext`].
pub struct Collector {
    adapters: Vec<Arc<dyn ScrapeAdapter>>,
    parser: ChatParser,
    store: Arc<dyn PriceStore>,
    recommender: Recommender,
}

impl Collector {
    pub fn new(adapters: Vec<Arc<dyn ScrapeAdapter>>, parser: ChatParser, store: Arc<dyn PriceStore>) -> Self {
        Self { adapters, parser, store, recommender: Recommender::default() }
    }

    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }

    /// Run every adapter for every query. A failing pair is logged and
    /// reported; it never stops the rest of the batch.
    pub async fn fetch_from_web(&self, queries: &[String], ctx: &BatchContext) -> CollectReport {
        let mut report = CollectReport::default();

        for query in queries {
            for adapter in &self.adapters {
                match adapter.search(query, ctx.area.as_deref()).await {
                    Ok(rows) => report
                        .rows
                        .extend(rows.into_iter().map(|row| row.into_observation(Origin::Web, ctx))),
                    Err(e) => {
                        warn!(adapter = adapter.name(), query = %query, "source failed: {e}");
                        report.failures.push(SourceFailure {
                            adapter: adapter.name().to_string(),
                            query: query.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        info!(
            event = "WEB_COLLECT",
            queries = queries.len(),
            adapters = self.adapters.len(),
            rows = report.rows.len(),
            failures = report.failures.len(),
            "Collected {} rows ({} failed lookups)",
            report.rows.len(),
            report.failures.len(),
        );
        report
    }

    pub fn ingest_chat(&self, content: &str, ctx: &BatchContext) -> Vec<PriceObservation> {
        let rows = self.parser.ingest(content, ctx);
        info!(event = "CHAT_INGEST", offers = rows.len(), "Parsed {} chat offers", rows.len());
        rows
    }

    /// Append rows, counting only fresh inserts as saved.
    pub async fn persist(&self, rows: &[PriceObservation]) -> Result<PersistStats> {
        let mut stats = PersistStats::default();
        for row in rows {
            if let Err(e) = row.validate() {
                warn!("Skipping row: {e}");
                stats.invalid += 1;
                continue;
            }
            if self.store.append(row).await? {
                stats.saved += 1;
            } else {
                stats.duplicates += 1;
            }
        }

        info!(
            event = "PERSIST",
            saved = stats.saved,
            duplicates = stats.duplicates,
            invalid = stats.invalid,
            "Persisted {} of {} rows",
            stats.saved,
            rows.len(),
        );
        Ok(stats)
    }

    /// Recommend from the `limit` newest observations.
    pub async fn recommend(&self, wishlist: &[WishlistEntry], limit: usize) -> Result<Recommendation> {
        let snapshot = self.store.recent(limit).await?;
        Ok(self.recommender.recommend(&snapshot, wishlist))
    }

    pub async fn recent(&self, limit: usize) -> Result<Vec<PriceObservation>> {
        self.store.recent(limit).await
    }
}
