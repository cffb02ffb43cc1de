use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::Result;
use crate::types::{ObservationKey, PriceObservation};

// ---------------------------------------------------------------------------
// PriceStore contract
// ---------------------------------------------------------------------------

/// Append-only table of price observations.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Insert `obs`. Returns `false`, not an error, when an observation with the
    /// same (item, brand, market, timestamp, origin) is already stored.
    async fn append(&self, obs: &PriceObservation) -> Result<bool>;

    /// The `limit` most recent observations, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<PriceObservation>>;
}

// ---------------------------------------------------------------------------
// MemoryPriceStore
// ---------------------------------------------------------------------------

/// Process-local store used when no database path is configured.
///
/// Rows are keyed by their uniqueness key; `seq` keeps insertion order so
/// equal timestamps still come back newest-inserted first.
#[derive(Default)]
pub struct MemoryPriceStore {
    rows: DashMap<ObservationKey, (u64, PriceObservation)>,
    seq: AtomicU64,
}

impl MemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl PriceStore for MemoryPriceStore {
    async fn append(&self, obs: &PriceObservation) -> Result<bool> {
        match self.rows.entry(obs.key()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                let seq = self.seq.fetch_add(1, Ordering::Relaxed);
                slot.insert((seq, obs.clone()));
                Ok(true)
            }
        }
    }

    async fn recent(&self, limit: usize) -> Result<Vec<PriceObservation>> {
        let mut rows: Vec<(u64, PriceObservation)> =
            self.rows.iter().map(|entry| entry.value().clone()).collect();
        rows.sort_by(|a, b| {
            b.1.observed_at
                .cmp(&a.1.observed_at)
                .then_with(|| b.0.cmp(&a.0))
        });
        Ok(rows.into_iter().take(limit).map(|(_, obs)| obs).collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BatchContext, Origin, RawPriceRow};
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    fn obs_at(item: &str, minute: u32) -> PriceObservation {
        let ctx = BatchContext::new(None, Utc.with_ymd_and_hms(2025, 9, 12, 12, minute, 0).unwrap());
        RawPriceRow::new(item, "Mercado A", Decimal::new(499, 2)).into_observation(Origin::Chat, &ctx)
    }

    #[tokio::test]
    async fn duplicate_append_is_dropped() {
        let store = MemoryPriceStore::new();
        let obs = obs_at("Leite 1L", 0);

        assert!(store.append(&obs).await.unwrap());
        assert!(!store.append(&obs).await.unwrap());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn price_is_not_part_of_the_key() {
        let store = MemoryPriceStore::new();
        let first = obs_at("Leite 1L", 0);
        let mut repriced = first.clone();
        repriced.price = Decimal::new(399, 2);

        assert!(store.append(&first).await.unwrap());
        assert!(!store.append(&repriced).await.unwrap());
    }

    #[tokio::test]
    async fn same_item_at_another_time_is_kept() {
        let store = MemoryPriceStore::new();
        let first = obs_at("Leite 1L", 0);
        let mut later = first.clone();
        later.observed_at += Duration::minutes(5);

        assert!(store.append(&first).await.unwrap());
        assert!(store.append(&later).await.unwrap());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn recent_is_newest_first_and_limited() {
        let store = MemoryPriceStore::new();
        for (item, minute) in [("a", 1), ("b", 3), ("c", 2)] {
            store.append(&obs_at(item, minute)).await.unwrap();
        }

        let recent = store.recent(2).await.unwrap();
        let items: Vec<&str> = recent.iter().map(|o| o.item.as_str()).collect();
        assert_eq!(items, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn recent_on_empty_store() {
        let store = MemoryPriceStore::new();
        assert!(store.is_empty());
        assert!(store.recent(10).await.unwrap().is_empty());
    }
}
