use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::recommender::matcher::{ItemMatcher, SubstringMatcher};
use crate::types::{MarketRanking, MatchResult, PriceObservation, Recommendation, WishlistEntry};

/// Best price per wishlist item plus a per-market cost ranking.
///
/// Stateless: every call recomputes from the observations it is given.
#[derive(Debug, Clone, Default)]
pub struct Recommender<M = SubstringMatcher> {
    matcher: M,
}

impl<M: ItemMatcher> Recommender<M> {
    pub fn new(matcher: M) -> Self {
        Self { matcher }
    }

    pub fn recommend(&self, observations: &[PriceObservation], wishlist: &[WishlistEntry]) -> Recommendation {
        if observations.is_empty() {
            return Recommendation::default();
        }
        let matches = self.best_prices(observations, wishlist);
        let ranking = rank_markets(&matches);
        Recommendation { matches, ranking }
    }

    /// One result per wishlist entry that has at least one matching observation,
    /// in wishlist order.
    pub fn best_prices(&self, observations: &[PriceObservation], wishlist: &[WishlistEntry]) -> Vec<MatchResult> {
        wishlist
            .iter()
            .filter_map(|wanted| {
                let best = self.cheapest(observations, &wanted.name)?;
                Some(MatchResult {
                    wanted: wanted.name.clone(),
                    item: best.item.clone(),
                    market: best.market.clone(),
                    price: best.price,
                    origin: best.origin,
                    url: best.url.clone(),
                })
            })
            .collect()
    }

    /// First observation with the lowest price among those matching `wanted`.
    fn cheapest<'a>(&self, observations: &'a [PriceObservation], wanted: &str) -> Option<&'a PriceObservation> {
        observations
            .iter()
            .filter(|obs| self.matcher.matches(wanted, &obs.item))
            .fold(None, |best: Option<&PriceObservation>, obs| match best {
                Some(b) if b.price <= obs.price => Some(b),
                _ => Some(obs),
            })
    }
}

/// Sum matched prices per market, cheapest total first. Equal totals order by market name.
pub fn rank_markets(matches: &[MatchResult]) -> Vec<MarketRanking> {
    let mut totals: BTreeMap<&str, (Decimal, usize)> = BTreeMap::new();
    for m in matches {
        let entry = totals.entry(m.market.as_str()).or_insert((Decimal::ZERO, 0));
        entry.0 += m.price;
        entry.1 += 1;
    }

    let mut ranking: Vec<MarketRanking> = totals
        .into_iter()
        .map(|(market, (total, items))| MarketRanking { market: market.to_string(), total, items })
        .collect();
    ranking.sort_by(|a, b| a.total.cmp(&b.total));
    ranking
}
