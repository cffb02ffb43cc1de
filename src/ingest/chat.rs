use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::config::{CURRENCY_MARKER, DEFAULT_CHAT_MARKET};
use crate::error::Result;
use crate::ingest::amount::{amount_regex, parse_amount};
use crate::types::{BatchContext, Origin, PriceObservation, RawPriceRow};

/// `DATE, TIME - SENDER: BODY`. Group 2 is the message body.
static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}/\d{1,2}/\d{2,4}),.*?:\s+(.*)$").expect("line pattern is valid")
});

static DEFAULT_AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| amount_regex(CURRENCY_MARKER).expect("default amount pattern is valid"));

/// Separator between the offer and the market name: `Arroz R$ 24,90 no Mercado Bom`.
const MARKET_SEPARATOR: &str = " no ";

/// Extracts price offers from an exported chat transcript.
///
/// One message per line. A line yields an offer when it has the export
/// shape and its body carries a currency amount. Anything else is skipped.
#[derive(Debug, Clone)]
pub struct ChatParser {
    marker: String,
    amount_re: Regex,
    default_market: String,
}

impl Default for ChatParser {
    fn default() -> Self {
        Self {
            marker: CURRENCY_MARKER.to_string(),
            amount_re: DEFAULT_AMOUNT_RE.clone(),
            default_market: DEFAULT_CHAT_MARKET.to_string(),
        }
    }
}

impl ChatParser {
    pub fn new(marker: &str, default_market: &str) -> Result<Self> {
        Ok(Self {
            marker: marker.to_string(),
            amount_re: amount_regex(marker)?,
            default_market: default_market.to_string(),
        })
    }

    /// Parse a single transcript line. `None` means the line is not an offer.
    pub fn parse_line(&self, line: &str) -> Option<RawPriceRow> {
        let caps = LINE_RE.captures(line)?;
        let body = caps.get(2)?.as_str();

        let amount = self.amount_re.find(body)?;
        let price = parse_amount(amount.as_str(), &self.marker)?;

        let market = match body.rsplit_once(MARKET_SEPARATOR) {
            Some((_, market)) => market.trim(),
            None => self.default_market.as_str(),
        };

        // The " no <market>" tail stays in the item name; matching relies on it.
        let item = self.amount_re.replace_all(body, "");
        let item = item.trim();
        if item.is_empty() {
            return None;
        }

        Some(RawPriceRow::new(item, market, price))
    }

    /// Parse a whole transcript, keeping input order.
    pub fn parse(&self, content: &str) -> Vec<RawPriceRow> {
        let mut lines = 0usize;
        let rows: Vec<RawPriceRow> = content
            .lines()
            .inspect(|_| lines += 1)
            .filter_map(|line| self.parse_line(line))
            .collect();
        debug!(lines, offers = rows.len(), "chat transcript parsed");
        rows
    }

    /// Parse a transcript and stamp each offer as a chat observation of this batch.
    pub fn ingest(&self, content: &str, ctx: &BatchContext) -> Vec<PriceObservation> {
        self.parse(content)
            .into_iter()
            .map(|row| row.into_observation(Origin::Chat, ctx))
            .collect()
    }
}
