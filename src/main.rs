mod api;
mod collector;
mod config;
mod db;
mod error;
mod fetcher;
mod ingest;
mod recommender;
mod state;
mod types;

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::collector::Collector;
use crate::config::Config;
use crate::db::SqlitePriceStore;
use crate::error::Result;
use crate::fetcher::{JsonFeedAdapter, ScrapeAdapter};
use crate::ingest::ChatParser;
use crate::state::{MemoryPriceStore, PriceStore};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Price store ---
    let store: Arc<dyn PriceStore> = if cfg.db_path.is_empty() {
        warn!("DB_PATH is empty; prices are kept in memory and lost on exit");
        Arc::new(MemoryPriceStore::new())
    } else {
        Arc::new(SqlitePriceStore::connect(&cfg.db_path).await?)
    };

    // --- Web sources ---
    let mut adapters: Vec<Arc<dyn ScrapeAdapter>> = Vec::with_capacity(cfg.feeds.len());
    for feed in &cfg.feeds {
        adapters.push(Arc::new(JsonFeedAdapter::new(feed, cfg.feed_timeout_secs)?));
    }
    if adapters.is_empty() {
        warn!("PRICE_FEEDS not set; /collect will find nothing. Example: PRICE_FEEDS=\"Mercado A=https://a.example/busca\"");
    } else {
        info!(
            "Price feeds configured ({}): {}",
            adapters.len(),
            cfg.feeds.iter().map(|f| f.name.as_str()).collect::<Vec<_>>().join(", ")
        );
    }

    let parser = ChatParser::new(&cfg.chat_currency, &cfg.chat_default_market)?;
    let collector = Collector::new(adapters, parser, store);
    info!(
        area = cfg.area.as_deref().unwrap_or("-"),
        wishlist = cfg.wishlist.len(),
        adapters = collector.adapter_count(),
        "Collector ready",
    );

    // --- HTTP API ---
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let api_state = ApiState { collector: Arc::new(collector), cfg: Arc::new(cfg) };
    let app = router(api_state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
