use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::collector::{Collector, SourceFailure};
use crate::config::Config;
use crate::error::AppError;
use crate::types::{BatchContext, PriceObservation, Recommendation, WishlistEntry};

#[derive(Clone)]
pub struct ApiState {
    pub collector: Arc<Collector>,
    pub cfg: Arc<Config>,
}

impl ApiState {
    /// Request area wins over the configured one.
    fn batch(&self, area: Option<String>) -> BatchContext {
        let area = area.filter(|a| !a.trim().is_empty()).or_else(|| self.cfg.area.clone());
        BatchContext::now(area)
    }

    fn default_wishlist(&self) -> Vec<WishlistEntry> {
        self.cfg.wishlist.iter().map(WishlistEntry::named).collect()
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/prices/recent", get(get_recent_prices))
        .route("/ingest/chat", post(ingest_chat))
        .route("/collect", post(collect))
        .route("/recommendations", post(recommendations))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request structs
// ---------------------------------------------------------------------------

#[derive(Deserialize, Default)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

#[derive(Deserialize, Default)]
pub struct IngestQuery {
    pub area: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct CollectRequest {
    #[serde(default)]
    pub queries: Vec<String>,
    pub area: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct RecommendRequest {
    #[serde(default)]
    pub wishlist: Vec<WishlistEntry>,
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize, Debug, PartialEq)]
pub struct IngestResponse {
    pub parsed: usize,
    pub saved: usize,
}

#[derive(Serialize, Debug)]
pub struct CollectResponse {
    pub fetched: usize,
    pub saved: usize,
    pub failures: Vec<SourceFailure>,
}

/// Optional JSON body: blank means defaults, anything else must parse.
fn json_or_default<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    Ok(serde_json::from_slice(body)?)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn get_recent_prices(
    State(state): State<ApiState>,
    Query(params): Query<RecentQuery>,
) -> Result<Json<Vec<PriceObservation>>, AppError> {
    let limit = params.limit.unwrap_or(state.cfg.recent_limit);
    Ok(Json(state.collector.recent(limit).await?))
}

async fn ingest_chat(
    State(state): State<ApiState>,
    Query(params): Query<IngestQuery>,
    body: String,
) -> Result<Json<IngestResponse>, AppError> {
    let ctx = state.batch(params.area);
    let rows = state.collector.ingest_chat(&body, &ctx);
    let stats = state.collector.persist(&rows).await?;
    Ok(Json(IngestResponse { parsed: rows.len(), saved: stats.saved }))
}

async fn collect(State(state): State<ApiState>, body: Bytes) -> Result<Json<CollectResponse>, AppError> {
    let req: CollectRequest = json_or_default(&body)?;
    let queries = if req.queries.is_empty() { state.cfg.wishlist.clone() } else { req.queries };

    let ctx = state.batch(req.area);
    let report = state.collector.fetch_from_web(&queries, &ctx).await;
    let stats = state.collector.persist(&report.rows).await?;

    Ok(Json(CollectResponse {
        fetched: report.rows.len(),
        saved: stats.saved,
        failures: report.failures,
    }))
}

async fn recommendations(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<Recommendation>, AppError> {
    let req: RecommendRequest = json_or_default(&body)?;
    let wishlist = if req.wishlist.is_empty() { state.default_wishlist() } else { req.wishlist };
    let limit = req.limit.unwrap_or(state.cfg.recent_limit);

    Ok(Json(state.collector.recommend(&wishlist, limit).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::ScrapeAdapter;
    use crate::ingest::ChatParser;
    use crate::state::MemoryPriceStore;
    use crate::types::RawPriceRow;
    use async_trait::async_trait;
    use axum::{http::StatusCode, response::IntoResponse};
    use rust_decimal::Decimal;
    use serde_json::json;

    struct EchoSource;

    #[async_trait]
    impl ScrapeAdapter for EchoSource {
        fn name(&self) -> &str {
            "Mercado Eco"
        }

        async fn search(&self, query: &str, _area: Option<&str>) -> crate::error::Result<Vec<RawPriceRow>> {
            Ok(vec![RawPriceRow::new(query, "Mercado Eco", Decimal::new(1000, 2))])
        }
    }

    fn state() -> ApiState {
        let cfg = Config {
            log_level: "info".to_string(),
            db_path: String::new(),
            api_port: 0,
            area: Some("01310-100".to_string()),
            wishlist: vec!["Arroz 5kg".to_string(), "Leite 1L".to_string()],
            recent_limit: 500,
            feeds: Vec::new(),
            feed_timeout_secs: 5,
            chat_currency: "R$".to_string(),
            chat_default_market: "Grupo WhatsApp".to_string(),
        };
        let collector = Collector::new(
            vec![Arc::new(EchoSource)],
            ChatParser::default(),
            Arc::new(MemoryPriceStore::new()),
        );
        ApiState { collector: Arc::new(collector), cfg: Arc::new(cfg) }
    }

    #[tokio::test]
    async fn ingest_reports_parsed_and_saved() {
        let state = state();
        let body = "12/09/2025, 09:14 - Ana: Arroz 5kg R$ 24,90 no Mercado Bom\nlixo\n".to_string();

        let Json(resp) = ingest_chat(State(state.clone()), Query(IngestQuery::default()), body)
            .await
            .unwrap();
        assert_eq!(resp, IngestResponse { parsed: 1, saved: 1 });

        let Json(recent) = get_recent_prices(State(state), Query(RecentQuery::default())).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].area.as_deref(), Some("01310-100"));
    }

    #[tokio::test]
    async fn collect_defaults_to_configured_wishlist() {
        let Json(resp) = collect(State(state()), Bytes::new()).await.unwrap();
        assert_eq!(resp.fetched, 2);
        assert_eq!(resp.saved, 2);
        assert!(resp.failures.is_empty());
    }

    #[tokio::test]
    async fn collect_uses_request_area() {
        let state = state();
        let body = json!({ "queries": ["Feijão"], "area": "30130" }).to_string();
        collect(State(state.clone()), Bytes::from(body)).await.unwrap();

        let Json(recent) = get_recent_prices(State(state), Query(RecentQuery { limit: Some(10) })).await.unwrap();
        assert_eq!(recent[0].area.as_deref(), Some("30130"));
    }

    #[tokio::test]
    async fn recommendations_use_stored_prices() {
        let state = state();
        collect(State(state.clone()), Bytes::new()).await.unwrap();
        let body = "12/09/2025, 09:16 - Carla: Leite 1L R$ 4,79 no Super Dia".to_string();
        ingest_chat(State(state.clone()), Query(IngestQuery::default()), body).await.unwrap();

        let Json(rec) = recommendations(State(state), Bytes::new()).await.unwrap();
        assert_eq!(rec.matches.len(), 2);
        assert_eq!(rec.matches[1].market, "Super Dia");
        assert_eq!(rec.ranking[0].market, "Super Dia");
        assert_eq!(rec.ranking[1].market, "Mercado Eco");
    }

    #[tokio::test]
    async fn recommendations_honour_requested_wishlist() {
        let state = state();
        collect(State(state.clone()), Bytes::new()).await.unwrap();

        let body = json!({ "wishlist": [{ "name": "leite" }] }).to_string();
        let Json(rec) = recommendations(State(state), Bytes::from(body)).await.unwrap();
        assert_eq!(rec.matches.len(), 1);
        assert_eq!(rec.matches[0].item, "Leite 1L");
    }

    #[tokio::test]
    async fn malformed_recommendation_body_is_bad_request() {
        let body = Bytes::from_static(br#"{"wishlist": "leite"}"#);
        let err = recommendations(State(state()), body).await.unwrap_err();
        assert!(matches!(err, AppError::Json(_)));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_collect_body_is_bad_request() {
        let err = collect(State(state()), Bytes::from_static(b"{not json")).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn blank_body_falls_back_to_defaults() {
        let Json(resp) = collect(State(state()), Bytes::from_static(b"  \n")).await.unwrap();
        assert_eq!(resp.fetched, 2);
    }
}
