//! HTTP surface over the [Detector].
//!
//! API endpoints:
//! - POST /check-duplicate                       - duplicates of a new report
//! - POST /search/semantic                       - free-text search
//! - POST /similar-bugs-for-classify-priority    - closed-bug precedents
//! - POST /add-embedding                         - store a reported bug
//! - POST /add-priority-embedding                - store a closed bug
//! - GET  /health                                - per-application entry counts

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bugsim_dedup::{BugText, DedupError, Detector, SearchResult};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Build the router with every route bound to `detector`.
pub fn router(detector: Arc<Detector>) -> Router {
    Router::new()
        .route("/check-duplicate", post(check_duplicate))
        .route("/search/semantic", post(semantic_search))
        .route(
            "/similar-bugs-for-classify-priority",
            post(classify_priority),
        )
        .route("/add-embedding", post(add_embedding))
        .route("/add-priority-embedding", post(add_priority_embedding))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(detector)
}

/// Serve the API on `addr` until the process exits.
pub async fn serve(addr: &str, detector: Arc<Detector>) -> Result<()> {
    let addr = parse_addr(addr)?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, router(detector)).await?;
    Ok(())
}

/// Parse address string to SocketAddr.
fn parse_addr(addr: &str) -> Result<SocketAddr> {
    let addr = if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    };
    Ok(addr.parse()?)
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct BugRequest {
    #[serde(default)]
    application: String,
    #[serde(default, rename = "bugId")]
    bug_id: String,
    #[serde(flatten)]
    bug: BugText,
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    #[serde(default)]
    application: String,
    #[serde(default)]
    query: String,
}

#[derive(Debug, Deserialize)]
struct PriorityParams {
    min_score: Option<f32>,
}

#[derive(Debug, Serialize)]
struct SimilarBugs {
    similar_bugs: Vec<SearchResult>,
}

#[derive(Debug, Serialize)]
struct Message {
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    general: BTreeMap<String, usize>,
    priority: BTreeMap<String, usize>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [DedupError] onto an HTTP status and `{"error": ..}` body.
#[derive(Debug)]
struct ApiError(DedupError);

impl From<DedupError> for ApiError {
    fn from(err: DedupError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            DedupError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            DedupError::EmbeddingUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.0.to_string())
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()),
        };
        if status != StatusCode::BAD_REQUEST {
            error!(error = %self.0, "request failed");
        }
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn check_duplicate(
    State(detector): State<Arc<Detector>>,
    Json(req): Json<BugRequest>,
) -> Result<Json<SimilarBugs>, ApiError> {
    let similar_bugs = detector.check_duplicate(&req.application, &req.bug).await?;
    Ok(Json(SimilarBugs { similar_bugs }))
}

async fn semantic_search(
    State(detector): State<Arc<Detector>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<SimilarBugs>, ApiError> {
    let similar_bugs = detector
        .semantic_search(&req.application, &req.query)
        .await?;
    Ok(Json(SimilarBugs { similar_bugs }))
}

async fn classify_priority(
    State(detector): State<Arc<Detector>>,
    Query(params): Query<PriorityParams>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<SimilarBugs>, ApiError> {
    let similar_bugs = detector
        .classify_priority(&req.application, &req.query, params.min_score)
        .await?;
    Ok(Json(SimilarBugs { similar_bugs }))
}

async fn add_embedding(
    State(detector): State<Arc<Detector>>,
    Json(req): Json<BugRequest>,
) -> Result<Json<Message>, ApiError> {
    detector
        .add_embedding(&req.application, &req.bug_id, &req.bug)
        .await?;
    Ok(Json(Message {
        message: "Embedding added",
    }))
}

async fn add_priority_embedding(
    State(detector): State<Arc<Detector>>,
    Json(req): Json<BugRequest>,
) -> Result<Json<Message>, ApiError> {
    detector
        .add_priority_embedding(&req.application, &req.bug_id, &req.bug)
        .await?;
    Ok(Json(Message {
        message: "Priority embedding added",
    }))
}

async fn health(State(detector): State<Arc<Detector>>) -> Json<Health> {
    Json(Health {
        status: "ok",
        general: detector.general().stats(),
        priority: detector.priority().stats(),
    })
}
