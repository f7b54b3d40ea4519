//! HTTP trigger layer for the Flight Agent Orchestrator
//!
//! The inbound command surface: builds a Request from the payload,
//! calls the orchestrator, returns the resulting text, and appends to
//! the request log. All I/O lives here; the core performs none.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use uuid::Uuid;

use crate::agent::Orchestrator;
use crate::audit::{RequestLog, RequestOutcome, RequestRecord};
use crate::models::Request;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AskRequest {
    pub text: String,
    pub requester_id: Option<String>,
    pub conversation_id: Option<String>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
    pub request_log: Arc<RequestLog>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Ask Endpoint
/// =============================

async fn ask(
    State(state): State<ApiState>,
    Json(req): Json<AskRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let text = req.text.trim();
    if text.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Please provide a query.".into())),
        );
    }

    let request = Request {
        query_text: text.to_string(),
        requester_id: req
            .requester_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| "anonymous".to_string()),
        conversation_id: req
            .conversation_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
    };

    info!(requester_id = %request.requester_id, "Received ask request");

    let outcome = state.orchestrator.handle(&request).await;

    let record_outcome = match &outcome {
        Ok(_) => RequestOutcome::Answered,
        Err(report) => RequestOutcome::Failed { kind: report.kind },
    };
    let audit_id = state
        .request_log
        .append(RequestRecord::for_request(&request, record_outcome))
        .await;

    // A FailureReport is still a deliverable answer: the message is the
    // text to post back, so it rides the success envelope.
    match outcome {
        Ok(explanation) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "answer": explanation.text,
                "follow_ups": explanation.follow_ups,
                "failure_kind": serde_json::Value::Null,
                "audit_id": audit_id,
            }))),
        ),
        Err(report) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "answer": report.message,
                "follow_ups": [],
                "failure_kind": report.kind,
                "audit_id": audit_id,
            }))),
        ),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(orchestrator: Arc<Orchestrator>, request_log: Arc<RequestLog>) -> Router {
    let state = ApiState {
        orchestrator,
        request_log,
    };

    Router::new()
        .route("/health", axum::routing::get(health))
        .route("/api/ask", post(ask))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    orchestrator: Arc<Orchestrator>,
    request_log: Arc<RequestLog>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(orchestrator, request_log);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
