//! Complaint Desk HTTP server.
//!
//! Exposes the complaint service and the sessioned chat controller as a
//! JSON HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/complaints` | File a complaint |
//! | `GET`  | `/complaints/{complaint_id}` | Retrieve a complaint by id |
//! | `POST` | `/chat` | One conversation turn in a (possibly new) session |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "validation_error", "field": "phone_number", "message": "..." } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `validation_error`
//! (422), `internal` (500). Internal causes are logged server-side and
//! never leak into a response body.
//!
//! # Degraded Mode
//!
//! The knowledge pipeline is built at startup. If it cannot be built
//! (missing document, missing `GROQ_API_KEY`, disabled embeddings), the
//! failure is logged and chat questions get a degraded reply; complaint
//! endpoints are unaffected.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser-based
//! form/chat clients can call the API directly.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::controller::{Answerer, ChatSession, Controller, Turn};
use crate::models::{Complaint, CreateAck, NewComplaint};
use crate::rag::KnowledgePipeline;
use crate::service::{ComplaintService, ServiceError};
use crate::store::SqliteComplaintStore;
use crate::{db, migrate};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    service: Arc<ComplaintService>,
    chat: Arc<ChatHub>,
}

/// Holds the optional knowledge pipeline and all live chat sessions.
///
/// Each session sits behind its own mutex: turns within a session are
/// serialized, sessions proceed independently.
pub struct ChatHub {
    pipeline: Option<Arc<KnowledgePipeline>>,
    sessions: RwLock<HashMap<String, Arc<Mutex<ChatSession>>>>,
}

impl ChatHub {
    async fn session(&self, id: Option<String>) -> (String, Arc<Mutex<ChatSession>>) {
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(ChatSession::new())))
            .clone();
        (id, session)
    }
}

/// Connect the store, run migrations, and build the knowledge pipeline.
///
/// A pipeline build failure is logged and leaves chat degraded; it never
/// prevents the complaint endpoints from starting.
pub async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let pool = db::connect(&config.db.path).await?;
    migrate::run_migrations(&pool).await?;
    let service = Arc::new(ComplaintService::new(Arc::new(SqliteComplaintStore::new(
        pool,
    ))));

    let pipeline = match KnowledgePipeline::build(config).await {
        Ok(p) => Some(Arc::new(p)),
        Err(e) => {
            warn!(error = %format!("{:#}", e), "knowledge pipeline unavailable, chat will degrade");
            None
        }
    };

    Ok(AppState {
        service,
        chat: Arc::new(ChatHub {
            pipeline,
            sessions: RwLock::new(HashMap::new()),
        }),
    })
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/complaints", post(handle_create_complaint))
        .route("/complaints/{complaint_id}", get(handle_get_complaint))
        .route("/chat", post(handle_chat))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on the configured bind address. Runs until the
/// process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let state = build_state(config).await?;
    let app = router(state);

    println!("Complaint API listening on http://{}", config.server.bind);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"validation_error"`).
    code: String,
    /// Human-readable error message.
    message: String,
    /// Offending field for validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
                field: self.field,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
        field: None,
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
        field: None,
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation { field, message } => AppError {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                code: "validation_error".to_string(),
                message,
                field: Some(field.to_string()),
            },
            ServiceError::NotFound(id) => not_found(format!("complaint not found: {}", id)),
            ServiceError::Internal(cause) => {
                error!(error = %format!("{:#}", cause), "internal error");
                AppError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "internal".to_string(),
                    message: "internal server error".to_string(),
                    field: None,
                }
            }
        }
    }
}

// ============ POST /complaints ============

async fn handle_create_complaint(
    State(state): State<AppState>,
    Json(new): Json<NewComplaint>,
) -> Result<Json<CreateAck>, AppError> {
    let ack = state.service.create(&new).await?;
    info!(complaint_id = %ack.complaint_id, "complaint created");
    Ok(Json(ack))
}

// ============ GET /complaints/{complaint_id} ============

async fn handle_get_complaint(
    State(state): State<AppState>,
    Path(complaint_id): Path<String>,
) -> Result<Json<Complaint>, AppError> {
    let complaint = state.service.get(&complaint_id).await?;
    Ok(Json(complaint))
}

// ============ POST /chat ============

#[derive(Deserialize)]
struct ChatTurnRequest {
    /// Omit to start a new session; unknown ids also start fresh.
    session_id: Option<String>,
    message: String,
}

#[derive(Serialize)]
struct ChatTurnResponse {
    session_id: String,
    reply: String,
    /// Full display history of the session, oldest first.
    history: Vec<Turn>,
}

async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatTurnRequest>,
) -> Result<Json<ChatTurnResponse>, AppError> {
    if req.message.trim().is_empty() {
        return Err(bad_request("message must not be empty"));
    }

    let (session_id, session) = state.chat.session(req.session_id).await;
    let mut session = session.lock().await;

    let controller = Controller {
        gateway: state.service.as_ref(),
        answerer: state
            .chat
            .pipeline
            .as_deref()
            .map(|p| p as &dyn Answerer),
    };
    let reply = controller.handle(&mut session, &req.message).await;

    Ok(Json(ChatTurnResponse {
        session_id,
        reply,
        history: session.history.clone(),
    }))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
