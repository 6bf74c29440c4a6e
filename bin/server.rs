// Budget Planner - Web Server
// REST API over the clarification pipeline (axum)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use clap::Parser;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use budget_planner::{
    AppConfig, BudgetPipeline, PipelineError, SessionRecord, SqliteSessionStore, SubmitOutcome,
    UnifiedBudgetModel,
};

#[derive(Parser, Debug)]
#[command(name = "budget-server")]
#[command(about = "REST API for budget clarification sessions")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "BUDGET_PLANNER_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured port
    #[arg(short, long)]
    port: Option<u16>,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    pipeline: Arc<BudgetPipeline<SqliteSessionStore>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    fn failed(data: T, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data,
            error: Some(error.into()),
        }
    }
}

/// Session view returned by the API
#[derive(Serialize)]
struct SessionResponse {
    session_id: String,
    stage: String,
    updated_at: String,
    model: UnifiedBudgetModel,
    missing: Vec<String>,
}

impl SessionResponse {
    fn new(record: SessionRecord, missing: Vec<String>) -> Self {
        Self {
            session_id: record.session_id,
            stage: record.stage.to_string(),
            updated_at: record.updated_at.to_rfc3339(),
            model: record.model,
            missing,
        }
    }
}

fn error_response(err: PipelineError) -> Response {
    let status = match &err {
        PipelineError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        PipelineError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
        PipelineError::Conflict(_) => StatusCode::CONFLICT,
        PipelineError::Provider { .. } | PipelineError::Storage(_) => {
            error!(error = %err, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ApiResponse::failed(Value::Null, err.to_string()))).into_response()
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /api/sessions - Start a session from a model document
async fn create_session(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let model = match UnifiedBudgetModel::from_value(body) {
        Ok(model) => model,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::failed(Value::Null, format!("{:#}", e))),
            )
                .into_response()
        }
    };

    let result = state.pipeline.create_session(model).map(|record| {
        let missing = state.pipeline.rules().missing(&record.model);
        SessionResponse::new(record, missing)
    });

    match result {
        Ok(session) => (StatusCode::CREATED, Json(ApiResponse::ok(session))).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/sessions/:id - Current snapshot + readiness gaps
async fn get_session(State(state): State<AppState>, Path(session_id): Path<String>) -> Response {
    let result = state.pipeline.session(&session_id).map(|record| {
        let missing = state.pipeline.rules().missing(&record.model);
        SessionResponse::new(record, missing)
    });

    match result {
        Ok(session) => (StatusCode::OK, Json(ApiResponse::ok(session))).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/sessions/:id/questions - Open clarifying questions
async fn get_questions(State(state): State<AppState>, Path(session_id): Path<String>) -> Response {
    match state.pipeline.questions(&session_id) {
        Ok(questions) => (StatusCode::OK, Json(ApiResponse::ok(questions))).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/sessions/:id/answers - Submit an answer batch
async fn submit_answers(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    match state.pipeline.submit_answers_json(&session_id, body) {
        Ok(outcome @ SubmitOutcome::Applied { .. }) => {
            (StatusCode::OK, Json(ApiResponse::ok(outcome))).into_response()
        }
        Ok(outcome @ SubmitOutcome::Rejected { .. }) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse::failed(outcome, "answer batch rejected")),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/sessions/:id/transitions - Audit trail, oldest first
async fn get_transitions(State(state): State<AppState>, Path(session_id): Path<String>) -> Response {
    match state.pipeline.transitions(&session_id) {
        Ok(events) => (StatusCode::OK, Json(ApiResponse::ok(events))).into_response(),
        Err(e) => error_response(e),
    }
}

fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session))
        .route("/sessions/:id/questions", get(get_questions))
        .route("/sessions/:id/answers", post(submit_answers))
        .route("/sessions/:id/transitions", get(get_transitions))
        .with_state(state)
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = SqliteSessionStore::open(&config.database_path)?;
    info!(path = ?config.database_path, "session database opened");

    let state = AppState {
        pipeline: Arc::new(BudgetPipeline::new(store, config.readiness).with_actor("api")),
    };

    let app = Router::new()
        .nest("/api", api_routes(state))
        .layer(CorsLayer::permissive());

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Server running on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
