use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use leadscout_core::domain::lead::{GenerationRequest, GenerationResult, Tier};
use leadscout_core::export;
use leadscout_core::llm::openai::OpenAiClient;
use leadscout_core::orchestrator::{GenerationError, Orchestrator};
use leadscout_core::session::SessionStore;
use leadscout_core::time::doha;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = leadscout_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let sessions = Arc::new(SessionStore::new());
    let orchestrator = match OpenAiClient::from_settings(&settings) {
        Ok(client) => Some(Arc::new(Orchestrator::new(
            Arc::new(client),
            sessions.clone(),
        ))),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "completion client unavailable; starting API in degraded mode");
            None
        }
    };

    let state = AppState {
        sessions,
        orchestrator,
    };

    let app = Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/api/generate", post(generate))
        .route("/api/sessions/:id", get(get_session).delete(clear_session))
        .route("/api/sessions/:id/export.md", get(export_markdown))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn index() -> Html<&'static str> {
    Html(include_str!("../assets/index.html"))
}

#[derive(Clone)]
struct AppState {
    sessions: Arc<SessionStore>,
    orchestrator: Option<Arc<Orchestrator>>,
}

#[derive(Debug, Deserialize)]
struct GenerateBody {
    session_id: Option<Uuid>,
    description: String,
    #[serde(default)]
    tiers: Vec<Tier>,
    #[serde(default)]
    extra_specs: Option<String>,
    #[serde(default = "default_align_qnv2030")]
    align_qnv2030: bool,
}

fn default_align_qnv2030() -> bool {
    true
}

#[derive(Debug, Serialize)]
struct GenerateResponse {
    session_id: Uuid,
    cached: bool,
    result: GenerationResult,
}

#[derive(Debug, Serialize)]
struct SessionSnapshot {
    session_id: Uuid,
    request_count: u64,
    result: Option<GenerationResult>,
}

#[derive(Debug, Serialize)]
struct ApiError {
    kind: &'static str,
    message: String,
}

async fn generate(
    State(state): State<AppState>,
    Json(body): Json<GenerateBody>,
) -> Result<Json<GenerateResponse>, (StatusCode, Json<ApiError>)> {
    let Some(orchestrator) = &state.orchestrator else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError {
                kind: "config",
                message: "OPENAI_API_KEY is not configured; set it in .env and restart."
                    .to_string(),
            }),
        ));
    };

    let session_id = body.session_id.unwrap_or_else(Uuid::new_v4);
    let request = GenerationRequest {
        description: body.description,
        tiers: body.tiers.into_iter().collect(),
        extra_specs: body.extra_specs,
        align_qnv2030: body.align_qnv2030,
    };

    match orchestrator.generate(session_id, request).await {
        Ok(outcome) => Ok(Json(GenerateResponse {
            session_id,
            cached: outcome.cached,
            result: outcome.result,
        })),
        Err(err) => Err(error_response(session_id, err)),
    }
}

fn error_response(session_id: Uuid, err: GenerationError) -> (StatusCode, Json<ApiError>) {
    let status = match &err {
        GenerationError::Validation(_) => StatusCode::BAD_REQUEST,
        GenerationError::Network(_) => StatusCode::BAD_GATEWAY,
        GenerationError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };

    match &err {
        GenerationError::Validation(msg) => {
            tracing::warn!(%session_id, %msg, "rejected invalid generation request");
        }
        GenerationError::Network(inner) | GenerationError::Parse(inner) => {
            sentry_anyhow::capture_anyhow(inner);
            tracing::error!(%session_id, error = %err, "generation failed");
        }
    }

    (
        status,
        Json(ApiError {
            kind: err.kind(),
            message: err.user_message(),
        }),
    )
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, StatusCode> {
    let Some(session) = state.sessions.get(id) else {
        return Err(StatusCode::NOT_FOUND);
    };
    let session = session.lock().await;

    Ok(Json(SessionSnapshot {
        session_id: id,
        request_count: session.request_count(),
        result: session.result().cloned(),
    }))
}

async fn clear_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> StatusCode {
    if state.sessions.clear(id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn export_markdown(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, StatusCode> {
    let Some(session) = state.sessions.get(id) else {
        return Err(StatusCode::NOT_FOUND);
    };
    let result = {
        let session = session.lock().await;
        session.result().cloned()
    };
    let Some(result) = result else {
        return Err(StatusCode::NOT_FOUND);
    };

    let offset = doha::display_offset().map_err(|e| {
        tracing::error!(error = %e, "invalid display offset configuration");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let markdown = export::render_markdown(&result, offset);
    let filename = export::export_filename(result.generated_at.with_timezone(&offset));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        markdown,
    )
        .into_response())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &leadscout_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
