use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use super::models::{ConvertRequest, ServerError, TtsQuery};
use super::state::ServerState;
use crate::phonetics::Readings;
use crate::settings::Settings;
use crate::words::{WordDraft, WordEntry, validate_required};

pub async fn run_server(settings: &Settings, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind server address: {}", addr))?;
    serve(listener, settings).await
}

/// Serves the word API on an already bound listener until the process ends.
pub async fn serve(listener: TcpListener, settings: &Settings) -> Result<()> {
    let state = Arc::new(ServerState::from_settings(settings)?);
    info!(
        "serving {} with {} user readings on {}",
        state.records.path().display(),
        state.dictionary.len(),
        listener.local_addr()?
    );
    let app = router(state);
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/words", get(list_words).post(create_word))
        .route("/api/words/:id", put(replace_word).delete(delete_word))
        .route("/api/tts", get(tts))
        .route("/api/convert", post(convert))
        .with_state(state)
        .layer(axum::middleware::from_fn(cors_middleware))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Result<Response<Body>, StatusCode> {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,PUT,DELETE,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type"),
    );
}

async fn list_words(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<Vec<WordEntry>>, ServerError> {
    Ok(Json(state.records.list().await?))
}

async fn create_word(
    State(state): State<Arc<ServerState>>,
    Json(draft): Json<WordDraft>,
) -> Result<Json<WordEntry>, ServerError> {
    validate_required(&draft.chinese, &draft.example, &draft.category, None)?;
    let entry = state.records.create(draft).await?;
    info!("created word {}", entry.id);
    Ok(Json(entry))
}

async fn replace_word(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    Json(entry): Json<WordEntry>,
) -> Result<Json<WordEntry>, ServerError> {
    validate_required(&entry.chinese, &entry.example, &entry.category, None)?;
    match state.records.replace(&id, entry).await? {
        Some(updated) => {
            info!("updated word {}", id);
            Ok(Json(updated))
        }
        None => Err(ServerError::not_found("Word not found")),
    }
}

async fn delete_word(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    if state.records.remove(&id).await? {
        info!("deleted word {}", id);
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn tts(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<TtsQuery>,
) -> Result<Response<Body>, ServerError> {
    let text = query.text.unwrap_or_default();
    let text = text.trim();
    if text.is_empty() {
        return Err(ServerError::bad_request("Text parameter is required"));
    }
    state.tts.relay(text).await
}

async fn convert(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<ConvertRequest>,
) -> Result<Json<Readings>, ServerError> {
    let text = payload.text.unwrap_or_default();
    let text = text.trim();
    if text.is_empty() {
        return Err(ServerError::bad_request("Text is required"));
    }
    Ok(Json(state.dictionary.convert(text)))
}
