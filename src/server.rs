use crate::services::AppServices;
use axum::{
    extract::{ws::WebSocketUpgrade, Path as AxumPath, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use parla_cloud::{voice_for, Synthesizer, Translator, DEFAULT_LANGUAGE};
use parla_core::CloudError;
use parla_session::SessionSupervisor;
use serde::Deserialize;
use serde_json::json;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    services: Arc<AppServices>,
    next_session_id: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(services: Arc<AppServices>) -> Self {
        Self {
            services,
            next_session_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/static/{*path}", get(static_file))
        .route("/api/status", get(status))
        .route("/api/translate", post(translate))
        .route("/api/new-phrase", get(new_phrase))
        .route("/api/synthesize", post(synthesize))
        .route("/listen", get(listen))
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

async fn index(State(state): State<AppState>) -> Response {
    let path = Path::new(&state.services.config.server.static_dir).join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::warn!("failed to read {}: {e}", path.display());
            (StatusCode::NOT_FOUND, "index.html not found").into_response()
        }
    }
}

/// Joins a request path onto the static root, refusing anything that could
/// leave it.
fn resolve_static(root: &Path, requested: &str) -> Option<PathBuf> {
    let relative = Path::new(requested);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(relative))
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("mp3") => "audio/mpeg",
        _ => "application/octet-stream",
    }
}

async fn static_file(
    AxumPath(path): AxumPath<String>,
    State(state): State<AppState>,
) -> Response {
    let root = Path::new(&state.services.config.server.static_dir);
    let Some(file) = resolve_static(root, &path) else {
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    };
    match tokio::fs::read(&file).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type(&file))], bytes).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let services = &state.services;
    Json(json!({
        "status": "ok",
        "engine": services.config.recognizer.engine,
        "speech_client": services.recognizer.is_some(),
        "translate_client": services.translator.is_some(),
        "tts_client": services.synthesizer.is_some(),
    }))
}

#[derive(Debug, Deserialize)]
struct TranslateBody {
    #[serde(default)]
    text: String,
    #[serde(default)]
    source_language: Option<String>,
}

async fn translate(State(state): State<AppState>, Json(body): Json<TranslateBody>) -> Response {
    if body.text.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No text provided");
    }
    let Some(translator) = &state.services.translator else {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            CloudError::NotConfigured("Translation".to_string()).to_string(),
        );
    };

    let requested = body.source_language.unwrap_or_else(|| "auto".to_string());
    let source = (requested != "auto").then_some(requested.as_str());
    let target = state.services.target_language();

    match translator.translate(&body.text, source, target).await {
        Ok(translation) => {
            let source_language = translation
                .detected_source_language
                .unwrap_or_else(|| requested.clone());
            tracing::info!(source_language = %source_language, target_language = target, "translated text");
            Json(json!({
                "original": body.text,
                "translated": translation.translated_text,
                "source_language": source_language,
            }))
            .into_response()
        }
        Err(e) => {
            tracing::error!("translation failed: {e}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Translation failed: {e}"),
            )
        }
    }
}

#[derive(Debug, Deserialize)]
struct PhraseParams {
    language: Option<String>,
}

async fn new_phrase(
    State(state): State<AppState>,
    Query(params): Query<PhraseParams>,
) -> Json<serde_json::Value> {
    let language = params.language.as_deref().unwrap_or(DEFAULT_LANGUAGE);
    let phrase = state.services.phrases.random_phrase(language);
    tracing::debug!(language, "new phrase");
    Json(json!({ "phrase": phrase }))
}

fn default_synthesis_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

#[derive(Debug, Deserialize)]
struct SynthesizeBody {
    text: String,
    #[serde(default = "default_synthesis_language")]
    language: String,
}

async fn synthesize(State(state): State<AppState>, Json(body): Json<SynthesizeBody>) -> Response {
    let Some(synthesizer) = &state.services.synthesizer else {
        tracing::error!("speech synthesis requested but not configured");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            CloudError::NotConfigured("TTS".to_string()).to_string(),
        );
    };

    let voice = voice_for(&body.language);
    match synthesizer.synthesize(&body.text, &body.language, voice).await {
        Ok(audio) => ([(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response(),
        Err(e) => {
            tracing::error!("speech synthesis failed: {e}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to synthesize speech: {e}"),
            )
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListenParams {
    language_code: Option<String>,
}

async fn listen(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<ListenParams>,
) -> Response {
    let session_id = state.next_session_id.fetch_add(1, Ordering::Relaxed);
    let services = Arc::clone(&state.services);
    ws.on_upgrade(move |socket| async move {
        let session = services
            .config
            .session
            .session_config(params.language_code.as_deref());
        tracing::info!(session_id, language_code = %session.language_code, "client connected");

        let streaming = services.config.recognizer.streaming_config(&session);
        let supervisor = SessionSupervisor::new(session_id, services.recognizer.clone(), streaming)
            .with_settings(&services.config.session);
        let (source, sink) = crate::ws::split(socket);
        supervisor.run(source, sink).await;
    })
}
