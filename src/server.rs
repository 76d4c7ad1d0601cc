use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    response::{
        Html, IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::WatchStream;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::agent::{LocalAgent, ToolSet};
use crate::compose::{self, Attachment, Composer, SubmitOutcome};
use crate::config::{AppConfig, ModelOption};
use crate::conversation::ConversationSnapshot;
use crate::error::Result;
use crate::render::{ConversationView, render_conversation};
use crate::session::{ChatSession, SessionStore};
use crate::ui;

/// How often idle sessions are swept.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let tools = ToolSet::with_defaults();
    for name in tools.names() {
        info!(name: "agent.tool.registered", tool = %name, "Tool registered");
    }

    let agent = LocalAgent::new(tools.clone()).with_delay(config.chat.stream_delay());
    let sessions = SessionStore::new(Arc::new(agent));

    let timeout = config.chat.session_timeout();
    let sweeper = sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = sweeper.cleanup_expired_with_timeout(timeout);
            if removed > 0 {
                info!(name: "session.expired", removed, "Expired idle sessions");
            }
        }
    });

    let state = AppState {
        sessions,
        tools,
        config: Arc::clone(&config),
    };

    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let static_dir = state.config.server.static_dir.clone();

    Router::new()
        // HTML pages
        .route("/", get(index_handler))
        // API routes
        .route("/api/models", get(api_get_models))
        .route("/api/tools", get(api_get_tools))
        .route("/api/sessions", get(api_list_sessions).post(api_create_session))
        .route(
            "/api/sessions/{id}",
            get(api_get_session).delete(api_delete_session),
        )
        .route("/api/sessions/{id}/view", get(api_get_view))
        .route("/api/sessions/{id}/view.json", get(api_get_view_json))
        .route("/api/sessions/{id}/stream", get(api_stream_view))
        .route("/api/sessions/{id}/messages", post(api_send_message))
        .route("/api/sessions/{id}/regenerate", post(api_regenerate))
        // Static assets
        .nest_service("/static", ServeDir::new(static_dir))
        // Attachments travel inline as data URLs
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB limit
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// HTML Page Handlers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct IndexQuery {
    #[serde(default)]
    session: Option<String>,
}

/// GET / - Chat page for `?session=`, or a fresh session.
async fn index_handler(
    State(state): State<AppState>,
    Query(query): Query<IndexQuery>,
) -> impl IntoResponse {
    let session = match query.session.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => state.sessions.get_or_create(id),
        None => state.sessions.create(),
    };

    let snapshot = session.snapshot();
    let draft = session.last_options().map_or_else(
        || Composer::new(state.config.chat.default_model_id()),
        |options| Composer::from_options(&options),
    );

    let conversation = ui::conversation_fragment(session.id(), &render_conversation(&snapshot));
    let composer = ui::composer(
        session.id(),
        &draft,
        &state.config.chat.models,
        snapshot.status(),
    );

    Html(ui::chat_page(session.id(), &conversation, &composer))
}

// ─────────────────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Model catalog response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelsResponse {
    models: Vec<ModelOption>,
    default_model: String,
}

/// GET /api/models - Selectable models.
async fn api_get_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: state.config.chat.models.clone(),
        default_model: state.config.chat.default_model_id().to_string(),
    })
}

/// GET /api/tools - Tools available to the agent.
async fn api_get_tools(State(state): State<AppState>) -> Json<Vec<serde_json::Value>> {
    Json(state.tools.definitions())
}

/// Session info returned by the API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionInfo {
    id: String,
    message_count: usize,
    status: String,
    created_at: DateTime<Utc>,
}

impl From<&ChatSession> for SessionInfo {
    fn from(session: &ChatSession) -> Self {
        let snapshot = session.snapshot();
        Self {
            id: session.id().to_string(),
            message_count: snapshot.messages().len(),
            status: snapshot.status().to_string(),
            created_at: session.created_at(),
        }
    }
}

/// GET /api/sessions - List sessions.
async fn api_list_sessions(State(state): State<AppState>) -> Json<Vec<SessionInfo>> {
    let sessions = state
        .sessions
        .list_ids()
        .iter()
        .filter_map(|id| state.sessions.get(id))
        .map(|session| SessionInfo::from(&session))
        .collect();
    Json(sessions)
}

/// POST /api/sessions - Create a session.
async fn api_create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionInfo>) {
    let session = state.sessions.create();
    (StatusCode::CREATED, Json(SessionInfo::from(&session)))
}

/// GET /api/sessions/{id} - Conversation snapshot.
async fn api_get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationSnapshot>> {
    Ok(Json(state.sessions.require(&id)?.snapshot()))
}

/// DELETE /api/sessions/{id}
async fn api_delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> StatusCode {
    match state.sessions.remove(&id) {
        Some(_) => {
            info!(name: "session.deleted", session_id = %id, "Session deleted");
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

/// GET /api/sessions/{id}/view - Rendered conversation fragment.
async fn api_get_view(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>> {
    let session = state.sessions.require(&id)?;
    let view = render_conversation(&session.snapshot());
    Ok(Html(ui::conversation_fragment(&id, &view)))
}

/// GET /api/sessions/{id}/view.json - View model.
async fn api_get_view_json(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationView>> {
    let session = state.sessions.require(&id)?;
    Ok(Json(render_conversation(&session.snapshot())))
}

/// GET /api/sessions/{id}/stream - One `view` event per snapshot.
async fn api_stream_view(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let session = state.sessions.require(&id)?;
    tracing::debug!(session_id = %id, "View stream opened");

    let stream = WatchStream::new(session.subscribe()).map(move |snapshot| {
        let fragment = ui::conversation_fragment(&id, &render_conversation(&snapshot));
        Ok::<_, Infallible>(Event::default().event("view").data(fragment))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Request body for sending a message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageRequest {
    #[serde(default)]
    text: String,
    #[serde(default)]
    files: Vec<Attachment>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    web_search: bool,
}

/// POST /api/sessions/{id}/messages - Submit a prompt.
///
/// 202 when the message was forwarded, 204 when there was nothing to send.
async fn api_send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> Result<Response> {
    let session = state.sessions.require(&id)?;
    let model = state.config.chat.resolve_model(req.model.as_deref())?;

    let mut composer = Composer::new(model);
    composer.set_input(req.text);
    composer.set_web_search(req.web_search);
    let outcome = composer
        .submit(&session, req.files, &state.config.chat.attachment_placeholder)
        .await?;

    Ok(match outcome {
        SubmitOutcome::Dispatched => (
            StatusCode::ACCEPTED,
            Json(SessionInfo::from(&session)),
        )
            .into_response(),
        SubmitOutcome::Rejected => StatusCode::NO_CONTENT.into_response(),
    })
}

/// POST /api/sessions/{id}/regenerate - Retry the last reply.
async fn api_regenerate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<SessionInfo>)> {
    let session = state.sessions.require(&id)?;
    compose::ChatBackend::regenerate(&session).await?;
    Ok((StatusCode::ACCEPTED, Json(SessionInfo::from(&session))))
}
