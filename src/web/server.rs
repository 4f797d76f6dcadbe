//! Axum web server for the filedeck API

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::events::EventBroadcaster;
use crate::explorer::{Explorer, FileInfo, RawFile, Snapshot};
use crate::sandbox::Sandbox;
use crate::tree::{FlattenedRow, OpenPaths};
use crate::watch::FileWatcher;
use crate::web::blocking;
use crate::web::error::{ApiError, Context};
use crate::web::events::{api_events, api_post_event, EventsState};

type ApiResult<T> = std::result::Result<T, ApiError>;

// =============================================================================
// STATE
// =============================================================================

#[derive(Clone)]
pub struct AppState {
    pub explorer: Arc<Explorer>,
}

/// Knobs for [`router`] that come from configuration
#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Allow any origin
    pub cors: bool,
    /// SSE keep-alive interval
    pub keep_alive: Duration,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            cors: true,
            keep_alive: Duration::from_secs(15),
        }
    }
}

// =============================================================================
// API TYPES
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeRequest {
    pub open_paths: Option<OpenPaths>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    #[serde(default)]
    pub path: String,
    pub open_paths: Option<OpenPaths>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    #[serde(default, alias = "path")]
    pub file_path: String,
    pub content: Option<String>,
    #[serde(default, alias = "isDir")]
    pub is_directory: bool,
    pub open_paths: Option<OpenPaths>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    #[serde(default)]
    pub path: String,
    pub open_paths: Option<OpenPaths>,
}

#[derive(Debug, Deserialize)]
pub struct ContentQuery {
    pub path: Option<String>,
    pub raw: Option<String>,
}

impl ContentQuery {
    fn is_raw(&self) -> bool {
        self.raw.as_deref() == Some("true")
    }

    fn path(&self) -> ApiResult<String> {
        match self.path.as_deref() {
            Some(path) if !path.trim().is_empty() => Ok(path.to_string()),
            _ => Err(ApiError::new(
                Error::validation("Invalid path parameter"),
                "Failed to read file",
            )),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub success: bool,
    pub toggled: bool,
    pub message: String,
    pub open_paths: OpenPaths,
    pub flattened_nodes: Vec<FlattenedRow>,
}

#[derive(Serialize)]
pub struct MutationResponse {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub snapshot: Snapshot,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentResponse {
    pub content: String,
    pub file_info: FileInfo,
}

/// Body of the top-level `/content` route
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyContentResponse {
    pub content: String,
    pub size: u64,
    pub modified_time: u64,
}

fn required(value: &str, message: &'static str, context: &'static str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::new(Error::validation(message), context));
    }
    Ok(())
}

// =============================================================================
// TREE HANDLERS
// =============================================================================

/// GET /files - Tree and rows under the default open state
async fn api_files(State(state): State<AppState>) -> ApiResult<Json<Snapshot>> {
    let snapshot = blocking(&state.explorer, |explorer| explorer.snapshot(None))
        .await
        .context("Failed to read directory")?;
    Ok(Json(snapshot))
}

/// POST /files/tree - Tree and rows under the client's open state
async fn api_files_tree(
    State(state): State<AppState>,
    payload: std::result::Result<Json<TreeRequest>, JsonRejection>,
) -> ApiResult<Json<Snapshot>> {
    let Json(req) = payload?;
    let snapshot = blocking(&state.explorer, move |explorer| {
        explorer.snapshot(req.open_paths.as_ref())
    })
    .await
    .context("Failed to read directory")?;
    Ok(Json(snapshot))
}

/// POST /files/toggle - Open or close one directory
async fn api_toggle(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ToggleRequest>, JsonRejection>,
) -> ApiResult<Json<ToggleResponse>> {
    let Json(req) = payload?;
    required(&req.path, "Node path is required", "Failed to toggle folder")?;

    let outcome = blocking(&state.explorer, move |explorer| {
        explorer.toggle(&req.path, req.open_paths.as_ref())
    })
    .await
    .context("Failed to toggle folder")?;

    Ok(Json(ToggleResponse {
        success: true,
        toggled: outcome.toggled,
        message: outcome.message,
        open_paths: outcome.open_paths,
        flattened_nodes: outcome.snapshot.flattened_nodes,
    }))
}

// =============================================================================
// MUTATION HANDLERS
// =============================================================================

/// POST /files/create - New file (with content) or directory
async fn api_create(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateRequest>, JsonRejection>,
) -> ApiResult<Json<MutationResponse>> {
    let Json(req) = payload?;
    required(
        &req.file_path,
        "File path is required",
        "Failed to create file/directory",
    )?;

    let outcome = blocking(&state.explorer, move |explorer| {
        explorer.create(
            &req.file_path,
            req.content.as_deref().unwrap_or_default(),
            req.is_directory,
            req.open_paths.as_ref(),
        )
    })
    .await
    .context("Failed to create file/directory")?;

    Ok(Json(MutationResponse {
        success: true,
        message: outcome.message,
        snapshot: outcome.snapshot,
    }))
}

/// DELETE /files/delete - Remove a file or directory tree
async fn api_delete(
    State(state): State<AppState>,
    payload: std::result::Result<Json<DeleteRequest>, JsonRejection>,
) -> ApiResult<Json<MutationResponse>> {
    let Json(req) = payload?;
    required(&req.path, "File path is required", "Failed to delete file/directory")?;

    let outcome = blocking(&state.explorer, move |explorer| {
        explorer.delete(&req.path, req.open_paths.as_ref())
    })
    .await
    .context("Failed to delete file/directory")?;

    Ok(Json(MutationResponse {
        success: true,
        message: outcome.message,
        snapshot: outcome.snapshot,
    }))
}

// =============================================================================
// CONTENT HANDLERS
// =============================================================================

/// GET /files/content?path=&raw= - Text with metadata, or raw bytes
async fn api_file_content(
    State(state): State<AppState>,
    Query(query): Query<ContentQuery>,
) -> ApiResult<Response> {
    let path = query.path()?;
    if query.is_raw() {
        return raw_response(&state, path).await;
    }
    Ok(Json(read_text(&state, path).await?).into_response())
}

/// GET /content?path=&raw= - Text with size and mtime, or raw bytes
async fn api_content(
    State(state): State<AppState>,
    Query(query): Query<ContentQuery>,
) -> ApiResult<Response> {
    let path = query.path()?;
    if query.is_raw() {
        return raw_response(&state, path).await;
    }

    let ContentResponse { content, file_info } = read_text(&state, path).await?;
    Ok(Json(LegacyContentResponse {
        content,
        size: file_info.size,
        modified_time: file_info.modified_millis(),
    })
    .into_response())
}

/// GET /collaborate/*path - Read a file addressed by absolute path
async fn api_collaborate(
    State(state): State<AppState>,
    Path(file_path): Path<String>,
) -> ApiResult<Json<ContentResponse>> {
    let absolute = format!("/{}", file_path.trim_start_matches('/'));
    debug!(path = %absolute, "Collaboration read");
    Ok(Json(read_text(&state, absolute).await?))
}

/// GET /health - Liveness probe
async fn api_health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "root": state.explorer.sandbox().root(),
    }))
}

async fn read_text(state: &AppState, path: String) -> ApiResult<ContentResponse> {
    let file = blocking(&state.explorer, move |explorer| explorer.read_content(&path))
        .await
        .context("Failed to read file")?;
    Ok(ContentResponse {
        content: file.content,
        file_info: file.info,
    })
}

/// Stream the file body instead of buffering it
async fn raw_response(state: &AppState, path: String) -> ApiResult<Response> {
    let RawFile { path, file, size } =
        blocking(&state.explorer, move |explorer| explorer.open_raw(&path))
            .await
            .context("Failed to read file")?;

    let stream = ReaderStream::new(tokio::fs::File::from_std(file));
    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static(content_type_for(&path)),
            ),
            (header::CONTENT_LENGTH, HeaderValue::from(size)),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

/// Content type inferred from the file extension
pub fn content_type_for(path: &FsPath) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "application/javascript; charset=utf-8",
        "json" => "application/json",
        "txt" | "log" => "text/plain; charset=utf-8",
        "md" => "text/markdown; charset=utf-8",
        "xml" => "application/xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "pdf" => "application/pdf",
        "wasm" => "application/wasm",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// Build the full application router
pub fn router(explorer: Arc<Explorer>, events: EventBroadcaster, options: RouterOptions) -> Router {
    let state = AppState {
        explorer: Arc::clone(&explorer),
    };
    let events_state = EventsState::new(explorer, events, options.keep_alive);

    let files_routes = Router::new()
        .route("/", get(api_files))
        .route("/tree", post(api_files_tree))
        .route("/toggle", post(api_toggle))
        .route("/content", get(api_file_content))
        .route("/create", post(api_create))
        .route("/delete", delete(api_delete))
        .with_state(state.clone());

    let events_routes = Router::new()
        .route("/", get(api_events).post(api_post_event))
        .with_state(events_state);

    let app = Router::new()
        .route("/content", get(api_content))
        .route("/collaborate/*path", get(api_collaborate))
        .route("/health", get(api_health))
        .with_state(state)
        .nest("/files", files_routes)
        .nest("/events", events_routes);

    if options.cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

// =============================================================================
// SERVER
// =============================================================================

pub async fn run(root: PathBuf, config: Config, open_browser: bool) -> Result<()> {
    let sandbox = Sandbox::create(&root)?;
    let explorer = Arc::new(Explorer::new(sandbox));
    let events = EventBroadcaster::new(config.events.capacity);

    // Held for the lifetime of the server
    let _watcher = if config.watch.enabled {
        match FileWatcher::new(
            explorer.sandbox().root().to_path_buf(),
            events.clone(),
            Duration::from_secs(config.watch.poll_interval_secs.max(1)),
        ) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!("File watcher unavailable: {}", e);
                None
            }
        }
    } else {
        None
    };

    let app = router(
        Arc::clone(&explorer),
        events,
        RouterOptions {
            cors: config.server.cors,
            keep_alive: Duration::from_secs(config.events.keep_alive_secs.max(1)),
        },
    );

    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    let addr = listener.local_addr()?;

    eprintln!();
    eprintln!(
        "\x1b[36m>\x1b[0m filedeck running at \x1b[36mhttp://{}\x1b[0m",
        addr
    );
    eprintln!(
        "\x1b[90m  Sandbox: {}\x1b[0m",
        explorer.sandbox().root().display()
    );
    eprintln!("\x1b[90m  Press Ctrl+C to stop\x1b[0m");

    if open_browser {
        let url = format!("http://{}", addr);
        let _ = open::that(&url);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
