//! Realtime channel
//!
//! Server to client traffic is a Server-Sent Events stream at `GET /events`.
//! Clients talk back by posting tagged commands to `POST /events`.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::events::{ClientCommand, EventBroadcaster, ServerEvent};
use crate::explorer::Explorer;
use crate::terminal::{MockTerminal, GREETING};
use crate::web::blocking;
use crate::web::error::{ApiError, Context};

// =============================================================================
// TYPES
// =============================================================================

/// State for the realtime routes
#[derive(Clone)]
pub struct EventsState {
    pub events: EventBroadcaster,
    pub terminal: MockTerminal,
    pub explorer: Arc<Explorer>,
    pub keep_alive: Duration,
}

impl EventsState {
    pub fn new(explorer: Arc<Explorer>, events: EventBroadcaster, keep_alive: Duration) -> Self {
        Self {
            terminal: MockTerminal::new(events.clone()),
            events,
            explorer,
            keep_alive,
        }
    }
}

fn sse_event(event: &ServerEvent) -> Event {
    // JSON keeps embedded \r\n inside a single data line
    let data = serde_json::to_string(event.payload()).unwrap_or_default();
    Event::default().event(event.name()).data(data)
}

// =============================================================================
// SSE ENDPOINT
// =============================================================================

/// SSE endpoint handler - `GET /events`
pub async fn api_events(
    State(state): State<EventsState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let client_id = Uuid::new_v4();
    info!(%client_id, "Realtime client connected");

    let rx = state.events.subscribe();

    // Lagged receivers skip what they missed
    let event_stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => Some(Ok::<_, Infallible>(sse_event(&event))),
        Err(_) => None,
    });

    let greeting = sse_event(&ServerEvent::TerminalData(GREETING.to_string()));
    let initial = futures::stream::once(async move { Ok(greeting) });

    Sse::new(initial.chain(event_stream))
        .keep_alive(KeepAlive::new().interval(state.keep_alive).text("ping"))
}

// =============================================================================
// COMMAND ENDPOINT
// =============================================================================

/// Client command handler - `POST /events`
pub async fn api_post_event(
    State(state): State<EventsState>,
    payload: Result<Json<ClientCommand>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(command) = payload?;

    match command {
        ClientCommand::TerminalWrite(data) | ClientCommand::Input(data) => {
            state.terminal.write(&data);
        }
        ClientCommand::FileRun { path } => {
            let target = state
                .explorer
                .resolve_contained(&path)
                .context("Failed to run file")?;
            state.terminal.run(&target).await;
        }
        ClientCommand::FileChange { path, content } => {
            let written = blocking(&state.explorer, move |explorer| {
                explorer.write_content(&path, &content)
            })
            .await
            .context("Failed to save file")?;
            debug!(path = %written.display(), "Saved from editor");
            state.events.file_refresh(&written);
        }
    }

    Ok(Json(json!({ "success": true })))
}

