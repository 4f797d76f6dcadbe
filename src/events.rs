//! Realtime event broadcasting
//!
//! A single broadcast channel fans server events out to every connected
//! realtime client. Delivery is at-most-once: a client that connects after an
//! event, or lags too far behind, never sees it.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::broadcast;

// =============================================================================
// EVENT TYPES
// =============================================================================

/// Events pushed from the server to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Something under this path changed on disk
    #[serde(rename = "file:refresh")]
    FileRefresh(String),
    /// Output for the mock terminal
    #[serde(rename = "terminal:data")]
    TerminalData(String),
}

impl ServerEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::FileRefresh(_) => "file:refresh",
            ServerEvent::TerminalData(_) => "terminal:data",
        }
    }

    pub fn payload(&self) -> &str {
        match self {
            ServerEvent::FileRefresh(path) => path,
            ServerEvent::TerminalData(text) => text,
        }
    }
}

/// Commands sent from clients to the server
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientCommand {
    /// Feed text to the mock terminal
    #[serde(rename = "terminal:write")]
    TerminalWrite(String),
    /// Raw keystrokes from the terminal widget; handled like `terminal:write`
    #[serde(rename = "input")]
    Input(String),
    /// Ask for a mock run of a file
    #[serde(rename = "file:run")]
    FileRun { path: String },
    /// Editor save
    #[serde(rename = "file:change")]
    FileChange { path: String, content: String },
}

// =============================================================================
// EVENT BROADCASTER
// =============================================================================

/// Broadcasts events to all subscribers
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<ServerEvent>,
}

impl EventBroadcaster {
    /// Create a new event broadcaster with the specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Broadcast an event to all subscribers
    /// Returns the number of receivers that received the event
    pub fn broadcast(&self, event: ServerEvent) -> usize {
        // send() returns Err if there are no receivers, which is fine
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    // ==========================================================================
    // CONVENIENCE METHODS
    // ==========================================================================

    /// Emit a file refresh event
    pub fn file_refresh(&self, path: &Path) -> usize {
        self.broadcast(ServerEvent::FileRefresh(path.to_string_lossy().to_string()))
    }

    /// Emit terminal output
    pub fn terminal_data(&self, text: impl Into<String>) -> usize {
        self.broadcast(ServerEvent::TerminalData(text.into()))
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}
