//! Filesystem watcher for the sandbox
//!
//! Changes under the root are pushed to realtime clients as `file:refresh`
//! events. Clients decide for themselves whether to refetch the tree.

use crate::core::error::Result;
use crate::events::EventBroadcaster;
use notify::{
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info};

/// Watches the sandbox root and broadcasts every change
pub struct FileWatcher {
    watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Start watching `root` recursively
    pub fn new(root: PathBuf, events: EventBroadcaster, poll_interval: Duration) -> Result<Self> {
        let watched = root.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| match res {
                Ok(event) => handle_notify_event(&event, &watched, &events),
                Err(e) => error!("Watch error: {}", e),
            },
            NotifyConfig::default().with_poll_interval(poll_interval),
        )?;

        watcher.watch(&root, RecursiveMode::Recursive)?;
        info!("Watching for changes: {:?}", root);

        Ok(Self { watcher, root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop watching
    pub fn stop(mut self) {
        let _ = self.watcher.unwatch(&self.root);
    }
}

fn handle_notify_event(event: &Event, root: &Path, events: &EventBroadcaster) {
    let Some(action) = action_for(&event.kind) else {
        return;
    };

    for path in &event.paths {
        if !path.starts_with(root) {
            continue;
        }

        debug!(path = %path.display(), action, "File event");
        events.file_refresh(path);
    }
}

/// Change kinds that clients care about; access and metadata-only noise is dropped
fn action_for(kind: &EventKind) -> Option<&'static str> {
    match kind {
        EventKind::Create(_) => Some("created"),
        EventKind::Modify(_) => Some("modified"),
        EventKind::Remove(_) => Some("deleted"),
        _ => None,
    }
}
