//! filedeck web API
//!
//! JSON routes for the explorer plus the realtime event channel.

pub mod error;
pub mod events;
pub mod server;

use std::sync::Arc;

use crate::core::error::{Error, Result};
use crate::explorer::Explorer;

/// Run a filesystem operation on the blocking pool
pub(crate) async fn blocking<T, F>(explorer: &Arc<Explorer>, op: F) -> Result<T>
where
    F: FnOnce(&Explorer) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let explorer = Arc::clone(explorer);
    tokio::task::spawn_blocking(move || op(&explorer))
        .await
        .map_err(|e| Error::TaskFailed {
            message: e.to_string(),
        })?
}
