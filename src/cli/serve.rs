//! Serve command implementation
//!
//! Starts the HTTP API over the sandbox root.

use clap::Args;
use std::path::PathBuf;
use tracing::info;

use crate::core::config::Config;
use crate::core::error::Result;

/// Arguments for the serve command
#[derive(Args, Debug)]
#[command(after_help = "EXAMPLES:
    filedeck serve                      Serve ./user on port 9000
    filedeck serve --root ~/sandbox     Serve a specific directory
    filedeck serve --port 8080 --open   Custom port, open the browser
    filedeck serve --no-watch           Skip filesystem change events")]
pub struct ServeArgs {
    /// Sandbox root (created if missing)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Interface to bind (default: 0.0.0.0)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to serve on (default: 9000)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Auto-open browser
    #[arg(long)]
    pub open: bool,

    /// Do not watch the sandbox for changes
    #[arg(long)]
    pub no_watch: bool,
}

/// Run the serve command
pub async fn run(args: ServeArgs) -> Result<()> {
    let mut config = Config::load()?;
    let root = config.sandbox_root(args.root.as_deref())?;

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.no_watch {
        config.watch.enabled = false;
    }

    info!(root = %root.display(), "Starting server");
    crate::web::server::run(root, config, args.open).await
}
