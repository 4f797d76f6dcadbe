//! CLI command definitions and handlers

pub mod serve;
pub mod tree;

use clap::{Parser, Subcommand};

const LONG_ABOUT: &str = r#"
Sandboxed file explorer backend.

Serves one directory tree over HTTP as a nested tree plus a flat,
virtualization-friendly row list, with create/delete/read operations and a
realtime event stream for file changes and a mock terminal.

QUICK START:
    filedeck serve                 Serve ./user on 0.0.0.0:9000
    filedeck tree                  Print the tree as the API would see it

CONFIGURATION:
    Config file:  $FILEDECK_HOME/config.toml (or the platform data dir)
    Sandbox root: --root, then $FILEDECK_ROOT, then sandbox.root, then ./user
    Logging:      FILEDECK_LOG=debug
"#;

/// Sandboxed file explorer backend
#[derive(Parser, Debug)]
#[command(name = "filedeck")]
#[command(author, version)]
#[command(about = "Sandboxed file explorer backend")]
#[command(long_about = LONG_ABOUT)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API and realtime channel
    #[command(visible_alias = "s")]
    Serve(serve::ServeArgs),

    /// Print the sandbox tree
    #[command(visible_alias = "t")]
    Tree(tree::TreeArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve_flags() {
        let cli = Cli::parse_from(["filedeck", "serve", "--port", "8080", "--no-watch"]);
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.port, Some(8080));
                assert!(args.no_watch);
                assert!(args.root.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
