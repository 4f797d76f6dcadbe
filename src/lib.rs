//! filedeck - Sandboxed file explorer backend
//!
//! Serves a single directory tree as a nested tree plus a flat row list
//! suited to virtualized rendering. Every mutation rescans the directory,
//! so the filesystem stays the only source of truth.

pub mod cli;
pub mod core;
pub mod events;
pub mod explorer;
pub mod sandbox;
pub mod terminal;
pub mod tree;
pub mod watch;
pub mod web;

pub use core::config::Config;
pub use core::error::{Error, Result};
pub use explorer::Explorer;
pub use sandbox::Sandbox;
