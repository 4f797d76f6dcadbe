//! Core types shared by every layer: configuration and errors

pub mod config;
pub mod error;
