//! Streamdrop - short-lived streaming and download links
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod ingest;
pub mod registry;
pub mod server;
pub mod storage;
pub mod streaming;
pub mod sweeper;
