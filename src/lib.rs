#![deny(missing_docs)]
//! Local-only web UI for driving gocryptfs: init, mount, info and unmount.

/// Command-line interface.
pub mod cli;
/// Config file discovery, parsing and validation.
pub mod config;
/// Error types and stable error codes.
pub mod error;
/// Tracing subscriber setup.
pub mod logging;
/// Native folder picker.
pub mod picker;
/// Loopback HTTP server.
pub mod server;
/// Shared types.
pub mod types;
/// gocryptfs orchestration.
pub mod vault;
