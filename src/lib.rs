// ABOUTME: Library root for rollwright - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod classify;
pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod handlers;
pub mod notify;
pub mod output;
pub mod retry;
pub mod telemetry;
pub mod types;
