//! Shared utilities for chart-insight
//!
//! This crate provides the pieces every other crate in the workspace needs:
//! tracing setup, a redacting wrapper for credentials, and small helpers for
//! reading configuration from the process environment.

pub mod env;
pub mod logging;
pub mod secret;

pub use env::{EnvError, env_parse, env_string, require_env};
pub use logging::{LogFormat, init_tracing};
pub use secret::Secret;
