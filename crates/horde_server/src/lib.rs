//! # Horde Match Server
//!
//! Headless authoritative server for one cooperative wave-survival match.
//!
//! Runs the [`horde_core`] simulation on a wall-clock tick, takes
//! commands from observers over a reliable ordered queue, and fans
//! state changes out best-effort.
//!
//! - [`config`] - Server configuration (RON + CLI overrides)
//! - [`data_loader`] - Wave and archetype files with safe fallbacks
//! - [`broadcast`] - Replication fan-out
//! - [`runner`] - The match loop and its handle

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod broadcast;
pub mod config;
pub mod data_loader;
pub mod error;
pub mod runner;

pub use config::ServerConfig;
pub use error::{ConfigError, ServerError};
pub use runner::{MatchHandle, MatchServer, StopReason};
