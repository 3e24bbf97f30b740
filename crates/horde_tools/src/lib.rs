//! # Horde Development Tools
//!
//! Command-line helpers for content authors:
//! - Data validators for wave catalogs and archetype files
//! - Wave plan preview

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod error;
pub mod preview;
pub mod validate;

pub use error::{ToolError, ToolResult};
