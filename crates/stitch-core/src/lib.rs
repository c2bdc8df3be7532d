//! Stitch Core - Data model, identifier classification, and configuration
//!
//! This crate provides the foundational types for tracestitch:
//!
//! - **Span / LogEntry / RootSpan**: the reconstructed call-tree data model
//! - **Identifier**: structural classification of operator input
//! - **Config**: endpoint/token configuration injected into the clients

pub mod config;
pub mod identifier;
pub mod span;

// Re-export commonly used types
pub use config::{ApmSettings, ConfigError, ConfigLoader, LogSearchSettings, StitchConfig};
pub use identifier::Identifier;
pub use span::{LogEntry, RootSpan, Span};

/// Crate version, reported by the delivery surfaces
pub const STITCH_VERSION: &str = env!("CARGO_PKG_VERSION");
