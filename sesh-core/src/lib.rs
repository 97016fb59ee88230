//! # sesh-core
//!
//! Core library for sesh - a streaming-history statistics engine.
//!
//! This library provides:
//! - Loading and validation of streaming-history export files
//! - Label interning and per-scope aggregation of play time and counts
//! - Derived statistics, listener personality and smart playlists
//! - A serializable report model for the summary assembler
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Export files │──►│    ingest    │──►│  aggregate   │──►│  analytics   │
//! │ (dir/*.json) │   │  PlayEvents  │   │   snapshot   │   │  statistics  │
//! └──────────────┘   └──────────────┘   └──────────────┘   └──────┬───────┘
//!                                                                 ▼
//!                                                          ┌──────────────┐
//!                                                          │    Report    │
//!                                                          └──────────────┘
//! ```
//!
//! A [`ReportContext`] drives one run end to end.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sesh_core::{Config, ReportContext};
//! use std::path::Path;
//!
//! let config = Config::load().expect("failed to load config");
//! let mut context = ReportContext::new(config);
//! let outcome = context
//!     .generate(Path::new("my_spotify_data"), |_, _, _| {})
//!     .expect("failed to read export directory");
//! if let Some(report) = outcome.report() {
//!     println!("{} plays", report.stats.tracks.total_plays);
//! }
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use context::ReportContext;
pub use error::{Error, Result};
pub use report::{Report, ReportOutcome};
pub use types::*;

// Public modules
pub mod aggregate;
pub mod analytics;
pub mod config;
pub mod context;
pub mod error;
pub mod format;
pub mod ingest;
pub mod intern;
pub mod logging;
pub mod report;
pub mod types;
