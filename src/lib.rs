//! # TandemDB
//!
//! A two-table record store on flat files:
//! - Fixed-size binary records addressed by byte offset
//! - Sorted in-memory index per table, flushed to disk
//! - Free-slot reuse and threshold-triggered compaction
//! - Per-course chains of certificates linked on disk
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Interactive Shell                       │
//! │                 (clap-parsed command lines)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Database                              │
//! │              (single Mutex over both tables)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Courses   │          │Certificates │──► chain / compaction
//!   │ (.fl .ind)  │          │(.fl .ind .jk)│
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod storage;
pub mod model;
pub mod chain;
pub mod compaction;
pub mod database;
pub mod shell;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, TandemError};
pub use config::Config;
pub use database::{CertificateUpdate, CourseUpdate, Database};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of TandemDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
