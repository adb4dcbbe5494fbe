//! Sensor Ledger
//!
//! Append-only, access-controlled ledger for environmental sensor telemetry.
//!
//! # Architecture
//!
//! - **Single Authority**: one fixed identity registers and revokes sensors
//! - **Anti-Replay**: per-sensor nonce watermark, strictly increasing
//! - **Single Writer**: one actor task serializes every mutation
//! - **Append-Only**: readings are addressed by a dense, stable index
//!
//! # Invariants
//!
//! - Sensor records are never deleted; revocation is terminal
//! - A reading is never visible without its watermark update
//! - Ledger index order is acceptance order
//! - Notifications are emitted once per successful mutation, never on failure

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod access;
pub mod actor;
pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod readings;
pub mod registry;
pub mod state;
pub mod storage;
pub mod types;
pub mod validation;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::SensorLedger;
pub use storage::Storage;
pub use types::{Address, LedgerEvent, Reading, ReadingSubmission, SensorRecord};
