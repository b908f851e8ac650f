//! Core library for the warden admission-control service.
//!
//! Ranks competing subjects by a bounded priority score and keeps a pool of
//! capacity-limited facilities reconciled against that ranking. The
//! [`admission`] module holds the engine and its HTTP surface; [`monitor`]
//! runs the independent capacity-ratio watchdog.

pub mod access;
pub mod admission;
pub mod config;
pub mod error;
pub mod history;
pub mod monitor;
pub mod telemetry;
