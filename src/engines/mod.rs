//! Speech synthesis engines.
//!
//! This module contains implementations of [`EngineFacade`](crate::EngineFacade).
//!
//! # Available Engines
//!
//! - `scripted` - deterministic in-memory engine, always available
//!
//! Enable engines via Cargo features:
//! - `espeak` - espeak-ng, driven through its command-line program

#[cfg(feature = "espeak")]
pub mod espeak;
pub mod scripted;
