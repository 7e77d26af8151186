//! nids Common - Shared types for the inspection core
//!
//! This crate provides the pieces both inspection subsystems lean on:
//! - Normalized packet views handed over by the decoder
//! - Per-engine performance counters
//! - Error handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod metrics;
pub mod packet;

pub use error::*;
pub use metrics::{AtomicCounter, CounterSnapshot, MetricsRegistry, OptionCounters};
pub use packet::{Packet, TcpHeader};
