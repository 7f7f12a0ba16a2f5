//! airsniff library — monitor-mode WiFi capture core.
//!
//! Captures 802.11 frames from one radio in promiscuous mode, pulls out the
//! sender address and frame class, optionally hunts for a single target
//! address, and reports every processed frame as NDJSON. Live channel
//! switching is supported while capturing.
//!
//! All logic lives here with no platform dependencies, testable on any host
//! with `cargo test`. The ESP-IDF firmware in `firmware-std/` is a thin
//! consumer that implements the [`radio::Radio`], [`reporter::Indicator`] and
//! [`reporter::ReportSink`] traits over the real hardware.
//!
//! Layout, leaves first: `classifier` → `filter` → `reporter` → `radio` →
//! `session`, with `protocol`/`comm` carrying the operator NDJSON surface.

#![cfg_attr(not(test), no_std)]

pub mod board;
pub mod classifier;
pub mod comm;
pub mod error;
pub mod filter;
pub mod protocol;
pub mod radio;
pub mod reporter;
pub mod session;

#[cfg(test)]
mod mock;

pub use classifier::{Address, Frame, FrameType};
pub use error::{Error, HwOp};
pub use session::{CaptureSession, CaptureState, Disposition};
