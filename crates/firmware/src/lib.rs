//! HydraLink firmware
//!
//! Demo application for two HydraUSB3 boards stacked back-to-back: the boards
//! elect their roles over the sync lines, then the host streams a 32 KiB test
//! pattern over HSPI (or a payload schedule over SerDes) and the device
//! verifies and reports what arrived.
//!
//! # Architecture
//!
//! ```text
//! Application Layer (main.rs, app)
//!         ↓
//! Board bring-up, diagnostic log, test pattern (board, log, pattern)
//!         ↓
//! Link transport (link crate)
//!         ↓
//! CH569 MMIO HAL (hal module, `hardware` only) / platform::mocks on host
//! ```
//!
//! # Features
//!
//! - `hardware` - Build for the CH569W target (riscv-rt, MMIO ports)
//! - `serdes` - Run the SerDes demo instead of the HSPI demo (implies `hardware`)
//! - `std` - Host builds: mocks available, diagnostic log mirrored to tracing
//!
//! # Hardware Target
//!
//! ```bash
//! cargo build --release --target riscv32imac-unknown-none-elf --features hardware
//! ```

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
// Upgrade relevant warns to deny; keep pedantic as warn (too noisy for firmware)
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
// unsafe fn body is not implicitly unsafe block
// Logging discipline
#![warn(clippy::print_stdout)] // the UART DiagLog is the only text sink
#![warn(clippy::dbg_macro)] // dbg! should not be left in committed code
// Intentional allows for this codebase:
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // most errors are self-explanatory
// Pedantic lints too noisy for firmware application code:
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::similar_names)]

#[macro_use]
pub mod log;

pub mod app;
pub mod board;
pub mod pattern;

#[cfg(feature = "hardware")]
pub mod hal;

// Re-export key types
pub use app::{AppError, Shared};
pub use board::Board;
pub use log::DiagLog;
pub use pattern::Mismatch;
