//! Hardware Abstraction Layer (HAL) for the HydraUSB3 dual-board link
//!
//! This crate describes the CH569 peripherals consumed by the link transport
//! as register maps and narrow collaborator traits, so the transport can be
//! developed and tested without physical boards.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (firmware crate)
//!         ↓
//! Link Transport (link crate: handshake, engines, sequencer)
//!         ↓
//! Platform HAL (this crate - register maps + collaborator traits)
//!         ↓
//! Hardware Layer (firmware::hal MMIO ports, or platform::mocks)
//! ```
//!
//! # Collaborators
//!
//! - [`gpio::FlexPin`] - Sync lines that switch between input and output
//! - [`timebase::Timebase`] - Free-running cycle counter
//! - [`hspi::HspiPort`] - Parallel high-speed interface registers
//! - [`serdes::SerdesPort`] - Serializer/deserializer registers
//! - [`dma::BusMemory`] - Byte access at DMA bus addresses
//!
//! # Features
//!
//! - `std`: Export [`mocks`] for downstream test suites
//! - `hardware`: Physical CH569 target
//! - `defmt`: Enable defmt derives

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors — callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

#[cfg(feature = "std")]
extern crate std;

pub mod config;
pub mod dma;
pub mod dma_safety;
pub mod gpio;
pub mod hspi;
pub mod serdes;
pub mod timebase;

#[cfg(any(test, feature = "std"))]
pub mod mocks;

// Re-export collaborator traits
pub use dma::{BusFault, BusMemory, LinkBufferPair, Selector};
pub use gpio::{FlexPin, PinMode, PinState, Port, PortPin};
pub use hspi::{DataWidth, HspiPort};
pub use serdes::{PllFreq, SerdesPort};
pub use timebase::{BusyDelay, Timebase};
