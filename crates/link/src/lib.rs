//! Inter-board link transport for two HydraUSB3 boards wired back-to-back
//!
//! Elects board roles over two GPIO lines, then streams fixed-size packet
//! bursts over the HSPI parallel bus through a double-buffered DMA engine.
//! Errors reported by the hardware (CRC, sequence number, FIFO overflow) are
//! handled in interrupt context by the [`LinkSequencer`]; the main loop only
//! sees the published [`LinkStatus`].
//!
//! # Layers
//!
//! ```text
//! main loop ── HspiLink::send / configure_receive / wait_done
//!                  │
//!                  ├── TxEngine / RxEngine   (register programming)
//!                  │
//! HSPI IRQ  ── HspiLink::on_interrupt ── LinkSequencer ── LinkState (pure)
//!                  │
//!                  └── StatusCell (single-writer atomic, read by main loop)
//! ```
//!
//! [`SerdesLink`] carries the same protocol shape over the SerDes block.
//!
//! # Features
//!
//! - `defmt`: log state transitions through defmt (hardware)
//! - `tracing`: log state transitions through tracing (host)
//! - `std`: `std::error::Error` for [`LinkError`]

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
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)]
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

#[cfg(feature = "std")]
extern crate std;

#[macro_use]
mod fmt;

pub mod burst;
pub mod config;
mod dual_dma;
pub mod error;
pub mod handshake;
pub mod rx;
pub mod sequencer;
pub mod serdes;
pub mod session;
pub mod state;
pub mod status;
pub mod tx;

pub use burst::{BurstProgress, PacketBurst};
pub use config::{HspiConfig, OverflowPolicy, SerdesConfig};
pub use error::{LinkError, LinkErrors};
pub use handshake::{synchronize, BoardRole, HandshakeOutcome};
pub use rx::RxEngine;
pub use sequencer::{Direction, IrqReport, LinkSequencer};
pub use serdes::{CustomNumber, RxSlot, SerdesIrq, SerdesLink, SerdesRole};
pub use session::HspiLink;
pub use state::{LinkState, PacketVerdict, Step};
pub use status::{LinkStatus, StatusCell};
pub use tx::TxEngine;
