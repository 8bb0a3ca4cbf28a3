//! Board and link configuration constants
//!
//! Central values shared by the link transport and the firmware. Everything
//! that depends on the board clock or the RAMX layout references these
//! constants rather than hardcoding values.

/// Firmware name printed in the start-up banner.
pub const APP_NAME: &str = "HydraLink";

/// Firmware version (synchronized with Cargo.toml)
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ── Clock ────────────────────────────────────────────────────────────────────

/// System clock after PLL setup (120 MHz).
pub const FREQ_SYS_HZ: u32 = 120_000_000;

/// System clock in cycles per microsecond.
pub const CYCLES_PER_US: u32 = FREQ_SYS_HZ / 1_000_000;

// ── Board synchronization ────────────────────────────────────────────────────

/// Handshake poll budget in cycles (about 700 ms at 120 MHz with loop overhead).
pub const SYNC_TIMEOUT_CYCLES: u64 = 12_000_000;

// ── HSPI ─────────────────────────────────────────────────────────────────────

/// Bytes per HSPI packet.
pub const HSPI_PACKET_LEN: u16 = 512;

/// Packets per HSPI burst (64 × 512 = 32 KiB).
pub const HSPI_BURST_PACKETS: u16 = 64;

/// HSPI user-defined field 0 (exchanged in the packet header).
pub const HSPI_UDF0: u32 = 0x03AB_CDEF;

/// HSPI user-defined field 1.
pub const HSPI_UDF1: u32 = 0x0345_6789;

/// Delay the transmitter leaves the receiver to arm before the first packet.
pub const HSPI_TX_ARM_DELAY_US: u32 = 100;

// ── SerDes ───────────────────────────────────────────────────────────────────

/// Poll budget for the SerDes PLL_READY bit, in status reads.
pub const PLL_READY_BUDGET: u32 = 1_000_000;

/// Poll budget for the SerDes TX_READY / TX_INT bits, in status reads.
pub const TX_READY_BUDGET: u32 = 1_000_000;

// ── Memory ───────────────────────────────────────────────────────────────────

/// Start of the 32 KiB link window in RAMX.
pub const LINK_WINDOW_BASE: u32 = crate::dma_safety::RAMX_BASE;

/// Link window size in bytes (one full HSPI burst).
pub const LINK_WINDOW_BYTES: u32 = HSPI_PACKET_LEN as u32 * HSPI_BURST_PACKETS as u32;

// ── Diagnostics ──────────────────────────────────────────────────────────────

/// Capacity of the captured diagnostic log, in bytes.
pub const DEBUG_LOG_CAPACITY: usize = 4096;

/// UART1 baud rate for the diagnostic log.
pub const UART1_BAUD: u32 = 5_000_000;
