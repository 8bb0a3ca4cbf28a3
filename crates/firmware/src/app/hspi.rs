//! HSPI demo: the host streams a 32 KiB test pattern, the device verifies it.
//!
//! Both boards use the same link window at the start of RAMX, split into an
//! interleaved buffer pair of 512-byte packets.

use core::fmt::Write;

use link::{HspiLink, LinkError, PacketBurst, StatusCell};
use platform::config::{HSPI_BURST_PACKETS, HSPI_PACKET_LEN, LINK_WINDOW_BASE, LINK_WINDOW_BYTES};
use platform::{BusMemory, HspiPort, LinkBufferPair, Timebase};

use super::{wait_link, with_session, AppError, Shared};
use crate::log::DiagLog;
use crate::pattern::{self, Mismatch};

/// Pattern words in one burst.
pub const PATTERN_WORDS: u32 = LINK_WINDOW_BYTES / 4;

/// Bytes dumped around a verify mismatch.
const MISMATCH_DUMP_BYTES: usize = 32;

/// Buffer pair over the link window.
pub const fn window_pair() -> LinkBufferPair {
    LinkBufferPair::interleaved(LINK_WINDOW_BASE, HSPI_PACKET_LEN)
}

/// Burst shape of the demo.
pub fn window_burst() -> Result<PacketBurst, LinkError> {
    PacketBurst::new(HSPI_PACKET_LEN, HSPI_BURST_PACKETS)
}

/// How one device receive step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxOutcome {
    /// Burst arrived and matched the pattern
    Verified,
    /// Burst arrived but a word differs
    Mismatch(Mismatch),
    /// The link reported an error; the burst was discarded
    Failed(LinkError),
    /// Nothing arrived within the wait budget
    Idle,
}

// ── Host ─────────────────────────────────────────────────────────────────────

/// Program the host side of the link.
pub fn host_setup<'a, P, S>(shared: &S) -> Result<(), AppError>
where
    P: HspiPort,
    S: Shared<Session = HspiLink<'a, P>>,
{
    let burst = window_burst()?;
    with_session(shared, |l| l.configure_transmit(window_pair(), burst))??;
    Ok(())
}

/// Write the pattern, send one burst and wait for the last packet.
///
/// A failed burst leaves the link reset and ready for the next one.
/// Returns the burst duration in microseconds.
pub fn host_burst<'a, P, S, M, W, T>(
    shared: &S,
    status: &StatusCell,
    memory: &mut M,
    log: &mut DiagLog<W, T>,
) -> Result<u64, AppError>
where
    P: HspiPort,
    S: Shared<Session = HspiLink<'a, P>>,
    M: BusMemory + ?Sized,
    W: Write,
    T: Timebase,
{
    pattern::fill(memory, LINK_WINDOW_BASE, PATTERN_WORDS)?;
    diag!(log, "Start Tx {}K", LINK_WINDOW_BYTES / 1024);

    let start = log.timebase().now_cycles();
    with_session(shared, HspiLink::send)??;
    let sent = wait_link(shared, status, log.timebase());
    let us = log.timebase().elapsed_us(start);

    match sent {
        Ok(()) => {
            diag!(log, "Tx end {}us", us);
            Ok(us)
        }
        Err(e) => {
            diag!(log, "Tx err {}", e);
            with_session(shared, reinit)??;
            Err(e.into())
        }
    }
}

/// Drop a latched error and reprogram the last configuration.
///
/// Only the host side does a full reset; the sequence counter keeps running
/// so the armed device stays in step.
fn reinit<P: HspiPort>(link: &mut HspiLink<'_, P>) -> Result<(), LinkError> {
    let _ = link.clear_error();
    link.reset()
}

// ── Device ───────────────────────────────────────────────────────────────────

/// Clear the link window and arm the device side.
pub fn device_setup<'a, P, S, M>(shared: &S, memory: &mut M) -> Result<(), AppError>
where
    P: HspiPort,
    S: Shared<Session = HspiLink<'a, P>>,
    M: BusMemory + ?Sized,
{
    pattern::clear(memory, LINK_WINDOW_BASE, LINK_WINDOW_BYTES)?;
    let burst = window_burst()?;
    with_session(shared, |l| l.configure_receive(window_pair(), burst))??;
    Ok(())
}

/// Wait for one burst, verify it, then clear the window and re-arm.
///
/// A link error or a pattern mismatch drops the latched error before the
/// receiver is re-armed for the next burst.
pub fn device_receive<'a, P, S, M, W, T>(
    shared: &S,
    status: &StatusCell,
    memory: &mut M,
    log: &mut DiagLog<W, T>,
) -> Result<RxOutcome, AppError>
where
    P: HspiPort,
    S: Shared<Session = HspiLink<'a, P>>,
    M: BusMemory + ?Sized,
    W: Write,
    T: Timebase,
{
    diag!(log, "Wait Rx");
    let outcome = match wait_link(shared, status, log.timebase()) {
        Err(LinkError::WaitTimeout) => return Ok(RxOutcome::Idle),
        Err(e) => {
            diag!(log, "Rx_End err {}", e);
            RxOutcome::Failed(e)
        }
        Ok(()) => {
            diag!(log, "Rx_End");
            check_window(memory, log)?
        }
    };

    diag!(log, "Clear RAMX {}K", LINK_WINDOW_BYTES / 1024);
    pattern::clear(memory, LINK_WINDOW_BASE, LINK_WINDOW_BYTES)?;

    if outcome != RxOutcome::Verified {
        diag!(log, "HSPI reinit");
    }
    with_session(shared, rearm_receive)??;
    Ok(outcome)
}

/// Drop a latched error and restart the receive sequence in place.
fn rearm_receive<P: HspiPort>(link: &mut HspiLink<'_, P>) -> Result<(), LinkError> {
    let _ = link.clear_error();
    link.reinit_receive()
}

fn check_window<M, W, T>(memory: &M, log: &mut DiagLog<W, T>) -> Result<RxOutcome, AppError>
where
    M: BusMemory + ?Sized,
    W: Write,
    T: Timebase,
{
    let last_addr = LINK_WINDOW_BASE.wrapping_add(LINK_WINDOW_BYTES.saturating_sub(4));
    match pattern::verify(memory, LINK_WINDOW_BASE, PATTERN_WORDS)? {
        None => {
            diag!(log, "Verify suc");
            diag!(
                log,
                "RX[0]=0x{:08X} [{}]=0x{:08X}",
                memory.read_u32(LINK_WINDOW_BASE)?,
                PATTERN_WORDS.saturating_sub(1),
                memory.read_u32(last_addr)?
            );
            Ok(RxOutcome::Verified)
        }
        Some(m) => {
            diag!(log, "{}", m);
            let mut around = [0u8; MISMATCH_DUMP_BYTES];
            let dump_at = m.addr.min(last_addr.wrapping_add(4).wrapping_sub(MISMATCH_DUMP_BYTES as u32));
            if memory.read(dump_at, &mut around).is_ok() {
                log.print_hex(&around);
            }
            Ok(RxOutcome::Mismatch(m))
        }
    }
}
