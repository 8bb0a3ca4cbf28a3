//! SerDes demo: the transmitter walks a payload schedule, sending every
//! payload twice; the receiver reports each pair of buffers it gets.

use core::fmt::Write;

use embedded_hal::delay::DelayNs;
use heapless::String;
use link::{CustomNumber, RxSlot, SerdesLink, SerdesRole};
use platform::config::LINK_WINDOW_BASE;
use platform::dma_safety::MAX_DMA_LEN;
use platform::{BusFault, BusMemory, PllFreq, SerdesPort, Timebase};

use super::{with_session, AppError, Shared};
use crate::log::DiagLog;
use crate::pattern::Ramp;

/// Custom number sent with every payload.
pub const SERDES_CUSTOM: CustomNumber = CustomNumber::MAX;

/// Transmit buffer.
pub const TX_BUFFER: u32 = LINK_WINDOW_BASE;
/// First receive buffer.
pub const RX_BUFFER0: u32 = LINK_WINDOW_BASE;
/// Second receive buffer.
pub const RX_BUFFER1: u32 = LINK_WINDOW_BASE.wrapping_add(MAX_DMA_LEN as u32);

/// Pause between two schedule states.
pub const STATE_INTERVAL_MS: u32 = 2000;
/// Pause between two pairs of a button burst (a 2 x 4 KiB pair takes
/// about 80 us at 1.2 Gbps).
pub const BURST_PAIR_GAP_US: u32 = 100;

/// Words printed per report row.
const ROW_WORDS: u32 = 16;

/// How a schedule state fills the transmit buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// Every word holds this value
    Constant(u32),
    /// Increasing words, continuing the previous state's ramp unless
    /// `restart` is set
    Ramp {
        /// Start again from zero
        restart: bool,
        /// Increment per word
        step: u32,
    },
}

/// One payload of the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxState {
    /// Payload length in bytes
    pub len: u16,
    /// Payload contents
    pub fill: Fill,
}

const fn constant(len: u16, value: u32) -> TxState {
    TxState {
        len,
        fill: Fill::Constant(value),
    }
}

const fn ramp(len: u16, restart: bool, step: u32) -> TxState {
    TxState {
        len,
        fill: Fill::Ramp { restart, step },
    }
}

/// Payloads sent in turn, from 4 bytes up to the 4 KiB DMA maximum.
pub const TX_SCHEDULE: [TxState; 13] = [
    constant(4, 0x5A5A_5A5A),
    constant(8, 0xAAAA_5555),
    constant(16, 0x1111_1111),
    constant(64, 0x2222_2222),
    constant(128, 0x3333_3333),
    constant(512, 0x4444_4444),
    constant(576, 0x5555_5555),
    constant(1024, 0x6666_6666),
    constant(2048, 0x7777_7777),
    ramp(2048, true, 0x0101_0101),
    ramp(2048, false, 0x1010_1010),
    ramp(4096, false, 0x1010_1010),
    ramp(4096, false, 0x1010_1010),
];

/// Payload sent continuously while the button is held.
pub const BUTTON_BURST: TxState = ramp(4096, true, 0x1010_1010);

/// Position in [`TX_SCHEDULE`] plus the running ramp value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxSchedule {
    index: usize,
    data: u32,
}

impl TxSchedule {
    /// Schedule at its first state.
    pub const fn new() -> Self {
        Self { index: 0, data: 0 }
    }

    /// Index of the next state.
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Value the next ramp word continues from.
    pub const fn data(&self) -> u32 {
        self.data
    }

    /// Initial buffer contents: a 2 KiB ramp from zero.
    pub fn prefill<M: BusMemory + ?Sized>(&mut self, memory: &mut M, base: u32) -> Result<(), BusFault> {
        self.write(memory, base, ramp(2048, true, 0x0101_0101))
    }

    /// Write the next state's payload at `base` and advance.
    pub fn load_next<M: BusMemory + ?Sized>(&mut self, memory: &mut M, base: u32) -> Result<TxState, BusFault> {
        let Some(&state) = TX_SCHEDULE.get(self.index) else {
            self.index = 0;
            return self.load_next(memory, base);
        };
        self.write(memory, base, state)?;
        self.index = self
            .index
            .checked_add(1)
            .filter(|&i| i < TX_SCHEDULE.len())
            .unwrap_or(0);
        Ok(state)
    }

    /// Write the button-burst payload at `base`. The schedule position is
    /// kept; the ramp value is shared with it.
    pub fn load_button_burst<M: BusMemory + ?Sized>(&mut self, memory: &mut M, base: u32) -> Result<TxState, BusFault> {
        self.write(memory, base, BUTTON_BURST)?;
        Ok(BUTTON_BURST)
    }

    fn write<M: BusMemory + ?Sized>(&mut self, memory: &mut M, base: u32, state: TxState) -> Result<(), BusFault> {
        let mut words = match state.fill {
            Fill::Constant(value) => Ramp::new(value, 0),
            Fill::Ramp { restart: true, step } => Ramp::new(0, step),
            Fill::Ramp { restart: false, step } => Ramp::new(self.data, step),
        };
        words.fill(memory, base, u32::from(state.len))?;
        self.data = match state.fill {
            Fill::Constant(value) => value,
            Fill::Ramp { .. } => words.peek(),
        };
        Ok(())
    }
}

// ── Transmitter ──────────────────────────────────────────────────────────────

/// Power up as transmitter and load the initial buffer.
pub fn tx_setup<P, D, M, W, T>(
    link: &mut SerdesLink<P, D>,
    schedule: &mut TxSchedule,
    memory: &mut M,
    log: &mut DiagLog<W, T>,
    freq: PllFreq,
) -> Result<(), AppError>
where
    P: SerdesPort,
    D: DelayNs,
    M: BusMemory + ?Sized,
    W: Write,
    T: Timebase,
{
    diag!(log, "SerDes Tx init {} MHz", freq.line_rate_mhz());
    link.power_up(SerdesRole::Transmitter, freq)?;
    schedule.prefill(memory, TX_BUFFER)?;
    Ok(())
}

/// Send the next schedule state twice, so both receive buffers fill.
pub fn tx_step<P, D, M, W, T>(
    link: &mut SerdesLink<P, D>,
    schedule: &mut TxSchedule,
    memory: &mut M,
    log: &mut DiagLog<W, T>,
) -> Result<TxState, AppError>
where
    P: SerdesPort,
    D: DelayNs,
    M: BusMemory + ?Sized,
    W: Write,
    T: Timebase,
{
    let state = schedule.load_next(memory, TX_BUFFER)?;
    send_pair(link, state)?;
    diag!(log, "Tx {} bytes x2", state.len);
    Ok(state)
}

/// Send 4 KiB pairs back to back while `held` returns true.
///
/// Returns the number of pairs sent.
pub fn tx_button_burst<P, D, M, W, T, G, H>(
    link: &mut SerdesLink<P, D>,
    schedule: &mut TxSchedule,
    memory: &mut M,
    log: &mut DiagLog<W, T>,
    gap: &mut G,
    mut held: H,
) -> Result<u32, AppError>
where
    P: SerdesPort,
    D: DelayNs,
    M: BusMemory + ?Sized,
    W: Write,
    T: Timebase,
    G: DelayNs,
    H: FnMut() -> bool,
{
    if !held() {
        return Ok(0);
    }
    let state = schedule.load_button_burst(memory, TX_BUFFER)?;
    let mut pairs = 0u32;
    while held() {
        send_pair(link, state)?;
        pairs = pairs.saturating_add(1);
        gap.delay_us(BURST_PAIR_GAP_US);
    }
    diag!(log, "Tx burst {} pairs", pairs);
    Ok(pairs)
}

fn send_pair<P: SerdesPort, D: DelayNs>(link: &mut SerdesLink<P, D>, state: TxState) -> Result<(), AppError> {
    link.configure_tx(TX_BUFFER, state.len, SERDES_CUSTOM)?;
    link.send_blocking()?;
    link.send_blocking()?;
    Ok(())
}

// ── Receiver ─────────────────────────────────────────────────────────────────

/// Power up as receiver with both buffers registered and interrupts on.
pub fn rx_setup<P, D, S, W, T>(shared: &S, log: &mut DiagLog<W, T>, freq: PllFreq) -> Result<(), AppError>
where
    P: SerdesPort,
    D: DelayNs,
    S: Shared<Session = SerdesLink<P, D>>,
    W: Write,
    T: Timebase,
{
    diag!(log, "SerDes Rx init {} MHz", freq.line_rate_mhz());
    diag!(log, "RX_DMA0=0x{:08X} RX_DMA1=0x{:08X}", RX_BUFFER0, RX_BUFFER1);
    with_session(shared, |l| {
        l.power_up(SerdesRole::Receiver, freq)?;
        l.configure_rx_double(RX_BUFFER0, RX_BUFFER1)
    })??;
    Ok(())
}

/// Counters reported with each received pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxReport {
    /// The two buffers, in arrival order
    pub slots: [RxSlot; 2],
    /// Receive errors so far
    pub rx_errors: u32,
    /// FIFO overflows so far
    pub fifo_overflows: u32,
}

impl RxReport {
    /// Both buffers passed the CRC.
    pub const fn crc_ok(&self) -> bool {
        let [first, second] = &self.slots;
        first.crc_ok && second.crc_ok
    }
}

/// Print the last received pair, if both buffers are in.
pub fn rx_report<P, D, S, M, W, T>(
    shared: &S,
    memory: &M,
    log: &mut DiagLog<W, T>,
) -> Result<Option<RxReport>, AppError>
where
    P: SerdesPort,
    D: DelayNs,
    S: Shared<Session = SerdesLink<P, D>>,
    M: BusMemory + ?Sized,
    W: Write,
    T: Timebase,
{
    let taken = with_session(shared, |l| {
        l.take_pair().map(|slots| RxReport {
            slots,
            rx_errors: l.rx_error_count(),
            fifo_overflows: l.fifo_overflow_count(),
        })
    })?;
    let Some(report) = taken else {
        shared.idle();
        return Ok(None);
    };

    let [first, second] = report.slots;
    let cycles = second.at_cycles.wrapping_sub(first.at_cycles);
    let us = cycles
        .checked_div(u64::from(log.timebase().cycles_per_us()))
        .unwrap_or(0);
    diag!(log, "RX_LEN0={} RX_LEN1={} cycles={}({}us)", first.len, second.len, cycles, us);
    diag!(
        log,
        "STATUS0=0x{:08X} STATUS1=0x{:08X} DATA0=0x{:08X} DATA1=0x{:08X}",
        first.status,
        second.status,
        first.custom,
        second.custom
    );
    diag!(
        log,
        "RX_ERR={} FIFO_OV={} RX_CRC_OK={}",
        report.rx_errors,
        report.fifo_overflows,
        u8::from(report.crc_ok())
    );

    let words = (first.len / 4).clamp(1, u32::from(MAX_DMA_LEN) / 4);
    let mut row = 0;
    while row < words {
        let n = words.saturating_sub(row).min(ROW_WORDS);
        let offset = row.wrapping_mul(4);
        print_words(memory, log, RX_BUFFER0.wrapping_add(offset), n)?;
        print_words(memory, log, RX_BUFFER1.wrapping_add(offset), n)?;
        row = row.saturating_add(ROW_WORDS);
    }
    Ok(Some(report))
}

/// One log line with `count` words read at `addr`.
fn print_words<M, W, T>(memory: &M, log: &mut DiagLog<W, T>, addr: u32, count: u32) -> Result<(), BusFault>
where
    M: BusMemory + ?Sized,
    W: Write,
    T: Timebase,
{
    let mut line: String<160> = String::new();
    for i in 0..count {
        let word = memory.read_u32(addr.wrapping_add(i.wrapping_mul(4)))?;
        // 16 words of 9 characters fit
        let _ = write!(line, "{word:08X} ");
    }
    log.log(format_args!("{}", line.trim_end()));
    Ok(())
}
