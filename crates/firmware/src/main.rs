//! HydraLink firmware - Main Entry Point
//!
//! Hardware-only entry point for the CH569W. Both boards run the same image;
//! the PB24 strap picks the side. The HSPI demo runs by default, the SerDes
//! demo with `--features serdes`.

#![no_std]
#![no_main]
#![allow(missing_docs)]

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use riscv_rt::entry;
use static_cell::StaticCell;

use firmware::app::AppError;
use firmware::board::{self, Board};
use firmware::hal::{self, HspiMmio, Pin, Ramx, SerdesMmio, SysTick, Uart1};
use firmware::{diag, DiagLog, Shared};
use link::{BoardRole, HandshakeOutcome, HspiLink, SerdesLink, StatusCell};
use platform::config::{APP_NAME, APP_VERSION, FREQ_SYS_HZ, UART1_BAUD};
use platform::hspi::HSPI_IRQ;
use platform::serdes::SERDES_IRQ;
use platform::BusyDelay;

#[cfg(not(feature = "serdes"))]
use {firmware::app::hspi, link::HspiConfig, platform::config::HSPI_TX_ARM_DELAY_US};

#[cfg(feature = "serdes")]
use {firmware::app::serdes, link::SerdesConfig};

type Log = DiagLog<Uart1, SysTick>;
type SerdesSession = SerdesLink<SerdesMmio, BusyDelay<SysTick>>;

// ── Interrupt-shared sessions ────────────────────────────────────────────────

/// A link session owned jointly by the main loop and its interrupt handler.
///
/// The handler and the main loop both enter through a critical section, so
/// the `RefCell` is never borrowed twice.
struct IrqCell<L>(Mutex<CriticalSectionRawMutex, RefCell<Option<L>>>);

impl<L> IrqCell<L> {
    const fn new() -> Self {
        Self(Mutex::new(RefCell::new(None)))
    }

    fn install(&self, session: L) {
        self.0.lock(|cell| {
            if let Ok(mut slot) = cell.try_borrow_mut() {
                *slot = Some(session);
            }
        });
    }
}

impl<L> Shared for IrqCell<L> {
    type Session = L;

    fn lock<R, F: FnOnce(&mut L) -> R>(&self, f: F) -> Option<R> {
        self.0.lock(|cell| {
            let mut slot = cell.try_borrow_mut().ok()?;
            slot.as_mut().map(f)
        })
    }
}

static HSPI_STATUS: StatusCell = StatusCell::new();
static HSPI: IrqCell<HspiLink<'static, HspiMmio>> = IrqCell::new();
static SERDES: IrqCell<SerdesSession> = IrqCell::new();

// The 4 KiB log capture stays off the 8 KiB stack.
static LOG: StaticCell<Log> = StaticCell::new();

/// Every PFIC interrupt lands here; riscv-rt only names the core ones.
#[export_name = "DefaultHandler"]
fn dispatch_interrupt() {
    let code = riscv::register::mcause::read().code();
    if code == usize::from(HSPI_IRQ) {
        let _ = HSPI.lock(HspiLink::on_interrupt);
    } else if code == usize::from(SERDES_IRQ) {
        let _ = SERDES.lock(|link| link.on_interrupt(&SysTick));
    }
}

#[panic_handler]
fn panic(_info: &core::panic::PanicInfo<'_>) -> ! {
    loop {
        core::hint::spin_loop();
    }
}

// ── Entry ────────────────────────────────────────────────────────────────────

#[entry]
fn main() -> ! {
    hal::init_clock_120mhz();
    hal::gpio::float_all();
    let timebase = SysTick::init();
    let uart = Uart1::init(UART1_BAUD, FREQ_SYS_HZ);
    let log = LOG.init(DiagLog::new(uart, timebase));

    diag!(log, "{} v{} ChipID 0x{:02X}", APP_NAME, APP_VERSION, hal::chip_id());
    diag!(log, "FSYS={} Hz", FREQ_SYS_HZ);

    let mut board = match Board::new(
        Pin::new(board::STRAP_PIN),
        Pin::new(board::SYNC_OUT_PIN),
        Pin::new(board::SYNC_IN_PIN),
        Pin::new(board::LED_PIN),
        Pin::new(board::BUTTON_PIN),
    ) {
        Ok(board) => board,
        Err(never) => match never {},
    };

    let outcome = board.synchronize(&timebase);
    log.reinit_time();
    match outcome {
        HandshakeOutcome::Synchronized { role, cycles } => {
            diag!(log, "SYNC {} after {} cycles", role, cycles);
        }
        HandshakeOutcome::Timeout { role } => {
            diag!(log, "SYNC timeout, continuing as {}", role);
        }
    }

    // SAFETY: the sessions are empty until a demo installs one, so an early
    // interrupt only finds nothing to service.
    unsafe { riscv::interrupt::enable() };

    run(outcome.role(), &mut board, log, timebase)
}

fn halt(log: &mut Log, err: AppError) -> ! {
    diag!(log, "Halted: {}", err);
    loop {
        core::hint::spin_loop();
    }
}

// ── HSPI demo ────────────────────────────────────────────────────────────────

#[cfg(not(feature = "serdes"))]
fn run(role: BoardRole, board: &mut Board<Pin>, log: &mut Log, timebase: SysTick) -> ! {
    let mut memory = Ramx;
    let mut delay = BusyDelay::new(timebase);
    HSPI.install(HspiLink::new(HspiMmio, &HSPI_STATUS, HspiConfig::default()));
    match role {
        BoardRole::RoleA => hspi_host(board, log, &mut memory, &mut delay),
        BoardRole::RoleB => hspi_device(log, &mut memory),
    }
}

#[cfg(not(feature = "serdes"))]
fn hspi_host(board: &mut Board<Pin>, log: &mut Log, memory: &mut Ramx, delay: &mut BusyDelay<SysTick>) -> ! {
    use embedded_hal::delay::DelayNs;

    diag!(log, "HSPI host (Tx)");
    if let Err(e) = hspi::host_setup(&HSPI) {
        halt(log, e);
    }
    delay.delay_us(HSPI_TX_ARM_DELAY_US);

    let mut send = true;
    loop {
        if send {
            // Link errors are logged by the step itself.
            if let Err(AppError::Bus(fault)) = hspi::host_burst(&HSPI, &HSPI_STATUS, memory, log) {
                halt(log, AppError::Bus(fault));
            }
        }
        let half_period = board.blink_period_ms();
        board.blink(delay, half_period);
        send = board.button_pressed();
    }
}

#[cfg(not(feature = "serdes"))]
fn hspi_device(log: &mut Log, memory: &mut Ramx) -> ! {
    diag!(log, "HSPI device (Rx)");
    if let Err(e) = hspi::device_setup(&HSPI, memory) {
        halt(log, e);
    }
    loop {
        if let Err(e) = hspi::device_receive(&HSPI, &HSPI_STATUS, memory, log) {
            halt(log, e);
        }
    }
}

// ── SerDes demo ──────────────────────────────────────────────────────────────

#[cfg(feature = "serdes")]
fn run(role: BoardRole, board: &mut Board<Pin>, log: &mut Log, timebase: SysTick) -> ! {
    let config = SerdesConfig::default();
    let link = SerdesLink::new(SerdesMmio, BusyDelay::new(timebase), config);
    match role {
        BoardRole::RoleA => serdes_tx(link, config, board, log, timebase),
        BoardRole::RoleB => {
            SERDES.install(link);
            serdes_rx(config, log)
        }
    }
}

#[cfg(feature = "serdes")]
fn serdes_tx(
    mut link: SerdesSession,
    config: SerdesConfig,
    board: &mut Board<Pin>,
    log: &mut Log,
    timebase: SysTick,
) -> ! {
    let mut memory = Ramx;
    let mut delay = BusyDelay::new(timebase);
    let mut schedule = serdes::TxSchedule::new();
    if let Err(e) = serdes::tx_setup(&mut link, &mut schedule, &mut memory, log, config.freq) {
        halt(log, e);
    }

    let blinks = serdes::STATE_INTERVAL_MS
        .checked_div(board::BLINK_SLOW_MS.saturating_mul(2))
        .unwrap_or(1);
    loop {
        if let Err(e) = serdes::tx_step(&mut link, &mut schedule, &mut memory, log) {
            diag!(log, "Tx err {}", e);
        }
        for _ in 0..blinks {
            let mut gap = BusyDelay::new(timebase);
            let burst = serdes::tx_button_burst(
                &mut link,
                &mut schedule,
                &mut memory,
                log,
                &mut gap,
                || board.button_pressed(),
            );
            if let Err(e) = burst {
                diag!(log, "Tx burst err {}", e);
            }
            board.blink(&mut delay, board::BLINK_SLOW_MS);
        }
    }
}

#[cfg(feature = "serdes")]
fn serdes_rx(config: SerdesConfig, log: &mut Log) -> ! {
    let memory = Ramx;
    if let Err(e) = serdes::rx_setup(&SERDES, log, config.freq) {
        halt(log, e);
    }
    loop {
        if let Err(e) = serdes::rx_report(&SERDES, &memory, log) {
            diag!(log, "Rx report err {}", e);
        }
    }
}
