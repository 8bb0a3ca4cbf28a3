//! Diagnostic text log
//!
//! Timestamped lines on a `core::fmt::Write` sink (UART1 on hardware), with a
//! copy of everything written kept in RAM so it can be dumped later.
//!
//! Each line starts with the time since the last [`DiagLog::reinit_time`]:
//!
//! ```text
//! 00s 012ms 345us Tx end 271us
//! ```

use core::fmt::{self, Write};

use heapless::String;
use platform::config::DEBUG_LOG_CAPACITY;
use platform::Timebase;

/// Bytes per [`DiagLog::print_hex`] row.
pub const HEX_ROW_BYTES: usize = 16;

/// Log one formatted line: `diag!(log, "Verify suc {}", n)`.
#[macro_export]
macro_rules! diag {
    ($log:expr, $($arg:tt)*) => {
        $log.log(format_args!($($arg)*))
    };
}

/// Timestamped diagnostic log over `W`, timed by `T`.
pub struct DiagLog<W, T> {
    out: W,
    timebase: T,
    start: u64,
    capture: String<DEBUG_LOG_CAPACITY>,
    saturated: bool,
    dropped: u32,
}

impl<W: Write, T: Timebase> DiagLog<W, T> {
    /// Log over `out`, time origin now.
    pub fn new(out: W, timebase: T) -> Self {
        let start = timebase.now_cycles();
        Self {
            out,
            timebase,
            start,
            capture: String::new(),
            saturated: false,
            dropped: 0,
        }
    }

    /// Restart the line timestamps from zero.
    pub fn reinit_time(&mut self) {
        self.start = self.timebase.now_cycles();
    }

    /// Microseconds since the time origin.
    pub fn elapsed_us(&self) -> u64 {
        self.timebase.elapsed_us(self.start)
    }

    /// Write one timestamped line.
    pub fn log(&mut self, args: fmt::Arguments<'_>) {
        let us = self.elapsed_us();
        self.emit(format_args!("{:02}s {:03}ms {:03}us ", us / 1_000_000, (us / 1000) % 1000, us % 1000));
        self.emit(args);
        self.emit(format_args!("\n"));

        #[cfg(feature = "std")]
        tracing::info!(target: "diag", "{}", args);
    }

    /// Hex dump of `bytes`, one line per 16 bytes, extra gap after 8.
    pub fn print_hex(&mut self, bytes: &[u8]) {
        for row in bytes.chunks(HEX_ROW_BYTES) {
            let mut line: String<64> = String::new();
            for (i, b) in row.iter().enumerate() {
                // 16 * 3 + 1 always fits
                let _ = write!(line, "{b:02X} ");
                if i == 7 {
                    let _ = line.push(' ');
                }
            }
            self.log(format_args!("{}", line.trim_end()));
        }
    }

    fn emit(&mut self, args: fmt::Arguments<'_>) {
        if self.out.write_fmt(args).is_err() {
            self.dropped = self.dropped.saturating_add(1);
        }
        if !self.saturated {
            let mut sink = Capture {
                buf: &mut self.capture,
                full: false,
            };
            let _ = sink.write_fmt(args);
            self.saturated = sink.full;
        }
    }

    // ── Capture ──────────────────────────────────────────────────────────────

    /// Text captured since the last drain.
    pub fn captured(&self) -> &str {
        &self.capture
    }

    /// True once the capture buffer stopped accepting text.
    pub fn is_saturated(&self) -> bool {
        self.saturated
    }

    /// Take the captured text and start a new capture.
    pub fn drain(&mut self) -> String<DEBUG_LOG_CAPACITY> {
        self.saturated = false;
        core::mem::take(&mut self.capture)
    }

    /// Writes the sink refused.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    /// Timebase driving the timestamps.
    pub fn timebase(&self) -> &T {
        &self.timebase
    }

    /// Underlying sink.
    pub fn writer(&self) -> &W {
        &self.out
    }
}

/// Appends until the buffer is full, then silently stops.
struct Capture<'a> {
    buf: &'a mut String<DEBUG_LOG_CAPACITY>,
    full: bool,
}

impl Write for Capture<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.full || self.buf.push(c).is_err() {
                self.full = true;
                break;
            }
        }
        Ok(())
    }
}
