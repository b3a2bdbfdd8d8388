//! Global serial console
//!
//! [`Console`] holds the one USART2 handle used for formatted output once
//! the board has brought it up. The global [`CONSOLE`] exposes it three ways:
//! - `kprint!` / `kprintln!` for Rust code
//! - [`putchar`] (and `__io_putchar` with the `io-putchar` feature) for a
//!   C library's formatted-output retargeting
//! - a `log` backend installed by [`init_logger`]
//!
//! # Concurrency
//! The console is guarded by a spinlock. Taking it from an interrupt
//! handler that preempted a holder deadlocks; the driver itself never
//! enables interrupts.

use core::fmt::{self, Write};

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Mutex;

use crate::drivers::usart::Uart;
use crate::mmio::{Mmio, RegisterBus};

/// A spinlocked, optionally installed serial port.
pub struct Console<B: RegisterBus> {
    uart: Mutex<Option<Uart<B>>>,
}

impl<B: RegisterBus> Console<B> {
    /// An empty console; output is dropped until [`install`](Self::install).
    pub const fn new() -> Self {
        Self {
            uart: Mutex::new(None),
        }
    }

    /// Make `uart` the console, returning the previous one.
    pub fn install(&self, uart: Uart<B>) -> Option<Uart<B>> {
        self.uart.lock().replace(uart)
    }

    /// Remove and return the installed port.
    pub fn take(&self) -> Option<Uart<B>> {
        self.uart.lock().take()
    }

    /// Transmit `ch` and return it. Dropped if nothing is installed.
    pub fn putchar(&self, ch: i32) -> i32 {
        if let Some(uart) = self.uart.lock().as_mut() {
            uart.putchar(ch);
        }
        ch
    }

    /// Write formatted text.
    pub fn print(&self, args: fmt::Arguments) {
        if let Some(uart) = self.uart.lock().as_mut() {
            let _ = uart.write_fmt(args);
        }
    }
}

impl<B: RegisterBus> Default for Console<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: RegisterBus + Send> Log for Console<B> {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    // The facade has already filtered on max_level
    fn log(&self, record: &Record) {
        // A record logged while the console is held (e.g. from inside a
        // console write) is dropped rather than deadlocking
        if let Some(mut uart) = self.uart.try_lock() {
            if let Some(uart) = uart.as_mut() {
                let _ = write_record(uart, record);
            }
        }
    }

    fn flush(&self) {}
}

/// The board console on USART2.
pub static CONSOLE: Console<Mmio> = Console::new();

/// Make `uart` the board console, returning the previous one.
pub fn install(uart: Uart<Mmio>) -> Option<Uart<Mmio>> {
    CONSOLE.install(uart)
}

/// Bring up USART2 transmit-only and install it as the console.
///
/// # Safety
/// Same contract as [`Mmio::new`]: the caller owns GPIOA, RCC and USART2.
pub unsafe fn init_tx_only() {
    // SAFETY: forwarded to the caller
    let bus = unsafe { Mmio::new() };
    install(Uart::tx_only(bus));
}

/// Bring up USART2 for receive and transmit and install it as the console.
///
/// # Safety
/// Same contract as [`Mmio::new`].
pub unsafe fn init_rx_tx() {
    // SAFETY: forwarded to the caller
    let bus = unsafe { Mmio::new() };
    install(Uart::rx_tx(bus));
}

/// Output hook: transmit `ch` on the board console and return it.
pub fn putchar(ch: i32) -> i32 {
    CONSOLE.putchar(ch)
}

/// `int __io_putchar(int)` for newlib-style `printf` retargeting.
#[cfg(feature = "io-putchar")]
#[no_mangle]
pub extern "C" fn __io_putchar(ch: core::ffi::c_int) -> core::ffi::c_int {
    putchar(ch)
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    CONSOLE.print(args);
}

/// Print to the serial console
#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => {
        $crate::console::_print(format_args!($($arg)*))
    };
}

/// Print to the serial console, with a newline
#[macro_export]
macro_rules! kprintln {
    () => {
        $crate::kprint!("\n")
    };
    ($($arg:tt)*) => {{
        $crate::kprint!($($arg)*);
        $crate::kprint!("\n");
    }};
}

/// Render one log line.
fn write_record<W: Write>(w: &mut W, record: &Record) -> fmt::Result {
    writeln!(w, "[{}] {}: {}", record.level(), record.target(), record.args())
}

/// Route the `log` facade to the board console.
pub fn init_logger(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&CONSOLE)?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mmio::sim::SimBus;

    fn sent(uart: Uart<SimBus>) -> Vec<u8> {
        uart.release().tx.iter().map(|&w| w as u8).collect()
    }

    #[test]
    fn test_putchar_without_console() {
        assert_eq!(putchar(0x41), 0x41);
        assert_eq!(putchar(0x1FF), 0x1FF);

        let console: Console<SimBus> = Console::new();
        assert_eq!(console.putchar(0x42), 0x42);
        assert!(console.take().is_none());
    }

    #[test]
    fn test_putchar_forwards_to_installed_port() {
        let console = Console::new();
        assert!(console.install(Uart::tx_only(SimBus::new())).is_none());

        assert_eq!(console.putchar(0x141), 0x141);

        let uart = console.take().unwrap();
        assert_eq!(uart.release().tx, [0x41]);
    }

    #[test]
    fn test_install_replaces_previous() {
        let console = Console::new();
        console.install(Uart::tx_only(SimBus::new()));
        console.putchar(b'a' as i32);

        let previous = console.install(Uart::rx_tx(SimBus::new())).unwrap();
        console.putchar(b'b' as i32);

        assert_eq!(sent(previous), b"a");
        assert_eq!(sent(console.take().unwrap()), b"b");
    }

    #[test]
    fn test_print() {
        let console = Console::new();
        console.install(Uart::tx_only(SimBus::new()));

        console.print(format_args!("divisor={}\n", 139));

        assert_eq!(sent(console.take().unwrap()), b"divisor=139\r\n");
    }

    #[test]
    fn test_logged_record_reaches_port() {
        let console = Console::new();
        console.install(Uart::tx_only(SimBus::new()));

        console.log(
            &Record::builder()
                .args(format_args!("brr={:#x}", 139))
                .level(log::Level::Warn)
                .target("usart2")
                .build(),
        );

        assert_eq!(sent(console.take().unwrap()), b"[WARN] usart2: brr=0x8b\r\n");
    }

    #[test]
    fn test_log_while_held_is_dropped() {
        let console = Console::new();
        console.install(Uart::tx_only(SimBus::new()));

        {
            let _held = console.uart.lock();
            console.log(
                &Record::builder()
                    .args(format_args!("lost"))
                    .level(log::Level::Info)
                    .build(),
            );
        }

        assert!(sent(console.take().unwrap()).is_empty());
    }
}
