//! STM32F4 USART2 driver
//!
//! Polled, blocking, one byte at a time. TX is PA2 and RX is PA3, both on
//! alternate function 7.
//!
//! # Memory Map
//! - Base address: 0x4000_4400 (APB1)
//! - SR, DR, BRR, CR1 at offsets 0x00, 0x04, 0x08, 0x0C
//!
//! # Blocking Semantics
//! [`Uart::write`] and [`Uart::read`] spin on the status register with no
//! timeout. If the peripheral is unclocked or never initialized they never
//! return. The `try_*` variants bound the wait according to the configured
//! [`WaitPolicy`].

use core::fmt;

use bitflags::bitflags;
use log::{debug, warn};

use super::{gpio, rcc};
use crate::config::{UartConfig, WaitPolicy};
use crate::mmio::RegisterBus;

/// USART2 base address
pub const USART2_BASE: usize = 0x4000_4400;

/// USART2 register addresses
pub mod regs {
    use super::USART2_BASE;

    /// Status register
    pub const SR: usize = USART2_BASE + 0x00;
    /// Data register
    pub const DR: usize = USART2_BASE + 0x04;
    /// Baud rate register
    pub const BRR: usize = USART2_BASE + 0x08;
    /// Control register 1
    pub const CR1: usize = USART2_BASE + 0x0C;
}

/// TX pin
pub const TX_PIN: gpio::Pin = gpio::Pin::PA2;
/// RX pin
pub const RX_PIN: gpio::Pin = gpio::Pin::PA3;

bitflags! {
    /// CR1 bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Control: u32 {
        /// Receiver enable
        const RE = 1 << 2;
        /// Transmitter enable
        const TE = 1 << 3;
        /// USART enable
        const UE = 1 << 13;
    }
}

bitflags! {
    /// SR bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u32 {
        /// Read data register not empty
        const RXNE = 1 << 5;
        /// Transmission complete: DR and the shift register are both empty
        const TC = 1 << 6;
        /// Transmit data register empty
        const TXE = 1 << 7;
    }
}

/// Transfer error. Only the bounded `try_*` primitives produce one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The status flag did not assert within the spin budget
    Timeout,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Timeout => write!(f, "timed out waiting for USART status flag"),
        }
    }
}

impl embedded_io::Error for Error {
    fn kind(&self) -> embedded_io::ErrorKind {
        embedded_io::ErrorKind::TimedOut
    }
}

/// USART2 driver over a register bus.
pub struct Uart<B: RegisterBus> {
    bus: B,
    config: UartConfig,
}

impl<B: RegisterBus> Uart<B> {
    /// Bring up the GPIO pins, clocks and USART2 for `config`.
    ///
    /// There is no failure path: a configuration whose divisor does not fit
    /// BRR is logged, asserted on in debug builds, and otherwise written
    /// truncated, leaving a garbled line.
    pub fn init(mut bus: B, config: UartConfig) -> Self {
        let checked = config.validate();
        if let Err(e) = checked {
            warn!("usart2: {}", e);
        }
        debug_assert!(checked.is_ok(), "invalid USART configuration: {:?}", checked);

        rcc::enable_gpioa(&mut bus);
        gpio::into_alternate(&mut bus, TX_PIN, gpio::AF_USART2);
        if config.direction.receives() {
            gpio::into_alternate(&mut bus, RX_PIN, gpio::AF_USART2);
        }

        rcc::enable_usart2(&mut bus);

        let brr = if config.baud_rate == 0 { 0 } else { config.divisor() };
        bus.write(regs::BRR, u32::from(brr));

        // Assignment, not OR: anything left over in CR1 is cleared
        bus.write(regs::CR1, config.direction.cr1_bits().bits());
        bus.set_bits(regs::CR1, Control::UE.bits());

        debug!(
            "usart2: {:?} {} baud, brr={:#x} cr1={:#x}",
            config.direction,
            config.baud_rate,
            brr,
            bus.read(regs::CR1)
        );

        Self { bus, config }
    }

    /// Receive and transmit at the default rate.
    pub fn rx_tx(bus: B) -> Self {
        Self::init(bus, UartConfig::RX_TX)
    }

    /// Transmit only at the default rate; PA3 is not claimed.
    pub fn tx_only(bus: B) -> Self {
        Self::init(bus, UartConfig::TX_ONLY)
    }

    /// The configuration this port was brought up with.
    pub fn config(&self) -> &UartConfig {
        &self.config
    }

    /// Give the bus back.
    pub fn release(self) -> B {
        self.bus
    }

    #[inline]
    fn status(&mut self) -> Status {
        Status::from_bits_retain(self.bus.read(regs::SR))
    }

    /// Spin until `flag` is set. Never gives up.
    #[inline]
    fn wait_for(&mut self, flag: Status) {
        while !self.status().contains(flag) {
            core::hint::spin_loop();
        }
    }

    /// Spin until `flag` is set, honoring the wait policy.
    fn wait_bounded(&mut self, flag: Status) -> Result<(), Error> {
        match self.config.wait {
            WaitPolicy::Forever => {
                self.wait_for(flag);
                Ok(())
            }
            WaitPolicy::Spins(budget) => {
                for _ in 0..budget {
                    if self.status().contains(flag) {
                        return Ok(());
                    }
                    core::hint::spin_loop();
                }
                Err(Error::Timeout)
            }
        }
    }

    /// Transmit the low byte of `ch`, waiting for TXE first.
    ///
    /// Bits above the low 8 are discarded.
    pub fn write(&mut self, ch: i32) {
        self.wait_for(Status::TXE);
        self.bus.write(regs::DR, (ch & 0xFF) as u32);
    }

    /// Wait for RXNE and return the received byte.
    pub fn read(&mut self) -> u8 {
        self.wait_for(Status::RXNE);
        self.bus.read(regs::DR) as u8
    }

    /// Character output hook: transmit `ch` and hand it back.
    ///
    /// Matches the `int putchar(int)` contract formatted-output libraries
    /// retarget to.
    pub fn putchar(&mut self, ch: i32) -> i32 {
        self.write(ch);
        ch
    }

    /// Transmit one byte within the configured wait budget.
    pub fn try_write(&mut self, byte: u8) -> Result<(), Error> {
        self.wait_bounded(Status::TXE)?;
        self.bus.write(regs::DR, u32::from(byte));
        Ok(())
    }

    /// Receive one byte within the configured wait budget.
    pub fn try_read(&mut self) -> Result<u8, Error> {
        self.wait_bounded(Status::RXNE)?;
        Ok(self.bus.read(regs::DR) as u8)
    }

    /// Transmit a byte slice as-is.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.write(i32::from(byte));
        }
    }

    /// Transmit a string, expanding `\n` to `\r\n` for terminals.
    pub fn write_str(&mut self, s: &str) {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.write(i32::from(b'\r'));
            }
            self.write(i32::from(byte));
        }
    }
}

impl<B: RegisterBus> fmt::Write for Uart<B> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        Uart::write_str(self, s);
        Ok(())
    }
}

impl<B: RegisterBus> embedded_io::ErrorType for Uart<B> {
    type Error = Error;
}

impl<B: RegisterBus> embedded_io::Write for Uart<B> {
    /// Fails only if the first byte cannot be sent; a timeout after that
    /// ends the write short.
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let Some((&first, rest)) = buf.split_first() else {
            return Ok(0);
        };
        self.try_write(first)?;

        let mut n = 1;
        for &byte in rest {
            if self.try_write(byte).is_err() {
                break;
            }
            n += 1;
        }
        Ok(n)
    }

    /// Waits for TC; TXE alone leaves the last byte in the shift register.
    fn flush(&mut self) -> Result<(), Self::Error> {
        self.wait_bounded(Status::TC)
    }
}

impl<B: RegisterBus> embedded_io::Read for Uart<B> {
    /// Blocks for the first byte, then takes whatever is already waiting.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let Some((first, rest)) = buf.split_first_mut() else {
            return Ok(0);
        };
        *first = self.try_read()?;

        let mut n = 1;
        for slot in rest {
            if !self.status().contains(Status::RXNE) {
                break;
            }
            *slot = self.bus.read(regs::DR) as u8;
            n += 1;
        }
        Ok(n)
    }
}
