//! GPIO port A pin configuration
//!
//! Only what the serial pins need: the 2-bit mode field in MODER and the
//! 4-bit alternate-function selector in AFRL/AFRH.

use crate::mmio::RegisterBus;

/// GPIOA base address
pub const GPIOA_BASE: usize = 0x4002_0000;

/// GPIOA register addresses
pub mod regs {
    use super::GPIOA_BASE;

    /// Mode register, 2 bits per pin
    pub const MODER: usize = GPIOA_BASE + 0x00;
    /// Alternate function low register, pins 0-7
    pub const AFRL: usize = GPIOA_BASE + 0x20;
    /// Alternate function high register, pins 8-15
    pub const AFRH: usize = GPIOA_BASE + 0x24;
}

/// Alternate function code routing a pin to USART1/USART2.
pub const AF_USART2: u8 = 0b0111;

/// A pin number on port A.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Pin(u8);

impl Pin {
    /// PA2, USART2_TX
    pub const PA2: Self = Self(2);
    /// PA3, USART2_RX
    pub const PA3: Self = Self(3);

    /// Create a pin handle.
    ///
    /// # Panics
    /// Panics in debug mode if `n` is not a valid pin number (0-15).
    #[inline]
    pub const fn new(n: u8) -> Self {
        debug_assert!(n < 16);
        Self(n & 0xF)
    }

    /// Pin number within the port.
    #[inline]
    pub const fn number(self) -> u8 {
        self.0
    }

    /// Address of the AFR register holding this pin's selector, and the
    /// selector's bit offset within it.
    #[inline]
    const fn afr_slot(self) -> (usize, u32) {
        let reg = if self.0 < 8 { regs::AFRL } else { regs::AFRH };
        (reg, (self.0 as u32 % 8) * 4)
    }
}

/// MODER encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Mode {
    Input = 0b00,
    Output = 0b01,
    Alternate = 0b10,
    Analog = 0b11,
}

/// Set a pin's mode: clear the 2-bit field, then write the encoding.
pub fn set_mode<B: RegisterBus>(bus: &mut B, pin: Pin, mode: Mode) {
    let shift = pin.number() as u32 * 2;
    bus.modify(regs::MODER, |v| (v & !(0b11 << shift)) | ((mode as u32) << shift));
}

/// Set a pin's alternate-function selector to `af` (low nibble only).
pub fn set_alternate<B: RegisterBus>(bus: &mut B, pin: Pin, af: u8) {
    let (reg, shift) = pin.afr_slot();
    bus.modify(reg, |v| (v & !(0xF << shift)) | (((af & 0xF) as u32) << shift));
}

/// Route a pin to a peripheral.
pub fn into_alternate<B: RegisterBus>(bus: &mut B, pin: Pin, af: u8) {
    set_mode(bus, pin, Mode::Alternate);
    set_alternate(bus, pin, af);
}

/// Read back a pin's alternate-function selector.
pub fn alternate<B: RegisterBus>(bus: &mut B, pin: Pin) -> u8 {
    let (reg, shift) = pin.afr_slot();
    ((bus.read(reg) >> shift) & 0xF) as u8
}
