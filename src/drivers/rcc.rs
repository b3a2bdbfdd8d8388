//! Reset and Clock Control (RCC) clock gates
//!
//! A peripheral's registers must not be touched before its clock gate is
//! open. Gates are only ever set here, never cleared.

use bitflags::bitflags;

use crate::mmio::RegisterBus;

/// RCC base address
pub const RCC_BASE: usize = 0x4002_3800;

/// RCC register addresses
pub mod regs {
    use super::RCC_BASE;

    /// AHB1 peripheral clock enable register
    pub const AHB1ENR: usize = RCC_BASE + 0x30;
    /// APB1 peripheral clock enable register
    pub const APB1ENR: usize = RCC_BASE + 0x40;
}

bitflags! {
    /// AHB1ENR gates.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Ahb1Gates: u32 {
        /// GPIO port A
        const GPIOA = 1 << 0;
    }
}

bitflags! {
    /// APB1ENR gates.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Apb1Gates: u32 {
        /// USART2
        const USART2 = 1 << 17;
    }
}

/// Open the GPIOA clock gate.
pub fn enable_gpioa<B: RegisterBus>(bus: &mut B) {
    bus.set_bits(regs::AHB1ENR, Ahb1Gates::GPIOA.bits());
}

/// Open the USART2 clock gate.
pub fn enable_usart2<B: RegisterBus>(bus: &mut B) {
    bus.set_bits(regs::APB1ENR, Apb1Gates::USART2.bits());
}
