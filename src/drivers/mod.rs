//! Peripheral drivers
//!
//! Each driver takes the register bus explicitly; nothing here reaches
//! hardware through a global.

pub mod gpio;
pub mod rcc;
pub mod usart;
