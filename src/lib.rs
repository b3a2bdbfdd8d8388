//! STM32F4 USART2 serial driver
//!
//! Polled, blocking serial I/O for an STM32F4 running from its 16 MHz
//! internal oscillator: PA2/PA3 on alternate function 7, 115200 baud 8N1.
//!
//! # Layout
//! - [`mmio`]: register bus trait and the volatile MMIO implementation
//! - [`drivers`]: RCC clock gates, GPIO pin routing, the USART itself
//! - [`config`]: line configuration and baud divisor math
//! - [`console`]: global console, print macros, C output hook, `log` backend
//!
//! # Example
//! ```no_run
//! use stm32f4_usart::{config::UartConfig, drivers::usart::Uart, mmio::Mmio};
//!
//! // SAFETY: running on an STM32F4, sole owner of GPIOA/RCC/USART2
//! let bus = unsafe { Mmio::new() };
//! let mut uart = Uart::init(bus, UartConfig::RX_TX);
//! let byte = uart.read();
//! uart.write(i32::from(byte));
//! ```
//!
//! # Concurrency
//! Single caller context. Nothing arbitrates access to the peripheral
//! except the spinlock around the global console.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod config;
pub mod console;
pub mod drivers;
pub mod mmio;

pub use config::{compute_divisor, Direction, UartConfig, WaitPolicy};
pub use drivers::usart::{Error, Uart};
