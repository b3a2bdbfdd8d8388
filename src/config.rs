//! Serial line configuration
//!
//! The board runs from the 16 MHz internal oscillator with no PLL, so the
//! APB1 clock feeding USART2 equals the system clock.

use core::fmt;

use crate::drivers::usart::Control;

/// System clock frequency (HSI)
pub const SYS_FREQ_HZ: u32 = 16_000_000;

/// APB1 peripheral clock frequency
pub const APB1_CLOCK_HZ: u32 = SYS_FREQ_HZ;

/// Default line rate
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Compute the BRR value for a peripheral clock and baud rate.
///
/// Rounds `clock / baud_rate` to the nearest integer using integer
/// arithmetic only. The result is truncated to the 16-bit register width;
/// use [`UartConfig::validate`] to detect out-of-range ratios.
///
/// # Panics
/// Panics if `baud_rate` is zero.
#[inline]
pub const fn compute_divisor(clock: u32, baud_rate: u32) -> u16 {
    rounded_ratio(clock, baud_rate) as u16
}

/// `clock / baud_rate` rounded to nearest, before truncation to BRR width.
#[inline]
const fn rounded_ratio(clock: u32, baud_rate: u32) -> u64 {
    (clock as u64 + (baud_rate / 2) as u64) / baud_rate as u64
}

/// Which halves of the link are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Transmitter only. The RX pin is left untouched.
    TxOnly,
    /// Transmitter and receiver.
    RxTx,
}

impl Direction {
    /// CR1 direction bits for this capability set.
    #[inline]
    pub const fn cr1_bits(self) -> Control {
        match self {
            Direction::TxOnly => Control::TE,
            Direction::RxTx => Control::TE.union(Control::RE),
        }
    }

    /// Whether the receiver (and RX pin) is claimed.
    #[inline]
    pub const fn receives(self) -> bool {
        matches!(self, Direction::RxTx)
    }
}

/// How long the `try_*` transfer primitives poll a status flag.
///
/// The plain blocking primitives always wait forever regardless of this
/// setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitPolicy {
    /// Spin until the flag asserts.
    #[default]
    Forever,
    /// Give up after this many status reads.
    Spins(u32),
}

/// Configuration rejected by [`UartConfig::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Baud rate of zero
    ZeroBaudRate,
    /// Rounded divisor is zero (baud rate far above the clock)
    DivisorTooSmall,
    /// Rounded divisor does not fit the 16-bit BRR
    DivisorOverflow {
        /// Untruncated divisor
        divisor: u32,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroBaudRate => write!(f, "baud rate is zero"),
            ConfigError::DivisorTooSmall => write!(f, "baud rate too high for clock"),
            ConfigError::DivisorOverflow { divisor } => {
                write!(f, "divisor {:#x} exceeds BRR width", divisor)
            }
        }
    }
}

/// Full serial port configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartConfig {
    pub direction: Direction,
    /// Peripheral input clock in Hz
    pub clock_hz: u32,
    pub baud_rate: u32,
    pub wait: WaitPolicy,
}

impl UartConfig {
    /// Receive and transmit at 115200 baud from the 16 MHz APB1 clock.
    pub const RX_TX: Self = Self {
        direction: Direction::RxTx,
        clock_hz: APB1_CLOCK_HZ,
        baud_rate: DEFAULT_BAUD_RATE,
        wait: WaitPolicy::Forever,
    };

    /// Transmit only, e.g. for a debug console that must not claim PA3.
    pub const TX_ONLY: Self = Self {
        direction: Direction::TxOnly,
        ..Self::RX_TX
    };

    pub const fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub const fn with_clock(mut self, clock_hz: u32) -> Self {
        self.clock_hz = clock_hz;
        self
    }

    pub const fn with_wait(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    /// Check the clock/baud ratio fits the divisor register.
    ///
    /// Returns the divisor that will be written to BRR.
    pub fn validate(&self) -> Result<u16, ConfigError> {
        if self.baud_rate == 0 {
            return Err(ConfigError::ZeroBaudRate);
        }

        let divisor = rounded_ratio(self.clock_hz, self.baud_rate);
        match divisor {
            0 => Err(ConfigError::DivisorTooSmall),
            1..=0xFFFF => Ok(divisor as u16),
            _ => Err(ConfigError::DivisorOverflow {
                divisor: divisor as u32,
            }),
        }
    }

    /// BRR value for this configuration.
    ///
    /// # Panics
    /// Panics if the baud rate is zero.
    #[inline]
    pub const fn divisor(&self) -> u16 {
        compute_divisor(self.clock_hz, self.baud_rate)
    }
}

impl Default for UartConfig {
    fn default() -> Self {
        Self::RX_TX
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_divisor() {
        assert_eq!(compute_divisor(16_000_000, 115_200), 139);
        assert_eq!(UartConfig::RX_TX.divisor(), 139);
    }

    #[test]
    fn test_divisor_rounds_to_nearest() {
        // 3.33 rounds down
        assert_eq!(compute_divisor(1_000_000, 300_000), 3);
        // 2.5 rounds up
        assert_eq!(compute_divisor(5, 2), 3);
        // 9600 baud: 1666.67
        assert_eq!(compute_divisor(16_000_000, 9_600), 1667);
    }

    #[test]
    fn test_divisor_truncates_to_register_width() {
        // 16e6 / 200 = 80000 = 0x13880
        assert_eq!(compute_divisor(16_000_000, 200), 0x3880);
    }

    #[test]
    fn test_validate_agrees_with_compute_divisor() {
        let cases = [
            (16_000_000, 115_200),
            (16_000_000, 9_600),
            (1_000_000, 300_000),
            (5, 2),
        ];
        for (clock, baud) in cases {
            let config = UartConfig::RX_TX.with_clock(clock).with_baud_rate(baud);
            assert_eq!(config.validate(), Ok(compute_divisor(clock, baud)));
        }
    }

    #[test]
    fn test_validate() {
        assert_eq!(UartConfig::RX_TX.validate(), Ok(139));
        assert_eq!(
            UartConfig::RX_TX.with_baud_rate(0).validate(),
            Err(ConfigError::ZeroBaudRate)
        );
        assert_eq!(
            UartConfig::RX_TX.with_baud_rate(200).validate(),
            Err(ConfigError::DivisorOverflow { divisor: 80_000 })
        );
        assert_eq!(
            UartConfig::TX_ONLY.with_clock(1_000).with_baud_rate(115_200).validate(),
            Err(ConfigError::DivisorTooSmall)
        );
    }

    #[test]
    fn test_direction_bits() {
        assert_eq!(Direction::TxOnly.cr1_bits(), Control::TE);
        assert_eq!(Direction::RxTx.cr1_bits(), Control::TE | Control::RE);
        assert!(!UartConfig::TX_ONLY.direction.receives());
        assert_eq!(UartConfig::TX_ONLY.baud_rate, DEFAULT_BAUD_RATE);
    }
}
