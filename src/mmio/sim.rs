//! Simulated register block for host tests.
//!
//! Registers behave like plain memory, except for the USART2 status and
//! data registers, which model TXE/RXNE the way the peripheral does.

use std::collections::{HashMap, VecDeque};

use super::RegisterBus;
use crate::drivers::usart::{regs, Status};

#[derive(Debug, Default)]
pub struct SimBus {
    mem: HashMap<usize, u32>,
    /// Bytes waiting to be read from DR.
    rx: VecDeque<u8>,
    /// Every word written to DR, in order.
    pub tx: Vec<u32>,
    /// Every register write, in order.
    pub writes: Vec<(usize, u32)>,
    /// When set, TXE and TC never assert.
    pub tx_stalled: bool,
    /// Stall the transmitter once this many words have been written to DR.
    pub stall_after: Option<usize>,
    /// When set, the last byte is still in the shift register: TXE asserts
    /// but TC does not.
    pub tx_shifting: bool,
    /// Number of status register reads so far.
    pub status_reads: usize,
}

impl SimBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored value, bypassing peripheral semantics.
    pub fn peek(&self, addr: usize) -> u32 {
        self.mem.get(&addr).copied().unwrap_or(0)
    }

    pub fn poke(&mut self, addr: usize, value: u32) {
        self.mem.insert(addr, value);
    }

    pub fn queue_rx(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    fn tx_ready(&self) -> bool {
        !self.tx_stalled && self.stall_after.map_or(true, |n| self.tx.len() < n)
    }

    /// Index of the first write to `addr`, if any.
    pub fn first_write_to(&self, addr: usize) -> Option<usize> {
        self.writes.iter().position(|&(a, _)| a == addr)
    }
}

impl RegisterBus for SimBus {
    fn read(&mut self, addr: usize) -> u32 {
        match addr {
            regs::SR => {
                self.status_reads += 1;
                let mut status = Status::from_bits_retain(self.peek(addr));
                let ready = self.tx_ready();
                status.set(Status::TXE, ready);
                status.set(Status::TC, ready && !self.tx_shifting);
                status.set(Status::RXNE, !self.rx.is_empty());
                status.bits()
            }
            regs::DR => self.rx.pop_front().map_or(0, u32::from),
            _ => self.peek(addr),
        }
    }

    fn write(&mut self, addr: usize, value: u32) {
        self.writes.push((addr, value));
        if addr == regs::DR {
            self.tx.push(value);
        } else {
            self.mem.insert(addr, value);
        }
    }
}
