use crate::arch::Mmio;
use crate::driver::uart::{IER, LSR, LSR_RX_READY, LSR_TX_IDLE, RHR, THR};

const RX_CAPACITY: usize = 64;
const TX_CAPACITY: usize = 8192;

/// A 16550 that always has room to transmit and records every byte
/// written to its holding register.
#[derive(Clone, Debug)]
pub struct SimUart {
    base: usize,
    rx: [u8; RX_CAPACITY],
    rx_head: usize,
    rx_len: usize,
    tx: [u8; TX_CAPACITY],
    tx_len: usize,
    ier: u8,
}

impl SimUart {
    pub const fn new(base: usize) -> Self {
        Self {
            base,
            rx: [0; RX_CAPACITY],
            rx_head: 0,
            rx_len: 0,
            tx: [0; TX_CAPACITY],
            tx_len: 0,
            ier: 0,
        }
    }

    /// Queues bytes on the receive side. Returns how many fit.
    pub fn push_rx(&mut self, bytes: &[u8]) -> usize {
        let mut accepted = 0;
        for &byte in bytes {
            if self.rx_len == RX_CAPACITY {
                break;
            }
            self.rx[(self.rx_head + self.rx_len) % RX_CAPACITY] = byte;
            self.rx_len += 1;
            accepted += 1;
        }
        accepted
    }

    pub fn rx_pending(&self) -> usize {
        self.rx_len
    }

    pub fn transmitted(&self) -> &[u8] {
        &self.tx[..self.tx_len]
    }

    pub fn clear_transmitted(&mut self) {
        self.tx_len = 0;
    }

    pub fn ier(&self) -> u8 {
        self.ier
    }

    fn pop_rx(&mut self) -> u8 {
        if self.rx_len == 0 {
            return 0;
        }
        let byte = self.rx[self.rx_head];
        self.rx_head = (self.rx_head + 1) % RX_CAPACITY;
        self.rx_len -= 1;
        byte
    }
}

impl Mmio for SimUart {
    fn read8(&mut self, addr: usize) -> u8 {
        match addr.checked_sub(self.base) {
            Some(RHR) => self.pop_rx(),
            Some(IER) => self.ier,
            Some(LSR) => {
                let ready = if self.rx_len > 0 { LSR_RX_READY } else { 0 };
                LSR_TX_IDLE | ready
            }
            _ => 0,
        }
    }

    fn write8(&mut self, addr: usize, value: u8) {
        match addr.checked_sub(self.base) {
            Some(THR) => {
                if self.tx_len < TX_CAPACITY {
                    self.tx[self.tx_len] = value;
                    self.tx_len += 1;
                }
            }
            Some(IER) => self.ier = value,
            _ => {}
        }
    }

    fn read32(&mut self, _addr: usize) -> u32 {
        0
    }

    fn write32(&mut self, _addr: usize, _value: u32) {}
}
