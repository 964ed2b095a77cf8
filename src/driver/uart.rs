// low-level driver routines for the 16550a UART.
// qemu's virt machine pre-programs the baud rate and line control,
// so the kernel only switches on the receive interrupt.

use core::hint::spin_loop;

use crate::arch::Mmio;

// the UART control registers.
// some have different meanings for read vs write.
// see http://byterunner.com/16550.html
pub(crate) const RHR: usize = 0; // receive holding register (for input bytes)
pub(crate) const THR: usize = 0; // transmit holding register (for output bytes)
pub(crate) const IER: usize = 1; // interrupt enable register
pub(crate) const LSR: usize = 5; // line status register

pub(crate) const IER_RX_ENABLE: u8 = 1 << 0;
pub(crate) const LSR_RX_READY: u8 = 1 << 0; // input is waiting to be read from RHR
pub(crate) const LSR_TX_IDLE: u8 = 1 << 5; // THR can accept another character to send

pub struct Uart<M: Mmio> {
    io: M,
    base: usize,
}

impl<M: Mmio> Uart<M> {
    pub const fn new(io: M, base: usize) -> Self {
        Self { io, base }
    }

    pub fn init(&mut self) {
        // enable receive interrupts.
        self.io.write8(self.base + IER, IER_RX_ENABLE);
    }

    pub fn rx_ready(&mut self) -> bool {
        self.io.read8(self.base + LSR) & LSR_RX_READY != 0
    }

    /// Reads one input byte, or `None` if nothing is waiting.
    pub fn getc(&mut self) -> Option<u8> {
        if self.rx_ready() {
            Some(self.io.read8(self.base + RHR))
        } else {
            None
        }
    }

    /// Waits for the transmit holding register to drain, then sends `byte`.
    pub fn putc(&mut self, byte: u8) {
        while self.io.read8(self.base + LSR) & LSR_TX_IDLE == 0 {
            spin_loop();
        }
        self.io.write8(self.base + THR, byte);
    }

    pub fn io(&self) -> &M {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut M {
        &mut self.io
    }
}
