//! Memory-mapped device register access.

use core::ptr::{read_volatile, write_volatile};

/// Byte and word accessors for device registers at physical addresses.
///
/// Accessors take `&mut self` because device reads can have side effects
/// (reading the PLIC claim register takes ownership of an interrupt).
pub trait Mmio {
    fn read8(&mut self, addr: usize) -> u8;
    fn write8(&mut self, addr: usize, value: u8);
    fn read32(&mut self, addr: usize) -> u32;
    fn write32(&mut self, addr: usize, value: u32);
}

/// Volatile loads and stores straight to physical memory.
#[derive(Debug)]
pub struct PhysMmio(());

impl PhysMmio {
    /// # Safety
    ///
    /// Every address later passed to the accessors must be a device
    /// register mapped at that physical address, with paging off.
    pub const unsafe fn new() -> Self {
        Self(())
    }
}

impl Mmio for PhysMmio {
    fn read8(&mut self, addr: usize) -> u8 {
        unsafe { read_volatile(addr as *const u8) }
    }

    fn write8(&mut self, addr: usize, value: u8) {
        unsafe { write_volatile(addr as *mut u8, value) }
    }

    fn read32(&mut self, addr: usize) -> u32 {
        unsafe { read_volatile(addr as *const u32) }
    }

    fn write32(&mut self, addr: usize, value: u32) {
        unsafe { write_volatile(addr as *mut u32, value) }
    }
}
