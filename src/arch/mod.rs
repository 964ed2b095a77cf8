//! RISC-V privileged architecture support.
//!
//! The register encodings and the `CsrFile`/`Mmio` seams build on every
//! target; the functions that execute privileged instructions only exist
//! when compiling the bare-metal kernel image.

pub mod csr;
pub mod mmio;
pub mod reg;

pub use csr::{Csr, CsrFile};
pub use mmio::{Mmio, PhysMmio};

#[cfg(all(target_arch = "riscv64", target_os = "none"))]
pub use csr::HartCsrs;

#[cfg(all(target_arch = "riscv64", target_os = "none"))]
pub mod tp {
    use core::arch::asm;

    // keep each CPU's hartid in its tp register, for HartId::current().
    pub fn write(bits: usize) {
        unsafe {
            asm!("mv tp, {}", in(reg) bits);
        }
    }

    pub fn read() -> usize {
        let bits: usize;
        unsafe {
            asm!("mv {}, tp", out(reg) bits);
        }
        bits
    }
}

/// Sends supervisor traps to `vector` in direct mode.
#[cfg(all(target_arch = "riscv64", target_os = "none"))]
pub fn set_trap_vector(vector: usize) {
    use riscv::register::stvec::{self, TrapMode};
    unsafe {
        stvec::write(vector, TrapMode::Direct);
    }
}

/// Enables supervisor interrupt delivery.
#[cfg(all(target_arch = "riscv64", target_os = "none"))]
pub fn intr_on() {
    unsafe {
        riscv::register::sstatus::set_sie();
    }
}

/// Disables supervisor interrupt delivery.
#[cfg(all(target_arch = "riscv64", target_os = "none"))]
pub fn intr_off() {
    unsafe {
        riscv::register::sstatus::clear_sie();
    }
}

/// Whether supervisor interrupts are enabled.
#[cfg(all(target_arch = "riscv64", target_os = "none"))]
pub fn intr_get() -> bool {
    riscv::register::sstatus::read().sie()
}

// hosts take no interrupts.
#[cfg(not(all(target_arch = "riscv64", target_os = "none")))]
pub fn intr_on() {}

#[cfg(not(all(target_arch = "riscv64", target_os = "none")))]
pub fn intr_off() {}

#[cfg(not(all(target_arch = "riscv64", target_os = "none")))]
pub fn intr_get() -> bool {
    false
}

/// Keeps supervisor interrupts off while alive, like xv6's
/// `push_off`/`pop_off`. Dropping it turns them back on only if they were
/// on when it was created, so guards nest.
#[must_use]
pub struct IntrGuard {
    was_on: bool,
}

impl IntrGuard {
    pub fn new() -> Self {
        let was_on = intr_get();
        // disable the interrupt to avoid the deadlock.
        intr_off();
        Self { was_on }
    }
}

impl Default for IntrGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IntrGuard {
    fn drop(&mut self) {
        if self.was_on {
            intr_on();
        }
    }
}

#[cfg(all(target_arch = "riscv64", target_os = "none"))]
pub fn wfi() {
    unsafe {
        riscv::asm::wfi();
    }
}
