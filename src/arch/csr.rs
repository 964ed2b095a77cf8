//! Control-and-status register access.
//!
//! Reads have no side effects beyond what the architecture defines for the
//! register; writes replace the whole value. Nothing here validates
//! encodings: an illegal access traps, which is outside this layer.

/// The CSRs the kernel core touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Csr {
    Mstatus,
    Mepc,
    Satp,
    Medeleg,
    Mideleg,
    Sie,
    Pmpaddr0,
    Pmpcfg0,
    Mhartid,
    Sstatus,
    Stvec,
    Scause,
    Sepc,
    Stval,
}

impl Csr {
    pub const COUNT: usize = 14;

    /// Architectural CSR number.
    pub const fn number(self) -> u16 {
        match self {
            Csr::Mstatus => 0x300,
            Csr::Mepc => 0x341,
            Csr::Satp => 0x180,
            Csr::Medeleg => 0x302,
            Csr::Mideleg => 0x303,
            Csr::Sie => 0x104,
            Csr::Pmpaddr0 => 0x3b0,
            Csr::Pmpcfg0 => 0x3a0,
            Csr::Mhartid => 0xf14,
            Csr::Sstatus => 0x100,
            Csr::Stvec => 0x105,
            Csr::Scause => 0x142,
            Csr::Sepc => 0x141,
            Csr::Stval => 0x143,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// CSR numbers with the top two bits set are read-only.
    pub const fn is_read_only(self) -> bool {
        self.number() >> 10 == 0b11
    }
}

/// Per-hart register file. The hardware implementation is `HartCsrs`;
/// tests substitute `sim::SimCsrs`.
pub trait CsrFile {
    fn read(&self, csr: Csr) -> usize;

    fn write(&mut self, csr: Csr, value: usize);

    /// Executes `mret`: switch to `mstatus.MPP` and jump to `mepc`.
    /// Never returns on hardware.
    fn mode_return(&mut self);

    fn set_bits(&mut self, csr: Csr, mask: usize) {
        let value = self.read(csr);
        self.write(csr, value | mask);
    }

    fn clear_bits(&mut self, csr: Csr, mask: usize) {
        let value = self.read(csr);
        self.write(csr, value & !mask);
    }
}

#[cfg(all(target_arch = "riscv64", target_os = "none"))]
pub use self::hart::HartCsrs;

#[cfg(all(target_arch = "riscv64", target_os = "none"))]
mod hart {
    use super::{Csr, CsrFile};
    use core::arch::asm;
    use riscv::register;

    macro_rules! csrr {
        ($name:literal) => {{
            let bits: usize;
            unsafe {
                asm!(concat!("csrr {0}, ", $name), out(reg) bits, options(nomem, nostack));
            }
            bits
        }};
    }

    macro_rules! csrw {
        ($name:literal, $bits:expr) => {{
            let bits: usize = $bits;
            unsafe {
                asm!(concat!("csrw ", $name, ", {0}"), in(reg) bits, options(nostack));
            }
        }};
    }

    /// The executing hart's own CSRs.
    pub struct HartCsrs;

    impl CsrFile for HartCsrs {
        fn read(&self, csr: Csr) -> usize {
            match csr {
                Csr::Mstatus => csrr!("mstatus"),
                Csr::Mepc => register::mepc::read(),
                Csr::Satp => register::satp::read().bits(),
                Csr::Medeleg => csrr!("medeleg"),
                Csr::Mideleg => csrr!("mideleg"),
                Csr::Sie => csrr!("sie"),
                Csr::Pmpaddr0 => register::pmpaddr0::read(),
                Csr::Pmpcfg0 => csrr!("pmpcfg0"),
                Csr::Mhartid => register::mhartid::read(),
                Csr::Sstatus => csrr!("sstatus"),
                Csr::Stvec => csrr!("stvec"),
                Csr::Scause => register::scause::read().bits(),
                Csr::Sepc => register::sepc::read(),
                Csr::Stval => register::stval::read(),
            }
        }

        fn write(&mut self, csr: Csr, value: usize) {
            match csr {
                Csr::Mstatus => csrw!("mstatus", value),
                Csr::Mepc => register::mepc::write(value),
                Csr::Satp => register::satp::write(value),
                Csr::Medeleg => csrw!("medeleg", value),
                Csr::Mideleg => csrw!("mideleg", value),
                Csr::Sie => csrw!("sie", value),
                Csr::Pmpaddr0 => register::pmpaddr0::write(value),
                Csr::Pmpcfg0 => register::pmpcfg0::write(value),
                Csr::Mhartid => {}
                Csr::Sstatus => csrw!("sstatus", value),
                Csr::Stvec => csrw!("stvec", value),
                Csr::Scause => csrw!("scause", value),
                Csr::Sepc => register::sepc::write(value),
                Csr::Stval => csrw!("stval", value),
            }
        }

        fn mode_return(&mut self) {
            unsafe {
                asm!("mret", options(noreturn));
            }
        }
    }
}
