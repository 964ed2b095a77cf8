//! Field encodings for the privileged registers the kernel programs.

use bitflags::bitflags;

use crate::error::{KernelError, Result};

/// Privilege level, as encoded in `mstatus.MPP`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum PrivilegeMode {
    User = 0b00,
    Supervisor = 0b01,
    Machine = 0b11,
}

impl PrivilegeMode {
    /// Decodes a two-bit privilege field. 0b10 is reserved.
    pub const fn from_bits(bits: usize) -> Result<Self> {
        match bits {
            0b00 => Ok(PrivilegeMode::User),
            0b01 => Ok(PrivilegeMode::Supervisor),
            0b11 => Ok(PrivilegeMode::Machine),
            _ => Err(KernelError::ReservedPrivilegeMode(bits)),
        }
    }

    pub const fn bits(self) -> usize {
        self as usize
    }
}

pub mod mstatus {
    use super::PrivilegeMode;
    use crate::error::Result;

    pub const SIE: usize = 1 << 1;
    pub const MIE: usize = 1 << 3;
    pub const MPIE: usize = 1 << 7;
    pub const MPP_SHIFT: usize = 11;
    pub const MPP_MASK: usize = 0b11 << MPP_SHIFT;

    /// Replaces the MPP field of `status`, keeping every other bit.
    pub const fn with_mpp(status: usize, mode: PrivilegeMode) -> usize {
        (status & !MPP_MASK) | (mode.bits() << MPP_SHIFT)
    }

    pub const fn mpp(status: usize) -> Result<PrivilegeMode> {
        PrivilegeMode::from_bits((status & MPP_MASK) >> MPP_SHIFT)
    }
}

bitflags! {
    /// Interrupt bits shared by `mie`/`mip`/`mideleg` and their
    /// supervisor views `sie`/`sip`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Interrupts: usize {
        const SSI = 1 << 1; // supervisor software
        const MSI = 1 << 3; // machine software
        const STI = 1 << 5; // supervisor timer
        const MTI = 1 << 7; // machine timer
        const SEI = 1 << 9; // supervisor external
        const MEI = 1 << 11; // machine external
    }
}

impl Interrupts {
    /// Classes unmasked in `sie` before handing control to the kernel.
    pub const SUPERVISOR: Interrupts = Interrupts::SSI
        .union(Interrupts::STI)
        .union(Interrupts::SEI);
}

// delegate all interrupts and exceptions to supervisor mode.
// bits the hart cannot delegate are WARL and read back as zero.
pub const DELEGATE_ALL_EXCEPTIONS: usize = 0xffff;
pub const DELEGATE_ALL_INTERRUPTS: usize = 0xffff;

pub mod satp {
    /// No translation, no protection.
    pub const MODE_BARE: usize = 0;
}

bitflags! {
    /// Permission bits of one `pmpNcfg` byte.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PmpPerm: u8 {
        const R = 1 << 0;
        const W = 1 << 1;
        const X = 1 << 2;
        const L = 1 << 7;
    }
}

/// Address-matching mode of a PMP entry (`pmpNcfg.A`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PmpMatch {
    Off = 0,
    /// Top of range: covers `[previous pmpaddr, pmpaddr)`.
    Tor = 1,
    Na4 = 2,
    Napot = 3,
}

impl PmpMatch {
    const SHIFT: u8 = 3;
    const MASK: u8 = 0b11 << Self::SHIFT;

    const fn from_cfg(cfg: u8) -> Self {
        match (cfg & Self::MASK) >> Self::SHIFT {
            0 => PmpMatch::Off,
            1 => PmpMatch::Tor,
            2 => PmpMatch::Na4,
            _ => PmpMatch::Napot,
        }
    }
}

/// Largest value `pmpaddr` holds on RV64: physical address bits 55:2.
pub const PMP_ADDR_MAX: usize = 0x3f_ffff_ffff_ffff;

/// PMP entry 0 as programmed through `pmpaddr0`/`pmpcfg0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PmpRegion {
    pub perm: PmpPerm,
    pub matching: PmpMatch,
    /// Physical address shifted right by two.
    pub addr: usize,
}

impl PmpRegion {
    /// One top-of-range region with read/write/execute over all of
    /// physical memory.
    pub const fn full_access() -> Self {
        Self {
            perm: PmpPerm::R.union(PmpPerm::W).union(PmpPerm::X),
            matching: PmpMatch::Tor,
            addr: PMP_ADDR_MAX,
        }
    }

    pub const fn cfg(&self) -> u8 {
        self.perm.bits() | ((self.matching as u8) << PmpMatch::SHIFT)
    }

    /// Decodes entry 0 from raw `pmpcfg0` and `pmpaddr0` values.
    pub const fn decode(pmpcfg0: usize, pmpaddr0: usize) -> Self {
        let cfg = (pmpcfg0 & 0xff) as u8;
        Self {
            perm: PmpPerm::from_bits_truncate(cfg),
            matching: PmpMatch::from_cfg(cfg),
            addr: pmpaddr0,
        }
    }

    /// Whether supervisor mode may read, write and execute at `pa`.
    /// Only entry 0 in TOR mode is modelled.
    pub fn grants_rwx(&self, pa: usize) -> bool {
        let rwx = PmpPerm::R | PmpPerm::W | PmpPerm::X;
        self.matching == PmpMatch::Tor && self.perm.contains(rwx) && (pa >> 2) < self.addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privilege_mode_rejects_reserved_encoding() {
        assert_eq!(PrivilegeMode::from_bits(1), Ok(PrivilegeMode::Supervisor));
        assert_eq!(
            PrivilegeMode::from_bits(2),
            Err(KernelError::ReservedPrivilegeMode(2))
        );
        assert!(PrivilegeMode::from_bits(4).is_err());
    }

    #[test]
    fn mpp_update_keeps_other_bits() {
        let status = mstatus::MPP_MASK | mstatus::SIE | mstatus::MPIE;
        let updated = mstatus::with_mpp(status, PrivilegeMode::Supervisor);
        assert_eq!(updated & !mstatus::MPP_MASK, mstatus::SIE | mstatus::MPIE);
        assert_eq!(mstatus::mpp(updated), Ok(PrivilegeMode::Supervisor));
    }

    #[test]
    fn full_access_region_encodes_like_xv6() {
        let region = PmpRegion::full_access();
        assert_eq!(region.cfg(), 0xf);
        assert_eq!(PmpRegion::decode(0xf, PMP_ADDR_MAX), region);
        assert!(region.grants_rwx(0x8000_0000));
        assert!(region.grants_rwx(0x1000_0000));
        assert!(!PmpRegion::decode(0x0, PMP_ADDR_MAX).grants_rwx(0x8000_0000));
    }

    #[test]
    fn supervisor_interrupt_classes() {
        assert_eq!(Interrupts::SUPERVISOR.bits(), (1 << 1) | (1 << 5) | (1 << 9));
    }
}
