//=================================
// machine-mode setup, run once per hart from start() before kmain.

use crate::arch::reg::{
    mstatus, satp, Interrupts, PmpRegion, PrivilegeMode, DELEGATE_ALL_EXCEPTIONS,
    DELEGATE_ALL_INTERRUPTS,
};
use crate::arch::{Csr, CsrFile};
use crate::error::{KernelError, Result};

/// One step of the machine-to-supervisor handoff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootStep {
    /// set M Previous Privilege mode to Supervisor, for mret.
    RequestSupervisor,
    /// set M Exception Program Counter to the kernel entry, for mret.
    InstallEntry,
    /// disable paging for now.
    DisableTranslation,
    /// delegate all interrupts and exceptions to supervisor mode.
    DelegateTraps,
    /// let supervisor mode observe timer and external interrupts.
    UnmaskSupervisorInterrupts,
    /// give supervisor mode access to all of physical memory.
    GrantPhysicalMemory,
    /// switch to supervisor mode and jump to the kernel entry.
    ReturnToSupervisor,
}

/// The handoff, in the only order it may run.
pub const BOOT_SEQUENCE: [BootStep; 7] = [
    BootStep::RequestSupervisor,
    BootStep::InstallEntry,
    BootStep::DisableTranslation,
    BootStep::DelegateTraps,
    BootStep::UnmaskSupervisorInterrupts,
    BootStep::GrantPhysicalMemory,
    BootStep::ReturnToSupervisor,
];

impl BootStep {
    /// The step that must have completed before this one.
    pub const fn requires(self) -> Option<BootStep> {
        match self {
            BootStep::RequestSupervisor => None,
            BootStep::InstallEntry => Some(BootStep::RequestSupervisor),
            BootStep::DisableTranslation => Some(BootStep::InstallEntry),
            BootStep::DelegateTraps => Some(BootStep::DisableTranslation),
            BootStep::UnmaskSupervisorInterrupts => Some(BootStep::DelegateTraps),
            BootStep::GrantPhysicalMemory => Some(BootStep::UnmaskSupervisorInterrupts),
            BootStep::ReturnToSupervisor => Some(BootStep::GrantPhysicalMemory),
        }
    }
}

/// Privilege configuration of a hart as seen from machine mode just
/// before `mret`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HartPrivilegeState {
    /// Mode `mret` will switch to.
    pub pending_mode: Result<PrivilegeMode>,
    pub entry: usize,
    pub satp: usize,
    pub medeleg: usize,
    pub mideleg: usize,
    pub sie: Interrupts,
    pub pmp: PmpRegion,
}

impl HartPrivilegeState {
    pub fn capture<C: CsrFile + ?Sized>(csrs: &C) -> Self {
        Self {
            pending_mode: mstatus::mpp(csrs.read(Csr::Mstatus)),
            entry: csrs.read(Csr::Mepc),
            satp: csrs.read(Csr::Satp),
            medeleg: csrs.read(Csr::Medeleg),
            mideleg: csrs.read(Csr::Mideleg),
            sie: Interrupts::from_bits_truncate(csrs.read(Csr::Sie)),
            pmp: PmpRegion::decode(csrs.read(Csr::Pmpcfg0), csrs.read(Csr::Pmpaddr0)),
        }
    }

    /// Whether `mret` would land in supervisor mode with everything the
    /// kernel needs already configured.
    pub fn ready_for_supervisor(&self) -> bool {
        self.pending_mode == Ok(PrivilegeMode::Supervisor)
            && self.satp == satp::MODE_BARE
            && self.medeleg & DELEGATE_ALL_EXCEPTIONS == DELEGATE_ALL_EXCEPTIONS
            && self.mideleg & DELEGATE_ALL_INTERRUPTS == DELEGATE_ALL_INTERRUPTS
            && self.sie.contains(Interrupts::STI | Interrupts::SEI)
            && self.pmp == PmpRegion::full_access()
    }
}

/// Replays `BOOT_SEQUENCE` against a hart's CSRs.
pub struct Bootstrap<'c, C: CsrFile + ?Sized> {
    csrs: &'c mut C,
    entry: usize,
    done: usize,
}

impl<'c, C: CsrFile + ?Sized> Bootstrap<'c, C> {
    pub fn new(csrs: &'c mut C, entry: usize) -> Self {
        Self {
            csrs,
            entry,
            done: 0,
        }
    }

    /// The next step the sequence expects, if any.
    pub fn next_step(&self) -> Option<BootStep> {
        BOOT_SEQUENCE.get(self.done).copied()
    }

    /// Applies `step` if its precondition holds. An out-of-order step
    /// touches no register.
    pub fn apply(&mut self, step: BootStep) -> Result<()> {
        let expected = self.next_step();
        if expected != Some(step) {
            return Err(KernelError::BootOrder {
                expected,
                found: step,
            });
        }
        self.perform(step);
        self.done += 1;
        Ok(())
    }

    /// Runs every remaining step. On hardware this does not return; the
    /// returned snapshot is the state `mret` switched with.
    pub fn run(mut self) -> HartPrivilegeState {
        let mut snapshot = HartPrivilegeState::capture(&*self.csrs);
        while let Some(step) = self.next_step() {
            if step == BootStep::ReturnToSupervisor {
                snapshot = HartPrivilegeState::capture(&*self.csrs);
            }
            self.perform(step);
            self.done += 1;
        }
        snapshot
    }

    fn perform(&mut self, step: BootStep) {
        let csrs = &mut *self.csrs;
        match step {
            BootStep::RequestSupervisor => {
                let status = csrs.read(Csr::Mstatus);
                csrs.write(
                    Csr::Mstatus,
                    mstatus::with_mpp(status, PrivilegeMode::Supervisor),
                );
            }
            BootStep::InstallEntry => csrs.write(Csr::Mepc, self.entry),
            BootStep::DisableTranslation => csrs.write(Csr::Satp, satp::MODE_BARE),
            BootStep::DelegateTraps => {
                csrs.write(Csr::Medeleg, DELEGATE_ALL_EXCEPTIONS);
                csrs.write(Csr::Mideleg, DELEGATE_ALL_INTERRUPTS);
            }
            BootStep::UnmaskSupervisorInterrupts => {
                csrs.set_bits(Csr::Sie, Interrupts::SUPERVISOR.bits());
            }
            BootStep::GrantPhysicalMemory => {
                let region = PmpRegion::full_access();
                csrs.write(Csr::Pmpaddr0, region.addr);
                csrs.write(Csr::Pmpcfg0, region.cfg() as usize);
            }
            BootStep::ReturnToSupervisor => csrs.mode_return(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::layout::Platform;
    use crate::sim::SimCsrs;

    const ENTRY: usize = 0x8000_1000;

    #[test]
    fn every_step_requires_its_predecessor() {
        assert_eq!(BOOT_SEQUENCE[0].requires(), None);
        for pair in BOOT_SEQUENCE.windows(2) {
            assert_eq!(pair[1].requires(), Some(pair[0]));
        }
    }

    #[test]
    fn run_hands_off_to_supervisor() {
        let mut csrs = SimCsrs::new(0);
        let state = Bootstrap::new(&mut csrs, ENTRY).run();

        assert!(state.ready_for_supervisor(), "{:?}", state);
        assert_eq!(state.entry, ENTRY);
        assert_eq!(csrs.mode(), PrivilegeMode::Supervisor);
        assert_eq!(csrs.pc(), ENTRY);
        // mret drops MPP to the least-privileged mode.
        assert_eq!(mstatus::mpp(csrs.read(Csr::Mstatus)), Ok(PrivilegeMode::User));
    }

    #[test]
    fn pmp_covers_platform_ram_and_devices() {
        let platform = Platform::QEMU_VIRT;
        let mut csrs = SimCsrs::new(0);
        let state = Bootstrap::new(&mut csrs, platform.ram_base).run();

        assert!(state.pmp.grants_rwx(platform.ram_base));
        assert!(state.pmp.grants_rwx(platform.ram_end - 1));
        assert!(state.pmp.grants_rwx(platform.uart_base));
        assert!(state.pmp.grants_rwx(platform.plic_base));
    }

    #[test]
    fn request_supervisor_preserves_other_status_bits() {
        let mut csrs = SimCsrs::new(0);
        let before = mstatus::MIE | mstatus::MPIE | mstatus::MPP_MASK;
        csrs.write(Csr::Mstatus, before);

        let mut boot = Bootstrap::new(&mut csrs, ENTRY);
        assert_eq!(boot.apply(BootStep::RequestSupervisor), Ok(()));

        let after = csrs.read(Csr::Mstatus);
        assert_eq!(after & !mstatus::MPP_MASK, mstatus::MIE | mstatus::MPIE);
        assert_eq!(mstatus::mpp(after), Ok(PrivilegeMode::Supervisor));
    }

    #[test]
    fn unmask_keeps_existing_sie_bits() {
        let mut csrs = SimCsrs::new(0);
        csrs.write(Csr::Sie, 1 << 0);
        let mut boot = Bootstrap::new(&mut csrs, ENTRY);
        for step in &BOOT_SEQUENCE[..5] {
            assert_eq!(boot.apply(*step), Ok(()));
        }
        assert_eq!(
            csrs.read(Csr::Sie),
            (1 << 0) | Interrupts::SUPERVISOR.bits()
        );
    }

    #[test]
    fn out_of_order_step_is_rejected_without_side_effects() {
        let mut csrs = SimCsrs::new(0);
        let mut boot = Bootstrap::new(&mut csrs, ENTRY);

        assert_eq!(
            boot.apply(BootStep::GrantPhysicalMemory),
            Err(KernelError::BootOrder {
                expected: Some(BootStep::RequestSupervisor),
                found: BootStep::GrantPhysicalMemory,
            })
        );
        assert_eq!(boot.next_step(), Some(BootStep::RequestSupervisor));
        assert_eq!(csrs.read(Csr::Pmpcfg0), 0);
        assert_eq!(csrs.read(Csr::Pmpaddr0), 0);
        assert_eq!(csrs.mode(), PrivilegeMode::Machine);
    }

    #[test]
    fn stopping_before_pmp_leaves_hart_unready() {
        let mut csrs = SimCsrs::new(0);
        let mut boot = Bootstrap::new(&mut csrs, ENTRY);
        for step in &BOOT_SEQUENCE[..5] {
            assert_eq!(boot.apply(*step), Ok(()));
        }
        let state = HartPrivilegeState::capture(&csrs);
        assert!(!state.ready_for_supervisor());
        assert!(!state.pmp.grants_rwx(ENTRY));
    }

    #[test]
    fn applying_past_the_end_is_rejected() {
        let mut csrs = SimCsrs::new(0);
        let mut boot = Bootstrap::new(&mut csrs, ENTRY);
        for step in BOOT_SEQUENCE {
            assert_eq!(boot.apply(step), Ok(()));
        }
        assert_eq!(
            boot.apply(BootStep::ReturnToSupervisor),
            Err(KernelError::BootOrder {
                expected: None,
                found: BootStep::ReturnToSupervisor,
            })
        );
    }
}
