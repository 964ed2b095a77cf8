use crate::arch::reg::{mstatus, PrivilegeMode};
use crate::arch::{Csr, CsrFile};

/// A hart's CSRs held in memory, plus the current privilege mode and
/// program counter that `mret` changes.
#[derive(Clone, Debug)]
pub struct SimCsrs {
    regs: [usize; Csr::COUNT],
    mode: PrivilegeMode,
    pc: usize,
}

impl SimCsrs {
    /// A hart fresh out of reset: machine mode, every CSR zero.
    pub fn new(hartid: usize) -> Self {
        let mut regs = [0; Csr::COUNT];
        regs[Csr::Mhartid.index()] = hartid;
        Self {
            regs,
            mode: PrivilegeMode::Machine,
            pc: 0,
        }
    }

    pub fn mode(&self) -> PrivilegeMode {
        self.mode
    }

    pub fn pc(&self) -> usize {
        self.pc
    }
}

impl CsrFile for SimCsrs {
    fn read(&self, csr: Csr) -> usize {
        self.regs[csr.index()]
    }

    fn write(&mut self, csr: Csr, value: usize) {
        if !csr.is_read_only() {
            self.regs[csr.index()] = value;
        }
    }

    fn mode_return(&mut self) {
        let status = self.regs[Csr::Mstatus.index()];
        // MPP cannot hold the reserved encoding on real harts.
        self.mode = mstatus::mpp(status).unwrap_or(PrivilegeMode::User);

        let mut status = mstatus::with_mpp(status, PrivilegeMode::User);
        if status & mstatus::MPIE != 0 {
            status |= mstatus::MIE;
        } else {
            status &= !mstatus::MIE;
        }
        status |= mstatus::MPIE;
        self.regs[Csr::Mstatus.index()] = status;

        self.pc = self.regs[Csr::Mepc.index()];
    }
}
