use static_assertions::const_assert;

use crate::error::{KernelError, Result};

pub const NCPU: usize = 8; // maximum number of CPUs
pub const KSTACK_SIZE: usize = 16 * 1024; // boot stack per CPU, see asm/entry.S

// software screen geometry for the console
pub const LINES: usize = 25;
pub const COLUMNS_IN_LINE: usize = 80;
pub const SCREENSIZE: usize = COLUMNS_IN_LINE * LINES;

const_assert!(SCREENSIZE % COLUMNS_IN_LINE == 0);
const_assert!(NCPU > 0);

/// Index of a hardware thread, checked against `NCPU`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HartId(usize);

impl HartId {
    /// The boot hart.
    pub const BOOT: HartId = HartId(0);

    pub const fn new(id: usize) -> Result<Self> {
        if id < NCPU {
            Ok(Self(id))
        } else {
            Err(KernelError::InvalidHart(id))
        }
    }

    pub const fn get(self) -> usize {
        self.0
    }

    /// Hart id cached in `tp` by `start()`.
    #[cfg(all(target_arch = "riscv64", target_os = "none"))]
    pub fn current() -> Result<Self> {
        Self::new(crate::arch::tp::read())
    }
}
