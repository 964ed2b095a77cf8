use core::fmt;

use crate::boot::BootStep;
use crate::trap::plic::SourceId;

/// Errors raised while configuring the kernel core.
///
/// Nothing on the trap path returns one of these: they come out of
/// checked constructors and boot-time registration only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KernelError {
    /// Interrupt source ids are 1..=1023; 0 is the "no interrupt" sentinel.
    InvalidSource(u32),
    /// PLIC priorities are 0..=7.
    InvalidPriority(u32),
    /// Hart index beyond `NCPU`.
    InvalidHart(usize),
    /// `mstatus.MPP` encoding 0b10 is reserved.
    ReservedPrivilegeMode(usize),
    /// A boot step was applied before its precondition.
    BootOrder {
        expected: Option<BootStep>,
        found: BootStep,
    },
    /// Every slot in the dispatcher's route table is taken.
    RouteTableFull,
    /// The source already has a handler.
    DuplicateRoute(SourceId),
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::InvalidSource(id) => write!(f, "invalid interrupt source {}", id),
            KernelError::InvalidPriority(p) => write!(f, "invalid interrupt priority {}", p),
            KernelError::InvalidHart(h) => write!(f, "invalid hart {}", h),
            KernelError::ReservedPrivilegeMode(bits) => {
                write!(f, "reserved privilege mode encoding {:#b}", bits)
            }
            KernelError::BootOrder {
                expected: Some(expected),
                found,
            } => write!(f, "boot step {:?} applied, expected {:?}", found, expected),
            KernelError::BootOrder {
                expected: None,
                found,
            } => write!(f, "boot step {:?} applied after the sequence finished", found),
            KernelError::RouteTableFull => write!(f, "interrupt route table is full"),
            KernelError::DuplicateRoute(id) => {
                write!(f, "interrupt source {} already has a handler", id.get())
            }
        }
    }
}

pub type Result<T> = core::result::Result<T, KernelError>;
