//! Register-level models of the hardware the kernel core drives.
//!
//! They implement the same `CsrFile` and `Mmio` seams as the real
//! hardware, so the bootstrap, the PLIC driver and the console can be
//! exercised on a host without privileged instructions or MMIO.

mod csr;
mod plic;
mod uart;

pub use csr::SimCsrs;
pub use plic::{SimPlic, SIM_SOURCES};
pub use uart::SimUart;
