//! RamOS kernel core for the QEMU RISC-V `virt` machine.
//!
//! Everything that touches hardware goes through the [`arch::CsrFile`]
//! and [`arch::Mmio`] seams, so the whole core also builds and runs on a
//! host against the register models in [`sim`]. The kernel image itself
//! lives in `main.rs`.

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod boot;
pub mod console;
pub mod driver;
pub mod error;
pub mod logger;
pub mod memory;
pub mod param;
pub mod sim;
pub mod trap;

pub use error::{KernelError, Result};
