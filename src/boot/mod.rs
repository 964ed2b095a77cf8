pub mod start;

pub use start::{BootStep, Bootstrap, HartPrivilegeState, BOOT_SEQUENCE};
