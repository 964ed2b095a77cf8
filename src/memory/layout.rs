// Physical memory layout

// qemu -machine virt is set up like this,
// based on qemu's hw/riscv/virt.c:
//
// 00001000 -- boot ROM, provided by qemu
// 02000000 -- CLINT
// 0C000000 -- PLIC
// 10000000 -- uart0
// 10001000 -- virtio disk
// 80000000 -- boot ROM jumps here in machine mode
//             -kernel loads the kernel here
// unused RAM after 80000000.

// the kernel uses physical memory thus:
// 80000000 -- entry.S, then kernel text and data
// end -- first address after the kernel image
// PHYSTOP -- end RAM used by the kernel

// qemu puts UART registers here in physical memory.
pub const UART0: usize = 0x1000_0000;
pub const UART0_IRQ: u32 = 10;

// virtio disk interrupt line.
pub const VIRTIO0_IRQ: u32 = 1;

// qemu puts platform-level interrupt controller (PLIC) here.
pub const PLIC: usize = 0x0c00_0000;

// the kernel expects there to be RAM
// from physical address 0x80000000 to PHYSTOP.
pub const KERNBASE: usize = 0x8000_0000;
pub const PHYSTOP: usize = KERNBASE + 128 * 1024 * 1024;

/// Base addresses and interrupt lines of the devices the kernel drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Platform {
    pub uart_base: usize,
    pub uart_irq: u32,
    pub plic_base: usize,
    pub ram_base: usize,
    pub ram_end: usize,
}

impl Platform {
    pub const QEMU_VIRT: Platform = Platform {
        uart_base: UART0,
        uart_irq: UART0_IRQ,
        plic_base: PLIC,
        ram_base: KERNBASE,
        ram_end: PHYSTOP,
    };
}
