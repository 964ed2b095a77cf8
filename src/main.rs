//! The RamOS kernel image.
//!
//! `_entry` (asm/entry.S) sets up a stack and calls `start` in machine
//! mode; `start` hands the hart to supervisor mode at `kmain`, which
//! brings up the console and the PLIC and then idles until interrupts
//! arrive at `kerneltrap`.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(all(target_arch = "riscv64", target_os = "none"))]
mod kernel {
    use core::arch::global_asm;
    use core::panic::PanicInfo;

    use log::info;
    use riscv::register::{scause, sepc, sstatus, stval};
    use spin::Mutex;

    use ramos::arch::{self, Csr, CsrFile, HartCsrs, PhysMmio};
    use ramos::boot::Bootstrap;
    use ramos::console::{self, Console};
    use ramos::driver::Uart;
    use ramos::logger;
    use ramos::memory::layout::Platform;
    use ramos::param::{HartId, KSTACK_SIZE, NCPU};
    use ramos::println;
    use ramos::trap::plic::{Plic, Priority, SourceId};
    use ramos::trap::{self, Dispatcher, TrapOutcome};

    global_asm!(include_str!("asm/entry.S"));
    global_asm!(include_str!("asm/kernelvec.S"));

    extern "C" {
        fn kernelvec();
    }

    const PLATFORM: Platform = Platform::QEMU_VIRT;

    #[repr(C, align(16))]
    struct Stack([u8; KSTACK_SIZE * NCPU]);

    // entry.S needs one stack per CPU.
    #[export_name = "stack0"]
    static mut STACK0: Stack = Stack([0; KSTACK_SIZE * NCPU]);

    static CONSOLE: Console<PhysMmio> =
        Console::new(Uart::new(unsafe { PhysMmio::new() }, PLATFORM.uart_base));

    // filled in by kmain, used only from kerneltrap.
    static DISPATCHER: Mutex<Option<Dispatcher<'static, PhysMmio>>> = Mutex::new(None);

    // entry.S jumps here in machine mode on stack0.
    #[no_mangle]
    extern "C" fn start() -> ! {
        let mut csrs = HartCsrs;

        // keep each CPU's hartid in its tp register, for HartId::current().
        arch::tp::write(csrs.read(Csr::Mhartid));

        // switch to supervisor mode and jump to kmain().
        Bootstrap::new(&mut csrs, kmain as usize).run();

        loop {
            arch::wfi();
        }
    }

    extern "C" fn kmain() -> ! {
        CONSOLE.clear();
        console::install(&CONSOLE);
        if let Err(err) = logger::init() {
            println!("logger: {}", err);
        }

        #[cfg(feature = "boot_banner")]
        {
            println!("RamOS RISC-V Kernel");
            println!("Type something...");
            println!();
        }

        let hart = match HartId::current() {
            Ok(hart) => hart,
            Err(err) => panic!("kmain: {}", err),
        };
        let uart = match SourceId::new(PLATFORM.uart_irq) {
            Ok(source) => source,
            Err(err) => panic!("kmain: {}", err),
        };

        CONSOLE.init();

        let mut plic = Plic::new(unsafe { PhysMmio::new() }, PLATFORM.plic_base);
        plic.configure(&[uart]);
        plic.enable(hart, uart);
        plic.set_threshold(hart, Priority::ACCEPT_ALL);

        let mut dispatcher = Dispatcher::new(plic);
        if let Err(err) = dispatcher.register(uart, &CONSOLE) {
            panic!("kmain: {}", err);
        }
        *DISPATCHER.lock() = Some(dispatcher);

        arch::set_trap_vector(kernelvec as usize);
        arch::intr_on();
        info!("hart {} waiting for interrupts", hart.get());

        loop {
            arch::wfi();
        }
    }

    // interrupts and exceptions from kernel code go here via kernelvec,
    // on whatever the current kernel stack is.
    #[no_mangle]
    extern "C" fn kerneltrap() {
        assert!(!sstatus::read().sie(), "kerneltrap: interrupts enabled");

        let cause = trap::decode_cause(scause::read().bits());
        let hart = match HartId::current() {
            Ok(hart) => hart,
            Err(err) => panic!("kerneltrap: {}", err),
        };

        let outcome = match DISPATCHER.lock().as_mut() {
            Some(dispatcher) => dispatcher.dispatch(hart, cause),
            None => panic!("kerneltrap: {:?} before the dispatcher is ready", cause),
        };

        if let TrapOutcome::Fatal(exception) = outcome {
            panic!(
                "kerneltrap: {:?} sepc={:#x} stval={:#x}",
                exception,
                sepc::read(),
                stval::read()
            );
        }
    }

    #[panic_handler]
    fn panic(info: &PanicInfo<'_>) -> ! {
        arch::intr_off();
        // the panicking code may have been holding the console.
        unsafe { CONSOLE.force_unlock() };
        println!("{}", info);
        loop {
            arch::wfi();
        }
    }
}

#[cfg(not(target_os = "none"))]
fn main() {}
