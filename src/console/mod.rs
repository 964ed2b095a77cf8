//! Console input and output.
//!
//! Input arrives one byte per UART interrupt and is echoed with simple
//! line editing. Output goes straight to the UART. Both are mirrored in
//! a [`ScreenBuffer`].

use core::ffi::CStr;
use core::fmt::{self, Write};

use spin::{Mutex, Once};

use crate::arch::{IntrGuard, Mmio};
use crate::driver::Uart;
use crate::param::COLUMNS_IN_LINE;
use crate::trap::plic::SourceId;
use crate::trap::IrqHandler;

pub mod screen;

#[cfg(test)]
mod tests_prop;

pub use screen::{Echo, ScreenBuffer};

// ESC[2J erases the display, ESC[H homes the cursor.
const CLEAR_SCREEN: &[u8] = b"\x1b[2J\x1b[H";

struct ConsoleInner<U: Mmio> {
    uart: Uart<U>,
    screen: ScreenBuffer,
}

impl<U: Mmio> ConsoleInner<U> {
    fn putc(&mut self, byte: u8) {
        if byte == b'\n' {
            self.uart.putc(b'\r');
        }
        self.uart.putc(byte);
        self.screen.record(byte);
    }
}

pub struct Console<U: Mmio> {
    inner: Mutex<ConsoleInner<U>>,
}

impl<U: Mmio> Console<U> {
    pub const fn new(uart: Uart<U>) -> Self {
        Self {
            inner: Mutex::new(ConsoleInner {
                uart,
                screen: ScreenBuffer::new(COLUMNS_IN_LINE),
            }),
        }
    }

    /// Turns on the UART receive interrupt.
    pub fn init(&self) {
        let _intr = IntrGuard::new();
        self.inner.lock().uart.init();
    }

    pub fn putc(&self, byte: u8) {
        let _intr = IntrGuard::new();
        self.inner.lock().putc(byte);
    }

    pub fn puts(&self, s: &str) {
        let _intr = IntrGuard::new();
        let mut inner = self.inner.lock();
        for byte in s.bytes() {
            inner.putc(byte);
        }
    }

    pub fn puts_cstr(&self, s: &CStr) {
        let _intr = IntrGuard::new();
        let mut inner = self.inner.lock();
        for &byte in s.to_bytes() {
            inner.putc(byte);
        }
    }

    /// Clears the terminal and the screen buffer.
    pub fn clear(&self) {
        let _intr = IntrGuard::new();
        let mut inner = self.inner.lock();
        for &byte in CLEAR_SCREEN {
            inner.uart.putc(byte);
        }
        inner.screen.clear();
    }

    /// Reads and echoes at most one byte from the UART.
    ///
    /// Returns `None` when nothing is waiting or when the console is
    /// already held, in which case the byte stays in the UART for the
    /// next interrupt.
    pub fn receive(&self) -> Option<Echo> {
        let _intr = IntrGuard::new();
        let mut guard = self.inner.try_lock()?;
        let ConsoleInner { uart, screen } = &mut *guard;
        let byte = uart.getc()?;
        let echo = screen.accept(byte);
        echo.transmit(|b| uart.putc(b));
        Some(echo)
    }

    pub fn with_screen<R>(&self, f: impl FnOnce(&ScreenBuffer) -> R) -> R {
        let _intr = IntrGuard::new();
        f(&self.inner.lock().screen)
    }

    pub fn with_uart<R>(&self, f: impl FnOnce(&mut Uart<U>) -> R) -> R {
        let _intr = IntrGuard::new();
        f(&mut self.inner.lock().uart)
    }

    /// Releases the console lock whoever holds it.
    ///
    /// # Safety
    ///
    /// Only for the panic path, once nothing else will run on this hart.
    /// The previous holder must never touch the console again.
    pub unsafe fn force_unlock(&self) {
        self.inner.force_unlock();
    }
}

impl<U: Mmio + Send> IrqHandler for Console<U> {
    fn handle(&self, _source: SourceId) {
        self.receive();
    }
}

/// Where formatted kernel output goes.
pub trait ConsoleSink: Sync {
    fn write_str(&self, s: &str);
}

impl<U: Mmio + Send> ConsoleSink for Console<U> {
    fn write_str(&self, s: &str) {
        self.puts(s);
    }
}

static SINK: Once<&'static dyn ConsoleSink> = Once::new();

/// Makes `sink` the target of `print!` and the logger. Only the first
/// call has any effect.
pub fn install(sink: &'static dyn ConsoleSink) {
    SINK.call_once(|| sink);
}

struct SinkWriter(&'static dyn ConsoleSink);

impl Write for SinkWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.write_str(s);
        Ok(())
    }
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    if let Some(&sink) = SINK.get() {
        let _ = SinkWriter(sink).write_fmt(args);
    }
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {
        $crate::console::_print(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! println {
    () => {
        $crate::print!("\n")
    };
    ($($arg:tt)*) => {
        $crate::print!("{}\n", format_args!($($arg)*))
    };
}
