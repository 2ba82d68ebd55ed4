//! Raw byte transport implemented by the host.

use std::io;

/// Byte-level I/O primitive the shell runs on top of (UART, stdio, socket).
///
/// The input unit calls `available`/`read`/`is_closed`; the output unit
/// calls `print`. Both go through the same mutex, so implementations only
/// need `Send`. `read` must not block: it is only called for bytes that
/// `available` reported.
pub trait Transport: Send {
    /// Write bytes to the display side.
    fn print(&mut self, data: &[u8]) -> io::Result<()>;

    /// Number of bytes that can be read without blocking.
    fn available(&mut self) -> usize;

    /// Read up to `buf.len()` bytes, returning how many were read.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Discard bytes buffered on the input side.
    ///
    /// Called when the runtime starts and when it shuts down.
    fn flush_in(&mut self) {}

    /// Push out (or discard) bytes buffered on the output side.
    ///
    /// Called when the runtime starts and when it shuts down.
    fn flush_out(&mut self) {}

    /// Whether the input side has ended (EOF, disconnect).
    fn is_closed(&self) -> bool {
        false
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn print(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).print(data)
    }

    fn available(&mut self) -> usize {
        (**self).available()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn flush_in(&mut self) {
        (**self).flush_in()
    }

    fn flush_out(&mut self) {
        (**self).flush_out()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}
