//! In-memory loopback transport.
//!
//! Input is pushed by the host (or a test) and output is captured in a
//! buffer. Clones share the same buffers, so one clone can be handed to the
//! runtime while another drives it.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use vtty_types::sync::lock;

use crate::transport::Transport;

#[derive(Debug, Default)]
struct MemoryInner {
    input: VecDeque<u8>,
    output: Vec<u8>,
    closed: bool,
}

/// Shared in-memory transport.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes to the input side.
    pub fn push_input(&self, bytes: impl AsRef<[u8]>) {
        lock(&self.inner).input.extend(bytes.as_ref());
    }

    /// Mark the input side as ended. Bytes already pushed are still read.
    pub fn close(&self) {
        lock(&self.inner).closed = true;
    }

    /// Everything printed so far (lossy UTF-8).
    pub fn output(&self) -> String {
        String::from_utf8_lossy(&lock(&self.inner).output).into_owned()
    }

    /// Everything printed so far, clearing the capture buffer.
    pub fn take_output(&self) -> String {
        let bytes = std::mem::take(&mut lock(&self.inner).output);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Poll the captured output until it contains `needle` or `timeout`
    /// elapses.
    pub fn wait_for_output(&self, needle: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.output().contains(needle) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}

impl Transport for MemoryTransport {
    fn print(&mut self, data: &[u8]) -> io::Result<()> {
        lock(&self.inner).output.extend_from_slice(data);
        Ok(())
    }

    fn available(&mut self) -> usize {
        lock(&self.inner).input.len()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inner = lock(&self.inner);
        let n = buf.len().min(inner.input.len());
        for (slot, byte) in buf.iter_mut().zip(inner.input.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn flush_in(&mut self) {
        lock(&self.inner).input.clear();
    }

    fn is_closed(&self) -> bool {
        lock(&self.inner).closed
    }
}
