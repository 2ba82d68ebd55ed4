//! Transport over the process's standard streams.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::thread;

use vtty_io::Transport;
use vtty_types::sync::lock;

const READ_CHUNK: usize = 256;

#[derive(Default)]
struct Inbox {
    bytes: VecDeque<u8>,
    closed: bool,
}

/// Reads stdin on a background thread and writes straight to stdout.
///
/// Input is never discarded: everything piped in is a command. A blocking
/// stdin read cannot be interrupted, so the reader thread is not joined; it
/// ends at EOF or on the first read error.
pub struct StdioTransport {
    inbox: Arc<Mutex<Inbox>>,
    stdout: io::Stdout,
}

impl StdioTransport {
    pub fn spawn() -> io::Result<Self> {
        let inbox = Arc::new(Mutex::new(Inbox::default()));
        let reader_inbox = Arc::clone(&inbox);
        thread::Builder::new()
            .name("stdin-reader".into())
            .spawn(move || read_stdin(&reader_inbox))?;
        Ok(Self {
            inbox,
            stdout: io::stdout(),
        })
    }
}

fn read_stdin(inbox: &Mutex<Inbox>) {
    let mut stdin = io::stdin().lock();
    let mut buf = [0u8; READ_CHUNK];
    loop {
        match stdin.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => lock(inbox).bytes.extend(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {},
            Err(e) => {
                log::warn!("stdin read failed: {e}");
                break;
            },
        }
    }
    lock(inbox).closed = true;
    log::debug!("stdin closed");
}

impl Transport for StdioTransport {
    fn print(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut out = self.stdout.lock();
        out.write_all(bytes)?;
        out.flush()
    }

    fn available(&mut self) -> usize {
        lock(&self.inbox).bytes.len()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inbox = lock(&self.inbox);
        let n = buf.len().min(inbox.bytes.len());
        for (slot, byte) in buf.iter_mut().zip(inbox.bytes.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn flush_out(&mut self) {
        if let Err(e) = self.stdout.lock().flush() {
            log::warn!("stdout flush failed: {e}");
        }
    }

    fn is_closed(&self) -> bool {
        let inbox = lock(&self.inbox);
        inbox.closed && inbox.bytes.is_empty()
    }
}
