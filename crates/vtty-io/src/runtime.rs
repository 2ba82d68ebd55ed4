//! Threaded I/O runtime.
//!
//! One input unit polls the transport, drives the [`LineDecoder`] and fills
//! the [`InputQueue`]; one output unit drains the [`Output`] queue into the
//! transport.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use vtty_types::VttyConfig;
use vtty_types::sync::lock;

use crate::line::{CommandLine, LineDecoder};
use crate::queue::{InputQueue, Output, PendingOutput};
use crate::transport::Transport;

type SharedTransport = Arc<Mutex<Box<dyn Transport>>>;

/// Input/output runtime over one transport.
pub struct VttyIo {
    transport: SharedTransport,
    decoder: Arc<Mutex<LineDecoder>>,
    input: Arc<InputQueue>,
    output: Output,
    running: Arc<AtomicBool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl VttyIo {
    /// Flush the transport and start the input and output units.
    pub fn start(transport: impl Transport + 'static, config: &VttyConfig) -> io::Result<Self> {
        let mut transport: Box<dyn Transport> = Box::new(transport);
        transport.flush_in();
        transport.flush_out();

        let io = Self {
            transport: Arc::new(Mutex::new(transport)),
            decoder: Arc::new(Mutex::new(LineDecoder::new(config.command_len_max))),
            input: Arc::new(InputQueue::new()),
            output: Output::new(),
            running: Arc::new(AtomicBool::new(true)),
            workers: Mutex::new(Vec::new()),
        };

        let input_unit = InputUnit {
            transport: Arc::clone(&io.transport),
            decoder: Arc::clone(&io.decoder),
            input: Arc::clone(&io.input),
            running: Arc::clone(&io.running),
            input_timeout: config.input_timeout(),
            poll_interval: config.poll_interval(),
        };
        let reader = thread::Builder::new()
            .name("vtty-input".into())
            .spawn(move || input_unit.run())?;

        let transport = Arc::clone(&io.transport);
        let output = io.output.clone();
        let writer = match thread::Builder::new()
            .name("vtty-output".into())
            .spawn(move || output_loop(&transport, &output))
        {
            Ok(handle) => handle,
            Err(e) => {
                io.running.store(false, Ordering::Release);
                let _ = reader.join();
                return Err(e);
            },
        };

        lock(&io.workers).extend([reader, writer]);
        log::debug!(
            "I/O started (line limit {}, idle timeout {:?})",
            config.command_len_max,
            config.input_timeout()
        );
        Ok(io)
    }

    /// Pop the oldest command line, waiting as described by
    /// [`InputQueue::read`].
    pub fn read(&self, timeout: Option<Duration>) -> CommandLine {
        self.input.read(timeout)
    }

    /// Number of command lines waiting to be read.
    pub fn available(&self) -> usize {
        self.input.len()
    }

    pub fn print(&self, text: impl Into<String>) {
        self.output.print(text);
    }

    pub fn println(&self, text: impl AsRef<str>) {
        self.output.println(text);
    }

    pub fn pending(&self) -> PendingOutput {
        self.output.pending()
    }

    /// Handle to the output queue.
    pub fn output(&self) -> Output {
        self.output.clone()
    }

    pub fn flush(&self) {
        self.flush_in();
        self.flush_out();
    }

    /// Drop queued lines and any partially decoded input.
    pub fn flush_in(&self) {
        self.input.clear();
        lock(&self.decoder).reset();
    }

    /// Drop output that has not reached the transport yet.
    pub fn flush_out(&self) {
        self.output.clear();
    }

    /// Stop handing out input. Blocked and later readers get `Nil` once the
    /// queued lines are gone.
    pub fn close_input(&self) {
        self.input.close();
    }

    /// True once the input is closed and every line was read.
    pub fn is_closed(&self) -> bool {
        self.input.is_closed() && self.input.is_empty()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop both units and release blocked readers.
    ///
    /// Output printed before the call is still written. Idempotent.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Release);
        self.input.close();
        self.output.close();

        let workers: Vec<_> = lock(&self.workers).drain(..).collect();
        if workers.is_empty() {
            return;
        }
        for worker in workers {
            let name = worker.thread().name().unwrap_or("vtty-io").to_string();
            if worker.join().is_err() {
                log::error!("{name} panicked");
            }
        }

        let mut transport = lock(&self.transport);
        transport.flush_in();
        transport.flush_out();
        log::debug!("I/O stopped");
    }
}

impl Drop for VttyIo {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct InputUnit {
    transport: SharedTransport,
    decoder: Arc<Mutex<LineDecoder>>,
    input: Arc<InputQueue>,
    running: Arc<AtomicBool>,
    input_timeout: Duration,
    poll_interval: Duration,
}

impl InputUnit {
    fn run(self) {
        let mut last_rx = Instant::now();

        while self.running.load(Ordering::Acquire) {
            let (received, closed) = {
                let mut transport = lock(&self.transport);
                let mut decoder = lock(&self.decoder);
                let received = match decoder.feed(&mut **transport) {
                    Ok(received) => received,
                    Err(e) => {
                        log::warn!("transport read failed: {e}");
                        false
                    },
                };
                if received {
                    self.input.extend(decoder.consume());
                }
                (received, transport.is_closed())
            };

            if received {
                last_rx = Instant::now();
                continue;
            }

            if closed {
                self.input.extend(lock(&self.decoder).finish());
                log::debug!("transport closed");
                break;
            }

            if last_rx.elapsed() >= self.input_timeout {
                let expired = lock(&self.decoder).expire();
                if let Some(line) = expired {
                    log::debug!("input idle for {:?}, dropping partial line", self.input_timeout);
                    self.input.push(line);
                }
                last_rx = Instant::now();
            }

            thread::sleep(self.poll_interval);
        }

        self.input.close();
    }
}

fn output_loop(transport: &Mutex<Box<dyn Transport>>, output: &Output) {
    while let Some(text) = output.next_blocking() {
        if let Err(e) = lock(transport).print(text.as_bytes()) {
            log::warn!("transport write failed: {e}");
        }
    }
}
