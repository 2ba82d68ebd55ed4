//! Input line queue and output string queue.
//!
//! Each queue is one mutex plus one condition variable. Closing a queue
//! wakes every waiter; a closed input queue still hands out the lines it
//! holds, a closed output queue still drains what was printed before.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use vtty_types::sync::{lock, wait, wait_timeout};

use crate::line::{CommandLine, InputState};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct InputSlots {
    lines: VecDeque<CommandLine>,
    closed: bool,
}

/// FIFO of decoded command lines waiting for the dispatcher.
#[derive(Debug, Default)]
pub struct InputQueue {
    state: Mutex<InputSlots>,
    cv: Condvar,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: CommandLine) {
        lock(&self.state).lines.push_back(line);
        self.cv.notify_one();
    }

    pub fn extend(&self, lines: impl IntoIterator<Item = CommandLine>) {
        let mut state = lock(&self.state);
        let before = state.lines.len();
        state.lines.extend(lines);
        if state.lines.len() > before {
            self.cv.notify_all();
        }
    }

    /// Pop the oldest line.
    ///
    /// `timeout == None` waits until a line exists; `Some(Duration::ZERO)`
    /// polls. An empty queue yields `Nil` when polling or closed, and
    /// `ReadTimeout` when a finite wait elapsed.
    pub fn read(&self, timeout: Option<Duration>) -> CommandLine {
        let mut state = lock(&self.state);

        match timeout {
            Some(t) if t.is_zero() => {},
            None => {
                while state.lines.is_empty() && !state.closed {
                    state = wait(&self.cv, state);
                }
            },
            Some(t) => {
                let deadline = Instant::now() + t;
                while state.lines.is_empty() && !state.closed {
                    let now = Instant::now();
                    if now >= deadline {
                        return CommandLine::empty(InputState::ReadTimeout);
                    }
                    state = wait_timeout(&self.cv, state, deadline - now).0;
                }
            },
        }

        state
            .lines
            .pop_front()
            .unwrap_or_else(|| CommandLine::empty(InputState::Nil))
    }

    pub fn len(&self) -> usize {
        lock(&self.state).lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        lock(&self.state).lines.clear();
    }

    /// Readers get the remaining lines, then `Nil` without blocking.
    pub fn close(&self) {
        lock(&self.state).closed = true;
        self.cv.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct OutputState {
    items: VecDeque<String>,
    closed: bool,
}

#[derive(Debug, Default)]
struct OutputQueue {
    state: Mutex<OutputState>,
    cv: Condvar,
}

/// Handle to the output queue. Clones share the queue.
#[derive(Debug, Clone, Default)]
pub struct Output {
    queue: Arc<OutputQueue>,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue text for the output unit.
    pub fn print(&self, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        let mut state = lock(&self.queue.state);
        if state.closed {
            log::debug!("output closed, dropping {} bytes", text.len());
            return;
        }
        state.items.push_back(text);
        self.queue.cv.notify_one();
    }

    /// Enqueue text followed by a newline.
    pub fn println(&self, text: impl AsRef<str>) {
        self.print(format!("{}\n", text.as_ref()));
    }

    /// Start an accumulated write that is enqueued as one item on flush.
    pub fn pending(&self) -> PendingOutput {
        PendingOutput {
            output: self.clone(),
            buf: String::new(),
        }
    }

    /// Number of queued items not yet written to the transport.
    pub fn len(&self) -> usize {
        lock(&self.queue.state).items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything still queued.
    pub fn clear(&self) {
        lock(&self.queue.state).items.clear();
    }

    pub fn close(&self) {
        lock(&self.queue.state).closed = true;
        self.queue.cv.notify_all();
    }

    /// Block until an item is queued; `None` once closed and drained.
    pub fn next_blocking(&self) -> Option<String> {
        let mut state = lock(&self.queue.state);
        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            if state.closed {
                return None;
            }
            state = wait(&self.queue.cv, state);
        }
    }
}

/// Buffered output: `append` accumulates, `flush` enqueues.
///
/// Implements [`fmt::Write`], so `write!`/`writeln!` work. Text left in the
/// buffer is flushed when the value is dropped.
#[derive(Debug)]
pub struct PendingOutput {
    output: Output,
    buf: String,
}

impl PendingOutput {
    pub fn append(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.buf.push_str(text.as_ref());
        self
    }

    /// Enqueue the accumulated text as a single item.
    pub fn flush(&mut self) {
        if !self.buf.is_empty() {
            self.output.print(std::mem::take(&mut self.buf));
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }
}

impl fmt::Write for PendingOutput {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.buf.push_str(s);
        Ok(())
    }
}

impl Drop for PendingOutput {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Write;
    use std::thread;

    use super::*;

    #[test]
    fn read_is_fifo() {
        let q = InputQueue::new();
        q.push(CommandLine::new("a", InputState::Valid));
        q.push(CommandLine::new("b", InputState::Timeout));
        assert_eq!(q.read(Some(Duration::ZERO)).text, "a");
        assert_eq!(q.read(Some(Duration::ZERO)).state, InputState::Timeout);
    }

    #[test]
    fn zero_timeout_polls_nil() {
        let q = InputQueue::new();
        assert_eq!(q.read(Some(Duration::ZERO)), CommandLine::empty(InputState::Nil));
    }

    #[test]
    fn finite_timeout_reports_read_timeout() {
        let q = InputQueue::new();
        let line = q.read(Some(Duration::from_millis(10)));
        assert_eq!(line.state, InputState::ReadTimeout);
    }

    #[test]
    fn forever_wakes_on_push() {
        let q = Arc::new(InputQueue::new());
        let q2 = Arc::clone(&q);
        let reader = thread::spawn(move || q2.read(None));
        thread::sleep(Duration::from_millis(20));
        q.push(CommandLine::new("ps", InputState::Valid));
        assert_eq!(reader.join().unwrap().text, "ps");
    }

    #[test]
    fn close_releases_forever_reader() {
        let q = Arc::new(InputQueue::new());
        let q2 = Arc::clone(&q);
        let reader = thread::spawn(move || q2.read(None));
        thread::sleep(Duration::from_millis(20));
        q.close();
        assert_eq!(reader.join().unwrap().state, InputState::Nil);
    }

    #[test]
    fn closed_queue_still_drains() {
        let q = InputQueue::new();
        q.push(CommandLine::new("last", InputState::Valid));
        q.close();
        assert_eq!(q.read(None).text, "last");
        assert_eq!(q.read(None).state, InputState::Nil);
    }

    #[test]
    fn output_drains_then_ends_after_close() {
        let out = Output::new();
        out.print("a");
        out.println("b");
        out.close();
        assert_eq!(out.next_blocking().as_deref(), Some("a"));
        assert_eq!(out.next_blocking().as_deref(), Some("b\n"));
        assert_eq!(out.next_blocking(), None);
    }

    #[test]
    fn print_after_close_is_dropped() {
        let out = Output::new();
        out.close();
        out.print("late");
        assert!(out.is_empty());
    }

    #[test]
    fn empty_print_is_ignored() {
        let out = Output::new();
        out.print("");
        assert!(out.is_empty());
    }

    #[test]
    fn pending_flushes_as_one_item() {
        let out = Output::new();
        let mut pending = out.pending();
        pending.append("TID\t");
        writeln!(pending, "{}", 7).unwrap();
        assert!(out.is_empty());
        pending.flush();
        assert_eq!(out.len(), 1);
        assert_eq!(out.next_blocking().as_deref(), Some("TID\t7\n"));
    }

    #[test]
    fn pending_flushes_on_drop() {
        let out = Output::new();
        {
            let mut pending = out.pending();
            pending.append("bye");
        }
        assert_eq!(out.next_blocking().as_deref(), Some("bye"));
    }
}
