//! Command contract, descriptors, and the signal mailbox.
//!
//! A command is instantiated once per invocation. `execute` runs on the
//! task's own thread while `on_signal` runs on the scheduler thread, so both
//! take `&self` and implementations keep mutable state behind their own
//! synchronisation.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use vtty_types::sync::{lock, wait_timeout};
use vtty_types::{Signal, TaskId};

use crate::shell::Shell;

/// Help text for commands that do not provide their own.
pub const DEFAULT_HELP: &str = "No help information to display.";

/// One invocation of a bound command.
pub trait Command: Send + Sync {
    /// Runs on the task thread before `execute`.
    fn init(&self) {}

    /// Command body. Non-empty text is printed followed by a newline.
    fn execute(&self) -> String;

    /// Called on the scheduler thread for each queued signal, in order.
    /// Must return promptly: admission is blocked while it runs.
    fn on_signal(&self, _signal: &Signal) {}
}

/// Everything a command receives at construction.
#[derive(Clone)]
pub struct CommandContext {
    pub shell: Shell,
    /// Tokenized line; `args[0]` is the command name.
    pub args: Vec<String>,
    pub task_id: TaskId,
}

/// A command type that can be bound by type with [`Shell::bind`].
pub trait BuiltinCommand: Command + Sized + 'static {
    fn create(ctx: CommandContext) -> Self;

    fn help() -> String {
        DEFAULT_HELP.to_string()
    }
}

pub type CommandFactory = Arc<dyn Fn(CommandContext) -> Box<dyn Command> + Send + Sync>;
pub type HelpFn = Arc<dyn Fn() -> String + Send + Sync>;

/// Registry entry: a unique name plus its constructor and help callbacks.
pub struct CommandDescriptor {
    name: String,
    factory: CommandFactory,
    help: HelpFn,
}

impl CommandDescriptor {
    pub fn new(name: impl Into<String>, factory: CommandFactory, help: HelpFn) -> Self {
        Self {
            name: name.into(),
            factory,
            help,
        }
    }

    /// Descriptor for a [`BuiltinCommand`] type.
    pub fn of<C: BuiltinCommand>(name: impl Into<String>) -> Self {
        Self::new(
            name,
            Arc::new(|ctx| Box::new(C::create(ctx)) as Box<dyn Command>),
            Arc::new(C::help),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instantiate(&self, ctx: CommandContext) -> Box<dyn Command> {
        (self.factory)(ctx)
    }

    pub fn help(&self) -> String {
        (self.help)()
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// SignalMailbox
// ---------------------------------------------------------------------------

/// Hands signals from `on_signal` to a command body blocked in `execute`.
///
/// `post` never blocks, so it is safe to call from `on_signal`. An `Exit`
/// signal also latches [`SignalMailbox::exit_requested`].
#[derive(Debug, Default)]
pub struct SignalMailbox {
    queue: Mutex<VecDeque<Signal>>,
    cv: Condvar,
    exit: AtomicBool,
}

impl SignalMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&self, signal: &Signal) {
        if signal.is_exit() {
            self.exit.store(true, Ordering::Release);
        }
        lock(&self.queue).push_back(signal.clone());
        self.cv.notify_all();
    }

    pub fn try_recv(&self) -> Option<Signal> {
        lock(&self.queue).pop_front()
    }

    /// Wait up to `timeout` for the next signal.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Signal> {
        let deadline = Instant::now() + timeout;
        let mut queue = lock(&self.queue);
        loop {
            if let Some(signal) = queue.pop_front() {
                return Some(signal);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            queue = wait_timeout(&self.cv, queue, deadline - now).0;
        }
    }

    pub fn exit_requested(&self) -> bool {
        self.exit.load(Ordering::Acquire)
    }

    /// Sleep until `Exit` arrives or `timeout` elapses. Returns true on exit.
    ///
    /// Other signals stay queued for `try_recv`.
    pub fn wait_exit(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut queue = lock(&self.queue);
        while !self.exit_requested() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            queue = wait_timeout(&self.cv, queue, deadline - now).0;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use vtty_types::SignalKind;

    use super::*;

    #[test]
    fn mailbox_is_fifo() {
        let mailbox = SignalMailbox::new();
        mailbox.post(&Signal::new(SignalKind::Msg, "one"));
        mailbox.post(&Signal::new(SignalKind::Stop, ""));
        assert_eq!(mailbox.try_recv().unwrap().payload, "one");
        assert_eq!(mailbox.try_recv().unwrap().kind, SignalKind::Stop);
        assert!(mailbox.try_recv().is_none());
    }

    #[test]
    fn recv_timeout_expires() {
        let mailbox = SignalMailbox::new();
        assert!(mailbox.recv_timeout(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn exit_wakes_waiter() {
        let mailbox = Arc::new(SignalMailbox::new());
        let waiter = {
            let mailbox = Arc::clone(&mailbox);
            thread::spawn(move || mailbox.wait_exit(Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(20));
        mailbox.post(&Signal::new(SignalKind::Msg, "ignored"));
        mailbox.post(&Signal::exit());
        assert!(waiter.join().unwrap());
        assert!(mailbox.exit_requested());
        // Both signals remain observable in order.
        assert_eq!(mailbox.try_recv().unwrap().kind, SignalKind::Msg);
        assert!(mailbox.try_recv().unwrap().is_exit());
    }

    #[test]
    fn wait_exit_times_out() {
        let mailbox = SignalMailbox::new();
        assert!(!mailbox.wait_exit(Duration::from_millis(10)));
    }

    struct Nop;
    impl Command for Nop {
        fn execute(&self) -> String {
            String::new()
        }
    }

    #[test]
    fn descriptor_help_defaults() {
        let d = CommandDescriptor::new(
            "nop",
            Arc::new(|_| Box::new(Nop) as Box<dyn Command>),
            Arc::new(|| DEFAULT_HELP.to_string()),
        );
        assert_eq!(d.name(), "nop");
        assert_eq!(d.help(), "No help information to display.");
        assert!(format!("{d:?}").contains("nop"));
    }
}
