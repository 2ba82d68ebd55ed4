//! Shell runtime: registry, dispatcher, and the owning [`Vtty`] handle.

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use vtty_io::{CommandLine, InputState, Output, PendingOutput, Transport, VttyIo};
use vtty_types::sync::{lock, read, write};
use vtty_types::{Result, TaskId, TaskIdCounter, VttyConfig, VttyError};

use crate::command::{BuiltinCommand, CommandContext, CommandDescriptor, CommandFactory, HelpFn};
use crate::commands::register_builtins;
use crate::registry::{CommandRegistry, tokenize};
use crate::scheduler::Scheduler;

pub const NO_HELP_FOUND: &str = "Unable to find relevant help documents!";
pub const OUT_OF_RANGE_NOTICE: &str =
    "The input instruction length exceeds the maximum receiving range.";
pub const TIMEOUT_NOTICE: &str = "The input instruction timeout.";
pub const READ_TIMEOUT_NOTICE: &str = "The input instruction read timeout.";

/// Platform restart primitive installed by the host.
pub type RebootHook = Arc<dyn Fn() + Send + Sync>;

struct ShellInner {
    config: VttyConfig,
    registry: RwLock<CommandRegistry>,
    scheduler: Scheduler,
    io: VttyIo,
    started: Instant,
    running: AtomicBool,
    reboot_hook: Mutex<Option<RebootHook>>,
}

/// Cloneable handle to a running shell.
///
/// Commands receive one in their [`CommandContext`].
#[derive(Clone)]
pub struct Shell {
    inner: Arc<ShellInner>,
}

impl Shell {
    fn start(
        transport: impl Transport + 'static,
        config: VttyConfig,
        ids: TaskIdCounter,
    ) -> Result<Self> {
        config.validate()?;
        let io = VttyIo::start(transport, &config)?;
        let scheduler = Scheduler::start(&config, ids, io.output())?;
        Ok(Self {
            inner: Arc::new(ShellInner {
                config,
                registry: RwLock::new(CommandRegistry::new()),
                scheduler,
                io,
                started: Instant::now(),
                running: AtomicBool::new(true),
                reboot_hook: Mutex::new(None),
            }),
        })
    }

    // -- Registry --

    pub fn bind_command(
        &self,
        name: impl Into<String>,
        factory: CommandFactory,
        help: HelpFn,
    ) -> Result<()> {
        self.bind_descriptor(CommandDescriptor::new(name, factory, help))
    }

    /// Bind a command type under `name`.
    pub fn bind<C: BuiltinCommand>(&self, name: impl Into<String>) -> Result<()> {
        self.bind_descriptor(CommandDescriptor::of::<C>(name))
    }

    fn bind_descriptor(&self, descriptor: CommandDescriptor) -> Result<()> {
        let name = descriptor.name().to_string();
        write(&self.inner.registry).bind(descriptor)?;
        log::info!("bound command {name}");
        Ok(())
    }

    /// Bind `vtty help signal kill ps btime reboot echo`.
    pub fn bind_builtins(&self) -> Result<()> {
        register_builtins(self)
    }

    /// Remove a command. Fails while any task of it exists.
    pub fn unbind_command(&self, name: &str) -> Result<()> {
        let mut registry = write(&self.inner.registry);
        if !registry.contains(name) {
            return Err(VttyError::UnknownCommand(name.to_string()));
        }
        if self.inner.scheduler.task_exists_by_name(name) {
            return Err(VttyError::CommandBusy(name.to_string()));
        }
        registry.remove(name);
        log::info!("unbound command {name}");
        Ok(())
    }

    pub fn command_exist(&self, name: &str) -> bool {
        read(&self.inner.registry).contains(name)
    }

    pub fn command_list(&self) -> Vec<String> {
        read(&self.inner.registry).names()
    }

    pub fn command_help(&self, name: &str) -> String {
        let descriptor = read(&self.inner.registry).get(name);
        match descriptor {
            Some(d) => d.help(),
            None => NO_HELP_FOUND.to_string(),
        }
    }

    // -- Dispatch --

    /// Tokenize `line` and start a task for it.
    ///
    /// Unknown commands and ceiling rejections are reported on the output
    /// and returned as errors. Blank lines give `EmptyCommand`.
    pub fn exec(&self, line: &str) -> Result<TaskId> {
        let args = tokenize(line);
        let Some(name) = args.first() else {
            return Err(VttyError::EmptyCommand);
        };

        let descriptor = read(&self.inner.registry).get(name);
        let Some(descriptor) = descriptor else {
            let err = VttyError::UnknownCommand(name.clone());
            self.println(err.to_string());
            return Err(err);
        };

        let result = self.inner.scheduler.new_task(&descriptor, line, args, |task_id, args| {
            descriptor.instantiate(CommandContext {
                shell: self.clone(),
                args: args.to_vec(),
                task_id,
            })
        });
        if let Err(e) = &result {
            self.println(e.to_string());
        }
        result
    }

    /// Route one decoded line.
    pub fn dispatch(&self, line: CommandLine) {
        match line.state {
            InputState::Valid => {
                if let Err(e) = self.exec(&line.text) {
                    log::debug!("exec {:?}: {e}", line.text);
                }
            },
            InputState::OutOfRange => self.println(OUT_OF_RANGE_NOTICE),
            InputState::Timeout => self.println(TIMEOUT_NOTICE),
            InputState::ReadTimeout => self.println(READ_TIMEOUT_NOTICE),
            InputState::Nil => {},
        }
    }

    /// Dispatch loop. Returns once input is closed or the shell is stopped.
    pub fn handler(&self) {
        log::debug!("dispatch loop started");
        while self.is_running() {
            let line = self.inner.io.read(None);
            if line.state == InputState::Nil && self.inner.io.is_closed() {
                log::info!("input closed");
                break;
            }
            self.dispatch(line);
        }
        log::debug!("dispatch loop stopped");
    }

    /// Ask the dispatch loop to return.
    pub fn stop(&self) {
        self.inner.running.store(false, Ordering::Release);
        self.inner.io.close_input();
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    // -- Output --

    pub fn print(&self, text: impl Into<String>) {
        self.inner.io.print(text);
    }

    pub fn println(&self, text: impl AsRef<str>) {
        self.inner.io.println(text);
    }

    pub fn pending(&self) -> PendingOutput {
        self.inner.io.pending()
    }

    pub fn output(&self) -> Output {
        self.inner.io.output()
    }

    // -- Host services --

    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    pub fn config(&self) -> &VttyConfig {
        &self.inner.config
    }

    /// Time since the shell started.
    pub fn uptime(&self) -> Duration {
        self.inner.started.elapsed()
    }

    pub fn set_reboot_hook(&self, hook: impl Fn() + Send + Sync + 'static) {
        *lock(&self.inner.reboot_hook) = Some(Arc::new(hook));
    }

    /// Run the reboot hook. Returns false when none is installed.
    pub fn reboot(&self) -> bool {
        let hook = lock(&self.inner.reboot_hook).clone();
        match hook {
            Some(hook) => {
                log::info!("reboot requested");
                hook();
                true
            },
            None => false,
        }
    }

    fn shutdown(&self) {
        self.stop();
        self.inner.scheduler.shutdown(self.inner.config.shutdown_grace());
        self.inner.io.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Vtty
// ---------------------------------------------------------------------------

/// Owner of a shell instance. Dropping it shuts the shell down.
pub struct Vtty {
    shell: Shell,
    dispatcher: Option<JoinHandle<()>>,
}

impl Vtty {
    /// Start a shell on `transport` with the builtins bound, drawing task
    /// ids from the process-wide counter.
    pub fn new(transport: impl Transport + 'static, config: VttyConfig) -> Result<Self> {
        Self::with_counter(transport, config, TaskIdCounter::process())
    }

    pub fn with_counter(
        transport: impl Transport + 'static,
        config: VttyConfig,
        ids: TaskIdCounter,
    ) -> Result<Self> {
        let detach = config.detach;
        let shell = Shell::start(transport, config, ids)?;
        let mut vtty = Self {
            shell,
            dispatcher: None,
        };
        vtty.shell.bind_builtins()?;

        if detach {
            let shell = vtty.shell.clone();
            let handle = thread::Builder::new()
                .name("vtty-dispatch".into())
                .spawn(move || shell.handler())?;
            vtty.dispatcher = Some(handle);
        }
        log::info!("vtty {} started", env!("CARGO_PKG_VERSION"));
        Ok(vtty)
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    /// Run the dispatch loop on the calling thread. Returns immediately in
    /// detached mode.
    pub fn run(&self) {
        if self.dispatcher.is_none() {
            self.shell.handler();
        }
    }

    /// Stop dispatching, exit every task, and stop I/O. Idempotent.
    pub fn shutdown(&mut self) {
        self.shell.stop();
        if let Some(dispatcher) = self.dispatcher.take()
            && dispatcher.join().is_err()
        {
            log::error!("dispatch thread panicked");
        }
        self.shell.shutdown();
    }
}

impl Deref for Vtty {
    type Target = Shell;

    fn deref(&self) -> &Shell {
        &self.shell
    }
}

impl Drop for Vtty {
    fn drop(&mut self) {
        self.shutdown();
    }
}
