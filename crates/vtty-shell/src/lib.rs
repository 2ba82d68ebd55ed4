//! Command shell runtime for VTTY.
//!
//! Commands are bound by name into a registry. Each decoded input line is
//! tokenized, looked up, and admitted to the [`Scheduler`] as a task that
//! runs on its own thread and receives signals from the scheduler thread.

pub mod command;
mod commands;
pub mod registry;
pub mod scheduler;
pub mod shell;
mod system_commands;
mod task_commands;


/// Per-invocation command contract and its construction context.
pub use command::{
    BuiltinCommand, Command, CommandContext, CommandDescriptor, CommandFactory, DEFAULT_HELP,
    HelpFn, SignalMailbox,
};
/// Bind the default command set into a shell.
pub use commands::register_builtins;
/// Name-keyed command registry and the argument tokenizer.
pub use registry::{CommandRegistry, tokenize};
/// Task set, tick thread, and task snapshots.
pub use scheduler::{Scheduler, TaskInfo};
/// Shell handle and its owner.
pub use shell::{RebootHook, Shell, Vtty};
/// Version reported by the `vtty` command.
pub use system_commands::{VERSION_DATE, version, version_code};
