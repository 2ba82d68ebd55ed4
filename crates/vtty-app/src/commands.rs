//! Commands the desktop host adds on top of the builtins.

use std::time::Duration;

use vtty_shell::{BuiltinCommand, Command, CommandContext, Shell, SignalMailbox};
use vtty_types::{Signal, SignalKind, TaskId};

const DEFAULT_SLEEP_MS: u64 = 1000;

/// `sleep [ms]`: wait, reporting signals as they arrive, until the time is
/// up or an `exit` signal is received.
pub struct SleepCmd {
    shell: Shell,
    args: Vec<String>,
    task_id: TaskId,
    mailbox: SignalMailbox,
}

impl BuiltinCommand for SleepCmd {
    fn create(ctx: CommandContext) -> Self {
        Self {
            shell: ctx.shell,
            args: ctx.args,
            task_id: ctx.task_id,
            mailbox: SignalMailbox::new(),
        }
    }

    fn help() -> String {
        "Sleep for a number of milliseconds. Stops early on an exit signal.\n\
         \n\
         Usage:\n    sleep [ms]\n\
         \n\
         Example:\n    sleep 60000\n    signal -ssleep msg \"wake up\"\n    kill -s sleep"
            .to_string()
    }
}

impl Command for SleepCmd {
    fn execute(&self) -> String {
        let ms = match self.args.get(1) {
            None => DEFAULT_SLEEP_MS,
            Some(arg) => match arg.parse::<u64>() {
                Ok(ms) => ms,
                Err(_) => return format!("sleep: invalid duration {arg:?}"),
            },
        };
        if self.mailbox.wait_exit(Duration::from_millis(ms)) {
            format!("sleep {} interrupted", self.task_id)
        } else {
            String::new()
        }
    }

    fn on_signal(&self, signal: &Signal) {
        if signal.kind != SignalKind::Exit {
            self.shell
                .println(format!("sleep {}: {} {}", self.task_id, signal.kind, signal.payload));
        }
        self.mailbox.post(signal);
    }
}
