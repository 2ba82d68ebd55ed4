//! Task management commands: signal, kill, ps.
//!
//! `kill` and `ps` are privileged by default and bypass the task limit.

use std::fmt::Write;
use std::time::UNIX_EPOCH;

use vtty_types::{SignalKind, parse_task_id};

use crate::command::{BuiltinCommand, Command, CommandContext};
use crate::shell::Shell;

const ILLEGAL_KILL_ARGS: &str = "The parameter input format is illegal. Please refer to the help.";

// ---------------------------------------------------------------------------
// signal
// ---------------------------------------------------------------------------

pub struct SignalCmd {
    shell: Shell,
    args: Vec<String>,
}

impl BuiltinCommand for SignalCmd {
    fn create(ctx: CommandContext) -> Self {
        Self {
            shell: ctx.shell,
            args: ctx.args,
        }
    }

    fn help() -> String {
        "Send a signal to a running task.\n\
         \n\
         Usage:\n    signal <-i<task id>|-s<task name>> <signal name> [payload]\n\
         \n\
         Signal names:\n    msg start suspend resume stop exit\n\
         \n\
         Examples:\n    \
         signal -i1 msg \"hello world\"\n    \
         signal -secho exit"
            .to_string()
    }
}

impl Command for SignalCmd {
    fn execute(&self) -> String {
        let [_, target, kind, rest @ ..] = self.args.as_slice() else {
            return Self::help();
        };
        let Ok(kind) = kind.parse::<SignalKind>() else {
            return "Invalid signal name.".to_string();
        };
        let payload = rest.first().map_or("", String::as_str);
        let tasks = self.shell.scheduler();

        if let Some(id) = target.strip_prefix("-i") {
            let Some(id) = parse_task_id(id) else {
                return "Invalid task id.".to_string();
            };
            if !tasks.task_exists(id) {
                return "Task not found.".to_string();
            }
            tasks.sig_task(&[id], kind, payload);
        } else if let Some(name) = target.strip_prefix("-s") {
            if name.is_empty() {
                return "Invalid task name.".to_string();
            }
            let ids = tasks.get_task_id_list(name);
            if ids.is_empty() {
                return "Task not found.".to_string();
            }
            tasks.sig_task(&ids, kind, payload);
        } else {
            return "Invalid task id or name.".to_string();
        }
        String::new()
    }
}

// ---------------------------------------------------------------------------
// kill
// ---------------------------------------------------------------------------

pub struct KillCmd {
    shell: Shell,
    args: Vec<String>,
}

impl BuiltinCommand for KillCmd {
    fn create(ctx: CommandContext) -> Self {
        Self {
            shell: ctx.shell,
            args: ctx.args,
        }
    }

    fn help() -> String {
        "Kill a task by id or by command name.\n\
         \n\
         Usage:\n    kill <-i task_id|-s task_name>\n\
         \n\
         Examples:\n    kill -i 12\n    kill -s \"my_task\""
            .to_string()
    }
}

impl Command for KillCmd {
    fn execute(&self) -> String {
        let tasks = self.shell.scheduler();
        match self.args.as_slice() {
            [_, flag, id] if flag == "-i" => {
                let Some(id) = parse_task_id(id) else {
                    return ILLEGAL_KILL_ARGS.to_string();
                };
                if tasks.del_task(id) {
                    format!("The task with id {id} is killed.")
                } else {
                    format!("The task with id {id} is not exist.")
                }
            },
            [_, flag, name] if flag == "-s" => {
                if name.is_empty() {
                    return "Missing parameters.".to_string();
                }
                let killed = tasks.del_task_by_name(name);
                if killed.is_empty() {
                    return "No tasks were killed.".to_string();
                }
                let ids: Vec<String> = killed.iter().map(ToString::to_string).collect();
                format!("The following tasks have been killed: {}", ids.join(" "))
            },
            _ => ILLEGAL_KILL_ARGS.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// ps
// ---------------------------------------------------------------------------

pub struct PsCmd {
    shell: Shell,
}

impl BuiltinCommand for PsCmd {
    fn create(ctx: CommandContext) -> Self {
        Self { shell: ctx.shell }
    }

    fn help() -> String {
        "Show the task list.\n\nUsage:\n    ps".to_string()
    }
}

impl Command for PsCmd {
    fn execute(&self) -> String {
        let rows: Vec<_> = self
            .shell
            .scheduler()
            .get_task_info()
            .into_iter()
            .filter(|t| t.name != "ps")
            .collect();

        let mut out = self.shell.pending();
        out.append("TID\tTask Name\tState\tCreate Time\tArguments\n");
        for task in &rows {
            let created = task
                .created_at
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_millis());
            let _ = writeln!(
                out,
                "{}\t{}\t {}\t {created}\t{}",
                task.id, task.name, task.state, task.raw_args
            );
        }
        out.flush();

        if rows.is_empty() {
            "No task is running.".to_string()
        } else {
            String::new()
        }
    }
}
