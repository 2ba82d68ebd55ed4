//! Default command set: registration plus `help` and `echo`.

use vtty_types::Result;

use crate::command::{BuiltinCommand, Command, CommandContext};
use crate::shell::Shell;
use crate::system_commands::{BtimeCmd, RebootCmd, VttyCmd};
use crate::task_commands::{KillCmd, PsCmd, SignalCmd};

/// Bind the builtins in listing order.
pub fn register_builtins(shell: &Shell) -> Result<()> {
    shell.bind::<VttyCmd>("vtty")?;
    shell.bind::<HelpCmd>("help")?;
    shell.bind::<SignalCmd>("signal")?;
    shell.bind::<KillCmd>("kill")?;
    shell.bind::<PsCmd>("ps")?;
    shell.bind::<BtimeCmd>("btime")?;
    shell.bind::<RebootCmd>("reboot")?;
    shell.bind::<EchoCmd>("echo")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// help
// ---------------------------------------------------------------------------

pub struct HelpCmd {
    shell: Shell,
    args: Vec<String>,
}

impl BuiltinCommand for HelpCmd {
    fn create(ctx: CommandContext) -> Self {
        Self {
            shell: ctx.shell,
            args: ctx.args,
        }
    }

    fn help() -> String {
        "Print help information of a command.\n\
         \n\
         Without a command name, list every command.\n\
         \n\
         Usage:\n    help [command name]\n\
         \n\
         Examples:\n    help\n    help kill\n    help btime"
            .to_string()
    }
}

impl Command for HelpCmd {
    fn execute(&self) -> String {
        match self.args.as_slice() {
            [_] => {
                let mut out = self.shell.pending();
                out.append("No.\tCommand Name\n");
                for (n, name) in self.shell.command_list().iter().enumerate() {
                    out.append(format!("{}\t{name}\n", n + 1));
                }
                out.flush();
                String::new()
            },
            [_, name] if name == "help" => Self::help(),
            [_, name] if self.shell.command_exist(name) => self.shell.command_help(name),
            [_, name] => format!("{name} is not a command."),
            _ => "Wrong parameter, can only receive one parameter at a time.".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// echo
// ---------------------------------------------------------------------------

pub struct EchoCmd {
    shell: Shell,
    args: Vec<String>,
}

impl BuiltinCommand for EchoCmd {
    fn create(ctx: CommandContext) -> Self {
        Self {
            shell: ctx.shell,
            args: ctx.args,
        }
    }

    fn help() -> String {
        "Display the received text on the console.\n\
         Wrap text containing spaces in quotes.\n\
         \n\
         Usage:\n    echo [text]\n\
         \n\
         Example:\n    echo \"Hello World!\""
            .to_string()
    }
}

impl Command for EchoCmd {
    fn execute(&self) -> String {
        let text = self.args.get(1..).unwrap_or_default().join(" ");
        self.shell.println(text);
        String::new()
    }
}
