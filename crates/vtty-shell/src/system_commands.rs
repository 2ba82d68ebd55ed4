//! System commands: vtty, btime, reboot.

use crate::command::{BuiltinCommand, Command, CommandContext};
use crate::shell::Shell;

/// Release date of this version.
pub const VERSION_DATE: &str = "2023-05-29";

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// `(major << 16) | (minor << 8) | patch`
pub fn version_code() -> u32 {
    let part = |s: &str| s.parse::<u32>().unwrap_or(0);
    (part(env!("CARGO_PKG_VERSION_MAJOR")) << 16)
        | (part(env!("CARGO_PKG_VERSION_MINOR")) << 8)
        | part(env!("CARGO_PKG_VERSION_PATCH"))
}

// ---------------------------------------------------------------------------
// vtty
// ---------------------------------------------------------------------------

pub struct VttyCmd {
    args: Vec<String>,
}

impl BuiltinCommand for VttyCmd {
    fn create(ctx: CommandContext) -> Self {
        Self { args: ctx.args }
    }

    fn help() -> String {
        "Show version information of vtty.\n\
         \n\
         Usage:\n    vtty [-version|-vercode|-verdate]\n\
         \n\
         Options:\n    \
         -version    version string\n    \
         -vercode    numeric version code\n    \
         -verdate    release date"
            .to_string()
    }
}

impl Command for VttyCmd {
    fn execute(&self) -> String {
        match self.args.get(1).map(String::as_str) {
            None => format!(
                "VTTY VERSION {}\nVTTY VERCODE {}\nVTTY VERDATE {VERSION_DATE}",
                version(),
                version_code()
            ),
            Some("-version") => version().to_string(),
            Some("-vercode") => version_code().to_string(),
            Some("-verdate") => VERSION_DATE.to_string(),
            Some(_) => "vtty: invalid arguments".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// btime
// ---------------------------------------------------------------------------

pub struct BtimeCmd {
    shell: Shell,
    args: Vec<String>,
}

impl BuiltinCommand for BtimeCmd {
    fn create(ctx: CommandContext) -> Self {
        Self {
            shell: ctx.shell,
            args: ctx.args,
        }
    }

    fn help() -> String {
        "Show the time elapsed since the shell started.\n\
         \n\
         Usage:\n    btime [-ms|-s|-m|-h]\n\
         \n\
         Options:\n    \
         -ms    milliseconds (default)\n    \
         -s     seconds\n    \
         -m     minutes\n    \
         -h     hours"
            .to_string()
    }
}

impl Command for BtimeCmd {
    fn execute(&self) -> String {
        let up = self.shell.uptime();
        let (value, unit) = match self.args.as_slice() {
            [_] => (up.as_millis(), "ms"),
            [_, arg] => match arg.as_str() {
                "-ms" => (up.as_millis(), "ms"),
                "-s" => (u128::from(up.as_secs()), "s"),
                "-m" => (u128::from(up.as_secs() / 60), "m"),
                "-h" => (u128::from(up.as_secs() / 3600), "h"),
                _ => return "Invalid argument.".to_string(),
            },
            _ => return "Can only receive at most one parameter.".to_string(),
        };
        format!("system startup {value} {unit}")
    }
}

// ---------------------------------------------------------------------------
// reboot
// ---------------------------------------------------------------------------

pub struct RebootCmd {
    shell: Shell,
}

impl BuiltinCommand for RebootCmd {
    fn create(ctx: CommandContext) -> Self {
        Self { shell: ctx.shell }
    }

    fn help() -> String {
        "Restart the system immediately.\n\nUsage:\n    reboot".to_string()
    }
}

impl Command for RebootCmd {
    fn execute(&self) -> String {
        if self.shell.reboot() {
            String::new()
        } else {
            "The system does not support this reboot command!".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_code_matches_package_version() {
        assert_eq!(version(), "1.0.0");
        assert_eq!(version_code(), 1 << 16);
    }
}
