//! Error types for VTTY.

use std::io;

/// Errors produced by the VTTY runtime.
#[derive(Debug, thiserror::Error)]
pub enum VttyError {
    #[error("command \"{0}\" is already bound")]
    DuplicateCommand(String),

    #[error("{0} not found!")]
    UnknownCommand(String),

    #[error("{0} is running, can't be unbinded!")]
    CommandBusy(String),

    #[error("The task limit has been reached")]
    TaskLimit(usize),

    #[error("Command {0} could not be created.")]
    CommandCreate(String),

    #[error("empty command line")]
    EmptyCommand,

    #[error("shell is shutting down")]
    ShuttingDown,

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, VttyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_command_display() {
        let e = VttyError::DuplicateCommand("echo".into());
        assert_eq!(format!("{e}"), "command \"echo\" is already bound");
    }

    #[test]
    fn unknown_command_display() {
        let e = VttyError::UnknownCommand("frob".into());
        assert_eq!(format!("{e}"), "frob not found!");
    }

    #[test]
    fn command_busy_display() {
        let e = VttyError::CommandBusy("sleep".into());
        assert_eq!(format!("{e}"), "sleep is running, can't be unbinded!");
    }

    #[test]
    fn task_limit_display() {
        let e = VttyError::TaskLimit(20);
        assert_eq!(format!("{e}"), "The task limit has been reached");
    }

    #[test]
    fn command_create_display() {
        let e = VttyError::CommandCreate("crash".into());
        assert_eq!(format!("{e}"), "Command crash could not be created.");
    }

    #[test]
    fn config_error_display() {
        let e = VttyError::Config("max_tasks must be positive".into());
        assert_eq!(format!("{e}"), "config error: max_tasks must be positive");
    }

    #[test]
    fn io_error_from_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let e: VttyError = io_err.into();
        let msg = format!("{e}");
        assert!(msg.contains("I/O error"));
        assert!(msg.contains("gone"));
    }

    #[test]
    fn toml_error_from_conversion() {
        let toml_err = toml::from_str::<toml::Value>("this is [[[not valid toml").unwrap_err();
        let e: VttyError = toml_err.into();
        assert!(format!("{e}").contains("TOML parse error"));
    }

    #[test]
    fn error_is_debug() {
        let e = VttyError::EmptyCommand;
        assert!(format!("{e:?}").contains("EmptyCommand"));
    }
}
