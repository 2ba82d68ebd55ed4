//! Cooperative task signals.

use std::fmt;
use std::str::FromStr;

/// Kind of a signal sent to a running task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// General purpose message.
    Msg,
    /// Start notification.
    Start,
    /// Suspend notification.
    Suspend,
    /// Resume notification.
    Resume,
    /// Stop request.
    Stop,
    /// Exit request. The task is expected to return from `execute`.
    Exit,
}

impl SignalKind {
    pub const ALL: [SignalKind; 6] = [
        SignalKind::Msg,
        SignalKind::Start,
        SignalKind::Suspend,
        SignalKind::Resume,
        SignalKind::Stop,
        SignalKind::Exit,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::Msg => "msg",
            SignalKind::Start => "start",
            SignalKind::Suspend => "suspend",
            SignalKind::Resume => "resume",
            SignalKind::Stop => "stop",
            SignalKind::Exit => "exit",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SignalKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}

/// A queued signal: kind plus free-form payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub kind: SignalKind,
    pub payload: String,
}

impl Signal {
    pub fn new(kind: SignalKind, payload: impl Into<String>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// An `Exit` signal with an empty payload.
    pub fn exit() -> Self {
        Self::new(SignalKind::Exit, "")
    }

    pub fn is_exit(&self) -> bool {
        self.kind == SignalKind::Exit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for kind in SignalKind::ALL {
            assert_eq!(kind.as_str().parse::<SignalKind>(), Ok(kind));
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert!("kill".parse::<SignalKind>().is_err());
        assert!("EXIT".parse::<SignalKind>().is_err());
        assert!("".parse::<SignalKind>().is_err());
    }

    #[test]
    fn exit_helper() {
        let sig = Signal::exit();
        assert!(sig.is_exit());
        assert!(sig.payload.is_empty());
        assert!(!Signal::new(SignalKind::Msg, "hi").is_exit());
    }
}
