//! The unit of work dispatched per invocation.

use serde::{Deserialize, Serialize};

use crate::SessionKey;

/// Verb name, as it appears on the command line and in records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verb {
    Open,
    Run,
    Logs,
    Status,
    Attach,
    Close,
}

impl Verb {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Run => "run",
            Self::Logs => "logs",
            Self::Status => "status",
            Self::Attach => "attach",
            Self::Close => "close",
        }
    }
}

/// A verb with its typed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ensure the connection and the remote session exist.
    Open,
    /// Type `command` into the session, followed by Enter.
    Run { command: String },
    /// Capture the last `lines` lines of the session.
    Logs { lines: u32 },
    /// Report connection and session liveness without creating either.
    Status,
    /// Hand the terminal to the session.
    Attach,
    /// Destroy the session.
    Close,
}

impl Command {
    #[must_use]
    pub const fn verb(&self) -> Verb {
        match self {
            Self::Open => Verb::Open,
            Self::Run { .. } => Verb::Run,
            Self::Logs { .. } => Verb::Logs,
            Self::Status => Verb::Status,
            Self::Attach => Verb::Attach,
            Self::Close => Verb::Close,
        }
    }
}

/// One command against one session key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub key: SessionKey,
    pub command: Command,
}

impl Invocation {
    #[must_use]
    pub const fn new(key: SessionKey, command: Command) -> Self {
        Self { key, command }
    }

    #[must_use]
    pub const fn verb(&self) -> Verb {
        self.command.verb()
    }
}
