//! Error taxonomy shared by every layer.

use thiserror::Error;

/// Everything that can go wrong in one invocation.
///
/// Nothing here is retried; each variant maps straight to a non-zero exit.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed invocation, detected before any network action.
    #[error("{0}")]
    Usage(String),
    /// Invalid environment override.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Transport unreachable, authentication or host-key failure.
    #[error("connection to {target} failed: {detail}")]
    Connection { target: String, detail: String },
    /// Remote multiplexer missing, or the session is absent when required.
    #[error("session `{alias}`: {detail}")]
    RemoteSession { alias: String, detail: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit code for this error.
    ///
    /// Bad invocations get 2, propagated failures get 1.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) | Self::Config(_) => 2,
            Self::Connection { .. } | Self::RemoteSession { .. } | Self::Io(_) => 1,
        }
    }
}
