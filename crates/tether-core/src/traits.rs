//! The transport seam between session control and the network.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{Error, SessionKey};

/// Exit status and captured streams of one remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteOutput {
    /// Exit status of the remote command.
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RemoteOutput {
    #[must_use]
    pub const fn success(&self) -> bool {
        self.status == 0
    }

    /// The most useful diagnostic text: stderr if present, otherwise stdout.
    #[must_use]
    pub fn detail(&self) -> String {
        let stderr = self.stderr.trim();
        let detail = if stderr.is_empty() {
            self.stdout.trim()
        } else {
            stderr
        };
        if detail.is_empty() {
            format!("exited with status {}", self.status)
        } else {
            detail.to_string()
        }
    }
}

/// Runs remote command strings for a session key.
///
/// Connection state lives in the OS (control sockets) and may be changed by
/// other processes at any time; implementations must query it, not cache it.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Make a reusable connection exist for `key`. Idempotent.
    async fn ensure(&self, key: &SessionKey) -> Result<(), Error>;

    /// Whether a reusable connection is currently alive. Never creates one.
    async fn is_alive(&self, key: &SessionKey) -> bool;

    /// Run one remote command and capture its output.
    ///
    /// A non-zero remote exit is not an error here; failures of the
    /// transport itself are.
    async fn exec(&self, key: &SessionKey, remote_command: &str) -> Result<RemoteOutput, Error>;

    /// Run one remote command attached to the local terminal.
    ///
    /// Returns the exit status unmodified.
    async fn exec_interactive(&self, key: &SessionKey, remote_command: &str)
    -> Result<i32, Error>;

    /// Drop the reusable connection for `key`, if any. Best-effort.
    async fn teardown(&self, key: &SessionKey) -> Result<(), Error>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn ensure(&self, key: &SessionKey) -> Result<(), Error> {
        (**self).ensure(key).await
    }

    async fn is_alive(&self, key: &SessionKey) -> bool {
        (**self).is_alive(key).await
    }

    async fn exec(&self, key: &SessionKey, remote_command: &str) -> Result<RemoteOutput, Error> {
        (**self).exec(key, remote_command).await
    }

    async fn exec_interactive(&self, key: &SessionKey, remote_command: &str)
    -> Result<i32, Error> {
        (**self).exec_interactive(key, remote_command).await
    }

    async fn teardown(&self, key: &SessionKey) -> Result<(), Error> {
        (**self).teardown(key).await
    }
}
