//! Connection multiplexing over ssh control masters.

use std::{
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
};

use async_trait::async_trait;
use tether_core::{Config, Error, RemoteOutput, SessionKey, Transport};
use tokio::process::Command;

use crate::{
    command::{CommandParts, SshCommand, SshMode},
    socket,
};

/// Exit status ssh reserves for its own failures.
const SSH_FAILURE_STATUS: i32 = 255;

/// Maps session keys onto ssh master connections.
///
/// Holds no connection state of its own: liveness is always asked of the
/// control socket, which other processes may create or drop at any time.
#[derive(Debug, Clone)]
pub struct Multiplexer {
    config: Config,
    socket_dir: Option<PathBuf>,
}

impl Multiplexer {
    /// Create a multiplexer, preparing the socket directory when enabled.
    ///
    /// # Errors
    /// Returns error if multiplexing is on and no socket directory is usable.
    pub fn new(config: Config) -> Result<Self, Error> {
        let socket_dir = if config.multiplex {
            Some(socket::socket_dir(&config)?)
        } else {
            None
        };
        Ok(Self { config, socket_dir })
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Control socket for `key`, or `None` when multiplexing is off.
    #[must_use]
    pub fn control_path(&self, key: &SessionKey) -> Option<PathBuf> {
        self.socket_dir
            .as_deref()
            .map(|dir| socket::control_path(dir, key))
    }

    fn build(
        &self,
        key: &SessionKey,
        path: Option<&Path>,
        mode: SshMode<'_>,
    ) -> Result<CommandParts, Error> {
        let command = SshCommand::new(&self.config, key);
        let command = match path {
            Some(path) => command.control_path(path),
            None => command,
        };
        Ok(command.build(mode)?)
    }

    async fn check(&self, key: &SessionKey, path: &Path) -> bool {
        if !path.exists() {
            return false;
        }
        let parts = match self.build(key, Some(path), SshMode::Check) {
            Ok(parts) => parts,
            Err(err) => {
                tracing::debug!(%err, "cannot build master check");
                return false;
            }
        };
        match run_captured(parts).await {
            Ok(output) => output.success(),
            Err(err) => {
                tracing::debug!(%err, "master check failed to run");
                false
            }
        }
    }

    async fn open_master(&self, key: &SessionKey, path: &Path) -> Result<(), Error> {
        remove_quietly(path);
        let parts = self.build(key, Some(path), SshMode::Master)?;
        let (program, args) = parts.into_resolved().await?;

        // The master keeps stderr after backgrounding itself; a pipe would
        // hold our caller's stream open for the master's whole lifetime.
        let log_path = path.with_extension("log");
        let log = std::fs::File::create(&log_path)?;

        tracing::debug!(program = %program.display(), ?args, "opening master connection");
        let status = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(log))
            .status()
            .await?;

        let log_text = std::fs::read_to_string(&log_path).unwrap_or_default();
        remove_quietly(&log_path);

        if status.success() {
            tracing::info!(
                remote = %key.connection_id(),
                socket = %path.display(),
                "master connection opened"
            );
            Ok(())
        } else {
            let detail = log_text.trim();
            Err(Error::Connection {
                target: key.connection_id(),
                detail: if detail.is_empty() {
                    format!("master exited with status {}", exit_code(status))
                } else {
                    detail.to_string()
                },
            })
        }
    }
}

#[async_trait]
impl Transport for Multiplexer {
    async fn ensure(&self, key: &SessionKey) -> Result<(), Error> {
        let Some(path) = self.control_path(key) else {
            tracing::debug!("multiplexing disabled, every call opens its own connection");
            return Ok(());
        };
        if self.check(key, &path).await {
            tracing::debug!(socket = %path.display(), "reusing master connection");
            return Ok(());
        }
        self.open_master(key, &path).await
    }

    async fn is_alive(&self, key: &SessionKey) -> bool {
        match self.control_path(key) {
            Some(path) => self.check(key, &path).await,
            None => false,
        }
    }

    async fn exec(&self, key: &SessionKey, remote_command: &str) -> Result<RemoteOutput, Error> {
        let path = self.control_path(key);
        let parts = self.build(key, path.as_deref(), SshMode::Exec(remote_command))?;
        let output = run_captured(parts).await?;

        if output.status == SSH_FAILURE_STATUS {
            return Err(Error::Connection {
                target: key.connection_id(),
                detail: output.detail(),
            });
        }
        Ok(output)
    }

    async fn exec_interactive(
        &self,
        key: &SessionKey,
        remote_command: &str,
    ) -> Result<i32, Error> {
        let path = self.control_path(key);
        let parts = self.build(key, path.as_deref(), SshMode::Interactive(remote_command))?;
        let (program, args) = parts.into_resolved().await?;

        tracing::debug!(program = %program.display(), ?args, "handing terminal to remote");
        let status = Command::new(&program).args(&args).status().await?;
        Ok(exit_code(status))
    }

    async fn teardown(&self, key: &SessionKey) -> Result<(), Error> {
        let Some(path) = self.control_path(key) else {
            return Ok(());
        };
        if path.exists() {
            let parts = self.build(key, Some(&path), SshMode::Exit)?;
            match run_captured(parts).await {
                Ok(output) if output.success() => {
                    tracing::debug!(socket = %path.display(), "master connection stopped");
                }
                Ok(output) => {
                    tracing::warn!(detail = %output.detail(), "master did not stop cleanly");
                }
                Err(err) => tracing::warn!(%err, "could not ask master to stop"),
            }
        }
        remove_quietly(&path);
        Ok(())
    }
}

async fn run_captured(parts: CommandParts) -> Result<RemoteOutput, Error> {
    let (program, args) = parts.into_resolved().await?;
    tracing::debug!(program = %program.display(), ?args, "running transport command");

    let output = Command::new(&program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    Ok(RemoteOutput {
        status: exit_code(output.status),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

fn remove_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed stale file"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => tracing::warn!(path = %path.display(), %err, "could not remove file"),
    }
}
