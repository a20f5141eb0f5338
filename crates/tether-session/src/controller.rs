//! Remote tmux session primitives.

use tether_core::{Config, Error, RemoteOutput, SessionKey, Transport};

use crate::quote::{quote, tmux_literal};

/// Remote exit status of a shell that could not find the command.
const COMMAND_NOT_FOUND: i32 = 127;

/// Issues tmux primitives for a session key over a [`Transport`].
///
/// Every primitive is exactly one remote invocation. Session targets use
/// tmux's `=` exact-match prefix so `dev` never resolves to `dev2`.
pub struct SessionController<T> {
    transport: T,
    tmux: String,
}

impl<T: Transport> SessionController<T> {
    #[must_use]
    pub fn new(transport: T, config: &Config) -> Self {
        Self {
            transport,
            tmux: config.tmux_command.clone(),
        }
    }

    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Create the detached session if absent. Never fails because it exists.
    ///
    /// Creation is attempted first and existence checked only when it fails,
    /// so a concurrent creator of the same session is not an error.
    ///
    /// # Errors
    /// Returns error if the transport fails or tmux cannot create the session.
    pub async fn ensure_exists(&self, key: &SessionKey) -> Result<(), Error> {
        let tmux = &self.tmux;
        let script = format!(
            "{tmux} new-session -d -s {name} || {tmux} has-session -t {target}",
            target = session_target(&key.alias),
            name = quote(&key.alias),
        );
        let output = self.transport.exec(key, &script).await?;
        self.check(key, output, "cannot create session")?;
        Ok(())
    }

    /// Type `text` into the session and press Enter.
    ///
    /// Returns once tmux has the keys, not once the command finishes.
    ///
    /// # Errors
    /// Returns error if the transport fails or the session does not exist.
    pub async fn send_input(&self, key: &SessionKey, text: &str) -> Result<(), Error> {
        let tmux = &self.tmux;
        let pane = pane_target(&key.alias);
        let script = format!(
            "{tmux} send-keys -t {pane} -l -- {text} \\; send-keys -t {pane} Enter",
            text = quote(&tmux_literal(text)),
        );
        let output = self.transport.exec(key, &script).await?;
        self.check(key, output, "cannot send input")?;
        Ok(())
    }

    /// The last `lines` lines of the pane, scrollback included.
    ///
    /// Trailing blank rows of the pane are dropped first; an empty pane
    /// yields an empty string.
    ///
    /// # Errors
    /// Returns error if the transport fails or the session does not exist.
    pub async fn capture_output(&self, key: &SessionKey, lines: u32) -> Result<String, Error> {
        let tmux = &self.tmux;
        let script = format!(
            "{tmux} capture-pane -p -J -t {pane} -S -{lines}",
            pane = pane_target(&key.alias),
        );
        let output = self.transport.exec(key, &script).await?;
        let output = self.check(key, output, "cannot capture output")?;
        Ok(tail_lines(&output.stdout, lines as usize))
    }

    /// Attach the local terminal to the session; returns its exit status.
    ///
    /// # Errors
    /// Returns error if the transport cannot be started.
    pub async fn attach(&self, key: &SessionKey) -> Result<i32, Error> {
        let script = format!(
            "{} attach-session -t {}",
            self.tmux,
            session_target(&key.alias)
        );
        self.transport.exec_interactive(key, &script).await
    }

    /// Kill the session. A session that is already gone is not an error.
    ///
    /// # Errors
    /// Returns error only if the transport itself fails.
    pub async fn destroy(&self, key: &SessionKey) -> Result<(), Error> {
        let script = format!(
            "{} kill-session -t {}",
            self.tmux,
            session_target(&key.alias)
        );
        let output = self.transport.exec(key, &script).await?;
        if !output.success() {
            tracing::debug!(
                alias = %key.alias,
                detail = %output.detail(),
                "kill-session failed, treating session as gone"
            );
        }
        Ok(())
    }

    /// Whether the session currently exists. Creates nothing.
    ///
    /// # Errors
    /// Returns error if the transport fails or tmux is missing remotely.
    pub async fn exists(&self, key: &SessionKey) -> Result<bool, Error> {
        let script = format!(
            "{} has-session -t {}",
            self.tmux,
            session_target(&key.alias)
        );
        let output = self.transport.exec(key, &script).await?;
        match output.status {
            0 => Ok(true),
            1 => Ok(false),
            _ => self.check(key, output, "cannot query session").map(|_| false),
        }
    }

    fn check(
        &self,
        key: &SessionKey,
        output: RemoteOutput,
        context: &str,
    ) -> Result<RemoteOutput, Error> {
        match output.status {
            0 => Ok(output),
            COMMAND_NOT_FOUND => Err(Error::RemoteSession {
                alias: key.alias.clone(),
                detail: format!("`{}` not found on {}", self.tmux, key.target),
            }),
            _ => Err(Error::RemoteSession {
                alias: key.alias.clone(),
                detail: format!("{context}: {}", output.detail()),
            }),
        }
    }
}

/// Exact-match session target.
fn session_target(alias: &str) -> String {
    quote(&format!("={alias}"))
}

/// Active pane of the exact-match session.
fn pane_target(alias: &str) -> String {
    quote(&format!("={alias}:"))
}

/// At most `n` trailing lines of `text`, ignoring trailing blank rows.
fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    let end = lines
        .iter()
        .rposition(|line| !line.is_empty())
        .map_or(0, |i| i + 1);
    let start = end.saturating_sub(n);
    lines[start..end].join("\n")
}
