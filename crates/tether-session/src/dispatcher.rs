//! Verb dispatch: composes the transport and the session controller.

use tether_core::{Command, Config, Error, Invocation, Payload, Record, Transport};

use crate::controller::SessionController;

/// What an invocation produced.
#[derive(Debug)]
pub enum Outcome {
    /// A record to render.
    Record(Record),
    /// Exit status of an interactive attach, passed through as-is.
    Exit(i32),
}

/// Runs one [`Invocation`] to completion.
///
/// Holds no state between invocations; every verb re-queries the remote
/// side through the transport.
pub struct Dispatcher<T> {
    controller: SessionController<T>,
    close_master: bool,
}

impl<T: Transport> Dispatcher<T> {
    /// Create a dispatcher over a transport.
    #[must_use]
    pub fn new(transport: T, config: &Config) -> Self {
        Self {
            controller: SessionController::new(transport, config),
            close_master: config.close_master,
        }
    }

    /// Execute the invocation.
    ///
    /// # Errors
    /// Returns the first transport or session error; nothing is retried.
    pub async fn dispatch(&self, invocation: &Invocation) -> Result<Outcome, Error> {
        let key = &invocation.key;
        let verb = invocation.verb();
        let transport = self.controller.transport();
        tracing::debug!(verb = verb.as_str(), alias = %key.alias, remote = %key.connection_id(), "dispatching");

        let payload = match &invocation.command {
            Command::Open => {
                transport.ensure(key).await?;
                self.controller.ensure_exists(key).await?;
                None
            }
            Command::Run { command } => {
                if command.trim().is_empty() {
                    return Err(Error::Usage("empty command".into()));
                }
                transport.ensure(key).await?;
                self.controller.send_input(key, command).await?;
                Some(Payload::Sent {
                    sent: command.clone(),
                })
            }
            Command::Logs { lines } => {
                transport.ensure(key).await?;
                let output = self.controller.capture_output(key, *lines).await?;
                Some(Payload::Captured {
                    output,
                    lines: *lines,
                })
            }
            Command::Status => {
                // Must not ensure anything: absence is the answer.
                let connection_alive = transport.is_alive(key).await;
                let session_alive = self.controller.exists(key).await?;
                Some(Payload::Status {
                    connection_alive,
                    session_alive,
                })
            }
            Command::Attach => {
                transport.ensure(key).await?;
                let status = self.controller.attach(key).await?;
                return Ok(Outcome::Exit(status));
            }
            Command::Close => {
                self.controller.destroy(key).await?;
                if self.close_master {
                    transport.teardown(key).await?;
                }
                None
            }
        };

        Ok(Outcome::Record(Record::success(verb, key, payload)))
    }
}
