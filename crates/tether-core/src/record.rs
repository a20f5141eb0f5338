//! Output records: one JSON line or one human line per invocation.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::{Error, SessionKey, Verb};

/// Verb-specific part of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// Echo of the command typed into the session.
    Sent { sent: String },
    /// Captured pane text.
    Captured { output: String, lines: u32 },
    /// Independent liveness flags.
    Status {
        connection_alive: bool,
        session_alive: bool,
    },
    /// Diagnostic for a failed invocation.
    Failed { error: String },
}

/// Result of one non-interactive invocation.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub ok: bool,
    pub verb: Verb,
    pub alias: String,
    pub host: String,
    pub port: u16,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
    #[serde(serialize_with = "serialize_ts")]
    pub ts: DateTime<Utc>,
}

impl Record {
    /// A successful record, stamped now.
    #[must_use]
    pub fn success(verb: Verb, key: &SessionKey, payload: Option<Payload>) -> Self {
        Self {
            ok: true,
            verb,
            alias: key.alias.clone(),
            host: key.target.to_string(),
            port: key.port,
            payload,
            ts: Utc::now(),
        }
    }

    /// A failure record carrying the error text.
    ///
    /// Takes the operands as given, since they may never have formed a
    /// valid [`SessionKey`].
    #[must_use]
    pub fn failure(verb: Verb, alias: &str, host: &str, port: u16, error: &Error) -> Self {
        Self {
            ok: false,
            verb,
            alias: alias.to_string(),
            host: host.to_string(),
            port,
            payload: Some(Payload::Failed {
                error: error.to_string(),
            }),
            ts: Utc::now(),
        }
    }

    /// Single-line JSON rendering.
    ///
    /// # Errors
    /// Returns error if serialization fails.
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Free-form rendering for people.
    ///
    /// For `logs` this is the captured text itself.
    #[must_use]
    pub fn to_human(&self) -> String {
        let place = format!("{}:{}", self.host, self.port);
        match (&self.payload, self.verb) {
            (Some(Payload::Failed { error }), _) => format!("{} failed: {error}", self.verb.as_str()),
            (Some(Payload::Captured { output, .. }), _) => output.clone(),
            (Some(Payload::Sent { sent }), _) => format!("sent to {}: {sent}", self.alias),
            (
                Some(Payload::Status {
                    connection_alive,
                    session_alive,
                }),
                _,
            ) => format!(
                "{} on {place}: connection {}, session {}",
                self.alias,
                alive(*connection_alive),
                alive(*session_alive),
            ),
            (None, Verb::Close) => format!("closed {} on {place}", self.alias),
            (None, verb) => format!("{} {} on {place}: ok", verb.as_str(), self.alias),
        }
    }
}

const fn alive(flag: bool) -> &'static str {
    if flag { "alive" } else { "down" }
}

fn serialize_ts<S: serde::Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Secs, true))
}
