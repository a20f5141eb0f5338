//! Session keys: the (alias, target, port) triple every verb addresses.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// A `user@host` destination.
///
/// The user part is optional so that `host` alone defers to the
/// transport's own configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    /// Remote login name.
    pub user: Option<String>,
    /// Hostname or address.
    pub host: String,
}

impl FromStr for Target {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (user, host) = match s.rsplit_once('@') {
            Some((user, host)) => {
                if user.is_empty() {
                    return Err(Error::Usage(format!("missing user before `@` in `{s}`")));
                }
                (Some(user.to_string()), host)
            }
            None => (None, s),
        };

        if host.is_empty() {
            return Err(Error::Usage(format!("missing host in `{s}`")));
        }
        // A leading dash would be read as an option by the transport.
        if host.starts_with('-') || user.as_deref().is_some_and(|u| u.starts_with('-')) {
            return Err(Error::Usage(format!("invalid destination `{s}`")));
        }
        if s.chars().any(char::is_whitespace) {
            return Err(Error::Usage(format!("destination `{s}` contains whitespace")));
        }

        Ok(Self {
            user,
            host: host.to_string(),
        })
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.user {
            Some(user) => write!(f, "{user}@{}", self.host),
            None => f.write_str(&self.host),
        }
    }
}

/// Identifies one remote session: alias on a target reached through a port.
///
/// Two keys that differ only in alias share a connection but address
/// different remote sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    /// Caller-chosen session name.
    pub alias: String,
    /// Where the session lives.
    pub target: Target,
    /// Transport port.
    pub port: u16,
}

impl SessionKey {
    /// Build a key, validating the alias.
    ///
    /// # Errors
    /// Returns [`Error::Usage`] if the alias is empty or contains characters
    /// the remote multiplexer treats as target separators.
    pub fn new(alias: impl Into<String>, target: Target, port: u16) -> Result<Self, Error> {
        let alias = alias.into();
        validate_alias(&alias)?;
        if port == 0 {
            return Err(Error::Usage("port must be between 1 and 65535".into()));
        }
        Ok(Self {
            alias,
            target,
            port,
        })
    }

    /// Canonical `user@host:port` form shared by every alias on the same link.
    #[must_use]
    pub fn connection_id(&self) -> String {
        format!("{}:{}", self.target, self.port)
    }
}

fn validate_alias(alias: &str) -> Result<(), Error> {
    if alias.trim().is_empty() {
        return Err(Error::Usage("alias must not be empty".into()));
    }
    if let Some(c) = alias
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || matches!(c, ':' | '.'))
    {
        return Err(Error::Usage(format!(
            "alias `{alias}` contains unsupported character {c:?}"
        )));
    }
    Ok(())
}
