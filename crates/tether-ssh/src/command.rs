//! Building ssh argument vectors.

use std::path::{Path, PathBuf};

use tether_core::{Config, Error, SessionKey};
use thiserror::Error;

use crate::shell::resolve_executable_path;

/// Command build error.
#[derive(Debug, Error)]
pub enum CommandBuildError {
    #[error("transport command cannot be parsed: {0}")]
    InvalidBase(String),
    #[error("transport command is empty")]
    EmptyCommand,
    #[error("executable not found: {0}")]
    NotFound(String),
}

impl From<CommandBuildError> for Error {
    fn from(err: CommandBuildError) -> Self {
        match err {
            CommandBuildError::NotFound(_) => Self::Connection {
                target: "local".into(),
                detail: err.to_string(),
            },
            CommandBuildError::InvalidBase(_) | CommandBuildError::EmptyCommand => {
                Self::Config(err.to_string())
            }
        }
    }
}

/// Parsed command parts (program + args).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandParts {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandParts {
    /// Create new command parts.
    #[must_use]
    pub const fn new(program: String, args: Vec<String>) -> Self {
        Self { program, args }
    }

    /// Resolve the program to an absolute path.
    ///
    /// # Errors
    /// Returns error if executable not found.
    pub async fn into_resolved(self) -> Result<(PathBuf, Vec<String>), CommandBuildError> {
        let Self { program, args } = self;
        let Some(executable) = resolve_executable_path(&program).await else {
            return Err(CommandBuildError::NotFound(program));
        };
        Ok((executable, args))
    }
}

/// What a single transport call does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SshMode<'a> {
    /// Start a background master (`-M -N -f`).
    Master,
    /// Ask a master whether it is alive (`-O check`).
    Check,
    /// Ask a master to exit (`-O exit`).
    Exit,
    /// Run a remote command without a tty.
    Exec(&'a str),
    /// Run a remote command on a forced tty.
    Interactive(&'a str),
}

/// Builder for one transport invocation against a session key.
#[derive(Debug, Clone)]
pub struct SshCommand<'a> {
    config: &'a Config,
    key: &'a SessionKey,
    control_path: Option<&'a Path>,
}

impl<'a> SshCommand<'a> {
    #[must_use]
    pub const fn new(config: &'a Config, key: &'a SessionKey) -> Self {
        Self {
            config,
            key,
            control_path: None,
        }
    }

    /// Route through the master socket at `path`.
    #[must_use]
    pub const fn control_path(mut self, path: &'a Path) -> Self {
        self.control_path = Some(path);
        self
    }

    /// Build argv for `mode`.
    ///
    /// # Errors
    /// Returns error if the configured transport command is invalid.
    pub fn build(&self, mode: SshMode<'_>) -> Result<CommandParts, CommandBuildError> {
        let mut parts = split_command_line(&self.config.ssh_command)?;
        if parts.is_empty() {
            return Err(CommandBuildError::EmptyCommand);
        }
        let program = parts.remove(0);
        let mut args = parts;

        args.extend(["-p".to_string(), self.key.port.to_string()]);
        self.push_options(&mut args);

        match self.control_path {
            Some(path) => {
                args.extend(["-S".to_string(), path.display().to_string()]);
            }
            None => push_option(&mut args, "ControlPath", "none"),
        }

        match mode {
            SshMode::Master => {
                args.extend(["-M", "-N", "-f"].map(String::from));
                push_option(&mut args, "ControlPersist", &self.config.control_persist);
            }
            SshMode::Check => args.extend(["-O", "check"].map(String::from)),
            SshMode::Exit => args.extend(["-O", "exit"].map(String::from)),
            SshMode::Exec(_) => {
                args.push("-T".into());
                push_option(&mut args, "ControlMaster", "no");
            }
            SshMode::Interactive(_) => {
                args.push("-t".into());
                push_option(&mut args, "ControlMaster", "no");
            }
        }

        args.push(self.key.target.to_string());
        if let SshMode::Exec(remote) | SshMode::Interactive(remote) = mode {
            args.push(remote.to_string());
        }

        Ok(CommandParts::new(program, args))
    }

    fn push_options(&self, args: &mut Vec<String>) {
        let config = self.config;
        push_option(
            args,
            "ServerAliveInterval",
            &config.server_alive_interval.to_string(),
        );
        push_option(
            args,
            "ServerAliveCountMax",
            &config.server_alive_count_max.to_string(),
        );
        push_option(args, "StrictHostKeyChecking", &config.host_key_checking);
        if let Some(list) = &config.kex_algorithms {
            push_option(args, "KexAlgorithms", list);
        }
        if let Some(list) = &config.ciphers {
            push_option(args, "Ciphers", list);
        }
        if let Some(list) = &config.macs {
            push_option(args, "MACs", list);
        }
        if let Some(identity) = &config.identity_file {
            args.extend(["-i".to_string(), identity.display().to_string()]);
        }
        if let Some(jump) = &config.jump_host {
            args.extend(["-J".to_string(), jump.clone()]);
        }
    }
}

fn push_option(args: &mut Vec<String>, name: &str, value: &str) {
    args.push("-o".into());
    args.push(format!("{name}={value}"));
}

fn split_command_line(input: &str) -> Result<Vec<String>, CommandBuildError> {
    shlex::split(input).ok_or_else(|| CommandBuildError::InvalidBase(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SessionKey {
        SessionKey::new("demo", "alice@10.0.0.5".parse().unwrap(), 2222).unwrap()
    }

    fn has_pair(args: &[String], flag: &str, value: &str) -> bool {
        args.windows(2).any(|w| w[0] == flag && w[1] == value)
    }

    #[test]
    fn exec_over_socket() {
        let config = Config::default();
        let key = key();
        let path = PathBuf::from("/run/user/1000/tether/abc.sock");
        let parts = SshCommand::new(&config, &key)
            .control_path(&path)
            .build(SshMode::Exec("tmux ls"))
            .unwrap();

        assert_eq!(parts.program, "ssh");
        assert!(has_pair(&parts.args, "-p", "2222"));
        assert!(has_pair(&parts.args, "-S", "/run/user/1000/tether/abc.sock"));
        assert!(has_pair(&parts.args, "-o", "ControlMaster=no"));
        assert!(has_pair(&parts.args, "-o", "StrictHostKeyChecking=accept-new"));
        assert!(parts.args.contains(&"-T".to_string()));
        assert_eq!(
            &parts.args[parts.args.len() - 2..],
            ["alice@10.0.0.5".to_string(), "tmux ls".to_string()]
        );
    }

    #[test]
    fn master_carries_persistence() {
        let config = Config {
            control_persist: "30m".into(),
            server_alive_interval: 5,
            server_alive_count_max: 2,
            ..Config::default()
        };
        let key = key();
        let path = PathBuf::from("/tmp/x.sock");
        let parts = SshCommand::new(&config, &key)
            .control_path(&path)
            .build(SshMode::Master)
            .unwrap();

        for flag in ["-M", "-N", "-f"] {
            assert!(parts.args.contains(&flag.to_string()), "{flag}");
        }
        assert!(has_pair(&parts.args, "-o", "ControlPersist=30m"));
        assert!(has_pair(&parts.args, "-o", "ServerAliveInterval=5"));
        assert!(has_pair(&parts.args, "-o", "ServerAliveCountMax=2"));
        assert_eq!(parts.args.last().map(String::as_str), Some("alice@10.0.0.5"));
    }

    #[test]
    fn without_socket_disables_control_path() {
        let config = Config::default();
        let key = key();
        let parts = SshCommand::new(&config, &key)
            .build(SshMode::Interactive("tmux attach-session -t '=demo'"))
            .unwrap();
        assert!(has_pair(&parts.args, "-o", "ControlPath=none"));
        assert!(parts.args.contains(&"-t".to_string()));
        assert!(!parts.args.contains(&"-S".to_string()));
    }

    #[test]
    fn optional_settings() {
        let config = Config {
            ssh_command: "autossh -M 0".into(),
            kex_algorithms: Some("curve25519-sha256".into()),
            ciphers: Some("aes256-gcm@openssh.com".into()),
            macs: Some("hmac-sha2-512".into()),
            identity_file: Some(PathBuf::from("/keys/id_ed25519")),
            jump_host: Some("bastion".into()),
            ..Config::default()
        };
        let key = key();
        let parts = SshCommand::new(&config, &key).build(SshMode::Check).unwrap();

        assert_eq!(parts.program, "autossh");
        assert_eq!(&parts.args[..2], ["-M".to_string(), "0".to_string()]);
        assert!(has_pair(&parts.args, "-o", "KexAlgorithms=curve25519-sha256"));
        assert!(has_pair(&parts.args, "-o", "Ciphers=aes256-gcm@openssh.com"));
        assert!(has_pair(&parts.args, "-o", "MACs=hmac-sha2-512"));
        assert!(has_pair(&parts.args, "-i", "/keys/id_ed25519"));
        assert!(has_pair(&parts.args, "-J", "bastion"));
        assert!(has_pair(&parts.args, "-O", "check"));
    }

    #[test]
    fn invalid_transport_command() {
        let key = key();
        let unbalanced = Config {
            ssh_command: "ssh 'oops".into(),
            ..Config::default()
        };
        assert!(matches!(
            SshCommand::new(&unbalanced, &key).build(SshMode::Check),
            Err(CommandBuildError::InvalidBase(_))
        ));

        let blank = Config {
            ssh_command: String::new(),
            ..Config::default()
        };
        assert!(matches!(
            SshCommand::new(&blank, &key).build(SshMode::Check),
            Err(CommandBuildError::EmptyCommand)
        ));
    }
}
