//! Command-line grammar and its resolution into an [`Invocation`].

use clap::{Args, Parser, Subcommand, value_parser};
use tether_core::{Command, Config, Error, Invocation, SessionKey, Target, Verb};

/// tether -- drive persistent remote shells from one-shot commands.
#[derive(Debug, Parser)]
#[command(name = "tether", version, about)]
pub struct Cli {
    /// Emit one JSON record instead of a human line.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub verb: VerbArgs,
}

#[derive(Debug, Subcommand)]
pub enum VerbArgs {
    /// Connect and create the remote session if it does not exist.
    Open(StructuralArgs),
    /// Type a command into the session and press Enter.
    Run(RunArgs),
    /// Print the tail of the session's scrollback.
    Logs(LogsArgs),
    /// Report connection and session liveness without creating either.
    Status(StructuralArgs),
    /// Attach this terminal to the session.
    Attach(StructuralArgs),
    /// Destroy the session.
    Close(StructuralArgs),
}

/// Alias and destination, shared by every verb.
#[derive(Debug, Args)]
pub struct KeyArgs {
    /// Session name on the remote host.
    pub alias: String,
    /// Remote destination, `user@host` or `host`.
    pub destination: String,
}

#[derive(Debug, Args)]
pub struct StructuralArgs {
    #[command(flatten)]
    pub key: KeyArgs,
    /// Transport port (default `TETHER_PORT`, then 22).
    #[arg(value_parser = value_parser!(u16).range(1..))]
    pub port: Option<u16>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub key: KeyArgs,
    /// Command to type, after `--`.
    #[arg(last = true, required = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

#[derive(Debug, Args)]
pub struct LogsArgs {
    #[command(flatten)]
    pub key: KeyArgs,
    /// Number of lines (default `TETHER_LOG_LINES`, then 200).
    #[arg(value_parser = value_parser!(u32).range(1..))]
    pub lines: Option<u32>,
}

/// The operands of one invocation as typed, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operands<'a> {
    pub verb: Verb,
    pub alias: &'a str,
    pub destination: &'a str,
    pub port: u16,
}

impl VerbArgs {
    /// Verb, alias, destination and effective port, unvalidated.
    #[must_use]
    pub fn operands(&self, config: &Config) -> Operands<'_> {
        let (verb, key, port) = match self {
            Self::Open(args) => (Verb::Open, &args.key, args.port),
            Self::Status(args) => (Verb::Status, &args.key, args.port),
            Self::Attach(args) => (Verb::Attach, &args.key, args.port),
            Self::Close(args) => (Verb::Close, &args.key, args.port),
            Self::Run(args) => (Verb::Run, &args.key, None),
            Self::Logs(args) => (Verb::Logs, &args.key, None),
        };
        Operands {
            verb,
            alias: &key.alias,
            destination: &key.destination,
            port: port.unwrap_or(config.default_port),
        }
    }

    /// Apply defaults and validation, producing the typed unit of work.
    ///
    /// Pure: touches neither the network nor the environment.
    ///
    /// # Errors
    /// Returns [`Error::Usage`] for an invalid alias, destination or command.
    pub fn resolve(&self, config: &Config) -> Result<Invocation, Error> {
        let command = match self {
            Self::Open(_) => Command::Open,
            Self::Status(_) => Command::Status,
            Self::Attach(_) => Command::Attach,
            Self::Close(_) => Command::Close,
            Self::Run(args) => {
                let command = args.command.join(" ");
                if command.trim().is_empty() {
                    return Err(Error::Usage("run needs a command after `--`".into()));
                }
                Command::Run { command }
            }
            Self::Logs(args) => Command::Logs {
                lines: args.lines.unwrap_or(config.log_lines),
            },
        };

        let operands = self.operands(config);
        let target: Target = operands.destination.parse()?;
        let key = SessionKey::new(operands.alias, target, operands.port)?;
        Ok(Invocation::new(key, command))
    }
}
