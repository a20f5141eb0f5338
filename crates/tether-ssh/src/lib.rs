//! Multiplexed ssh transport.
//!
//! Provides:
//! - `Multiplexer` - one reusable master connection per (user, host, port)
//! - `SshCommand` - argv construction for every transport call
//! - Control socket placement and executable resolution

pub mod command;
pub mod mux;
pub mod shell;
pub mod socket;

pub use command::{CommandBuildError, CommandParts, SshCommand, SshMode};
pub use mux::Multiplexer;
pub use shell::resolve_executable_path;
