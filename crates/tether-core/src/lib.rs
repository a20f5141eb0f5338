//! Core abstractions for persistent remote shell sessions.
//!
//! This crate provides the fundamental building blocks:
//! - `SessionKey` - alias, target and port addressing one remote session
//! - `Config` - every environment override, resolved once
//! - `Command` / `Invocation` - the typed unit of work per process
//! - `Transport` - the seam to the network
//! - `Record` - structured and human output

pub mod command;
pub mod config;
pub mod error;
pub mod key;
pub mod record;
pub mod traits;

pub use command::{Command, Invocation, Verb};
pub use config::Config;
pub use error::Error;
pub use key::{SessionKey, Target};
pub use record::{Payload, Record};
pub use traits::{RemoteOutput, Transport};
