//! Remote session control for tether.
//!
//! Provides:
//! - `SessionController` - tmux primitives over any `Transport`
//! - `Dispatcher` - one verb per invocation, composed from those primitives

pub mod controller;
pub mod dispatcher;
pub mod quote;

#[cfg(test)]
mod fake;

pub use controller::SessionController;
pub use dispatcher::{Dispatcher, Outcome};
pub use quote::{quote, tmux_literal};
