//! Startup configuration.
//!
//! - [`Config`]: the immutable record produced by [`Config::resolve`] from
//!   command-line tokens. It only exists in a valid state.
//! - [`RuntimeConfig`]: tunables of the lifecycle manager itself (grace period,
//!   worker slots, event bus capacity, quit character).
//! - [`Secret`]: credential wrapper that never prints its value.
//! - [`SecretPrompt`]: source for the secret when `-p` is omitted.

mod record;
mod resolver;
mod runtime;

pub use record::{Config, Secret};
pub use resolver::{NoPrompt, SecretPrompt, TerminalPrompt, USAGE};
pub use runtime::RuntimeConfig;
