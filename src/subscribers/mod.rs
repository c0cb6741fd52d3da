//! # Event subscribers.
//!
//! ## Architecture
//! ```text
//! Lifecycle/Adapter/Workers ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                                                         │
//!                                                                ┌────────┴────────┐
//!                                                                ▼                 ▼
//!                                                            LogWriter          Custom
//! ```

mod log;
mod set;
mod subscriber;

pub use log::LogWriter;
pub(crate) use set::SubscriberSet;
pub use subscriber::Subscribe;
