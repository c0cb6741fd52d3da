//! # Lifecycle manager tunables.
//!
//! ## Sentinel values
//! - `grace = 0s` → workers are aborted right after cancellation is requested
//! - `max_workers = 0` → unlimited (no semaphore created)

use std::time::Duration;

/// Settings of the lifecycle manager that are not part of the command line.
///
/// ## Field semantics
/// - `grace`: how long teardown waits for a cancelled worker before aborting it
/// - `max_workers`: worker slot limit (`0` = unlimited)
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `quit_char`: character that ends the interactive session
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Wait for cancelled workers before aborting them.
    ///
    /// The default is zero: teardown requests cancellation and proceeds to
    /// resource release immediately.
    pub grace: Duration,

    /// Maximum number of concurrently running workers.
    ///
    /// A start that finds no free slot fails with
    /// [`WorkerStartError::Exhausted`](crate::WorkerStartError::Exhausted).
    pub max_workers: usize,

    /// Capacity of the lifecycle event bus.
    pub bus_capacity: usize,

    /// Character that ends the console session (and the control port session).
    pub quit_char: char,
}

impl RuntimeConfig {
    /// Returns the worker slot limit as an `Option`.
    ///
    /// - `None` → unlimited
    /// - `Some(n)` → at most `n` workers
    #[inline]
    pub fn worker_limit(&self) -> Option<usize> {
        if self.max_workers == 0 {
            None
        } else {
            Some(self.max_workers)
        }
    }

    /// Returns the grace period as an `Option` (`None` = abort immediately).
    #[inline]
    pub fn grace_period(&self) -> Option<Duration> {
        if self.grace == Duration::ZERO {
            None
        } else {
            Some(self.grace)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for RuntimeConfig {
    /// Default configuration:
    ///
    /// - `grace = 0s` (cancel and release without waiting)
    /// - `max_workers = 2` (one data, one actuate)
    /// - `bus_capacity = 256`
    /// - `quit_char = 'q'`
    fn default() -> Self {
        Self {
            grace: Duration::ZERO,
            max_workers: 2,
            bus_capacity: 256,
            quit_char: 'q',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_map_to_none() {
        let cfg = RuntimeConfig {
            grace: Duration::ZERO,
            max_workers: 0,
            bus_capacity: 0,
            quit_char: 'q',
        };
        assert_eq!(cfg.worker_limit(), None);
        assert_eq!(cfg.grace_period(), None);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }

    #[test]
    fn defaults_allow_both_workers() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.worker_limit(), Some(2));
        assert_eq!(cfg.quit_char, 'q');
    }
}
