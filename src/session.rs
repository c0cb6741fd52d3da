//! One adapter process from resolved configuration to exit status.
//!
//! ```text
//! launch ──► Err(fatal)        ──► finish ──► 1
//!        ──► Err(WorkerStart)  ──► warn, keep running ─┐
//!        ──► Ok(workers)       ───────────────────────┤
//!                                                     ▼
//!                          wait_for_quit(console, control port, signals)
//!                                                     ▼
//!                                                  finish ──► 0
//! ```

use std::sync::Arc;

use tokio::io::AsyncBufRead;

use crate::backplane::BusConnector;
use crate::config::{Config, RuntimeConfig};
use crate::control;
use crate::core::Lifecycle;
use crate::error::AdapterError;
use crate::protocol::Registry;
use crate::subscribers::Subscribe;

/// Everything a session runs against besides its configuration.
pub struct Session {
    pub runtime: RuntimeConfig,
    pub registry: Arc<Registry>,
    pub connector: Arc<dyn BusConnector>,
    pub subscribers: Vec<Arc<dyn Subscribe>>,
}

impl Session {
    /// Runs the adapter until the operator quits and returns the exit status.
    ///
    /// `console` stands in for the operator's terminal.
    pub async fn run<R>(self, config: &Config, console: R) -> u8
    where
        R: AsyncBufRead + Unpin,
    {
        let quit = self.runtime.quit_char;
        let mut lifecycle = Lifecycle::builder(self.runtime, self.registry, self.connector)
            .with_subscribers(self.subscribers)
            .build();

        match lifecycle.launch(config).await {
            Ok(started) => tracing::info!(workers = started, "adapter running"),
            Err(AdapterError::WorkerStart(failures)) => {
                for failure in &failures {
                    tracing::warn!(capability = %failure.capability(), error = %failure, "worker not started");
                }
            }
            Err(err) => {
                tracing::error!(error = %err, label = err.as_label(), "adapter failed to start");
                lifecycle.finish().await;
                return err.exit_code();
            }
        }

        match control::wait_for_quit(console, quit, config.ipc_port()).await {
            Ok(source) => tracing::info!(%source, "quit requested"),
            Err(err) => tracing::error!(error = %err, "cannot wait for quit; shutting down"),
        }

        let report = lifecycle.finish().await;
        tracing::info!(
            workers = report.workers_cancelled,
            connection = report.connection_released,
            "adapter stopped"
        );
        0
    }
}
