//! # Operator control: what ends a running adapter.
//!
//! [`wait_for_quit`] completes on the first of:
//! - the quit character typed on the console;
//! - a control line on the loopback control port (when configured);
//! - a termination signal.
//!
//! Console EOF is not a quit request; the adapter keeps waiting on the
//! other sources.

use std::fmt;
use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

/// What requested shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitSource {
    Console,
    ControlPort,
    Signal(&'static str),
}

impl QuitSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuitSource::Console => "console",
            QuitSource::ControlPort => "control_port",
            QuitSource::Signal(name) => name,
        }
    }
}

impl fmt::Display for QuitSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reads lines until one contains `quit`.
///
/// Returns `Ok(true)` on quit, `Ok(false)` on EOF.
pub async fn read_until_quit<R>(mut reader: R, quit: char) -> io::Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(false);
        }
        if line.contains(quit) {
            return Ok(true);
        }
    }
}

/// Binds the control port on the loopback interface.
pub async fn bind_control(port: u16) -> io::Result<TcpListener> {
    TcpListener::bind(("127.0.0.1", port)).await
}

/// Accepts control connections until one sends a line equal to `quit`.
pub async fn serve_control(listener: TcpListener, quit: char) -> io::Result<()> {
    let requested = CancellationToken::new();
    loop {
        tokio::select! {
            _ = requested.cancelled() => return Ok(()),
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                tracing::debug!(%peer, "control connection");
                let requested = requested.clone();
                tokio::spawn(async move {
                    match control_session(stream, quit).await {
                        Ok(true) => requested.cancel(),
                        Ok(false) => {}
                        Err(err) => tracing::warn!(%peer, error = %err, "control connection failed"),
                    }
                });
            }
        }
    }
}

async fn control_session(stream: TcpStream, quit: char) -> io::Result<bool> {
    let mut lines = BufReader::new(stream).lines();
    while let Some(line) = lines.next_line().await? {
        let mut chars = line.trim().chars();
        if chars.next() == Some(quit) && chars.next().is_none() {
            return Ok(true);
        }
        tracing::debug!(line = %line.trim(), "ignored control line");
    }
    Ok(false)
}

/// Waits for a termination signal and names it.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = sigint.recv()  => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sigquit.recv() => "SIGQUIT",
    };
    Ok(name)
}

/// Waits for a termination signal and names it.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl_c")
}

/// Blocks until the operator asks the adapter to stop.
///
/// `console` is the operator's terminal, normally stdin.
pub async fn wait_for_quit<R>(
    console: R,
    quit: char,
    control_port: Option<u16>,
) -> io::Result<QuitSource>
where
    R: AsyncBufRead + Unpin,
{
    let control = match control_port {
        Some(port) => match bind_control(port).await {
            Ok(listener) => {
                tracing::info!(port, "control port listening");
                Some(listener)
            }
            Err(err) => {
                tracing::warn!(port, error = %err, "control port unavailable");
                None
            }
        },
        None => None,
    };

    let console = async {
        match read_until_quit(console, quit).await {
            Ok(true) => QuitSource::Console,
            Ok(false) => {
                tracing::debug!("console closed");
                std::future::pending().await
            }
            Err(err) => {
                tracing::warn!(error = %err, "console read failed");
                std::future::pending().await
            }
        }
    };

    let control = async {
        match control {
            Some(listener) => match serve_control(listener, quit).await {
                Ok(()) => QuitSource::ControlPort,
                Err(err) => {
                    tracing::warn!(error = %err, "control port stopped");
                    std::future::pending().await
                }
            },
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        source = console => Ok(source),
        source = control => Ok(source),
        signal = wait_for_shutdown_signal() => signal.map(QuitSource::Signal),
    }
}
