//! Process-wide `tracing` setup.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Installs the global subscriber.
///
/// Records go to `log_file` (created if missing, appended) or to stderr.
/// `RUST_LOG` overrides the default `info` filter. When a global subscriber
/// is already installed it stays in place and the refusal is logged at debug.
pub fn init(log_file: Option<&Path>) -> io::Result<()> {
    let (writer, ansi) = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(io::stderr), true),
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(ansi)
        .with_target(false)
        .with_writer(writer)
        .try_init();
    if let Err(err) = installed {
        // goes to the subscriber that is already installed
        tracing::debug!(error = %err, "global subscriber already set; keeping it");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritable_log_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-dir").join("adapter.log");
        assert!(init(Some(&missing)).is_err());
    }

    #[test]
    fn creates_the_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adapter.log");
        init(Some(&path)).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn second_init_keeps_the_first_subscriber() {
        let dir = tempfile::tempdir().unwrap();
        init(Some(&dir.path().join("first.log"))).unwrap();
        let second = dir.path().join("second.log");
        init(Some(&second)).unwrap();
        // the file is opened before install is attempted
        assert!(second.exists());
        assert!(tracing::dispatcher::has_been_set());
    }
}
