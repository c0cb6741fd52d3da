use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use devgate::{
    Config, LocalBackplane, LogWriter, RuntimeConfig, Session, Subscribe, TerminalPrompt, USAGE,
    logging, units,
};
use tokio::io::BufReader;

/// Backplane ring size for the in-process backplane.
const BACKPLANE_CAPACITY: usize = 1024;

fn main() -> ExitCode {
    let tokens = std::env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned());
    let config = match Config::resolve(tokens, &TerminalPrompt) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("adapter: {err}");
            eprintln!("{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = logging::init(config.log_file()) {
        eprintln!("adapter: cannot set up logging: {err}");
        return ExitCode::FAILURE;
    }

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(err) => {
            tracing::error!(error = %err, "cannot start runtime");
            return ExitCode::FAILURE;
        }
    };

    let registry = units::builtin();
    tracing::info!(
        identity = config.identity(),
        protocol = config.protocol(),
        available = ?registry.kinds(),
        "starting adapter"
    );
    let session = Session {
        runtime: RuntimeConfig::default(),
        registry: Arc::new(registry),
        connector: Arc::new(LocalBackplane::open(BACKPLANE_CAPACITY)),
        subscribers: vec![Arc::new(LogWriter::new()) as Arc<dyn Subscribe>],
    };
    let status = rt.block_on(session.run(&config, BufReader::new(tokio::io::stdin())));
    // the console reader may still sit in a blocking read
    rt.shutdown_timeout(Duration::from_millis(100));
    ExitCode::from(status)
}
