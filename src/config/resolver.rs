//! # Configuration resolver.
//!
//! Turns command-line-style tokens into a [`Config`]. Resolution is atomic:
//! the caller receives either a complete record or a [`ConfigError`].
//!
//! ## Flow
//! ```text
//! tokens ──► normalise (-ipc → --ipc) ──► clap ──► validate ──► secret (arg or prompt) ──► Config
//!                                           │          │               │
//!                                           ▼          ▼               ▼
//!                                        Invalid   NoCapability    MissingSecret
//!                                                  Missing*        Prompt
//! ```
//!
//! Everything except the secret is validated before prompting, so an
//! incomplete command line never blocks on a prompt.

use std::io;
use std::path::PathBuf;

use clap::Parser;

use super::record::{Config, Secret};
use crate::error::ConfigError;

/// Usage text printed by the binary on [`ConfigError`].
pub const USAGE: &str = "\
usage: adapter -t <type> -c <config dir> -j <identity> [-p <secret>] [-l <log file>] [-a] [-d] [-ipc <port>]
    -t <type>        protocol type: enfuse, hue, bacnet, modbus, pup, b3
    -c <dir>         configuration directory handed to the protocol unit
    -j <identity>    backplane identity
    -p <secret>      backplane secret (prompted when omitted)
    -l <file>        log file (default: stderr)
    -a               run the actuate worker
    -d               run the data worker
    -ipc <port>      local control port (127.0.0.1)
";

#[derive(Parser, Debug)]
#[command(name = "adapter", no_binary_name = true, args_override_self = true)]
struct Args {
    /// Backplane identity.
    #[arg(short = 'j', value_name = "IDENTITY", allow_hyphen_values = true)]
    identity: Option<String>,

    /// Backplane secret.
    #[arg(short = 'p', value_name = "SECRET", allow_hyphen_values = true)]
    secret: Option<String>,

    /// Protocol type.
    #[arg(short = 't', value_name = "TYPE", allow_hyphen_values = true)]
    protocol: Option<String>,

    /// Configuration directory.
    #[arg(short = 'c', value_name = "DIR", allow_hyphen_values = true)]
    config_dir: Option<PathBuf>,

    /// Log file.
    #[arg(short = 'l', value_name = "FILE", allow_hyphen_values = true)]
    log_file: Option<PathBuf>,

    /// Enable the actuate capability.
    #[arg(short = 'a')]
    actuate: bool,

    /// Enable the data capability.
    #[arg(short = 'd')]
    data: bool,

    /// Auxiliary control port.
    #[arg(long = "ipc", value_name = "PORT")]
    ipc_port: Option<u16>,
}

/// Supplies the secret when `-p` is absent.
pub trait SecretPrompt {
    /// Asks for the secret of `identity`. `Ok(None)` means nothing was entered.
    fn prompt(&self, identity: &str) -> io::Result<Option<String>>;
}

/// Reads the secret from the controlling terminal with echo disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl SecretPrompt for TerminalPrompt {
    fn prompt(&self, identity: &str) -> io::Result<Option<String>> {
        let value = rpassword::prompt_password(format!("Secret for {identity}: "))?;
        Ok(Some(value))
    }
}

/// Non-interactive source: a missing `-p` stays missing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrompt;

impl SecretPrompt for NoPrompt {
    fn prompt(&self, _identity: &str) -> io::Result<Option<String>> {
        Ok(None)
    }
}

impl Config {
    /// Resolves startup tokens (program name excluded) into a configuration record.
    ///
    /// # Example
    /// ```
    /// use devgate::{Config, NoPrompt};
    ///
    /// let cfg = Config::resolve(
    ///     ["-t", "modbus", "-c", "/etc/adapter", "-j", "gateway@example", "-p", "secret", "-d"],
    ///     &NoPrompt,
    /// )
    /// .unwrap();
    /// assert!(cfg.wants_data());
    /// assert!(!cfg.wants_actuate());
    /// ```
    pub fn resolve<I, S>(tokens: I, prompt: &dyn SecretPrompt) -> Result<Config, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(normalise).collect();
        if tokens.is_empty() {
            return Err(ConfigError::NoArguments);
        }

        let args = Args::try_parse_from(&tokens).map_err(|err| ConfigError::Invalid {
            reason: first_line(&err.to_string()),
        })?;

        if !args.data && !args.actuate {
            return Err(ConfigError::NoCapability);
        }
        let identity = required(args.identity).ok_or(ConfigError::MissingIdentity)?;
        let config_dir = args
            .config_dir
            .filter(|dir| !dir.as_os_str().is_empty())
            .ok_or(ConfigError::MissingConfigDir)?;
        let protocol = required(args.protocol).ok_or(ConfigError::MissingProtocolType)?;

        let secret = match args.secret {
            Some(secret) => Some(secret),
            None => prompt.prompt(&identity).map_err(|err| ConfigError::Prompt {
                reason: err.to_string(),
            })?,
        };
        let secret = secret
            .filter(|s| !s.is_empty())
            .map(Secret::new)
            .ok_or(ConfigError::MissingSecret)?;

        Ok(Config {
            identity,
            secret,
            protocol,
            config_dir,
            log_file: args.log_file,
            wants_data: args.data,
            wants_actuate: args.actuate,
            ipc_port: args.ipc_port,
        })
    }
}

/// The single-dash long flag is kept for compatibility with existing launch scripts.
fn normalise(token: impl Into<String>) -> String {
    let token = token.into();
    if token == "-ipc" {
        "--ipc".to_string()
    } else {
        token
    }
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn first_line(message: &str) -> String {
    message
        .lines()
        .next()
        .unwrap_or(message)
        .trim_start_matches("error: ")
        .to_string()
}
