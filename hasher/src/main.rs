//! Operator CLI for producing and checking credential hashes. Secrets can be
//! passed as an argument, piped on stdin, or typed at a no-echo prompt.

use std::io::{self, BufRead, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand, ValueHint};
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use credential_hasher::{load_config, ConfigError, CredentialHasher, HasherConfig, Secret};

/// Hash and verify user credentials (bcrypt by default, Argon2id optional)
#[derive(Parser)]
#[command(name = "credential-hasher", version, about, long_about = None)]
struct Cli {
    /// JSON config selecting the scheme and work factor
    #[arg(short, long, global = true, value_name = "PATH", value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Hash a secret and print the record
    Hash {
        /// Secret to hash; "-" or omitted reads from stdin
        secret: Option<String>,
    },
    /// Check a secret against a stored record (exit 0 on match, 1 otherwise)
    Verify {
        /// Previously produced hash record
        record: String,
        /// Secret to check; "-" or omitted reads from stdin
        secret: Option<String>,
    },
    /// Report whether a record should be re-hashed under the current settings
    NeedsRehash {
        record: String,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("hashing failed: {0}")]
    Hasher(#[from] credential_hasher::HasherError),
    #[error("could not read secret: {0}")]
    Input(#[from] io::Error),
    #[error("refusing to process an empty secret")]
    EmptySecret,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn build_hasher(path: Option<&PathBuf>) -> Result<CredentialHasher, CliError> {
    let base = match path {
        Some(path) => load_config(path)?,
        None => HasherConfig::default(),
    };
    let config = base.with_env_overrides()?;
    Ok(config.build_hasher()?)
}

fn read_secret(arg: Option<String>) -> Result<Secret, CliError> {
    let secret = match arg.filter(|v| v != "-") {
        Some(value) => Secret::from(value),
        None => read_secret_from_stdin()?,
    };
    if secret.is_empty() {
        return Err(CliError::EmptySecret);
    }
    Ok(secret)
}

fn read_secret_from_stdin() -> Result<Secret, io::Error> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return rpassword::prompt_password("Secret: ").map(Secret::from);
    }
    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    let trimmed = line.trim_end_matches(['\n', '\r']).len();
    line.truncate(trimmed);
    Ok(Secret::from(line))
}

fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let hasher = build_hasher(cli.config.as_ref())?;
    debug!(scheme = %hasher.scheme(), "hasher ready");

    match cli.command {
        Command::Hash { secret } => {
            let secret = read_secret(secret)?;
            let record = hasher.hash(&secret)?;
            println!("{record}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Verify { record, secret } => {
            let secret = read_secret(secret)?;
            if hasher.verify(&secret, &record) {
                println!("match");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("no-match");
                Ok(ExitCode::from(1))
            }
        }
        Command::NeedsRehash { record } => {
            println!("{}", if hasher.needs_rehash(&record) { "yes" } else { "no" });
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(2)
        }
    }
}
