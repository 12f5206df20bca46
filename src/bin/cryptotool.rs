//! cryptotool CLI - Password-based file encryption
//!
//! Command-line interface for encrypting and decrypting files using
//! AES-256-GCM with scrypt key derivation.

use clap::{Parser, Subcommand};
use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use cryptotool::envelope::Sealer;
use cryptotool::error::Result;
use cryptotool::file_ops;
use cryptotool::passphrase::{PassphraseReader, ReaderPassphraseReader, TerminalPassphraseReader};

#[derive(Parser)]
#[command(name = "cryptotool")]
#[command(version)]
#[command(about = "Password-based file encryption.", long_about = None)]
struct Cli {
    /// Read the password from the first line of stdin instead of from terminal
    #[arg(long, global = true)]
    passphrase_stdin: bool,

    /// Log debug details to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a file
    #[command(alias = "e")]
    Encrypt {
        /// Path to the file whose contents is to be encrypted
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Path to the file to write the encrypted data to
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// Decrypt a file
    #[command(alias = "d")]
    Decrypt {
        /// Path to the file whose contents is to be decrypted
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Path to the file to write the decrypted data to
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
        process::exit(1);
    }

    println!("Operation completed successfully.");
}

fn run(cli: Cli) -> Result<()> {
    let sealer = Sealer::with_default_params()?;
    let mut reader = get_passphrase_reader(cli.passphrase_stdin);

    match cli.command {
        Commands::Encrypt { input, output } => {
            file_ops::encrypt_file(&sealer, &input, &output, &mut *reader)
        }
        Commands::Decrypt { input, output } => {
            file_ops::decrypt_file(&sealer, &input, &output, &mut *reader)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
    if let Err(e) = result {
        eprintln!("warning: failed to initialize logging: {}", e);
    }
}

fn get_passphrase_reader(use_stdin: bool) -> Box<dyn PassphraseReader> {
    if use_stdin {
        Box::new(ReaderPassphraseReader::new(Box::new(io::stdin())))
    } else {
        Box::new(TerminalPassphraseReader)
    }
}
