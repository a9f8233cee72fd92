//! trunkdec command line entrypoint.
//!
//! Two modes:
//! - `trunkdec decode` - walk capture files and emit the requested
//!   artifacts synchronously
//! - `trunkdec serve` - run the HTTP ingestion service
//!
//! Decryption keys are given as `KEYID:KEYHEX`; the key length selects the
//! cipher family (5 octets ADP/RC4, 8 DES-OFB, 32 AES-256).

#![forbid(unsafe_code)]

mod batch;
mod keys;

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};

use trunkdec_crypto::KeyTable;
use trunkdec_service::{IngestService, ServiceConfig};

/// P25 capture decoder and ingestion service.
#[derive(Parser)]
#[command(name = "trunkdec")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode capture files to audio and metadata.
    ///
    /// A single file processes one capture; a directory processes every
    /// `.p25` file it contains, sorted, optionally recursing. At least one
    /// output format flag is required.
    ///
    /// Example: trunkdec decode captures/ -o out --wav --json -k 1:0102030405
    Decode(batch::DecodeArgs),

    /// Run the HTTP ingestion service.
    ///
    /// Accepts multipart uploads on /api/v1/decode, queues them, and
    /// decodes on a worker pool. Runs until the process is terminated.
    ///
    /// Example: trunkdec serve -c trunkdec.json
    Serve(ServeArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// JSON config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the configured output directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Decryption key as KEYID:KEYHEX; repeatable.
    #[arg(short = 'k', long = "key", value_name = "KEYID:KEYHEX")]
    keys: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Decode(args) => batch::run(args),
        Commands::Serve(args) => serve(args),
    }
}

/// Logs go to stderr so stdout stays clean for report output.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "trunkdec=debug,info",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();
}

fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ServiceConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ServiceConfig::default(),
    };

    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(output) = args.output {
        config.output_dir = output;
    }

    let mut table = KeyTable::new();
    for spec in &args.keys {
        let (key_id, key) = keys::parse_key_spec(spec)?;
        let family = table
            .add_key(key_id, key)
            .with_context(|| format!("registering key {spec}"))?;
        tracing::info!(key_id = format_args!("0x{key_id:04X}"), cipher = family.name(), "key registered");
    }

    let service = IngestService::start(config, table).context("starting ingestion service")?;
    tracing::info!(addr = %service.local_addr(), "serving until terminated");

    // The service runs on its own threads; hold the main thread until the
    // process is terminated.
    loop {
        std::thread::park();
    }
}
