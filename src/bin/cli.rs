//! CaskKV CLI
//!
//! Opens a data directory, runs one command, and closes it.

use std::process::ExitCode;

use caskkv::{Config, Engine, FlushStrategy};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// CaskKV CLI
#[derive(Parser, Debug)]
#[command(name = "caskkv-cli")]
#[command(about = "CLI for the CaskKV embedded key-value store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./caskkv_data")]
    data_dir: String,

    /// Staging buffer capacity in bytes (0 = write through)
    #[arg(short, long, default_value = "0")]
    buffer_capacity: usize,

    /// Segment rotation threshold in KiB
    #[arg(short = 's', long, default_value = "1024")]
    segment_kb: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Print segment and key counts
    Stats,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,caskkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .buffer_capacity(args.buffer_capacity)
        .max_segment_size(args.segment_kb * 1024)
        .flush_strategy(FlushStrategy::EveryWrite)
        .build();

    let engine = match Engine::open(config) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to open {}: {}", args.data_dir, e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = run(&engine, args.command);
    if let Err(e) = engine.close() {
        tracing::error!("Failed to close {}: {}", args.data_dir, e);
        return ExitCode::FAILURE;
    }

    match outcome {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(engine: &Engine, command: Commands) -> caskkv::Result<ExitCode> {
    match command {
        Commands::Get { key } => match engine.get(&key)? {
            Some(value) => {
                println!("{}", String::from_utf8_lossy(&value));
                Ok(ExitCode::SUCCESS)
            }
            None => {
                println!("(nil)");
                Ok(ExitCode::from(1))
            }
        },
        Commands::Put { key, value } => {
            engine.put(&key, value.as_bytes())?;
            println!("OK");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Del { key } => {
            engine.delete(&key)?;
            println!("OK");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Stats => {
            println!("version:        {}", caskkv::VERSION);
            println!("segments:       {}", engine.segment_count());
            println!("active segment: {}", engine.active_segment_id());
            println!("live keys:      {}", engine.len());
            Ok(ExitCode::SUCCESS)
        }
    }
}
