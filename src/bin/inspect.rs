//! replaykit Inspect Binary
//!
//! Reads a buffer snapshot and prints what is inside.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use replaykit::{DictReplayBuffer, ReplayBuffer};
use tracing_subscriber::{fmt, EnvFilter};

/// replaykit snapshot inspector
#[derive(Parser, Debug)]
#[command(name = "replaykit-inspect")]
#[command(about = "Inspect replay buffer snapshots")]
#[command(version)]
struct Args {
    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print capacity, fill count and the record mapping
    Info {
        /// Snapshot archive written by `dump`
        path: PathBuf,
    },

    /// Print one sampled batch
    Sample {
        /// Snapshot archive written by `dump`
        path: PathBuf,

        /// Batch size
        #[arg(short = 'n', long, default_value = "4")]
        batch_size: usize,
    },
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "info,replaykit=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt().with_env_filter(filter).with_target(true).init();

    if let Err(e) = run(args.command) {
        tracing::error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn load(path: &Path) -> replaykit::Result<DictReplayBuffer> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    DictReplayBuffer::load(&mut reader)
}

fn run(command: Commands) -> replaykit::Result<()> {
    match command {
        Commands::Info { path } => {
            let buffer = load(&path)?;

            println!("snapshot:        {}", path.display());
            println!("mem_size:        {}", buffer.mem_size());
            println!("count:           {}", buffer.count());
            println!("len:             {}", buffer.len());
            println!("is_full:         {}", buffer.is_full());
            println!("nbytes:          {}", buffer.nbytes());
            println!("total_elements:  {}", buffer.transform().total_elements());

            let mapping = match buffer.transform().mapping() {
                Some(mapping) => serde_json::to_string_pretty(mapping.entries())?,
                None => "(unset)".to_string(),
            };
            println!("mapping:\n{}", mapping);
        }
        Commands::Sample { path, batch_size } => {
            let buffer = load(&path)?;
            let batch = buffer.sample(batch_size)?;

            for (i, entry) in batch.iter().enumerate() {
                println!("[{}] {}", i, entry);
            }
        }
    }
    Ok(())
}
