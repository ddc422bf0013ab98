//! denseid Binary
//!
//! Numbers record files and verifies numbered output.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use denseid::number::verify_output;
use denseid::{Config, NumberError, Numberer, OutputFormat};
use tracing_subscriber::{fmt, EnvFilter};

/// denseid
#[derive(Parser, Debug)]
#[command(name = "denseid")]
#[command(about = "Assign dense, prefix-ordered sequential ids to key-value records")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Number every record under INPUT into OUTPUT
    Run {
        /// Record file, or directory of record files
        input: PathBuf,

        /// Output directory (must not exist)
        output: PathBuf,

        /// Reduce partitions used by both passes
        #[arg(short, long, default_value = "1000")]
        partitions: usize,

        /// Key-prefix buckets
        #[arg(short, long, default_value = "1024")]
        buckets: u32,

        /// Local worker threads (defaults to available parallelism)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Scratch directory for intermediate state
        #[arg(long, default_value = "_tmp")]
        temp_dir: PathBuf,

        /// Write raw id+value bytes instead of framed record files
        #[arg(long)]
        raw: bool,
    },

    /// Check that OUTPUT holds exactly the ids 0..total
    Verify {
        /// Output directory of a previous run
        output: PathBuf,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,denseid=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("denseid v{}", denseid::VERSION);

    if let Err(e) = execute(args.command) {
        tracing::error!("{}", e);
        std::process::exit(e.root_cause().exit_code());
    }
}

fn execute(command: Commands) -> Result<(), NumberError> {
    match command {
        Commands::Run {
            input,
            output,
            partitions,
            buckets,
            threads,
            temp_dir,
            raw,
        } => {
            let mut builder = Config::builder()
                .num_partitions(partitions)
                .bucket_count(buckets)
                .temp_dir(temp_dir)
                .output_format(if raw {
                    OutputFormat::Raw
                } else {
                    OutputFormat::Records
                });
            if let Some(threads) = threads {
                builder = builder.worker_threads(threads);
            }

            let numberer = Numberer::new(builder.build())?;
            let summary = numberer.run(&input, &output)?;

            println!("{}", summary.total);
            Ok(())
        }
        Commands::Verify { output } => {
            let report = verify_output(&output)?;
            tracing::info!(
                "{}: {} ids in {} part file(s) verified",
                output.display(),
                report.total,
                report.part_files
            );
            println!("{}", report.total);
            Ok(())
        }
    }
}
