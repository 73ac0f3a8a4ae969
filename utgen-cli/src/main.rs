//! utgen command line: list methods of a Java class and generate JUnit tests for them

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{generate, methods};

#[derive(Parser)]
#[command(name = "utgen")]
#[command(about = "Unit test input generator for Java methods", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the methods of a class and whether inputs can be generated for them
    Methods {
        /// Java source file
        file: PathBuf,
    },

    /// Generate a JUnit test class
    Generate {
        /// Java source file
        file: PathBuf,

        /// Loop unrolling bound
        #[arg(short = 'k', long = "bound")]
        bound: Option<usize>,

        /// Method to generate tests for, by name or signature (repeatable; all when omitted)
        #[arg(short, long = "method")]
        methods: Vec<String>,

        /// Keep the run directory with intermediate sources and bytecode
        #[arg(long)]
        keep_temp: bool,

        /// Methods processed concurrently
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Compile in memory instead of through the run directory
        #[arg(long)]
        in_memory: bool,

        /// Output directory (defaults to the directory of the source file)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Seed of the input search
        #[arg(long, env = "UTGEN_SEED")]
        seed: Option<u64>,

        /// Write the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.debug);

    let config = config::load_config(cli.config)?;

    match cli.command {
        Commands::Methods { file } => methods::list(&file)?,

        Commands::Generate {
            file,
            bound,
            methods,
            keep_temp,
            jobs,
            in_memory,
            output,
            seed,
            report,
        } => {
            let options = generate::GenerateOptions {
                bound,
                methods,
                keep_temp,
                jobs,
                in_memory,
                output,
                seed,
                report,
            };
            generate::generate(&file, config, options).await?;
        }
    }

    Ok(())
}

/// `RUST_LOG` wins over `--debug`
fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
