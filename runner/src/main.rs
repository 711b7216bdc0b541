mod bench;
mod config;
mod database;
mod generate;
mod orchestrator;
mod report;
mod schema;
mod table;

use clap::{Args, Parser, Subcommand};
use config::{Backend, BenchConfig, ConfigErrors};
use orchestrator::BenchError;
use std::{path::PathBuf, process::exit};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Benchmark two analytical queries before and after index/schema optimization")]
struct Cli {
    /// YAML config file, flags below take precedence over its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, global = true)]
    backend: Option<Backend>,

    /// Path of the database file
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recreate the test_data table and fill it with synthetic orders
    Generate(GenerateArgs),
    /// Drop indexes, benchmark, optimize schema and indexes, benchmark again
    Benchmark(BenchmarkArgs),
    /// Generate followed by benchmark
    Run {
        #[command(flatten)]
        generate: GenerateArgs,
        #[command(flatten)]
        benchmark: BenchmarkArgs,
    },
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Number of rows to generate
    #[arg(long)]
    rows: Option<u64>,

    /// Rows per bulk insert
    #[arg(long)]
    batch_size: Option<usize>,

    /// Seed of the row generator
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct BenchmarkArgs {
    /// Also write the before/after results as YAML
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Cli {
    fn load_config(&self) -> Result<BenchConfig, ConfigErrors> {
        let mut config = match &self.config {
            Some(path) => BenchConfig::load(path)?,
            None => BenchConfig::default(),
        };

        if let Some(backend) = self.backend {
            config.database.backend = backend;
        }
        if let Some(path) = &self.database {
            config.database.path = path.clone();
        }

        let generate = match &self.command {
            Command::Generate(generate) | Command::Run { generate, .. } => Some(generate),
            Command::Benchmark(_) => None,
        };
        if let Some(generate) = generate {
            if let Some(rows) = generate.rows {
                config.generate.total_rows = rows;
            }
            if let Some(batch_size) = generate.batch_size {
                config.generate.batch_size = batch_size;
            }
            if let Some(seed) = generate.seed {
                config.generate.seed = seed;
            }
        }

        if config.preflight_checks() {
            return Err(ConfigErrors::PreflightFailed);
        }

        Ok(config)
    }
}

fn benchmark(config: &BenchConfig, args: &BenchmarkArgs) -> Result<(), BenchError> {
    let report = orchestrator::full_benchmark(&config.database)?;
    report::print_comparison(&report);

    if let Some(path) = &args.output {
        report::write_yaml(path, &report)?;
    }

    Ok(())
}

fn run(cli: &Cli) -> Result<(), BenchError> {
    let config = cli.load_config()?;
    info!(
        backend = %config.database.backend,
        path = ?config.database.path,
        "Using database"
    );

    match &cli.command {
        Command::Generate(_) => {
            orchestrator::generate(&config)?;
        }
        Command::Benchmark(args) => benchmark(&config, args)?,
        Command::Run { benchmark: args, .. } => {
            orchestrator::generate(&config)?;
            benchmark(&config, args)?;
        }
    }

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(error) = run(&cli) {
        error!(error = ?error, "{error}");

        exit(1)
    }
}
