use std::path::PathBuf;
use std::process::ExitStatus;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use ibmdb_orm::config::{self, Config};
use ibmdb_orm::observability::init_logging;
use ibmdb_orm::{DatabaseClient, SchemaGeneration};

#[derive(Parser, Debug)]
#[command(name = "ibmdb-orm")]
#[command(about = "DB2 and Informix backend tooling for the ORM adapter", long_about = None)]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Settings generation (legacy, intermediate, current); inferred when omitted
    #[arg(long)]
    schema: Option<String>,

    /// Database name or alias
    #[arg(long, env = "IBMDB_NAME")]
    name: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable JSON logging output
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the settings and print the connection parameters
    Check,
    /// Open the DB2 command line processor connected to the database
    Dbshell,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // File and environment first (env > file), then command line flags
    let mut builder = if let Some(ref path) = args.config {
        config::load_config_from_path(path)?
    } else {
        config::load_config()?
    };

    if let Some(ref schema) = args.schema {
        builder = builder.schema(schema.parse::<SchemaGeneration>()?);
    }
    if let Some(ref name) = args.name {
        builder = builder.name(name.clone());
    }
    if args.verbose {
        builder = builder.log_level("debug");
    }
    if args.json_logs {
        builder = builder.json_logs(true);
    }

    let config = builder.build()?;
    init_logging(&config.logging);

    match args.command {
        Command::Check => check(&config),
        Command::Dbshell => dbshell(&config),
    }
}

fn check(config: &Config) -> anyhow::Result<()> {
    let params = config.database.resolve()?;
    tracing::info!(
        generation = %config.database.generation(),
        database = params.name(),
        "settings resolved"
    );

    let report = serde_json::json!({
        "generation": config.database.generation().to_string(),
        "parameters": params,
        "target": format!("{:?}", params.target()),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn dbshell(config: &Config) -> anyhow::Result<()> {
    let params = config.database.resolve()?;
    let client = DatabaseClient::new(params);

    let status = client
        .connect_command()
        .status()
        .context("failed to run the db2 command line processor")?;
    ensure_success(status, "db2 connect")?;

    let status = DatabaseClient::shell_command()
        .status()
        .context("failed to start the db2 shell")?;
    ensure_success(status, "db2 shell")
}

fn ensure_success(status: ExitStatus, what: &str) -> anyhow::Result<()> {
    if !status.success() {
        bail!("{what} exited with {status}");
    }
    Ok(())
}
