use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use photo_date_renamer_core::{
    app_paths, load_config, AppConfig, Pipeline, RenameOutcome, RenameStats,
};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "photo-date-renamer-cli")]
#[command(about = "Renames JPEG/HEIF photos after their capture date")]
struct Cli {
    /// Log level (error, warn, info, debug, trace). RUST_LOG takes precedence.
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Rename(RenameArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
}

#[derive(Debug, Args)]
struct RenameArgs {
    /// Directory to scan recursively
    directory: PathBuf,
    /// One of YYYY-MM-DD, YYYY/MM/DD, YYYY/MM-DD
    #[arg(long)]
    pattern: Option<String>,
    /// Number of concurrent workers
    #[arg(long)]
    workers: Option<usize>,
    /// Actually rename files (default is a dry run)
    #[arg(long, default_value_t = false)]
    apply: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config()?;
    init_tracing(cli.log_level.as_deref().unwrap_or(&config.log_level));

    match cli.command {
        Commands::Rename(args) => cmd_rename(args, &config),
        Commands::Config(args) => match args.action {
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    if EnvFilter::try_new(level).is_err() {
        warn!(log_level = level, "invalid log level, using info");
    }
}

fn cmd_rename(args: RenameArgs, config: &AppConfig) -> Result<()> {
    let mut options = config.run_options(args.directory);
    if let Some(pattern) = args.pattern {
        options.pattern = pattern;
    }
    if let Some(workers) = args.workers {
        options.workers = workers;
    }
    if args.apply {
        options.dry_run = false;
    }

    let mut pipeline = Pipeline::start(&options)?;
    for outcome in pipeline.by_ref() {
        match args.output {
            OutputFormat::Json => println!("{}", serde_json::to_string(&outcome)?),
            OutputFormat::Table => print_outcome(&outcome),
        }
    }
    let stats = pipeline.finish()?;

    print_summary(&stats);
    if options.dry_run {
        eprintln!("dry run: no files were changed. Pass --apply to rename.");
    }
    if stats.failed > 0 {
        anyhow::bail!("{} file(s) could not be renamed", stats.failed);
    }
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let paths = app_paths()?;
    println!("config file: {}", paths.config_path.display());
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn print_outcome(outcome: &RenameOutcome) {
    let original = outcome.original_path().display();
    match outcome {
        RenameOutcome::Planned { new_path, .. } | RenameOutcome::Renamed { new_path, .. } => {
            println!("{} ⇨ {}", original, new_path.display());
        }
        RenameOutcome::Unchanged { .. } => println!("{} (unchanged)", original),
        RenameOutcome::Skipped { reason, .. } => println!("{} skipped: {}", original, reason),
        RenameOutcome::Failed { reason, .. } => println!("{} failed: {}", original, reason),
    }
    if let Some(warning) = outcome.warning() {
        println!("    warning: {}", warning);
    }
}

fn print_summary(stats: &RenameStats) {
    eprintln!(
        "\nsummary: scanned={} planned={} renamed={} unchanged={} skipped={} failed={} fallback_dates={}",
        stats.scanned,
        stats.planned,
        stats.renamed,
        stats.unchanged,
        stats.skipped,
        stats.failed,
        stats.fallbacks
    );
}
