use crate::auth::TokenSource;
use crate::classifier::{Classifier, Destination, MatchMode};
use crate::config::{Config, DEFAULT_CONFIG_FILE};
use crate::drive::DriveClient;
use crate::logging;
use crate::mover::Mover;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use log::{info, LevelFilter};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "drivesort")]
#[command(version, about = "Sort meeting transcripts and recordings into Drive folders", long_about = None)]
pub struct Args {
    /// Configuration file
    #[arg(short, long, value_name = "FILE", env = "DRIVESORT_CONFIG", default_value = DEFAULT_CONFIG_FILE, global = true)]
    pub config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Move matching files from the source folder to their destinations (default)
    Run {
        /// Show where files would go without moving them
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Show the destination for each file name
    Classify {
        /// File names to classify
        #[arg(required = true)]
        names: Vec<String>,

        /// Compare prefixes case-insensitively
        #[arg(short, long)]
        ignore_case: bool,
    },

    /// Print the search query used to select files
    Query,

    /// Validate the configuration and print the folder table
    CheckConfig,
}

pub fn console_level(args: &Args) -> LevelFilter {
    if args.quiet {
        LevelFilter::Error
    } else if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Loaded before logging starts, so failures here only reach stderr.
pub fn load_config(args: &Args) -> Result<Config> {
    Config::load_or_default(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))
}

pub fn init_logging(args: &Args, config: &Config) -> Result<()> {
    // RUST_LOG still takes precedence on the console
    logging::init(console_level(args), &config.logging).context("Failed to set up log files")?;

    // load_config ran before any logger was installed
    if !args.config.exists() {
        info!("No config file at {}, using built-in defaults", args.config.display());
    }
    Ok(())
}

pub fn run(args: Args, config: Config) -> Result<()> {
    match args.command.clone().unwrap_or(Commands::Run { dry_run: false }) {
        Commands::Run { dry_run } => run_mover(config, dry_run, args.quiet),
        Commands::Classify { names, ignore_case } => {
            classify_names(&config, &names, ignore_case);
            Ok(())
        }
        Commands::Query => {
            println!("{}", config.search_query());
            Ok(())
        }
        Commands::CheckConfig => {
            show_config(&config, &args.config);
            Ok(())
        }
    }
}

fn run_mover(config: Config, dry_run: bool, quiet: bool) -> Result<()> {
    let tokens = TokenSource::from_config(&config.credentials).context("Failed to set up Drive credentials")?;
    let client = DriveClient::new(&config.drive, tokens).context("Failed to create Drive client")?;

    let tally = Mover::new(client, config)
        .with_dry_run(dry_run)
        .run()
        .context("Run aborted")?;

    if !quiet {
        let line = tally.completion_line();
        if tally.errors > 0 {
            println!("{} {}", "⚠".yellow(), line.yellow());
        } else {
            println!("{} {}", "✓".green(), line.green());
        }
        if dry_run {
            println!("Dry run: {} files classified, nothing moved", tally.files_skipped);
        }
    }

    Ok(())
}

fn classify_names(config: &Config, names: &[String], ignore_case: bool) {
    let match_mode = if ignore_case {
        MatchMode::CaseInsensitive
    } else {
        config.classifier.match_mode
    };
    let classifier = Classifier::with_match_mode(match_mode);

    for name in names {
        let result = classifier.explain(name);
        println!(
            "{:<16} {}  ({})",
            colorize(result.destination),
            name,
            result.reason.dimmed()
        );
    }
}

fn show_config(config: &Config, path: &Path) {
    println!("✓ Configuration OK ({})", path.display());
    println!();
    println!("{:<16} {}", "source", config.folders.source);
    for destination in Destination::ALL {
        println!("{:<16} {}", destination.as_str(), config.folder_for(destination));
    }
    println!();
    println!("Query: {}", config.search_query());
    println!("Match mode: {:?}", config.classifier.match_mode);
    println!("API base: {}", config.drive.api_base);
    match &config.logging.log_dir {
        Some(dir) => println!("Log files: {}", dir.display()),
        None => println!("Log files: none (stderr only)"),
    }
}

fn colorize(destination: Destination) -> ColoredString {
    match destination {
        Destination::Dragon => destination.as_str().magenta(),
        Destination::NoInstructions => destination.as_str().blue(),
        Destination::Customer => destination.as_str().green(),
        Destination::Catchall => destination.as_str().yellow(),
    }
}
