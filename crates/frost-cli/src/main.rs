//! Frost CLI
//!
//! Inspect a frost image (a directory tree or an executable with an
//! appended image) and run frozen modules through the sandbox host.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "frost")]
#[command(about = "Inspect frost images and run frozen modules", long_about = None)]
#[command(version)]
struct Cli {
    /// Log import decisions (same as FROST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Importer configuration (frost.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show entry count, mounts and search path
    Info {
        /// Image directory or executable
        image: PathBuf,
    },

    /// List a directory of the image
    Ls {
        /// Image directory or executable
        image: PathBuf,
        /// Virtual directory
        #[arg(default_value = "/")]
        dir: String,
    },

    /// Write a file of the image to stdout
    Cat {
        /// Image directory or executable
        image: PathBuf,
        /// Virtual path
        path: String,
    },

    /// Show how a module name classifies along the search path
    Find {
        /// Image directory or executable
        image: PathBuf,
        /// Dotted module name
        fqmn: String,
    },

    /// Import a module in the sandbox and print its namespace
    Run {
        /// Image directory or executable
        image: PathBuf,
        /// Dotted module name
        fqmn: String,
    },
}

fn init_logging(verbose: bool) {
    let env = env_logger::Env::default().filter_or("FROST_LOG", "warn");
    let mut builder = env_logger::Builder::from_env(env);
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Info { image } => commands::info::execute(&image, config),
        Commands::Ls { image, dir } => commands::ls::execute(&image, &dir),
        Commands::Cat { image, path } => commands::cat::execute(&image, &path),
        Commands::Find { image, fqmn } => commands::find::execute(&image, config, &fqmn),
        Commands::Run { image, fqmn } => commands::run::execute(&image, config, &fqmn),
    }
}
