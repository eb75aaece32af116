//! mdl - GoldSrc MDL inspection tool
//!
//! # Commands
//!
//! - `mdl info <file>` - header summary, counts and decode warnings
//! - `mdl bones <file>` - skeleton tree with bind positions
//! - `mdl sequences <file>` - one line per animation sequence
//! - `mdl textures <file> [-o DIR]` - write every texture as PNG
//!
//! Settings come from `--config <path>` or `mdl.toml` in the working
//! directory (see [`mdl_cli::config`]).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use goldsrc_mdl::{DecodeOptions, Mdl, load_file};
use mdl_cli::{Config, export_textures, write_bones, write_info, write_sequences};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "mdl")]
#[command(about = "Inspect GoldSrc MDL (version 10) studio models")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./mdl.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print header summary, counts and warnings
    Info {
        /// Input .mdl file
        file: PathBuf,
    },

    /// Print the bone hierarchy
    Bones {
        /// Input .mdl file
        file: PathBuf,
    },

    /// List animation sequences
    Sequences {
        /// Input .mdl file
        file: PathBuf,
    },

    /// Export textures as PNG
    Textures {
        /// Input .mdl file
        file: PathBuf,

        /// Output directory (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();
}

fn load(path: &Path, options: &DecodeOptions) -> Result<Mdl> {
    load_file(path, options).with_context(|| format!("Failed to decode {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cwd = std::env::current_dir().context("Failed to read working directory")?;
    let config = Config::resolve(cli.config.as_deref(), &cwd)?;
    let options = config.decode.options();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Info { file } => write_info(&load(&file, &options)?, &mut out)?,
        Commands::Bones { file } => write_bones(&load(&file, &options)?, &mut out)?,
        Commands::Sequences { file } => {
            let options = DecodeOptions {
                decode_sequences: true,
                ..options
            };
            write_sequences(&load(&file, &options)?, &mut out)?;
        }
        Commands::Textures { file, output } => {
            let options = DecodeOptions {
                decode_texture_pixels: true,
                ..options
            };
            let mdl = load(&file, &options)?;
            let dir = output.unwrap_or(config.export.output_dir);
            let written = export_textures(&mdl, &dir)?;
            writeln!(out, "wrote {} texture(s) to {}", written.len(), dir.display())?;
        }
    }
    Ok(())
}
