//! Command-line argument structures.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via the "cargo" feature in clap
    about = "codectune: codec parameter tuning against a result cache",
    long_about = "Inspects and ranks encoder configurations stored in a \
                  codectune result cache, and compares rate/quality curves."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Cache work directory (created if missing)
    #[arg(short, long, global = true, value_name = "DIR", default_value = "workdir")]
    pub workdir: PathBuf,

    /// Additional read-only cache directories, searched after the workdir
    #[arg(long, global = true, value_name = "DIR")]
    pub score_path: Vec<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Lists every scored configuration for a clip at one target bitrate
    Ls(LsArgs),
    /// Shows the best scored configuration for a clip at one target bitrate
    Best(BestArgs),
    /// Computes the BD-rate difference between two stored configurations
    Bdrate(BdrateArgs),
}

#[derive(Parser, Debug)]
pub struct LsArgs {
    /// Clip filename, e.g. foreman_352_288_30.yuv
    #[arg(required = true, value_name = "CLIP")]
    pub clip: String,

    /// Target bitrate in kbps
    #[arg(required = true, value_name = "KBPS")]
    pub bitrate: u32,

    /// Scorer to rank by
    #[arg(long, value_name = "NAME", default_value = "psnr")]
    pub scorer: String,
}

#[derive(Parser, Debug)]
pub struct BestArgs {
    /// Clip filename
    #[arg(required = true, value_name = "CLIP")]
    pub clip: String,

    /// Target bitrate in kbps
    #[arg(required = true, value_name = "KBPS")]
    pub bitrate: u32,

    /// Scorer to rank by
    #[arg(long, value_name = "NAME", default_value = "psnr")]
    pub scorer: String,
}

#[derive(Parser, Debug)]
pub struct BdrateArgs {
    /// Clip filename
    #[arg(required = true, value_name = "CLIP")]
    pub clip: String,

    /// Hashname of the baseline configuration
    #[arg(required = true, value_name = "HASH")]
    pub baseline: String,

    /// Hashname of the candidate configuration
    #[arg(required = true, value_name = "HASH")]
    pub candidate: String,
}
