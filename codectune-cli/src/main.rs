//! Binary entry point: parse arguments, set up logging, dispatch.

use std::process;

use clap::Parser;

use codectune_cli::cli::{Cli, Commands};
use codectune_cli::commands::{bdrate::run_bdrate, best::run_best, ls::run_ls};
use codectune_cli::logging;

fn main() {
    logging::init();
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Ls(args) => run_ls(&cli.workdir, &cli.score_path, args),
        Commands::Best(args) => run_best(&cli.workdir, &cli.score_path, args),
        Commands::Bdrate(args) => run_bdrate(&cli.workdir, &cli.score_path, args),
    };

    if let Err(error) = result {
        log::error!("{error}");
        process::exit(1);
    }
}
