//! The `best` subcommand: show the winning configuration for one clip
//! and rate.

use std::path::PathBuf;
use std::sync::Arc;

use codectune_core::{pick_scorer, CoreError, CoreResult, Optimizer, Videofile};

use crate::cli::BestArgs;
use crate::commands::{open_cache, report_bad_entries};
use crate::passthrough::PassthroughCodec;

pub fn run_best(workdir: &PathBuf, score_paths: &[PathBuf], args: &BestArgs) -> CoreResult<()> {
    let scorer = pick_scorer(&args.scorer)
        .ok_or_else(|| CoreError::Parse(format!("unknown scorer {}", args.scorer)))?;
    let cache = open_cache(workdir, score_paths)?;
    let videofile = Videofile::new(&args.clip)?;

    let codec = Arc::new(PassthroughCodec::new());
    let optimizer = Optimizer::new(codec, Box::new(cache)).with_score_function(scorer);
    let best = optimizer.best_encoding(args.bitrate, &videofile)?;
    report_bad_entries(optimizer.cache());

    let Some(result) = best.result() else {
        println!(
            "No scored configurations for {} at {} kbps",
            videofile.basename(),
            args.bitrate
        );
        return Ok(());
    };
    let score = optimizer
        .score_encoding(&best)
        .ok_or_else(|| CoreError::MissingResult(format!("{best:?} could not be scored")))?;

    println!("hashname:   {}", best.encoder().hashname());
    println!("parameters: {}", best.encoder().parameters());
    println!("score:      {score:.4}");
    println!(
        "result:     {}",
        serde_json::to_string_pretty(result)
            .map_err(|e| CoreError::Other(format!("result serialization failed: {e}")))?
    );
    Ok(())
}
