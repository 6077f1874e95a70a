//! The `ls` subcommand: list scored configurations, best first.

use std::path::PathBuf;

use codectune_core::{pick_scorer, Cache, CoreError, CoreResult, Videofile};

use crate::cli::LsArgs;
use crate::commands::{open_cache, report_bad_entries};

pub fn run_ls(workdir: &PathBuf, score_paths: &[PathBuf], args: &LsArgs) -> CoreResult<()> {
    let scorer = pick_scorer(&args.scorer)
        .ok_or_else(|| CoreError::Parse(format!("unknown scorer {}", args.scorer)))?;
    let cache = open_cache(workdir, score_paths)?;
    let videofile = Videofile::new(&args.clip)?;

    let mut scored: Vec<_> = cache
        .all_scored_encodings(args.bitrate, &videofile)
        .into_iter()
        .filter_map(|encoding| {
            let score = encoding
                .result()
                .and_then(|result| scorer(args.bitrate, result))?;
            Some((score, encoding))
        })
        .collect();
    report_bad_entries(&cache);

    if scored.is_empty() {
        println!(
            "No scored configurations for {} at {} kbps",
            videofile.basename(),
            args.bitrate
        );
        return Ok(());
    }

    scored.sort_by(|(a, _), (b, _)| b.total_cmp(a));
    println!(
        "{:<12} {:>10} {:>8} {:>8}  parameters",
        "hashname", "score", "kbps", "psnr"
    );
    for (score, encoding) in &scored {
        let result = encoding.result().expect("filtered to scored encodings");
        println!(
            "{:<12} {:>10.4} {:>8} {:>8.2}  {}",
            encoding.encoder().hashname(),
            score,
            result.bitrate,
            result.psnr,
            encoding.encoder().parameters()
        );
    }
    Ok(())
}
