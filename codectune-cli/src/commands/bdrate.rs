//! The `bdrate` subcommand: BD-rate between two stored configurations.

use std::path::PathBuf;
use std::sync::Arc;

use codectune_core::{bd_rate, Cache, CoreResult, Encoder, Videofile};

use crate::cli::BdrateArgs;
use crate::commands::{open_cache, report_bad_entries};
use crate::passthrough::PassthroughCodec;

/// Gathers the (bitrate, psnr) curve one encoder has produced for a clip,
/// using achieved rather than target bitrates.
fn rate_psnr_curve(
    cache: &dyn Cache,
    codec: &Arc<PassthroughCodec>,
    hashname: &str,
    videofile: &Videofile,
) -> CoreResult<Vec<(f64, f64)>> {
    let encoder = Encoder::from_hashname(codec.clone(), cache, hashname)?;
    Ok(cache
        .all_scored_rates(&encoder, videofile)
        .iter()
        .filter_map(|encoding| {
            let result = encoding.result()?;
            Some((result.bitrate as f64, result.psnr))
        })
        .collect())
}

pub fn run_bdrate(workdir: &PathBuf, score_paths: &[PathBuf], args: &BdrateArgs) -> CoreResult<()> {
    let cache = open_cache(workdir, score_paths)?;
    let videofile = Videofile::new(&args.clip)?;
    let codec = Arc::new(PassthroughCodec::new());

    let baseline = rate_psnr_curve(&cache, &codec, &args.baseline, &videofile)?;
    let candidate = rate_psnr_curve(&cache, &codec, &args.candidate, &videofile)?;
    report_bad_entries(&cache);
    log::info!(
        "comparing {} baseline points against {} candidate points",
        baseline.len(),
        candidate.len()
    );

    let report = bd_rate(&baseline, &candidate)?;
    println!("clip:          {}", videofile.basename());
    println!("baseline:      {}", args.baseline);
    println!("candidate:     {}", args.candidate);
    println!(
        "quality range: {:.2} .. {:.2} dB",
        report.quality_range.0, report.quality_range.1
    );
    println!("bd-rate:       {:+.2}%", report.difference);
    if report.difference < 0.0 {
        println!("The candidate needs less bitrate for the same quality.");
    } else if report.difference > 0.0 {
        println!("The candidate needs more bitrate for the same quality.");
    }
    Ok(())
}
