//! Command implementations for the CLI.
//!
//! Each submodule implements one subcommand against a disk cache opened
//! with the passthrough codec.

pub mod bdrate;
pub mod best;
pub mod ls;

use std::path::PathBuf;
use std::sync::Arc;

use codectune_core::{Cache, CoreResult, EncodingDiskCache};

use crate::passthrough::PassthroughCodec;

/// Opens the disk cache every subcommand works against.
pub fn open_cache(workdir: &PathBuf, score_paths: &[PathBuf]) -> CoreResult<EncodingDiskCache> {
    let codec = Arc::new(PassthroughCodec::new());
    Ok(EncodingDiskCache::new(codec, workdir)?.with_score_paths(score_paths.to_vec()))
}

/// Logs a summary of entries that enumeration had to skip.
pub fn report_bad_entries(cache: &dyn Cache) {
    let bad = cache.take_bad_entries();
    if !bad.is_empty() {
        log::warn!("{} unreadable cache entries were skipped", bad.len());
    }
}
