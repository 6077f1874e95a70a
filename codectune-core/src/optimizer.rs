//! Local search over encoder configurations.
//!
//! The optimizer answers two questions against a cache of measured results:
//! which known configuration is best for a (bitrate, videofile) pair, and
//! which configuration that has *not* been measured yet is worth trying
//! next. The untried search is a layered set of heuristics ending in
//! randomized single- and double-option variation; when every layer is
//! exhausted it returns `None`, which is the search's natural termination
//! signal rather than an error.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::cache::Cache;
use crate::codec::Codec;
use crate::encoder::{Encoder, Encoding};
use crate::error::{CoreError, CoreResult};
use crate::score::{score_psnr_bitrate, ScoreFunction};
use crate::videofile::Videofile;

/// Weak penalty per explicitly assigned parameter, so shorter configurations
/// win among near-ties. Deliberately far below any meaningful quality
/// difference.
pub const PARAMETER_PENALTY: f64 = 0.00001;

/// Number of randomized variants generated per pass of the final fallback.
const RANDOM_VARIANT_ATTEMPTS: usize = 10;

/// A fixed set of (target bitrate, filename) pairs being tuned together.
#[derive(Debug, Clone, Default)]
pub struct FileAndRateSet {
    rates_and_files: Vec<(u32, String)>,
    verify_files_present: bool,
    set_is_complete: bool,
}

impl FileAndRateSet {
    /// With `verify_files_present`, adding a missing file stops the add and
    /// marks the set incomplete.
    pub fn new(verify_files_present: bool) -> Self {
        Self {
            rates_and_files: Vec::new(),
            verify_files_present,
            set_is_complete: true,
        }
    }

    pub fn add_files_and_rates(&mut self, filenames: &[&str], rates: &[u32], basedir: Option<&Path>) {
        for &rate in rates {
            for &filename in filenames {
                let full_filename = match basedir {
                    Some(basedir) => basedir.join(filename).to_string_lossy().into_owned(),
                    None => filename.to_string(),
                };
                if self.verify_files_present && !PathBuf::from(&full_filename).is_file() {
                    self.set_is_complete = false;
                    return;
                }
                let pair = (rate, full_filename);
                if !self.rates_and_files.contains(&pair) {
                    self.rates_and_files.push(pair);
                }
            }
        }
    }

    pub fn all_files_and_rates(&self) -> &[(u32, String)] {
        &self.rates_and_files
    }

    pub fn all_rates_for_file(&self, filename: &str) -> Vec<u32> {
        let mut rates: Vec<u32> = self
            .rates_and_files
            .iter()
            .filter(|(_, f)| f == filename)
            .map(|(rate, _)| *rate)
            .collect();
        rates.sort_unstable();
        rates.dedup();
        rates
    }

    pub fn all_file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .rates_and_files
            .iter()
            .map(|(_, f)| f.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn is_complete(&self) -> bool {
        self.set_is_complete
    }
}

/// Finds the best known, and proposes the best untried, configuration for
/// one codec against a result cache.
pub struct Optimizer {
    codec: Arc<dyn Codec>,
    cache: Box<dyn Cache>,
    file_set: Option<FileAndRateSet>,
    score_function: ScoreFunction,
    rng: RefCell<StdRng>,
}

impl Optimizer {
    pub fn new(codec: Arc<dyn Codec>, cache: Box<dyn Cache>) -> Self {
        Self {
            codec,
            cache,
            file_set: None,
            score_function: score_psnr_bitrate,
            rng: RefCell::new(StdRng::from_entropy()),
        }
    }

    #[must_use]
    pub fn with_file_set(mut self, file_set: FileAndRateSet) -> Self {
        self.file_set = Some(file_set);
        self
    }

    #[must_use]
    pub fn with_score_function(mut self, score_function: ScoreFunction) -> Self {
        self.score_function = score_function;
        self
    }

    /// Seeds the random source, making search sequences reproducible.
    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        *self.rng.borrow_mut() = StdRng::seed_from_u64(seed);
        self
    }

    pub fn codec(&self) -> &Arc<dyn Codec> {
        &self.codec
    }

    pub fn cache(&self) -> &dyn Cache {
        self.cache.as_ref()
    }

    /// The score of one measured encoding: the raw score function minus the
    /// parameter-count penalty. `None` when the encoding has no result or
    /// the result is unusable.
    pub fn score_encoding(&self, encoding: &Encoding) -> Option<f64> {
        let result = encoding.result()?;
        let raw = (self.score_function)(encoding.bitrate(), result)?;
        Some(raw - encoding.encoder().parameters().assigned_len() as f64 * PARAMETER_PENALTY)
    }

    /// The stored encoding with the highest score for (bitrate, videofile),
    /// or a fresh unexecuted encoding of the codec's start configuration
    /// when nothing is stored. Tie order is unspecified.
    pub fn best_encoding(&self, bitrate: u32, videofile: &Videofile) -> CoreResult<Encoding> {
        let mut best: Option<(Encoding, f64)> = None;
        for encoding in self.cache.all_scored_encodings(bitrate, videofile) {
            let Some(score) = self.score_encoding(&encoding) else {
                continue;
            };
            if best.as_ref().map_or(true, |(_, best_score)| score > *best_score) {
                best = Some((encoding, score));
            }
        }
        match best {
            Some((encoding, _)) => Ok(encoding),
            None => {
                let start = Encoder::new(Arc::clone(&self.codec), self.codec.start_config()?);
                Ok(start.encoding(bitrate, videofile.clone()))
            }
        }
    }

    /// Attempts to guess the best untried encoding for this file and rate.
    /// Encoders whose hashnames appear in `hashnames_to_ignore` are never
    /// proposed. Returns `None` when every heuristic layer is exhausted.
    pub fn best_untried_encoding(
        &self,
        bitrate: u32,
        videofile: &Videofile,
        hashnames_to_ignore: &HashSet<String>,
    ) -> CoreResult<Option<Encoding>> {
        let current_best = self.best_encoding(bitrate, videofile)?;

        if let Some(encoding) = self.works_better_on_some_other_clip(&current_best, bitrate, videofile)? {
            log::debug!("untried candidate from another clip");
            return Ok(Some(encoding));
        }
        if let Some(encoding) =
            self.encoding_good_on_other_rate(bitrate, videofile, hashnames_to_ignore)?
        {
            log::debug!("untried candidate from another rate");
            return Ok(Some(encoding));
        }
        if let Some(encoding) =
            self.encoding_with_one_less_parameter(&current_best, bitrate, videofile, hashnames_to_ignore)?
        {
            if encoding.result().is_none() {
                log::debug!("untried candidate with one parameter removed");
                return Ok(Some(encoding));
            }
        }
        // Randomly vary some parameters and see if things improve.
        // This is the final fallback.
        for encoding in self.some_untried_variants(&current_best)? {
            if encoding.result().is_none() {
                return Ok(Some(encoding));
            }
        }
        Ok(None)
    }

    /// The single encoder with the highest total score over every (bitrate,
    /// file) pair of the configured file set, restricted to encoders that
    /// have been measured on all of them. `None` when no encoder qualifies.
    pub fn best_overall_encoder(&self) -> CoreResult<Option<Encoder>> {
        let file_set = self.file_set.as_ref().ok_or_else(|| {
            CoreError::Precondition("best_overall_encoder needs a file set".to_string())
        })?;
        let pairs = file_set.all_files_and_rates();
        let Some(((first_rate, first_file), rest)) = pairs.split_first() else {
            return Ok(None);
        };

        let first_video = Videofile::new(first_file)?;
        let mut candidates: HashMap<String, Encoder> = self
            .cache
            .all_scored_encodings(*first_rate, &first_video)
            .into_iter()
            .map(|encoding| (encoding.encoder().hashname(), encoding.encoder().clone()))
            .collect();
        for (rate, filename) in rest {
            let videofile = Videofile::new(filename)?;
            let scored: HashSet<String> = self
                .cache
                .all_scored_encodings(*rate, &videofile)
                .iter()
                .map(|encoding| encoding.encoder().hashname())
                .collect();
            candidates.retain(|hashname, _| scored.contains(hashname));
        }

        if candidates.is_empty() {
            return Ok(None);
        }
        if candidates.len() == 1 {
            // No scoring pass needed for a sole candidate.
            return Ok(candidates.into_values().next());
        }

        let mut best: Option<(Encoder, f64)> = None;
        'candidates: for encoder in candidates.into_values() {
            let mut total = 0.0;
            for (rate, filename) in pairs {
                let mut encoding = encoder.encoding(*rate, Videofile::new(filename)?);
                encoding.recover(self.cache.as_ref())?;
                let Some(score) = self.score_encoding(&encoding) else {
                    continue 'candidates;
                };
                total += score;
            }
            if best.as_ref().map_or(true, |(_, best_total)| total > *best_total) {
                best = Some((encoder, total));
            }
        }
        Ok(best.map(|(encoder, _)| encoder))
    }

    /// Finds an encoder that works better than the current best on some
    /// other clip it has been measured on, and has not been tried here yet.
    fn works_better_on_some_other_clip(
        &self,
        current: &Encoding,
        bitrate: u32,
        videofile: &Videofile,
    ) -> CoreResult<Option<Encoding>> {
        let candidates = self.cache.all_scored_encodings_for_encoder(current.encoder());
        for candidate in candidates {
            if candidate == *current {
                continue;
            }
            let best_there = self.best_encoding(bitrate, candidate.videofile())?;
            if best_there != candidate {
                // A different encoder beats this one on the other clip;
                // try that encoder here if it is untried.
                let mut transplanted = best_there.encoder().encoding(bitrate, videofile.clone());
                transplanted.recover(self.cache.as_ref())?;
                if transplanted.result().is_none() {
                    return Ok(Some(transplanted));
                }
            }
        }
        Ok(None)
    }

    /// Finds an untried encoder that is best on some other configured rate
    /// for the same file.
    fn encoding_good_on_other_rate(
        &self,
        bitrate: u32,
        videofile: &Videofile,
        hashnames_to_ignore: &HashSet<String>,
    ) -> CoreResult<Option<Encoding>> {
        let Some(file_set) = &self.file_set else {
            return Ok(None);
        };
        for other_rate in file_set.all_rates_for_file(videofile.filename()) {
            let encoder = self.best_encoding(other_rate, videofile)?.encoder().clone();
            if hashnames_to_ignore.contains(&encoder.hashname()) {
                continue;
            }
            let mut encoding = encoder.encoding(bitrate, videofile.clone());
            encoding.recover(self.cache.as_ref())?;
            if encoding.result().is_none() {
                return Ok(Some(encoding));
            }
        }
        Ok(None)
    }

    /// Builds an encoder with one randomly chosen non-mandatory parameter
    /// removed, testing whether an implicit default does as well as the
    /// explicit override.
    fn encoding_with_one_less_parameter(
        &self,
        current: &Encoding,
        bitrate: u32,
        videofile: &Videofile,
        hashnames_to_ignore: &HashSet<String>,
    ) -> CoreResult<Option<Encoding>> {
        let reduced = {
            let mut rng = self.rng.borrow_mut();
            current
                .encoder()
                .parameters()
                .randomly_remove_parameter(&mut *rng)
        };
        let Some(parameters) = reduced else {
            return Ok(None);
        };
        let encoder = Encoder::new(Arc::clone(&self.codec), parameters);
        if hashnames_to_ignore.contains(&encoder.hashname()) {
            return Ok(None);
        }
        let mut encoding = encoder.encoding(bitrate, videofile.clone());
        encoding.recover(self.cache.as_ref())?;
        Ok(Some(encoding))
    }

    /// Randomized variants of the current best configuration: the codec's
    /// suggested tweak first (when present), then up to 10 single-option
    /// mutations, then, only if none of those were untried, up to 10
    /// two-option mutations. Each batch is deduplicated by canonical string.
    fn some_untried_variants(&self, current: &Encoding) -> CoreResult<Vec<Encoding>> {
        let mut untried = Vec::new();

        if let Some(tweaked) = self.codec.suggest_tweak(current) {
            let encoder = Encoder::new(Arc::clone(&self.codec), tweaked);
            let mut encoding = encoder.encoding(current.bitrate(), current.videofile().clone());
            encoding.recover(self.cache.as_ref())?;
            if encoding.result().is_none() {
                untried.push(encoding);
            }
        }

        for hops in [1, 2] {
            let mut seen = HashSet::new();
            for _ in 0..RANDOM_VARIANT_ATTEMPTS {
                let parameters = {
                    let mut rng = self.rng.borrow_mut();
                    let mut parameters = self
                        .codec
                        .randomly_change_config(current.encoder().parameters(), &mut *rng)?;
                    if hops == 2 {
                        parameters = self.codec.randomly_change_config(&parameters, &mut *rng)?;
                    }
                    parameters
                };
                if !seen.insert(parameters.to_string()) {
                    continue;
                }
                let encoder = Encoder::new(Arc::clone(&self.codec), parameters);
                let mut encoding = encoder.encoding(current.bitrate(), current.videofile().clone());
                encoding.recover(self.cache.as_ref())?;
                if encoding.result().is_none() {
                    untried.push(encoding);
                }
            }
            // Two-option mutations only when no single-hop variant is left.
            if !untried.is_empty() {
                break;
            }
        }
        Ok(untried)
    }
}
