//! Content-addressable persistence of encoders and encodings.
//!
//! Encoders are stored by the truncated hash of their canonical parameter
//! string, encodings by encoder-hash / speed-group / video-basename:
//!
//! ```text
//! <root>/<hash>/parameters
//! <root>/<hash>/<speed_group>/<video_basename>.result
//! ```
//!
//! This layout is the durable contract between process runs. Lookups scan an
//! ordered list of roots (the writable work directory first, then read-only
//! score directories) and return the first hit; writes always target the
//! primary root.
//!
//! Enumeration queries skip entries that fail to read or parse, recording
//! them in a side list, so partial cache corruption never blocks a search.
//! Reads of a single addressed entry fail loudly instead.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::codec::Codec;
use crate::encoder::{Encoder, Encoding};
use crate::error::{CoreError, CoreResult};
use crate::result::EncodingResult;
use crate::values::OptionValueSet;
use crate::videofile::Videofile;

/// A cache entry that could not be read or parsed during enumeration.
#[derive(Debug)]
pub struct BadCacheEntry {
    pub path: PathBuf,
    pub reason: String,
}

/// Storage for encoders and their measured encodings.
pub trait Cache {
    /// Persists an encoder's parameters under its hashname. Idempotent:
    /// storing an already-stored encoder instance is a no-op.
    fn store_encoder(&self, encoder: &Encoder) -> CoreResult<()>;

    /// Reads back the parameters stored under a hashname.
    fn read_encoder_parameters(&self, hashname: &str) -> CoreResult<OptionValueSet>;

    /// Persists an encoding's result (if it has one).
    fn store_encoding(&self, encoding: &Encoding) -> CoreResult<()>;

    /// Reads the stored result for one specific encoding, or `None` when
    /// nothing is stored. An unreadable or undecodable file is an error.
    fn read_encoding_result(&self, encoding: &Encoding) -> CoreResult<Option<EncodingResult>>;

    /// All stored encodings across all encoders for one (bitrate, videofile).
    fn all_scored_encodings(&self, bitrate: u32, videofile: &Videofile) -> Vec<Encoding>;

    /// All stored encodings for one encoder and videofile, across bitrates.
    fn all_scored_rates(&self, encoder: &Encoder, videofile: &Videofile) -> Vec<Encoding>;

    /// All stored encodings for one encoder, across bitrates and videofiles.
    fn all_scored_encodings_for_encoder(&self, encoder: &Encoder) -> Vec<Encoding>;

    /// Drains the entries skipped by enumeration queries so far.
    fn take_bad_entries(&self) -> Vec<BadCacheEntry>;
}

// ============================================================================
// DISK CACHE
// ============================================================================

/// Encoder and encoding information, saved to disk.
pub struct EncodingDiskCache {
    codec: Arc<dyn Codec>,
    workdir: PathBuf,
    score_paths: Vec<PathBuf>,
    bad_entries: RefCell<Vec<BadCacheEntry>>,
}

impl EncodingDiskCache {
    /// Opens (creating if necessary) a cache rooted at `workdir`.
    pub fn new(codec: Arc<dyn Codec>, workdir: &Path) -> CoreResult<Self> {
        fs::create_dir_all(workdir)?;
        Ok(Self {
            codec,
            workdir: workdir.to_path_buf(),
            score_paths: Vec::new(),
            bad_entries: RefCell::new(Vec::new()),
        })
    }

    /// Adds read-only roots searched after the work directory.
    #[must_use]
    pub fn with_score_paths(mut self, score_paths: Vec<PathBuf>) -> Self {
        self.score_paths = score_paths;
        self
    }

    /// The writable primary root.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// The directory an external encode for this encoding should run in.
    pub fn encoding_workdir(&self, encoding: &Encoding) -> CoreResult<PathBuf> {
        let dir = self
            .workdir
            .join(encoding.encoder().hashname())
            .join(self.codec.speed_group(encoding.bitrate()));
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    fn roots(&self) -> impl Iterator<Item = &PathBuf> {
        std::iter::once(&self.workdir).chain(self.score_paths.iter())
    }

    fn result_filename(videofile: &Videofile) -> String {
        format!("{}.result", videofile.basename())
    }

    fn record_bad_entry(&self, path: &Path, error: &CoreError) {
        log::warn!("skipping bad cache entry {}: {error}", path.display());
        self.bad_entries.borrow_mut().push(BadCacheEntry {
            path: path.to_path_buf(),
            reason: error.to_string(),
        });
    }

    /// Subdirectory names of `dir`, silently empty when `dir` is absent.
    fn subdirectories(dir: &Path) -> Vec<String> {
        let Ok(entries) = fs::read_dir(dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| {
                let entry = entry.ok()?;
                if !entry.path().is_dir() {
                    return None;
                }
                entry.file_name().into_string().ok()
            })
            .collect();
        names.sort();
        names
    }

    /// Reconstructs one stored encoding from its result file. Any failure
    /// (unreadable file, corrupt result, hash mismatch on the parameters)
    /// belongs to this entry alone.
    fn recover_stored_encoding(
        &self,
        result_path: &Path,
        hashname: &str,
        bitrate: u32,
        videofile: &Videofile,
    ) -> CoreResult<Encoding> {
        let encoder = Encoder::from_hashname(Arc::clone(&self.codec), self, hashname)?;
        let text = fs::read_to_string(result_path)?;
        let result = EncodingResult::decode(&text, result_path)?;
        let mut encoding = encoder.encoding(bitrate, videofile.clone());
        encoding.set_result(Some(result));
        Ok(encoding)
    }
}

impl Cache for EncodingDiskCache {
    fn store_encoder(&self, encoder: &Encoder) -> CoreResult<()> {
        if encoder.is_stored() {
            return Ok(());
        }
        let dirname = self.workdir.join(encoder.hashname());
        fs::create_dir_all(&dirname)?;
        fs::write(dirname.join("parameters"), encoder.parameters().to_string())?;
        log::debug!("stored encoder {}", encoder.hashname());
        encoder.mark_stored();
        Ok(())
    }

    fn read_encoder_parameters(&self, hashname: &str) -> CoreResult<OptionValueSet> {
        for root in self.roots() {
            let path = root.join(hashname).join("parameters");
            if path.is_file() {
                let text = fs::read_to_string(&path)?;
                return OptionValueSet::parse(
                    Arc::clone(self.codec.option_set()),
                    text.trim(),
                    self.codec.option_formatter(),
                );
            }
        }
        Err(CoreError::EncoderNotFound(hashname.to_string()))
    }

    fn store_encoding(&self, encoding: &Encoding) -> CoreResult<()> {
        let dirname = self
            .workdir
            .join(encoding.encoder().hashname())
            .join(self.codec.speed_group(encoding.bitrate()));
        fs::create_dir_all(&dirname)?;
        let Some(result) = encoding.result() else {
            return Ok(());
        };
        let path = dirname.join(Self::result_filename(encoding.videofile()));
        fs::write(&path, result.encode()?)?;
        log::debug!("stored result {}", path.display());
        Ok(())
    }

    fn read_encoding_result(&self, encoding: &Encoding) -> CoreResult<Option<EncodingResult>> {
        let relative = Path::new(&encoding.encoder().hashname())
            .join(self.codec.speed_group(encoding.bitrate()))
            .join(Self::result_filename(encoding.videofile()));
        for root in self.roots() {
            let path = root.join(&relative);
            if path.is_file() {
                let text = fs::read_to_string(&path)?;
                return EncodingResult::decode(&text, &path).map(Some);
            }
        }
        Ok(None)
    }

    fn all_scored_encodings(&self, bitrate: u32, videofile: &Videofile) -> Vec<Encoding> {
        let group = self.codec.speed_group(bitrate);
        let filename = Self::result_filename(videofile);
        let mut seen = HashSet::new();
        let mut encodings = Vec::new();
        for root in self.roots() {
            for hashname in Self::subdirectories(root) {
                if seen.contains(&hashname) {
                    continue;
                }
                let result_path = root.join(&hashname).join(&group).join(&filename);
                if !result_path.is_file() {
                    continue;
                }
                seen.insert(hashname.clone());
                match self.recover_stored_encoding(&result_path, &hashname, bitrate, videofile) {
                    Ok(encoding) => encodings.push(encoding),
                    Err(error) => self.record_bad_entry(&result_path, &error),
                }
            }
        }
        encodings
    }

    fn all_scored_rates(&self, encoder: &Encoder, videofile: &Videofile) -> Vec<Encoding> {
        let hashname = encoder.hashname();
        let filename = Self::result_filename(videofile);
        let mut seen = HashSet::new();
        let mut encodings = Vec::new();
        for root in self.roots() {
            for group in Self::subdirectories(&root.join(&hashname)) {
                if seen.contains(&group) {
                    continue;
                }
                let result_path = root.join(&hashname).join(&group).join(&filename);
                if !result_path.is_file() {
                    continue;
                }
                seen.insert(group.clone());
                // A sub-directory name that is not a bitrate means the
                // target rate is unknown; keep the entry with rate zero.
                let bitrate = group.parse().unwrap_or(0);
                let mut encoding = encoder.encoding(bitrate, videofile.clone());
                match self.read_encoding_result(&encoding) {
                    Ok(Some(result)) => {
                        encoding.set_result(Some(result));
                        encodings.push(encoding);
                    }
                    Ok(None) => {}
                    Err(error) => self.record_bad_entry(&result_path, &error),
                }
            }
        }
        encodings
    }

    fn all_scored_encodings_for_encoder(&self, encoder: &Encoder) -> Vec<Encoding> {
        let hashname = encoder.hashname();
        let mut seen = HashSet::new();
        let mut encodings = Vec::new();
        for root in self.roots() {
            for group in Self::subdirectories(&root.join(&hashname)) {
                let group_dir = root.join(&hashname).join(&group);
                let Ok(entries) = fs::read_dir(&group_dir) else {
                    continue;
                };
                let bitrate = group.parse().unwrap_or(0);
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.extension().and_then(|e| e.to_str()) != Some("result") {
                        continue;
                    }
                    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                        continue;
                    };
                    if !seen.insert((group.clone(), stem.to_string())) {
                        continue;
                    }
                    // Result files are named by the clip's basename; the
                    // stored clips are .yuv by convention.
                    let videofile = match Videofile::new(&format!("{stem}.yuv")) {
                        Ok(videofile) => videofile,
                        Err(error) => {
                            self.record_bad_entry(&path, &error);
                            continue;
                        }
                    };
                    let mut encoding = encoder.encoding(bitrate, videofile);
                    match self.read_encoding_result(&encoding) {
                        Ok(Some(result)) => {
                            encoding.set_result(Some(result));
                            encodings.push(encoding);
                        }
                        Ok(None) => {}
                        Err(error) => self.record_bad_entry(&path, &error),
                    }
                }
            }
        }
        encodings
    }

    fn take_bad_entries(&self) -> Vec<BadCacheEntry> {
        self.bad_entries.take()
    }
}

// ============================================================================
// MEMORY CACHE
// ============================================================================

/// Encoder and encoding information, in memory only.
///
/// A value-equal substitute for [`EncodingDiskCache`], used by tests and by
/// score functions that must not touch disk.
#[derive(Default)]
pub struct EncodingMemoryCache {
    encoders: RefCell<HashMap<String, Encoder>>,
    encodings: RefCell<Vec<Encoding>>,
}

impl EncodingMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cache for EncodingMemoryCache {
    fn store_encoder(&self, encoder: &Encoder) -> CoreResult<()> {
        self.encoders
            .borrow_mut()
            .insert(encoder.hashname(), encoder.clone());
        encoder.mark_stored();
        Ok(())
    }

    fn read_encoder_parameters(&self, hashname: &str) -> CoreResult<OptionValueSet> {
        self.encoders
            .borrow()
            .get(hashname)
            .map(|encoder| encoder.parameters().clone())
            .ok_or_else(|| CoreError::EncoderNotFound(hashname.to_string()))
    }

    fn store_encoding(&self, encoding: &Encoding) -> CoreResult<()> {
        let mut encodings = self.encodings.borrow_mut();
        if let Some(existing) = encodings.iter_mut().find(|stored| *stored == encoding) {
            *existing = encoding.clone();
        } else {
            encodings.push(encoding.clone());
        }
        Ok(())
    }

    fn read_encoding_result(&self, encoding: &Encoding) -> CoreResult<Option<EncodingResult>> {
        Ok(self
            .encodings
            .borrow()
            .iter()
            .find(|stored| *stored == encoding)
            .and_then(|stored| stored.result().cloned()))
    }

    fn all_scored_encodings(&self, bitrate: u32, videofile: &Videofile) -> Vec<Encoding> {
        self.encodings
            .borrow()
            .iter()
            .filter(|stored| {
                stored.bitrate() == bitrate
                    && stored.videofile() == videofile
                    && stored.result().is_some()
            })
            .cloned()
            .collect()
    }

    fn all_scored_rates(&self, encoder: &Encoder, videofile: &Videofile) -> Vec<Encoding> {
        self.encodings
            .borrow()
            .iter()
            .filter(|stored| {
                stored.encoder() == encoder
                    && stored.videofile() == videofile
                    && stored.result().is_some()
            })
            .cloned()
            .collect()
    }

    fn all_scored_encodings_for_encoder(&self, encoder: &Encoder) -> Vec<Encoding> {
        self.encodings
            .borrow()
            .iter()
            .filter(|stored| stored.encoder() == encoder && stored.result().is_some())
            .cloned()
            .collect()
    }

    fn take_bad_entries(&self) -> Vec<BadCacheEntry> {
        Vec::new()
    }
}
