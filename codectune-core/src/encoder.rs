//! Encoders and encodings.
//!
//! An encoder is a codec bound to one fully specified parameter assignment;
//! its cache identity is a truncated content hash of the canonical parameter
//! string. An encoding is an encoder applied to one (bitrate, videofile)
//! pair, optionally holding the measured result.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::cache::Cache;
use crate::codec::Codec;
use crate::error::{CoreError, CoreResult};
use crate::result::EncodingResult;
use crate::values::OptionValueSet;
use crate::videofile::Videofile;

/// Number of hex characters kept from the parameter digest. 48 bits is an
/// accepted collision-risk trade-off; reconstruction re-verifies the hash.
const HASHNAME_LENGTH: usize = 12;

/// The cache key for a parameter set: the first 12 hex characters of the
/// SHA-256 of its canonical string. A pure function of the canonical form.
pub fn hashname(parameters: &OptionValueSet) -> String {
    let digest = Sha256::digest(parameters.to_string().as_bytes());
    digest
        .iter()
        .flat_map(|byte| [byte >> 4, byte & 0xf])
        .take(HASHNAME_LENGTH)
        .map(|nibble| char::from_digit(u32::from(nibble), 16).unwrap_or('0'))
        .collect()
}

/// A codec with a specific set of parameters.
#[derive(Clone)]
pub struct Encoder {
    codec: Arc<dyn Codec>,
    parameters: OptionValueSet,
    // Shared across clones, so an encoding derived from this encoder marking
    // it stored is visible through every handle.
    stored: Arc<AtomicBool>,
}

impl Encoder {
    /// Creates an encoder, applying the codec's configuration fixups.
    pub fn new(codec: Arc<dyn Codec>, parameters: OptionValueSet) -> Self {
        let parameters = codec.configuration_fixups(parameters);
        Self {
            codec,
            parameters,
            stored: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Reconstructs an encoder from a stored hashname. The recovered
    /// parameters must re-derive the same hashname, or the stored entry is
    /// corrupt (or a truncated-hash collision) and reconstruction fails.
    pub fn from_hashname(
        codec: Arc<dyn Codec>,
        cache: &dyn Cache,
        stored_hashname: &str,
    ) -> CoreResult<Self> {
        let parameters = cache.read_encoder_parameters(stored_hashname)?;
        let computed = hashname(&parameters);
        if computed != stored_hashname {
            return Err(CoreError::HashMismatch {
                stored: stored_hashname.to_string(),
                computed,
            });
        }
        // Fixups are skipped here: the stored canonical string is the
        // identity and must round-trip unchanged.
        Ok(Self {
            codec,
            parameters,
            stored: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn codec(&self) -> &Arc<dyn Codec> {
        &self.codec
    }

    pub fn parameters(&self) -> &OptionValueSet {
        &self.parameters
    }

    pub fn hashname(&self) -> String {
        hashname(&self.parameters)
    }

    /// Whether this encoder (through any clone) has already been written to
    /// a cache.
    pub fn is_stored(&self) -> bool {
        self.stored.load(Ordering::Relaxed)
    }

    pub fn mark_stored(&self) {
        self.stored.store(true, Ordering::Relaxed);
    }

    /// Applies this encoder to one (bitrate, videofile) pair.
    pub fn encoding(&self, bitrate: u32, videofile: Videofile) -> Encoding {
        Encoding::new(self.clone(), bitrate, videofile)
    }
}

impl PartialEq for Encoder {
    fn eq(&self, other: &Self) -> bool {
        self.codec.name() == other.codec.name() && self.parameters == other.parameters
    }
}

impl Eq for Encoder {}

impl fmt::Debug for Encoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoder")
            .field("codec", &self.codec.name())
            .field("parameters", &self.parameters.to_string())
            .finish()
    }
}

/// The result of applying a specific encoder to a specific videofile with
/// a specific target bitrate.
#[derive(Clone)]
pub struct Encoding {
    encoder: Encoder,
    bitrate: u32,
    videofile: Videofile,
    result: Option<EncodingResult>,
}

impl Encoding {
    pub fn new(encoder: Encoder, bitrate: u32, videofile: Videofile) -> Self {
        Self {
            encoder,
            bitrate,
            videofile,
            result: None,
        }
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn bitrate(&self) -> u32 {
        self.bitrate
    }

    pub fn videofile(&self) -> &Videofile {
        &self.videofile
    }

    pub fn result(&self) -> Option<&EncodingResult> {
        self.result.as_ref()
    }

    pub fn set_result(&mut self, result: Option<EncodingResult>) {
        self.result = result;
    }

    /// Runs the codec's external encode step and records the measurement.
    pub fn execute(&mut self, workdir: &Path) -> CoreResult<&mut Self> {
        let result = self.encoder.codec().execute(
            self.encoder.parameters(),
            self.bitrate,
            &self.videofile,
            workdir,
        )?;
        self.result = Some(result);
        Ok(self)
    }

    /// Persists the owning encoder (once) and this encoding's result.
    pub fn store(&self, cache: &dyn Cache) -> CoreResult<()> {
        cache.store_encoder(&self.encoder)?;
        cache.store_encoding(self)
    }

    /// Loads the result from the cache, if one is stored. Leaves the
    /// encoding unchanged when nothing is stored.
    pub fn recover(&mut self, cache: &dyn Cache) -> CoreResult<()> {
        if let Some(result) = cache.read_encoding_result(self)? {
            self.result = Some(result);
        }
        Ok(())
    }
}

impl PartialEq for Encoding {
    /// Identity comparison: same encoder, bitrate and videofile. The
    /// measured result does not participate.
    fn eq(&self, other: &Self) -> bool {
        self.encoder == other.encoder
            && self.bitrate == other.bitrate
            && self.videofile == other.videofile
    }
}

impl Eq for Encoding {}

impl fmt::Debug for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoding")
            .field("encoder", &self.encoder)
            .field("bitrate", &self.bitrate)
            .field("videofile", &self.videofile.basename())
            .field("has_result", &self.result.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{EncoderOption, OptionFormatter, OptionSet};

    fn values(input: &str) -> OptionValueSet {
        let set = Arc::new(OptionSet::new(vec![EncoderOption::new(
            "preset",
            &["fast", "slow"],
        )]));
        OptionValueSet::parse(set, input, OptionFormatter::default()).unwrap()
    }

    #[test]
    fn test_hashname_is_deterministic() {
        let one = hashname(&values("--preset=slow"));
        let other = hashname(&values("--preset=slow"));
        assert_eq!(one, other);
        assert_eq!(one.len(), 12);
        assert!(one.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hashname_depends_on_canonical_string() {
        assert_ne!(
            hashname(&values("--preset=slow")),
            hashname(&values("--preset=fast"))
        );
    }

    #[test]
    fn test_hashname_ignores_token_order() {
        let one = values("--preset=slow unknown-a unknown-b");
        let other = values("unknown-b unknown-a --preset=slow");
        assert_eq!(hashname(&one), hashname(&other));
    }
}
