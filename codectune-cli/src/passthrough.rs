//! A codec for cache inspection.
//!
//! The CLI reads caches written by arbitrary tuning runs, without knowing
//! the option sets the codecs involved were built with. This codec has an
//! empty option set, so every stored parameter token is preserved verbatim
//! and hashnames verify against the canonical string unchanged. It cannot
//! execute encodes.

use std::path::Path;
use std::sync::Arc;

use codectune_core::{
    Codec, CoreError, CoreResult, EncodingResult, OptionSet, OptionValueSet, Videofile,
};

pub struct PassthroughCodec {
    option_set: Arc<OptionSet>,
}

impl PassthroughCodec {
    pub fn new() -> Self {
        Self {
            option_set: Arc::new(OptionSet::new(Vec::new())),
        }
    }
}

impl Default for PassthroughCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for PassthroughCodec {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn option_set(&self) -> &Arc<OptionSet> {
        &self.option_set
    }

    fn start_config(&self) -> CoreResult<OptionValueSet> {
        OptionValueSet::parse(Arc::clone(&self.option_set), "", self.option_formatter())
    }

    fn execute(
        &self,
        _parameters: &OptionValueSet,
        _bitrate: u32,
        _videofile: &Videofile,
        _workdir: &Path,
    ) -> CoreResult<EncodingResult> {
        Err(CoreError::Precondition(
            "the passthrough codec only inspects caches, it cannot encode".to_string(),
        ))
    }
}
