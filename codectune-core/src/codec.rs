//! Codec capability interface.
//!
//! A codec supplies the variation dimensions the optimizer searches over
//! (its option set and a starting configuration), and the entry point for
//! running an actual encode. The search core never invokes `execute`
//! itself; it only proposes configurations, and the caller runs them.
//!
//! Optional behaviors (result-driven tweak suggestions, inter-parameter
//! fixups, bitrate bucketing) have default implementations so a minimal
//! codec only defines its options, its start configuration and `execute`.

use std::path::Path;
use std::sync::Arc;

use rand::RngCore;

use crate::encoder::Encoding;
use crate::error::CoreResult;
use crate::options::{OptionFormatter, OptionSet};
use crate::result::EncodingResult;
use crate::values::OptionValueSet;
use crate::videofile::Videofile;

pub trait Codec {
    /// Short name, used as a display label and a cache namespace component.
    fn name(&self) -> &str;

    /// All the options this codec can vary.
    fn option_set(&self) -> &Arc<OptionSet>;

    /// The command-line form of this codec's options.
    fn option_formatter(&self) -> OptionFormatter {
        OptionFormatter::default()
    }

    /// The default configuration the search starts from.
    fn start_config(&self) -> CoreResult<OptionValueSet>;

    /// Runs the external encode/decode/measure step for one configuration.
    /// Only the caller invokes this; the search core proposes configurations
    /// and reads the cache.
    fn execute(
        &self,
        parameters: &OptionValueSet,
        bitrate: u32,
        videofile: &Videofile,
        workdir: &Path,
    ) -> CoreResult<EncodingResult>;

    /// Hook for inter-parameter adjustments after a configuration changes
    /// (e.g. deriving a buffer size from a rate cap).
    fn configuration_fixups(&self, config: OptionValueSet) -> OptionValueSet {
        config
    }

    /// The cache bucket for a target bitrate. The default gives every
    /// bitrate its own bucket; bitrate-independent codecs may collapse
    /// all bitrates into one.
    fn speed_group(&self, bitrate: u32) -> String {
        bitrate.to_string()
    }

    /// Optional deterministic tweak derived from a measured result, e.g.
    /// nudging a quantizer by one depending on bitrate overshoot. Tried by
    /// the optimizer before randomized variation.
    fn suggest_tweak(&self, _encoding: &Encoding) -> Option<OptionValueSet> {
        None
    }

    /// One random single-option change, with fixups applied.
    fn randomly_change_config(
        &self,
        parameters: &OptionValueSet,
        rng: &mut dyn RngCore,
    ) -> CoreResult<OptionValueSet> {
        Ok(self.configuration_fixups(parameters.randomly_patch_config(rng)?))
    }
}
