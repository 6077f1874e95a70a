//! Shared test fixtures: a codec whose "encode" step is a pure function of
//! its parameters, so search behavior can be tested without real encoders.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use codectune_core::{
    Codec, CoreResult, EncoderOption, EncodingResult, OptionSet, OptionValueSet, Videofile,
};

/// A codec scoring exactly what its `--score` parameter says: psnr equals
/// the score value (or -100 with no score set), bitrate is always 100.
pub struct DummyCodec {
    option_set: Arc<OptionSet>,
}

impl DummyCodec {
    pub fn new() -> Self {
        Self {
            option_set: Arc::new(OptionSet::new(vec![
                EncoderOption::integer("score", 0, 10),
                EncoderOption::new("another_parameter", &["yes", "no"]),
            ])),
        }
    }
}

impl Default for DummyCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for DummyCodec {
    fn name(&self) -> &str {
        "dummy"
    }

    fn option_set(&self) -> &Arc<OptionSet> {
        &self.option_set
    }

    fn start_config(&self) -> CoreResult<OptionValueSet> {
        self.parse("--score=5")
    }

    fn execute(
        &self,
        parameters: &OptionValueSet,
        _bitrate: u32,
        _videofile: &Videofile,
        _workdir: &Path,
    ) -> CoreResult<EncodingResult> {
        let psnr = parameters
            .value("score")
            .and_then(|score| score.parse::<f64>().ok())
            .unwrap_or(-100.0);
        Ok(EncodingResult::new(100, psnr))
    }
}

impl DummyCodec {
    /// Parses a parameter string against this codec's option set.
    pub fn parse(&self, input: &str) -> CoreResult<OptionValueSet> {
        OptionValueSet::parse(
            Arc::clone(&self.option_set),
            input,
            self.option_formatter(),
        )
    }
}

pub fn test_videofile() -> Videofile {
    Videofile::new("foofile_640_480_30.yuv").expect("test filename parses")
}

pub fn other_videofile() -> Videofile {
    Videofile::new("barfile_640_480_30.yuv").expect("test filename parses")
}
