//! Core library for codectune.
//!
//! This crate contains the codec-tuning engine: a model of encoder
//! command-line options and configurations, a content-addressed on-disk
//! cache of encoding results, scoring functions, the BD-rate metric, and
//! an optimizer that searches for better configurations against the cache.
//!
//! The main entry points are:
//! - [`Codec`]: the trait a concrete encoder integration implements.
//! - [`EncodingDiskCache`]: persistent storage of measured results.
//! - [`Optimizer`]: search for the best known and best untried
//!   configurations.
//! - [`bd_rate`]: Bjøntegaard-delta rate between two rate/quality curves.
//!
//! The library never shells out to encoders itself; `Codec::execute` is the
//! seam where a caller plugs in real encode-and-measure work.

pub mod bdrate;
pub mod cache;
pub mod codec;
pub mod encoder;
pub mod error;
pub mod options;
pub mod optimizer;
pub mod result;
pub mod score;
pub mod values;
pub mod videofile;

pub use bdrate::{bd_rate, BdRateReport};
pub use cache::{BadCacheEntry, Cache, EncodingDiskCache, EncodingMemoryCache};
pub use codec::Codec;
pub use encoder::{hashname, Encoder, Encoding};
pub use error::{CoreError, CoreResult};
pub use options::{EncoderOption, OptionFormatter, OptionKind, OptionSet};
pub use optimizer::{FileAndRateSet, Optimizer};
pub use result::EncodingResult;
pub use score::{pick_scorer, score_cpu_psnr, score_psnr_bitrate, ScoreFunction};
pub use values::OptionValueSet;
pub use videofile::Videofile;
