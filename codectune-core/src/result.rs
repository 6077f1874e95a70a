//! Encoding measurement records.
//!
//! A result is the flat measurement record produced by running an encoder:
//! at minimum the achieved bitrate and a PSNR figure, plus any codec-specific
//! extra fields (CPU time, clip time, frame-level detail).
//!
//! On disk, results are JSON. Caches written by the previous generation of
//! tooling used the Python literal form of the same record, so reading tries
//! an ordered list of decoders: JSON first, then the legacy literal syntax.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// The measurement record for one executed encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingResult {
    /// Achieved bitrate in kilobits per second.
    pub bitrate: i64,
    /// Overall PSNR in dB.
    pub psnr: f64,
    /// Codec-specific extra fields, preserved as-is.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl EncodingResult {
    pub fn new(bitrate: i64, psnr: f64) -> Self {
        Self {
            bitrate,
            psnr,
            extra: BTreeMap::new(),
        }
    }

    /// An extra field interpreted as a float, if present and numeric.
    pub fn extra_f64(&self, name: &str) -> Option<f64> {
        self.extra.get(name).and_then(serde_json::Value::as_f64)
    }

    /// Serializes to the on-disk JSON form.
    pub fn encode(&self) -> CoreResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::Other(format!("result serialization failed: {e}")))
    }

    /// Decodes a stored result, trying each supported format in order.
    /// `path` is only used for error reporting.
    pub fn decode(text: &str, path: &Path) -> CoreResult<Self> {
        if let Ok(result) = serde_json::from_str(text) {
            return Ok(result);
        }
        if let Ok(result) = serde_json::from_str(&python_literal_to_json(text)) {
            return Ok(result);
        }
        Err(CoreError::CorruptResult {
            path: path.to_path_buf(),
            reason: "neither JSON nor legacy literal syntax".to_string(),
        })
    }
}

/// Rewrites a Python literal expression (the legacy result format, e.g.
/// `{'psnr': 25.5, 'bitrate': 100}`) into JSON text. String contents are
/// left untouched; outside strings, `True`/`False`/`None` become their
/// JSON spellings.
fn python_literal_to_json(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    let mut delimiter = '\'';

    while let Some(c) = chars.next() {
        if in_string {
            match c {
                _ if c == delimiter => {
                    in_string = false;
                    out.push('"');
                }
                '"' => out.push_str("\\\""),
                '\\' => {
                    out.push('\\');
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                _ => out.push(c),
            }
        } else if c == '\'' || c == '"' {
            in_string = true;
            delimiter = c;
            out.push('"');
        } else if c.is_ascii_alphabetic() {
            let mut word = String::new();
            word.push(c);
            while let Some(&next) = chars.peek() {
                if next.is_ascii_alphanumeric() || next == '_' {
                    word.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            match word.as_str() {
                "True" => out.push_str("true"),
                "False" => out.push_str("false"),
                "None" => out.push_str("null"),
                _ => out.push_str(&word),
            }
        } else {
            out.push(c);
        }
    }
    out
}
