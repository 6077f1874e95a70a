//! Score functions for encoding results.
//!
//! A score function maps a target bitrate and a measurement record to a
//! single comparable number, or `None` when the record is unusable. Scores
//! must be total (no panics for any well-formed record) and non-zero
//! whenever present, since callers use presence as "has a score".

use crate::error::{CoreError, CoreResult};
use crate::result::EncodingResult;

/// Signature of all score functions.
pub type ScoreFunction = fn(u32, &EncodingResult) -> Option<f64>;

/// Lower bound for [`score_psnr_bitrate`]. Keeps heavy bitrate overshoot
/// from producing unboundedly negative scores, and keeps scores non-zero.
pub const MIN_PSNR_SCORE: f64 = 0.01;

/// Looks up a score function by its registry name.
pub fn pick_scorer(name: &str) -> Option<ScoreFunction> {
    match name {
        "psnr" => Some(score_psnr_bitrate),
        "rt" => Some(score_cpu_psnr),
        _ => None,
    }
}

/// PSNR, with 0.1 dB subtracted per kilobit per second of bitrate overshoot,
/// floored at [`MIN_PSNR_SCORE`].
pub fn score_psnr_bitrate(target_bitrate: u32, result: &EncodingResult) -> Option<f64> {
    let mut score = result.psnr;
    let overshoot = result.bitrate - i64::from(target_bitrate);
    if overshoot > 0 {
        score -= overshoot as f64 * 0.1;
    }
    Some(score.max(MIN_PSNR_SCORE))
}

/// The score relevant to interactive usage: stay within the requested
/// bitrate and keep encode CPU time below clip time; otherwise PSNR rules.
/// Overshoot costs 0.1 dB per percentage point over target.
///
/// Needs `encode_cputime` and `cliptime` fields in the result; returns
/// `None` without them.
pub fn score_cpu_psnr(target_bitrate: u32, result: &EncodingResult) -> Option<f64> {
    // There are cases where no target bitrate is known.
    if target_bitrate == 0 {
        return Some(-1.0);
    }
    let used_time = result.extra_f64("encode_cputime")?;
    let available_time = result.extra_f64("cliptime")?;

    let mut score = result.psnr;
    let target = f64::from(target_bitrate);
    if result.bitrate as f64 > target {
        let percent_overshoot = 100.0 * (result.bitrate as f64 - target) / target;
        score -= 0.1 * percent_overshoot;
    }
    if used_time > available_time && available_time > 0.0 {
        score -= (used_time - available_time) / available_time * 100.0;
    }
    if score == 0.0 {
        score = MIN_PSNR_SCORE;
    }
    Some(score)
}

/// Total delay in frame delivery for a sequence of frames, as a proportion
/// of clip length: 0.2 means a 10 second clip takes 12 seconds to play.
///
/// `frame_sizes` are per-frame sizes in bits, `bitrate` is in bits per
/// second and `buffer_size` is the initial buffering in seconds. Playback
/// pauses until a late frame arrives; no further penalty falls on the
/// following frame.
pub fn delay_calculation(
    frame_sizes: &[f64],
    framerate: f64,
    bitrate: f64,
    buffer_size: f64,
) -> CoreResult<f64> {
    if frame_sizes.is_empty() || framerate <= 0.0 || bitrate <= 0.0 {
        return Err(CoreError::Precondition(
            "delay calculation needs frames, a framerate and a bitrate".to_string(),
        ));
    }
    let mut playback_clock = buffer_size;
    let mut buffer_clock = 0.0;
    let mut delay = 0.0;
    for size in frame_sizes {
        buffer_clock += size / bitrate;
        playback_clock += 1.0 / framerate;
        if buffer_clock > playback_clock {
            delay += buffer_clock - playback_clock;
            playback_clock = buffer_clock;
        }
    }
    Ok(delay / (frame_sizes.len() as f64 / framerate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_psnr_score_without_overshoot() {
        let result = EncodingResult::new(100, 10.0);
        assert_eq!(score_psnr_bitrate(100, &result), Some(10.0));
        assert_eq!(score_psnr_bitrate(200, &result), Some(10.0));
    }

    #[test]
    fn test_psnr_score_overshoot_penalty() {
        let result = EncodingResult::new(100, 10.0);
        let score = score_psnr_bitrate(99, &result).unwrap();
        assert!((score - 9.9).abs() < 1e-9);
        let score = score_psnr_bitrate(1, &result).unwrap();
        assert!((score - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_psnr_score_floors_instead_of_diving() {
        // 900 kbps over target would score -80 without the floor.
        let result = EncodingResult::new(1000, 10.0);
        assert_eq!(score_psnr_bitrate(100, &result), Some(MIN_PSNR_SCORE));
    }

    #[test]
    fn test_cpu_score_requires_timing_fields() {
        let result = EncodingResult::new(100, 10.0);
        assert_eq!(score_cpu_psnr(100, &result), None);
    }

    #[test]
    fn test_cpu_score_penalizes_slow_encodes() {
        let mut result = EncodingResult::new(100, 10.0);
        result
            .extra
            .insert("encode_cputime".to_string(), serde_json::json!(2.0));
        result
            .extra
            .insert("cliptime".to_string(), serde_json::json!(1.0));
        // One clip-length over budget costs 100.
        assert_eq!(score_cpu_psnr(100, &result), Some(10.0 - 100.0));

        result
            .extra
            .insert("encode_cputime".to_string(), serde_json::json!(0.5));
        assert_eq!(score_cpu_psnr(100, &result), Some(10.0));
    }

    #[test]
    fn test_cpu_score_unknown_target() {
        let result = EncodingResult::new(100, 10.0);
        assert_eq!(score_cpu_psnr(0, &result), Some(-1.0));
    }

    #[test]
    fn test_pick_scorer() {
        assert!(pick_scorer("psnr").is_some());
        assert!(pick_scorer("rt").is_some());
        assert!(pick_scorer("vmaf").is_none());
    }

    #[test]
    fn test_delay_calculation_on_time() {
        // 30 fps, every frame small enough to arrive in time.
        let frames = vec![1000.0; 30];
        let delay = delay_calculation(&frames, 30.0, 100_000.0, 0.0).unwrap();
        assert_eq!(delay, 0.0);
    }

    #[test]
    fn test_delay_calculation_late_frames() {
        // One oversized frame stalls playback.
        let mut frames = vec![1000.0; 30];
        frames[0] = 200_000.0;
        let delay = delay_calculation(&frames, 30.0, 100_000.0, 0.0).unwrap();
        assert!(delay > 0.0);
    }

    #[test]
    fn test_delay_calculation_preconditions() {
        assert!(delay_calculation(&[], 30.0, 100.0, 0.0).is_err());
        assert!(delay_calculation(&[1.0], 0.0, 100.0, 0.0).is_err());
    }
}
