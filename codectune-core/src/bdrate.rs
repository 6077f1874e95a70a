//! Bjøntegaard-delta rate between two rate-distortion curves.
//!
//! Fits quality against log(bitrate) with a cubic polynomial for each point
//! set, integrates both fits over the overlapping quality range, and turns
//! the average log-rate difference into a percentage bitrate saving. This is
//! the standard way to rank two configurations (or codecs) at equal quality.

use crate::error::{CoreError, CoreResult};

/// A cubic fit needs at least this many points to be stable.
const MIN_POINTS: usize = 4;

/// Ill-conditioned fits can produce absurd exponents; clamp them.
const MAX_LOG_DIFFERENCE: f64 = 200.0;

/// The outcome of a BD-rate comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct BdRateReport {
    /// Average bitrate difference of the candidate against the baseline, in
    /// percent, at equal quality. Positive means the candidate spends more
    /// bits.
    pub difference: f64,
    /// The quality interval the comparison integrated over.
    pub quality_range: (f64, f64),
}

/// Computes the BD-rate of `candidate` against `baseline`.
///
/// Each point is `(bitrate, quality)`; both sets must describe the same
/// content. Fewer than four points per set, or point sets whose quality
/// ranges do not overlap, are precondition violations.
pub fn bd_rate(baseline: &[(f64, f64)], candidate: &[(f64, f64)]) -> CoreResult<BdRateReport> {
    if baseline.len() < MIN_POINTS || candidate.len() < MIN_POINTS {
        return Err(CoreError::Precondition(format!(
            "BD-rate needs at least {MIN_POINTS} points per set"
        )));
    }

    let fit1 = log_rate_fit(baseline)?;
    let fit2 = log_rate_fit(candidate)?;

    let quality = |set: &[(f64, f64)]| -> (f64, f64) {
        let min = set.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let max = set.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
        (min, max)
    };
    let (min1, max1) = quality(baseline);
    let (min2, max2) = quality(candidate);
    let min_int = min1.max(min2);
    let max_int = max1.min(max2);
    if max_int <= min_int {
        return Err(CoreError::Precondition(
            "BD-rate quality ranges do not overlap".to_string(),
        ));
    }

    let int1 = integrate(&fit1, min_int, max_int);
    let int2 = integrate(&fit2, min_int, max_int);
    let mut avg_log_diff = (int2 - int1) / (max_int - min_int);
    if avg_log_diff > MAX_LOG_DIFFERENCE {
        avg_log_diff = MAX_LOG_DIFFERENCE;
    }

    Ok(BdRateReport {
        difference: (avg_log_diff.exp() - 1.0) * 100.0,
        quality_range: (min_int, max_int),
    })
}

/// Least-squares cubic fit of quality -> ln(bitrate).
/// Coefficients are in ascending powers.
fn log_rate_fit(points: &[(f64, f64)]) -> CoreResult<[f64; 4]> {
    let xs: Vec<f64> = points.iter().map(|p| p.1).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.0.ln()).collect();
    polyfit3(&xs, &ys)
}

/// Degree-3 polynomial least squares via the normal equations.
fn polyfit3(xs: &[f64], ys: &[f64]) -> CoreResult<[f64; 4]> {
    // power_sums[k] = sum of x^k, k = 0..=6
    let mut power_sums = [0.0f64; 7];
    let mut moments = [0.0f64; 4];
    for (&x, &y) in xs.iter().zip(ys) {
        let mut x_power = 1.0;
        for (k, sum) in power_sums.iter_mut().enumerate() {
            *sum += x_power;
            if k < moments.len() {
                moments[k] += y * x_power;
            }
            x_power *= x;
        }
    }

    // Augmented 4x5 system: rows are the normal equations.
    let mut m = [[0.0f64; 5]; 4];
    for (row, m_row) in m.iter_mut().enumerate() {
        for col in 0..4 {
            m_row[col] = power_sums[row + col];
        }
        m_row[4] = moments[row];
    }
    solve4(&mut m)
}

/// Gaussian elimination with partial pivoting on a 4x5 augmented matrix.
fn solve4(m: &mut [[f64; 5]; 4]) -> CoreResult<[f64; 4]> {
    for pivot in 0..4 {
        let max_row = (pivot..4)
            .max_by(|&a, &b| {
                m[a][pivot]
                    .abs()
                    .partial_cmp(&m[b][pivot].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(pivot);
        m.swap(pivot, max_row);
        if m[pivot][pivot].abs() < 1e-12 {
            return Err(CoreError::Precondition(
                "degenerate point set for curve fit".to_string(),
            ));
        }
        for row in pivot + 1..4 {
            let factor = m[row][pivot] / m[pivot][pivot];
            for col in pivot..5 {
                m[row][col] -= factor * m[pivot][col];
            }
        }
    }
    let mut coefficients = [0.0f64; 4];
    for row in (0..4).rev() {
        let mut value = m[row][4];
        for col in row + 1..4 {
            value -= m[row][col] * coefficients[col];
        }
        coefficients[row] = value / m[row][row];
    }
    Ok(coefficients)
}

/// Definite integral of a cubic given by ascending-power coefficients.
fn integrate(coefficients: &[f64; 4], from: f64, to: f64) -> f64 {
    let antiderivative = |x: f64| {
        coefficients
            .iter()
            .enumerate()
            .map(|(k, c)| c * x.powi(k as i32 + 1) / (k as f64 + 1.0))
            .sum::<f64>()
    };
    antiderivative(to) - antiderivative(from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline_points() -> Vec<(f64, f64)> {
        vec![
            (100.0, 30.0),
            (200.0, 35.0),
            (400.0, 40.0),
            (800.0, 45.0),
            (1600.0, 50.0),
        ]
    }

    #[test]
    fn test_self_comparison_is_zero() {
        let points = baseline_points();
        let report = bd_rate(&points, &points).unwrap();
        assert!(report.difference.abs() < 1e-9);
        assert_eq!(report.quality_range, (30.0, 50.0));
    }

    #[test]
    fn test_double_bitrate_at_equal_quality() {
        let baseline = baseline_points();
        let doubled: Vec<(f64, f64)> = baseline.iter().map(|p| (p.0 * 2.0, p.1)).collect();
        // The candidate spends twice the bits for the same quality.
        let report = bd_rate(&baseline, &doubled).unwrap();
        assert!((report.difference - 100.0).abs() < 0.5);
        // Swapping baseline and candidate flips the sign.
        let swapped = bd_rate(&doubled, &baseline).unwrap();
        assert!(swapped.difference < 0.0);
        assert!((swapped.difference + 50.0).abs() < 0.5);
    }

    #[test]
    fn test_too_few_points() {
        let three = vec![(100.0, 30.0), (200.0, 35.0), (400.0, 40.0)];
        assert!(matches!(
            bd_rate(&three, &baseline_points()),
            Err(CoreError::Precondition(_))
        ));
        assert!(matches!(
            bd_rate(&baseline_points(), &three),
            Err(CoreError::Precondition(_))
        ));
    }

    #[test]
    fn test_disjoint_quality_ranges() {
        let low = baseline_points();
        let high: Vec<(f64, f64)> = low.iter().map(|p| (p.0, p.1 + 100.0)).collect();
        assert!(matches!(
            bd_rate(&low, &high),
            Err(CoreError::Precondition(_))
        ));
    }

    #[test]
    fn test_extreme_difference_is_clamped() {
        let baseline = baseline_points();
        let absurd: Vec<(f64, f64)> = baseline
            .iter()
            .map(|p| (p.0 * (300.0f64).exp(), p.1))
            .collect();
        let report = bd_rate(&baseline, &absurd).unwrap();
        assert!(report.difference.is_finite());
        let expected = ((200.0f64).exp() - 1.0) * 100.0;
        assert!((report.difference - expected).abs() / expected < 1e-9);
    }

    #[test]
    fn test_polyfit_recovers_exact_cubic() {
        let xs: Vec<f64> = (0..6).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 - x + 0.5 * x * x * x).collect();
        let fit = polyfit3(&xs, &ys).unwrap();
        assert!((fit[0] - 2.0).abs() < 1e-6);
        assert!((fit[1] + 1.0).abs() < 1e-6);
        assert!(fit[2].abs() < 1e-6);
        assert!((fit[3] - 0.5).abs() < 1e-6);
    }
}
