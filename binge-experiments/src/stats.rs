//! Confidence estimation for experiment results
//!
//! Two modes are available. `Simplified` reproduces the original product
//! heuristic: a single-sample standard-error penalty that never compares
//! variants against each other. `TwoProportion` is a pooled two-proportion
//! z-test of a variant against the aggregate of all other variants, for
//! callers that want an actual hypothesis test.

use serde::{Deserialize, Serialize};

/// How variant confidence is computed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceMode {
    /// Legacy heuristic: confidence = clamp(1 - 2*sqrt(p(1-p)/n), 0.5, 0.99).
    ///
    /// Only penalizes small samples and mid-range rates; it is not a
    /// hypothesis test and ignores the other variants entirely.
    #[default]
    Simplified,
    /// Pooled two-proportion z-test of the variant against all other
    /// variants combined; confidence = 1 - two-sided p-value.
    TwoProportion,
}

impl ConfidenceMode {
    /// Confidence for one variant. `rest` aggregates the views and
    /// conversions of every other variant and is ignored in Simplified
    /// mode.
    pub fn confidence(&self, conversions: u64, views: u64, rest: (u64, u64)) -> f64 {
        match self {
            ConfidenceMode::Simplified => simplified_confidence(conversions, views),
            ConfidenceMode::TwoProportion => {
                let (rest_conversions, rest_views) = rest;
                two_proportion_confidence(conversions, views, rest_conversions, rest_views)
            }
        }
    }
}

/// Legacy single-sample heuristic.
///
/// Zero views yields the 0.5 floor rather than a division error.
pub fn simplified_confidence(conversions: u64, views: u64) -> f64 {
    if views == 0 {
        return 0.5;
    }

    let n = views as f64;
    let p = conversions as f64 / n;
    let standard_error = (p * (1.0 - p) / n).sqrt();

    (1.0 - 2.0 * standard_error).clamp(0.5, 0.99)
}

/// Pooled two-proportion z-test, two-sided.
///
/// Returns 1 - p_value; 0.5 when either side has no samples or the pooled
/// rate is degenerate (all or none converted everywhere).
pub fn two_proportion_confidence(
    conversions_a: u64,
    views_a: u64,
    conversions_b: u64,
    views_b: u64,
) -> f64 {
    if views_a == 0 || views_b == 0 {
        return 0.5;
    }

    let n_a = views_a as f64;
    let n_b = views_b as f64;
    let p_a = conversions_a as f64 / n_a;
    let p_b = conversions_b as f64 / n_b;
    let pooled = (conversions_a + conversions_b) as f64 / (n_a + n_b);

    let standard_error = (pooled * (1.0 - pooled) * (1.0 / n_a + 1.0 / n_b)).sqrt();
    if standard_error == 0.0 {
        return 0.5;
    }

    let z = (p_a - p_b) / standard_error;
    let p_value = 2.0 * (1.0 - normal_cdf(z.abs()));

    (1.0 - p_value).clamp(0.0, 1.0)
}

/// Standard normal CDF via the error function.
fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Abramowitz and Stegun error-function approximation (max error 1.5e-7).
fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simplified_zero_views_is_floor() {
        assert_eq!(simplified_confidence(0, 0), 0.5);
    }

    #[test]
    fn simplified_matches_formula() {
        // n=10, p=0.8: se = sqrt(0.8*0.2/10) ≈ 0.126491, 1-2se ≈ 0.747018
        let confidence = simplified_confidence(8, 10);
        assert!((confidence - 0.747018).abs() < 1e-5, "got {confidence}");
    }

    #[test]
    fn simplified_is_clamped() {
        // Degenerate rates have zero standard error; the cap applies
        assert_eq!(simplified_confidence(10, 10), 0.99);
        assert_eq!(simplified_confidence(0, 10), 0.99);

        // Worst case p=0.5 at tiny n bottoms out at the floor
        assert_eq!(simplified_confidence(1, 2), 0.5);
    }

    #[test]
    fn simplified_grows_with_sample_size() {
        let small = simplified_confidence(40, 100);
        let large = simplified_confidence(4000, 10_000);
        assert!(large > small);
        assert!(large >= 0.98);
    }

    #[test]
    fn two_proportion_zero_samples_is_neutral() {
        assert_eq!(two_proportion_confidence(0, 0, 5, 10), 0.5);
        assert_eq!(two_proportion_confidence(5, 10, 0, 0), 0.5);
    }

    #[test]
    fn two_proportion_degenerate_pool_is_neutral() {
        // Everyone converted on both sides: pooled rate 1.0, no signal
        assert_eq!(two_proportion_confidence(10, 10, 20, 20), 0.5);
    }

    #[test]
    fn two_proportion_equal_rates_have_low_confidence() {
        let confidence = two_proportion_confidence(50, 100, 50, 100);
        assert!(confidence < 0.1, "identical rates should not look significant, got {confidence}");
    }

    #[test]
    fn two_proportion_large_effect_is_confident() {
        // 40% vs 10% at n=200 per side is overwhelming
        let confidence = two_proportion_confidence(80, 200, 20, 200);
        assert!(confidence > 0.99, "got {confidence}");
    }

    #[test]
    fn two_proportion_is_symmetric() {
        let ab = two_proportion_confidence(30, 100, 10, 100);
        let ba = two_proportion_confidence(10, 100, 30, 100);
        assert!((ab - ba).abs() < 1e-12);
    }

    #[test]
    fn normal_cdf_reference_points() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((normal_cdf(1.959964) - 0.975).abs() < 1e-4);
        assert!((normal_cdf(-1.959964) - 0.025).abs() < 1e-4);
    }
}
