//! Sequential Bayesian fusion of independent evidence signals.
//!
//! Odds-form update folded over the likelihoods in the order given; the
//! result is order-sensitive when the signals disagree. This is a heuristic
//! evidence combiner, not a calibrated probabilistic model.

/// Fold `likelihoods` into `prior`, returning the posterior rounded to
/// 4 decimals.
///
/// Each likelihood is clamped to [0, 1] first. A zero denominator (both
/// hypotheses with zero support) carries no information and leaves the
/// current belief unchanged.
pub fn bayesian_fusion(prior: f64, likelihoods: &[f64]) -> f64 {
    let mut p = prior;
    for l in likelihoods {
        if !l.is_finite() {
            continue;
        }
        let l = l.clamp(0.0, 1.0);
        let numerator = p * l;
        let denominator = numerator + (1.0 - p) * (1.0 - l);
        if denominator != 0.0 {
            p = numerator / denominator;
        }
    }
    round4(p)
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}
