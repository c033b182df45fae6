pub mod lowess;
pub mod resample;
pub mod spline;

pub use lowess::lowess;
pub use resample::{
    bootstrap_optimum, permutation_test, BootstrapCi, PermutationResult, ResampleOptions,
};
pub use spline::{PSpline, SplineParams};

use statrs::distribution::{ContinuousCDF, Normal};
use statrs::statistics::Statistics;

#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("need at least {needed} points, got {got}")]
    TooFewPoints { needed: usize, got: usize },
    #[error("input range is degenerate (all x equal)")]
    DegenerateRange,
    #[error("response is constant; deviance ratio undefined")]
    ConstantResponse,
    #[error("normal equations are singular")]
    Singular,
    #[error("thread pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Signal-to-noise ratio: variance of group means over the mean of the
/// within-group variances. Single-member groups do not enter the noise term.
pub fn snr<G: AsRef<[f64]>>(groups: &[G]) -> f64 {
    let means: Vec<f64> = groups
        .iter()
        .map(|g| g.as_ref().mean())
        .filter(|m| !m.is_nan())
        .collect();
    if means.len() < 2 {
        return f64::NAN;
    }
    let var_between = means.variance();

    // Sample variance is NaN for single-member groups.
    let within: Vec<f64> = groups
        .iter()
        .map(|g| g.as_ref().variance())
        .filter(|v| !v.is_nan())
        .collect();
    let mean_var_within = within.mean();

    if mean_var_within == 0.0 {
        return f64::INFINITY;
    }
    var_between / mean_var_within
}

/// Indices of `x` grouped by equal value, groups ordered by ascending `x`.
pub fn group_indices(x: &[f64]) -> Vec<Vec<usize>> {
    let mut order: Vec<usize> = (0..x.len()).collect();
    order.sort_by(|&a, &b| x[a].total_cmp(&x[b]));
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for i in order {
        match groups.last_mut() {
            Some(g) if x[g[0]] == x[i] => g.push(i),
            _ => groups.push(vec![i]),
        }
    }
    groups
}

/// `y` split by equal `x`, ascending in `x`.
pub fn group_by_x(x: &[f64], y: &[f64]) -> Vec<(f64, Vec<f64>)> {
    group_indices(x)
        .into_iter()
        .map(|g| (x[g[0]], g.iter().map(|&i| y[i]).collect()))
        .collect()
}

/// Quantile with linear interpolation between order statistics.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let t = pos - lo as f64;
        sorted[lo] * (1.0 - t) + sorted[hi] * t
    }
}

/// `n` evenly spaced points over `[lo, hi]`, both ends included.
pub fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![lo],
        _ => {
            let step = (hi - lo) / (n - 1) as f64;
            (0..n).map(|i| lo + step * i as f64).collect()
        }
    }
}

/// Inverse standard normal CDF; infinite at and beyond the ends of `(0, 1)`.
pub fn normal_quantile(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    Normal::new(0.0, 1.0).map_or(f64::NAN, |n| n.inverse_cdf(p))
}

/// Argmax of `f` over a grid spanning `[min x, max x]`; first maximum wins.
pub fn find_optimum<F: Fn(f64) -> f64>(f: F, xs: &[f64], grid_points: usize) -> Option<f64> {
    let lo = xs.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !lo.is_finite() || !hi.is_finite() {
        return None;
    }
    let mut best: Option<(f64, f64)> = None;
    for x in linspace(lo, hi, grid_points) {
        let y = f(x);
        if best.map_or(true, |(_, by)| y > by) {
            best = Some((x, y));
        }
    }
    best.map(|(x, _)| x)
}
