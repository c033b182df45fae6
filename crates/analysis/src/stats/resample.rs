use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use rayon::prelude::*;

use super::spline::{null_deviance, pseudo_r2, PSpline, SplineParams};
use super::{find_optimum, group_by_x, group_indices, quantile, snr, StatsError};

/// Settings shared by the bootstrap and permutation loops.
#[derive(Debug, Clone, Copy)]
pub struct ResampleOptions {
    pub samples: usize,
    pub seed: u64,
    pub n_workers: Option<usize>,
    pub params: SplineParams,
    pub grid_points: usize,
}

#[derive(Debug, Clone)]
pub struct BootstrapCi {
    pub lo: f64,
    pub hi: f64,
    /// Optimum of every resample whose refit succeeded, in resample order.
    pub optima: Vec<f64>,
    pub requested: usize,
}

#[derive(Debug, Clone)]
pub struct PermutationResult {
    pub observed_r2: f64,
    pub observed_snr: f64,
    pub p_r2: f64,
    pub p_snr: f64,
    pub samples: usize,
}

fn build_pool(n_workers: Option<usize>) -> Result<rayon::ThreadPool, StatsError> {
    Ok(rayon::ThreadPoolBuilder::new()
        .num_threads(n_workers.unwrap_or_else(|| rayon::current_num_threads().min(8)))
        .build()?)
}

#[inline]
fn resample_rng(seed: u64, i: usize) -> Pcg64 {
    Pcg64::seed_from_u64(seed.wrapping_add(i as u64))
}

/// Percentile interval for the location of the fitted maximum, resampling
/// with replacement inside each group of equal `x`.
///
/// Returns `Ok(None)` when no resample could be refitted.
pub fn bootstrap_optimum(
    x: &[f64],
    y: &[f64],
    level: f64,
    opts: ResampleOptions,
) -> Result<Option<BootstrapCi>, StatsError> {
    let groups = group_indices(x);
    let pool = build_pool(opts.n_workers)?;

    let optima: Vec<Option<f64>> = pool.install(|| {
        (0..opts.samples)
            .into_par_iter()
            .map(|i| {
                let mut rng = resample_rng(opts.seed, i);
                let mut bx = Vec::with_capacity(x.len());
                let mut by = Vec::with_capacity(y.len());
                for g in &groups {
                    for _ in 0..g.len() {
                        let pick = g[rng.gen_range(0..g.len())];
                        bx.push(x[pick]);
                        by.push(y[pick]);
                    }
                }
                let fit = PSpline::fit(&bx, &by, opts.params).ok()?;
                find_optimum(|v| fit.predict(v), &bx, opts.grid_points)
            })
            .collect()
    });

    let optima: Vec<f64> = optima.into_iter().flatten().collect();
    let failed = opts.samples - optima.len();
    if failed > 0 {
        tracing::debug!(failed, "bootstrap resamples could not be refitted");
    }
    if optima.is_empty() {
        return Ok(None);
    }
    let alpha = (1.0 - level) / 2.0;
    Ok(Some(BootstrapCi {
        lo: quantile(&optima, alpha),
        hi: quantile(&optima, 1.0 - alpha),
        optima,
        requested: opts.samples,
    }))
}

/// Shuffles the `x` labels against `y` and compares the pseudo R² of the
/// refit and the SNR of the regrouped responses with the observed values.
pub fn permutation_test(
    x: &[f64],
    y: &[f64],
    opts: ResampleOptions,
) -> Result<PermutationResult, StatsError> {
    let null_dev = null_deviance(y);
    let observed = PSpline::fit(x, y, opts.params)?;
    let observed_r2 = pseudo_r2(observed.deviance(), null_dev)?;
    let observed_snr = snr_of(x, y);

    let pool = build_pool(opts.n_workers)?;
    let stats: Vec<(Option<f64>, f64)> = pool.install(|| {
        (0..opts.samples)
            .into_par_iter()
            .map(|i| {
                let mut rng = resample_rng(opts.seed, i);
                let mut px = x.to_vec();
                px.shuffle(&mut rng);
                let r2 = PSpline::fit(&px, y, opts.params)
                    .ok()
                    .map(|fit| 1.0 - fit.deviance() / null_dev);
                (r2, snr_of(&px, y))
            })
            .collect()
    });

    let r2s: Vec<f64> = stats.iter().filter_map(|s| s.0).collect();
    let p_r2 = exceedance(&r2s, observed_r2);
    let snrs: Vec<f64> = stats.iter().map(|s| s.1).filter(|v| !v.is_nan()).collect();
    let p_snr = exceedance(&snrs, observed_snr);

    Ok(PermutationResult {
        observed_r2,
        observed_snr,
        p_r2,
        p_snr,
        samples: opts.samples,
    })
}

fn snr_of(x: &[f64], y: &[f64]) -> f64 {
    let groups: Vec<Vec<f64>> = group_by_x(x, y).into_iter().map(|(_, g)| g).collect();
    snr(&groups)
}

/// Fraction of `values` at or above `observed`.
fn exceedance(values: &[f64], observed: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().filter(|&&v| v >= observed).count() as f64 / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hump() -> (Vec<f64>, Vec<f64>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for k in 1..=16 {
            let xv = k as f64 * 2.0;
            for r in 0..6 {
                x.push(xv);
                y.push(1.0 - (xv - 14.0).powi(2) / 400.0 + (r as f64 - 2.5) * 0.01);
            }
        }
        (x, y)
    }

    fn opts(samples: usize, n_workers: usize) -> ResampleOptions {
        ResampleOptions {
            samples,
            seed: 42,
            n_workers: Some(n_workers),
            params: SplineParams::default(),
            grid_points: 200,
        }
    }

    #[test]
    fn test_bootstrap_same_seed_any_worker_count() {
        let (x, y) = hump();
        let a = bootstrap_optimum(&x, &y, 0.95, opts(40, 1)).unwrap().unwrap();
        let b = bootstrap_optimum(&x, &y, 0.95, opts(40, 4)).unwrap().unwrap();
        assert_eq!(a.optima, b.optima);
        assert_eq!(a.lo, b.lo);
        assert_eq!(a.hi, b.hi);
    }

    #[test]
    fn test_bootstrap_interval_brackets_optimum() {
        let (x, y) = hump();
        let ci = bootstrap_optimum(&x, &y, 0.95, opts(60, 2)).unwrap().unwrap();
        assert_eq!(ci.requested, 60);
        assert!(ci.lo <= ci.hi);
        assert!(ci.lo > 10.0 && ci.hi < 18.0, "ci [{}, {}]", ci.lo, ci.hi);
    }

    #[test]
    fn test_permutation_detects_signal() {
        let (x, y) = hump();
        let res = permutation_test(&x, &y, opts(50, 2)).unwrap();
        assert!(res.observed_r2 > 0.9);
        assert!(res.p_r2 < 0.05);
        assert!(res.p_snr < 0.05);
    }

    #[test]
    fn test_permutation_deterministic() {
        let (x, y) = hump();
        let a = permutation_test(&x, &y, opts(30, 1)).unwrap();
        let b = permutation_test(&x, &y, opts(30, 3)).unwrap();
        assert_eq!(a.p_r2, b.p_r2);
        assert_eq!(a.p_snr, b.p_snr);
    }

    #[test]
    fn test_exceedance_counts_ties() {
        assert_eq!(exceedance(&[1.0, 2.0, 3.0, 4.0], 3.0), 0.5);
        assert!(exceedance(&[], 1.0).is_nan());
    }
}
