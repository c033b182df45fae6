//! Penalized cubic B-spline regression (P-spline) of a response on one input.
//!
//! Basis functions sit on an equally spaced knot grid over the data range; a
//! second-order difference penalty on adjacent coefficients controls
//! smoothness. Coefficients solve `(B'B + lam D'D) a = B'y`.

use dipfig_shared::config::{SPLINE_BASIS, SPLINE_LAMBDA};
use nalgebra::{DMatrix, DVector};
use statrs::statistics::Statistics;

use super::{normal_quantile, StatsError};

const DEGREE: usize = 3;
// Keeps the system positive definite when a basis function has no support.
const RIDGE: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
pub struct SplineParams {
    pub n_basis: usize,
    pub lam: f64,
}

impl Default for SplineParams {
    fn default() -> Self {
        Self {
            n_basis: SPLINE_BASIS,
            lam: SPLINE_LAMBDA,
        }
    }
}

/// Equally spaced cubic B-spline basis over `[x_min, x_max]`.
#[derive(Debug, Clone, Copy)]
struct Basis {
    x_min: f64,
    x_max: f64,
    spacing: f64,
    n: usize,
}

impl Basis {
    /// Non-zero basis values at `x` as `(index, value)`; at most four.
    fn row(&self, x: f64) -> Vec<(usize, f64)> {
        let x = x.clamp(self.x_min, self.x_max);
        // Basis j starts at knot x_min + (j - 3) * spacing.
        let pos = (x - self.x_min) / self.spacing;
        let last = (pos.floor() as usize + DEGREE).min(self.n - 1);
        let first = last.saturating_sub(DEGREE);
        (first..=last)
            .filter_map(|j| {
                let u = pos - j as f64 + DEGREE as f64;
                let b = cubic_bspline(u);
                (b > 0.0).then_some((j, b))
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct PSpline {
    basis: Basis,
    coef: DVector<f64>,
    /// `(B'B + P)^-1`, the posterior covariance up to `sigma^2`.
    cov: DMatrix<f64>,
    deviance: f64,
    edf: f64,
    n_obs: usize,
}

/// Uniform cubic B-spline evaluated at `u` knot spacings past its first knot.
#[inline]
fn cubic_bspline(u: f64) -> f64 {
    if !(0.0..4.0).contains(&u) {
        0.0
    } else if u < 1.0 {
        u * u * u / 6.0
    } else if u < 2.0 {
        (-3.0 * u * u * u + 12.0 * u * u - 12.0 * u + 4.0) / 6.0
    } else if u < 3.0 {
        (3.0 * u * u * u - 24.0 * u * u + 60.0 * u - 44.0) / 6.0
    } else {
        let v = 4.0 - u;
        v * v * v / 6.0
    }
}

impl PSpline {
    pub fn fit(x: &[f64], y: &[f64], params: SplineParams) -> Result<Self, StatsError> {
        let n_obs = x.len().min(y.len());
        let n_basis = params.n_basis.max(DEGREE + 1);
        if n_obs < 2 {
            return Err(StatsError::TooFewPoints {
                needed: 2,
                got: n_obs,
            });
        }
        let x_min = x.iter().copied().fold(f64::INFINITY, f64::min);
        let x_max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !(x_max > x_min) {
            return Err(StatsError::DegenerateRange);
        }
        let basis = Basis {
            x_min,
            x_max,
            spacing: (x_max - x_min) / (n_basis - DEGREE) as f64,
            n: n_basis,
        };

        let mut btb = DMatrix::<f64>::zeros(n_basis, n_basis);
        let mut bty = DVector::<f64>::zeros(n_basis);
        for (&xi, &yi) in x.iter().zip(y) {
            let row = basis.row(xi);
            for &(j, bj) in &row {
                bty[j] += bj * yi;
                for &(k, bk) in &row {
                    btb[(j, k)] += bj * bk;
                }
            }
        }

        let system = &btb
            + difference_penalty(n_basis, params.lam)
            + DMatrix::<f64>::identity(n_basis, n_basis) * RIDGE;
        let chol = system.cholesky().ok_or(StatsError::Singular)?;
        let coef = chol.solve(&bty);
        if coef.iter().any(|c| !c.is_finite()) {
            return Err(StatsError::Singular);
        }
        let cov = chol.inverse();
        let edf = (&cov * &btb).trace();
        let mut model = Self {
            basis,
            coef,
            cov,
            deviance: 0.0,
            edf,
            n_obs,
        };
        model.deviance = x
            .iter()
            .zip(y)
            .map(|(&xi, &yi)| {
                let r = yi - model.predict(xi);
                r * r
            })
            .sum();
        Ok(model)
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.basis.row(x).iter().map(|&(j, b)| self.coef[j] * b).sum()
    }

    pub fn predict_many(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.predict(x)).collect()
    }

    /// Residual sum of squares (Gaussian deviance).
    pub fn deviance(&self) -> f64 {
        self.deviance
    }

    /// Effective degrees of freedom, `trace((B'B + P)^-1 B'B)`.
    pub fn edf(&self) -> f64 {
        self.edf
    }

    pub fn range(&self) -> (f64, f64) {
        (self.basis.x_min, self.basis.x_max)
    }

    pub fn residual_variance(&self) -> f64 {
        let dof = (self.n_obs as f64 - self.edf).max(1.0);
        self.deviance / dof
    }

    /// Pointwise `(lower, upper)` band at `level` from the posterior covariance
    /// `sigma^2 (B'B + P)^-1`.
    pub fn confidence_band(&self, xs: &[f64], level: f64) -> Vec<(f64, f64)> {
        let z = normal_quantile(0.5 + level / 2.0);
        let sigma2 = self.residual_variance();
        xs.iter()
            .map(|&x| {
                let row = self.basis.row(x);
                let quad: f64 = row
                    .iter()
                    .flat_map(|&(j, bj)| row.iter().map(move |&(k, bk)| (j, bj, k, bk)))
                    .map(|(j, bj, k, bk)| bj * bk * self.cov[(j, k)])
                    .sum();
                let var = quad * sigma2;
                let f = self.predict(x);
                let half = z * var.max(0.0).sqrt();
                (f - half, f + half)
            })
            .collect()
    }
}

/// `lam * D'D` for the second-order difference operator `D`.
fn difference_penalty(n: usize, lam: f64) -> DMatrix<f64> {
    const STENCIL: [f64; 3] = [1.0, -2.0, 1.0];
    let mut p = DMatrix::<f64>::zeros(n, n);
    for r in 0..n.saturating_sub(2) {
        for (a, &da) in STENCIL.iter().enumerate() {
            for (b, &db) in STENCIL.iter().enumerate() {
                p[(r + a, r + b)] += lam * da * db;
            }
        }
    }
    p
}

/// Total sum of squares around the mean, the deviance of an intercept-only fit.
pub fn null_deviance(y: &[f64]) -> f64 {
    let m = y.mean();
    y.iter().map(|v| (v - m) * (v - m)).sum()
}

/// `1 - deviance / null_deviance`.
pub fn pseudo_r2(deviance: f64, null_deviance: f64) -> Result<f64, StatsError> {
    if null_deviance <= 0.0 {
        return Err(StatsError::ConstantResponse);
    }
    Ok(1.0 - deviance / null_deviance)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadratic(n: usize) -> (Vec<f64>, Vec<f64>) {
        let x: Vec<f64> = (0..n).map(|i| i as f64 / (n - 1) as f64 * 30.0).collect();
        let y: Vec<f64> = x.iter().map(|&v| 1.0 - (v - 14.0).powi(2) / 400.0).collect();
        (x, y)
    }

    #[test]
    fn test_basis_partition_of_unity() {
        let (x, y) = quadratic(50);
        let fit = PSpline::fit(&x, &y, SplineParams::default()).unwrap();
        for &xi in &[0.0, 3.3, 15.0, 29.99, 30.0] {
            let total: f64 = fit.basis.row(xi).iter().map(|&(_, b)| b).sum();
            assert!((total - 1.0).abs() < 1e-12, "x={} total={}", xi, total);
        }
    }

    #[test]
    fn test_recovers_smooth_curve() {
        let (x, y) = quadratic(120);
        let fit = PSpline::fit(&x, &y, SplineParams::default()).unwrap();
        for (&xi, &yi) in x.iter().zip(&y) {
            assert!((fit.predict(xi) - yi).abs() < 0.02, "x={}", xi);
        }
        assert!(fit.deviance() < 0.01);
        assert!(fit.edf() > 2.0 && fit.edf() < SPLINE_BASIS as f64);
    }

    #[test]
    fn test_optimum_of_fit() {
        let (x, y) = quadratic(120);
        let fit = PSpline::fit(&x, &y, SplineParams::default()).unwrap();
        let best = super::super::find_optimum(|v| fit.predict(v), &x, 500).unwrap();
        assert!((best - 14.0).abs() < 0.2, "optimum {}", best);
    }

    #[test]
    fn test_large_penalty_flattens_to_line() {
        let x: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let y: Vec<f64> = x
            .iter()
            .map(|&v| 2.0 * v + if (v as i64) % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let fit = PSpline::fit(&x, &y, SplineParams { n_basis: 20, lam: 1e8 }).unwrap();
        // A second-order penalty leaves straight lines unpenalised.
        assert!((fit.predict(10.0) - 20.0).abs() < 0.2);
        assert!((fit.edf() - 2.0).abs() < 0.1);
    }

    #[test]
    fn test_unpenalised_edf_counts_basis() {
        let x: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|&v| (v / 7.0).sin()).collect();
        let fit = PSpline::fit(&x, &y, SplineParams { n_basis: 6, lam: 0.0 }).unwrap();
        assert!((fit.edf() - 6.0).abs() < 1e-4, "edf {}", fit.edf());
    }

    #[test]
    fn test_difference_penalty_annihilates_lines() {
        let p = difference_penalty(5, 2.0);
        let line = DVector::from_vec(vec![1.0, 3.0, 5.0, 7.0, 9.0]);
        assert!((&p * &line).norm() < 1e-12);
        assert_eq!(p[(0, 0)], 2.0);
        assert_eq!(p[(2, 2)], 2.0 * 6.0);
    }

    #[test]
    fn test_band_contains_fit() {
        let x: Vec<f64> = (0..60).map(|i| (i % 6) as f64).collect();
        let y: Vec<f64> = x.iter().enumerate().map(|(i, &v)| v + (i % 3) as f64 * 0.1).collect();
        let fit = PSpline::fit(&x, &y, SplineParams::default()).unwrap();
        let grid = [0.0, 2.5, 5.0];
        for ((lo, hi), &g) in fit.confidence_band(&grid, 0.95).into_iter().zip(&grid) {
            let f = fit.predict(g);
            assert!(lo <= f && f <= hi);
            assert!(hi - lo > 0.0);
        }
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(matches!(
            PSpline::fit(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0], SplineParams::default()),
            Err(StatsError::DegenerateRange)
        ));
        assert!(matches!(
            PSpline::fit(&[1.0], &[1.0], SplineParams::default()),
            Err(StatsError::TooFewPoints { .. })
        ));
        assert!(matches!(pseudo_r2(1.0, 0.0), Err(StatsError::ConstantResponse)));
    }
}
