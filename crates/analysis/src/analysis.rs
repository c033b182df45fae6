use dipfig_shared::config::AnalysisConfig;
use dipfig_shared::result::PeakSet;

use crate::stats::spline::{null_deviance, pseudo_r2};
use crate::stats::{
    bootstrap_optimum, find_optimum, group_by_x, linspace, lowess, permutation_test, snr,
    BootstrapCi, PSpline, PermutationResult, ResampleOptions, SplineParams, StatsError,
};

/// Fitted curve and pointwise band on an even grid over the data range.
#[derive(Debug, Clone)]
pub struct FitCurve {
    pub grid: Vec<f64>,
    pub fit: Vec<f64>,
    pub band: Vec<(f64, f64)>,
}

/// Everything the peak-versus-yield figure and report need.
#[derive(Debug, Clone)]
pub struct PeakAnalysis {
    /// Relative yield of each run.
    pub x: Vec<f64>,
    /// Peak value of each run.
    pub y: Vec<f64>,
    pub curve: FitCurve,
    pub lowess: Vec<(f64, f64)>,
    pub edf: f64,
    pub deviance: f64,
    pub pseudo_r2: f64,
    pub snr: f64,
    pub optimum: f64,
    pub n_groups: usize,
    pub bootstrap: Option<BootstrapCi>,
    pub permutation: Option<PermutationResult>,
}

impl PeakAnalysis {
    /// Analyses a peak table. Resampling runs when the configured sample
    /// counts are non-zero.
    pub fn from_peaks(
        peaks: &PeakSet,
        config: &AnalysisConfig,
        n_workers: Option<usize>,
    ) -> Result<Self, StatsError> {
        let x: Vec<f64> = peaks
            .records
            .iter()
            .map(|r| config.relative_yield(r.burst_size))
            .collect();
        let y: Vec<f64> = peaks.records.iter().map(|r| r.peak).collect();
        Self::from_points(x, y, config, n_workers)
    }

    pub fn from_points(
        x: Vec<f64>,
        y: Vec<f64>,
        config: &AnalysisConfig,
        n_workers: Option<usize>,
    ) -> Result<Self, StatsError> {
        let params = SplineParams {
            n_basis: config.spline_basis,
            lam: config.spline_lambda,
        };
        let model = PSpline::fit(&x, &y, params)?;
        let r2 = pseudo_r2(model.deviance(), null_deviance(&y))?;

        let groups = group_by_x(&x, &y);
        let group_values: Vec<&[f64]> = groups.iter().map(|(_, g)| g.as_slice()).collect();
        let snr = snr(&group_values);

        let optimum = find_optimum(|v| model.predict(v), &x, config.grid_points)
            .ok_or(StatsError::DegenerateRange)?;
        let (lo, hi) = model.range();
        let grid = linspace(lo, hi, config.grid_points);
        let curve = FitCurve {
            fit: model.predict_many(&grid),
            band: model.confidence_band(&grid, config.ci_level),
            grid,
        };
        let smooth = lowess(&x, &y, config.lowess_frac, config.lowess_iters);
        tracing::info!(
            runs = x.len(),
            groups = groups.len(),
            edf = model.edf(),
            r2,
            snr,
            optimum,
            "fitted peak curve"
        );

        let opts = |samples: usize| ResampleOptions {
            samples,
            seed: config.seed,
            n_workers,
            params,
            grid_points: config.grid_points,
        };
        let bootstrap = if config.bootstrap_samples > 0 {
            let ci = bootstrap_optimum(&x, &y, config.ci_level, opts(config.bootstrap_samples))?;
            if ci.is_none() {
                tracing::warn!("no bootstrap resample could be refitted");
            }
            ci
        } else {
            None
        };
        let permutation = if config.permutation_samples > 0 {
            Some(permutation_test(&x, &y, opts(config.permutation_samples))?)
        } else {
            None
        };

        Ok(Self {
            n_groups: groups.len(),
            x,
            y,
            curve,
            lowess: smooth,
            edf: model.edf(),
            deviance: model.deviance(),
            pseudo_r2: r2,
            snr,
            optimum,
            bootstrap,
            permutation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dipfig_shared::result::PeakRecord;

    fn peaks() -> PeakSet {
        let mut records = Vec::new();
        for k in 1..=16u32 {
            let burst = k * 100;
            let ratio = burst as f64 / 50.0;
            for rep in 1..=5u32 {
                records.push(PeakRecord {
                    burst_size: burst,
                    replicate_id: rep,
                    seed: rep as i64,
                    peak: 0.2 - (ratio - 14.0).powi(2) / 2000.0 + rep as f64 * 1e-3,
                    t_peak: 40.0,
                    scenario: "baseline".into(),
                });
            }
        }
        PeakSet::from_records(records)
    }

    #[test]
    fn test_analysis_without_resampling() {
        let config = AnalysisConfig {
            bootstrap_samples: 0,
            permutation_samples: 0,
            ..AnalysisConfig::default()
        };
        let analysis = PeakAnalysis::from_peaks(&peaks(), &config, Some(1)).unwrap();
        assert_eq!(analysis.x.len(), 80);
        assert_eq!(analysis.n_groups, 16);
        assert!((analysis.optimum - 14.0).abs() < 0.5, "optimum {}", analysis.optimum);
        assert!(analysis.pseudo_r2 > 0.9);
        assert!(analysis.snr > 1.0);
        assert_eq!(analysis.curve.grid.len(), config.grid_points);
        assert_eq!(analysis.lowess.len(), 80);
        assert!(analysis.bootstrap.is_none() && analysis.permutation.is_none());
    }

    #[test]
    fn test_analysis_with_resampling() {
        let config = AnalysisConfig {
            bootstrap_samples: 20,
            permutation_samples: 20,
            seed: 7,
            ..AnalysisConfig::default()
        };
        let analysis = PeakAnalysis::from_peaks(&peaks(), &config, Some(2)).unwrap();
        let ci = analysis.bootstrap.unwrap();
        assert!(ci.lo <= analysis.optimum + 1.0 && analysis.optimum - 1.0 <= ci.hi);
        let perm = analysis.permutation.unwrap();
        assert_eq!(perm.samples, 20);
        assert!(perm.p_r2 <= 0.1);
    }

    #[test]
    fn test_constant_peaks_rejected() {
        let mut set = peaks();
        for r in &mut set.records {
            r.peak = 1.0;
        }
        let config = AnalysisConfig {
            bootstrap_samples: 0,
            permutation_samples: 0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            PeakAnalysis::from_peaks(&set, &config, None),
            Err(StatsError::ConstantResponse)
        ));
    }
}
