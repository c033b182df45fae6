use std::path::Path;

use dipfig_analysis::peak::max_group;
use dipfig_analysis::PeakAnalysis;
use dipfig_plot::DynamicsOptions;
use dipfig_shared::config::{default_burst_sizes, AnalysisConfig};

use super::dynamics::load_dynamics;
use super::grouping;
use crate::output;

pub fn run(
    root: &Path,
    tag: &str,
    bursts: Option<Vec<u32>>,
    virion_burst: f64,
    out: &Path,
) -> anyhow::Result<()> {
    let config = grouping(tag, Some(bursts.unwrap_or_else(default_burst_sizes)));
    let dynamics = load_dynamics(root, &config)?;
    let highlight = max_group(&dynamics);

    // Right panel: every member peak of the same runs, no resampling.
    let analysis_config = AnalysisConfig {
        virion_burst_size: virion_burst,
        bootstrap_samples: 0,
        permutation_samples: 0,
        ..AnalysisConfig::default()
    };
    let (x, y): (Vec<f64>, Vec<f64>) = dynamics
        .iter()
        .flat_map(|d| {
            let ratio = analysis_config.relative_yield(d.key);
            d.member_peaks.iter().map(move |&p| (ratio, p))
        })
        .unzip();
    if x.is_empty() {
        anyhow::bail!("no peak values could be extracted for the fit panel");
    }
    let analysis = PeakAnalysis::from_points(x, y, &analysis_config, None)?;

    let opts = DynamicsOptions {
        virion_burst_size: virion_burst,
        ..DynamicsOptions::default()
    };
    dipfig_plot::render_combined(out, &dynamics, highlight, &opts, &analysis)?;

    output::print_dynamics(&dynamics, highlight, virion_burst);
    println!("  Optimum yield: {:.1}", analysis.optimum);
    println!("  Saved {}", out.display());
    Ok(())
}
