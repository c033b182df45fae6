use std::path::Path;

use dipfig_analysis::peak::read_peaks;
use dipfig_analysis::PeakAnalysis;
use dipfig_shared::config::AnalysisConfig;

use super::{ensure_dir, figure_paths};
use crate::output;

const FIGURE_STEM: &str = "5_peak_ifn_vs_dip_burst_size_ratio";

pub fn run(
    input: &Path,
    bootstrap: usize,
    permutations: usize,
    seed: u64,
    workers: usize,
    virion_burst: f64,
    out: &Path,
) -> anyhow::Result<()> {
    let peaks = read_peaks(input)?;
    if peaks.is_empty() {
        anyhow::bail!("peak table {} has no rows", input.display());
    }
    let config = AnalysisConfig {
        virion_burst_size: virion_burst,
        bootstrap_samples: bootstrap,
        permutation_samples: permutations,
        seed,
        ..AnalysisConfig::default()
    };
    let n_workers = if workers == 0 { None } else { Some(workers) };

    println!(
        "Analyzing {} runs ({} bootstrap, {} permutation resamples)...",
        peaks.n_runs(),
        bootstrap,
        permutations,
    );
    let start = std::time::Instant::now();
    let analysis = PeakAnalysis::from_peaks(&peaks, &config, n_workers)?;
    let elapsed = start.elapsed();

    ensure_dir(out)?;
    for path in figure_paths(out, FIGURE_STEM) {
        dipfig_plot::render_peak_fit(&path, &analysis)?;
        println!("  Saved {}", path.display());
    }

    output::print_analysis(&analysis, config.ci_level, elapsed);
    Ok(())
}
