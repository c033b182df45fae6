use std::path::Path;

use dipfig_analysis::aggregate::read_summaries;
use dipfig_analysis::peak::peak_of_summaries;
use dipfig_plot::StemOptions;
use dipfig_shared::config::ColumnConfig;
use dipfig_shared::TagPattern;

use super::{ensure_dir, figure_paths};

const FIGURE_STEM: &str = "3_max_ifn_stem_plot";

pub fn run(dir: &Path, tag: &str, out: &Path) -> anyhow::Result<()> {
    let pattern = TagPattern::new(tag);
    let summaries = read_summaries(dir, &pattern)?;
    if summaries.is_empty() {
        anyhow::bail!("no summary_{}<n>.csv files in {}", tag, dir.display());
    }
    let peaks = peak_of_summaries(&summaries, &ColumnConfig::default());
    if peaks.is_empty() {
        anyhow::bail!("no summary in {} has a usable measurement column", dir.display());
    }
    let points: Vec<(f64, f64)> = peaks.iter().map(|(k, p)| (*k as f64, p.value)).collect();

    let opts = StemOptions {
        x_desc: format!("{} Value", tag),
        ..StemOptions::default()
    };
    ensure_dir(out)?;
    for path in figure_paths(out, FIGURE_STEM) {
        dipfig_plot::render_stems(&path, &points, &opts)?;
        println!("  Saved {}", path.display());
    }

    println!("\n{:>10}  {:>14}  {:>8}", tag, "Max", "Time");
    for (key, peak) in &peaks {
        println!("{:>10}  {:>14.6}  {:>8}", key, peak.value, peak.time);
    }
    Ok(())
}
