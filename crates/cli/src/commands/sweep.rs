use std::path::Path;

use dipfig_analysis::discover::sweep_groups;
use dipfig_analysis::peak::{group_dynamics, sweep_runs, write_sweep};
use dipfig_plot::{DynamicsOptions, StemOptions};
use dipfig_shared::config::DYNAMICS_X_MAX;

use super::{ensure_dir, grouping};
use crate::output;

pub fn run(
    root: &Path,
    tag: &str,
    bursts: Option<Vec<u32>>,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    let config = grouping(tag, bursts);
    let out = out.unwrap_or(root);
    let folder = root
        .canonicalize()?
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sweep".to_string());

    let records = sweep_runs(root, &config)?;
    let groups = sweep_groups(root, &config)?;
    let dynamics = group_dynamics(&groups, &config.columns);
    let highlight = records.iter().find(|r| r.rank == 1).map(|r| r.burst_size);

    ensure_dir(out)?;
    let table_path = out.join(format!("maxIFN_burst_{}.csv", folder));
    write_sweep(&records, &table_path)?;

    // Legend shows the raw tag value, not a relative yield.
    let opts = DynamicsOptions {
        virion_burst_size: 1.0,
        x_max: DYNAMICS_X_MAX,
        y_max: None,
        caption: format!("IFN Dynamics (Time <= {}) Across {}", DYNAMICS_X_MAX, tag),
    };
    let stems = StemOptions {
        caption: format!("Max IFN vs {}", tag),
        x_desc: tag.to_string(),
        y_desc: "Max IFN Concentration".to_string(),
    };
    let maxima: Vec<(f64, f64)> = records
        .iter()
        .map(|r| (r.burst_size as f64, r.max_value))
        .collect();
    let figure_path = out.join(format!("1_maxIFN_vs_{}_{}.png", tag, folder));
    dipfig_plot::render_sweep(&figure_path, &dynamics, highlight, &opts, &maxima, &stems)?;

    output::print_sweep(&records);
    println!("  Saved {}", table_path.display());
    println!("  Saved {}", figure_path.display());
    Ok(())
}
