use std::path::Path;

use dipfig_analysis::discover_runs;
use dipfig_analysis::peak::{group_dynamics, max_group, GroupDynamics};
use dipfig_plot::DynamicsOptions;
use dipfig_shared::config::{default_burst_sizes, GroupingConfig};

use super::grouping;
use crate::output;

/// Discovers and averages every allowed group.
pub(crate) fn load_dynamics(
    root: &Path,
    config: &GroupingConfig,
) -> anyhow::Result<Vec<GroupDynamics>> {
    let groups = discover_runs(root, config)?;
    if groups.is_empty() {
        anyhow::bail!("no {}<n> run directories under {}", config.tag, root.display());
    }
    let dynamics = group_dynamics(&groups, &config.columns);
    if dynamics.is_empty() {
        anyhow::bail!("none of the {} groups had a readable run", groups.len());
    }
    Ok(dynamics)
}

pub fn run(
    root: &Path,
    tag: &str,
    bursts: Option<Vec<u32>>,
    virion_burst: f64,
    x_max: f64,
    out: &Path,
) -> anyhow::Result<()> {
    let config = grouping(tag, Some(bursts.unwrap_or_else(default_burst_sizes)));
    let dynamics = load_dynamics(root, &config)?;
    let highlight = max_group(&dynamics);

    let opts = DynamicsOptions {
        virion_burst_size: virion_burst,
        x_max,
        ..DynamicsOptions::default()
    };
    dipfig_plot::render_dynamics(out, &dynamics, highlight, &opts)?;

    output::print_dynamics(&dynamics, highlight, virion_burst);
    println!("  Saved {}", out.display());
    Ok(())
}
