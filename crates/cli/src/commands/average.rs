use std::path::Path;

use dipfig_analysis::aggregate::write_summaries;
use dipfig_analysis::{aggregate_all, discover_runs};
use dipfig_shared::TagPattern;

use super::grouping;
use crate::output;

pub fn run(
    root: &Path,
    tag: &str,
    bursts: Option<Vec<u32>>,
    replicates: usize,
    out: &Path,
) -> anyhow::Result<()> {
    let mut config = grouping(tag, bursts);
    config.expected_replicates = replicates;

    let groups = discover_runs(root, &config)?;
    if groups.is_empty() {
        anyhow::bail!("no {}<n> run directories under {}", tag, root.display());
    }
    println!("Averaging {} groups from {}...", groups.len(), root.display());

    let report = aggregate_all(&groups, &config);
    if report.is_empty() {
        anyhow::bail!("none of the {} groups had a readable run", groups.len());
    }
    let written = write_summaries(&report.summaries, &TagPattern::new(tag), out)?;

    output::print_aggregate(&report, &written, replicates);
    Ok(())
}
