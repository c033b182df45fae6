use std::path::Path;

use dipfig_analysis::collect_peaks;
use dipfig_analysis::peak::write_peaks;

use super::grouping;
use crate::output;

pub fn run(root: &Path, base: &str, tag: &str, scenario: &str, out: &Path) -> anyhow::Result<()> {
    let config = grouping(tag, None);
    println!("Collecting peaks from {}/{}*...", root.display(), base);

    let peaks = collect_peaks(root, base, scenario, &config)?;
    write_peaks(&peaks, out)?;

    output::print_peaks(&peaks, out, config.expected_replicates);
    Ok(())
}
