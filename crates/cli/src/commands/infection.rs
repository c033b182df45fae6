use std::path::Path;

use dipfig_analysis::compare::InfectionCounts;
use dipfig_plot::Scale;
use dipfig_shared::config::{INFECTION_TIME_POINTS, RUN_FILE_NAME, TIME_COLUMN};
use dipfig_shared::RunTable;

use super::figure_paths;
use crate::output;

pub fn run(folder: &Path, experiment: &Path) -> anyhow::Result<()> {
    let sim_path = folder.join(RUN_FILE_NAME);
    let sim_table = RunTable::read(&sim_path)?;
    let simulation =
        InfectionCounts::from_simulation(&sim_table, TIME_COLUMN, &INFECTION_TIME_POINTS)?;

    let observed = RunTable::read(experiment).and_then(|exp| {
        InfectionCounts::from_experiment(&exp, &sim_table, TIME_COLUMN, &INFECTION_TIME_POINTS)
    });
    let observed = match observed {
        Ok(counts) => counts,
        Err(err) => {
            tracing::warn!(path = %experiment.display(), %err, "using built-in experiment counts");
            InfectionCounts::fallback()
        }
    };

    for (scale, stem) in [
        (Scale::Log, "comparison_plot_log"),
        (Scale::Linear, "comparison_plot_linear"),
    ] {
        for path in figure_paths(folder, stem) {
            dipfig_plot::render_infection_comparison(&path, &observed, &simulation, scale)?;
            println!("  Saved {}", path.display());
        }
    }

    output::print_infection(&observed, &simulation);
    Ok(())
}
