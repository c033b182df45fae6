use std::path::{Path, PathBuf};

use dipfig_analysis::compare::{plaque_file_name, plaque_series};
use dipfig_shared::config::{PLAQUE_COLUMN, PLAQUE_EXPERIMENT, PLAQUE_TIME_POINTS, TIME_COLUMN};
use dipfig_shared::RunTable;

use super::ensure_dir;

pub fn run(csv: &Path, output_dir: Option<&Path>) -> anyhow::Result<()> {
    let table = RunTable::read(csv)?;
    let series = plaque_series(
        &table,
        TIME_COLUMN,
        PLAQUE_COLUMN,
        &PLAQUE_TIME_POINTS,
        &PLAQUE_EXPERIMENT,
    )?;
    if series.time.is_empty() {
        anyhow::bail!(
            "{} has none of the sampling times {:?}",
            csv.display(),
            PLAQUE_TIME_POINTS
        );
    }

    let path = match output_dir {
        Some(dir) => {
            ensure_dir(dir)?;
            dir.join("comparison_plot.png")
        }
        None => PathBuf::from(plaque_file_name(&table)?),
    };
    dipfig_plot::render_plaque_comparison(&path, &series)?;

    println!("{:>8}  {:>12}  {:>12}", "Time", "Simulation", "Experiment");
    for ((t, sim), exp) in series.time.iter().zip(&series.simulated).zip(&series.experiment) {
        println!("{:>8}  {:>12.4}  {:>12.4}", t, sim, exp);
    }
    println!("Plot saved to {}", path.display());
    Ok(())
}
