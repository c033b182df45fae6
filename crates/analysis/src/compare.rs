//! Simulation-versus-experiment series for the plaque and infection figures.

use dipfig_shared::config::{
    GRID_SIZE_COLUMN, INFECTION_FALLBACK_BOTH, INFECTION_FALLBACK_DIP,
    INFECTION_FALLBACK_SUSCEPTIBLE, INFECTION_FALLBACK_VIRION, INFECTION_TIME_POINTS,
};
use dipfig_shared::{RunTable, TableError};

const RUN_PARAMETERS: [&str; 6] = [
    "max_global_IFN",
    "v_pfu_initial",
    "d_pfu_initial",
    "RHO",
    "BURST_SIZE",
    "DIP_BURST_PCT",
];

/// Simulated plaque percentage at the experiment's sampling times.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaqueSeries {
    pub time: Vec<f64>,
    pub simulated: Vec<f64>,
    pub experiment: Vec<f64>,
}

/// Rows whose time equals a sampling time exactly; sampling times with no
/// matching row are dropped from both series.
pub fn plaque_series(
    table: &RunTable,
    time_col: &str,
    plaque_col: &str,
    times: &[f64],
    experiment: &[f64],
) -> Result<PlaqueSeries, TableError> {
    let mut series = PlaqueSeries {
        time: Vec::new(),
        simulated: Vec::new(),
        experiment: Vec::new(),
    };
    for row in table.rows_at(time_col, times)? {
        let Some(t) = table.value_at(row, time_col)? else {
            continue;
        };
        let Some(idx) = times.iter().position(|&x| x == t) else {
            continue;
        };
        series.time.push(t);
        series
            .simulated
            .push(table.value_at(row, plaque_col)?.unwrap_or(f64::NAN));
        series
            .experiment
            .push(experiment.get(idx).copied().unwrap_or(f64::NAN));
    }
    if series.time.len() < times.len() {
        tracing::warn!(
            found = series.time.len(),
            expected = times.len(),
            "some sampling times are missing from the run"
        );
    }
    Ok(series)
}

/// File name carrying the run parameters, e.g.
/// `5_Vero_RHO=0.1_VInt=1_DInt=0_VBt=50_DBt=10.png`. Runs without interferon
/// (`max_global_IFN == -1`) are labelled Vero, others MDBK.
pub fn plaque_file_name(table: &RunTable) -> Result<String, TableError> {
    let mut values = Vec::with_capacity(RUN_PARAMETERS.len());
    for name in RUN_PARAMETERS {
        let idx = table.require_column(name)?;
        values.push(table.cell(0, idx).ok_or(TableError::Empty)?.trim().to_string());
    }
    let prefix = match values[0].parse::<f64>() {
        Ok(v) if v == -1.0 => "Vero",
        _ => "MDBK",
    };
    Ok(format!(
        "5_{}_RHO={}_VInt={}_DInt={}_VBt={}_DBt={}.png",
        prefix, values[3], values[1], values[2], values[4], values[5]
    ))
}

#[derive(Debug, Clone, PartialEq)]
pub struct InfectionCounts {
    pub time: Vec<f64>,
    pub virion: Vec<f64>,
    pub dip: Vec<f64>,
    pub both: Vec<f64>,
    pub susceptible: Vec<f64>,
}

impl InfectionCounts {
    pub fn fallback() -> Self {
        Self {
            time: INFECTION_TIME_POINTS.to_vec(),
            virion: INFECTION_FALLBACK_VIRION.to_vec(),
            dip: INFECTION_FALLBACK_DIP.to_vec(),
            both: INFECTION_FALLBACK_BOTH.to_vec(),
            susceptible: INFECTION_FALLBACK_SUSCEPTIBLE.to_vec(),
        }
    }

    fn empty(times: &[f64]) -> Self {
        Self {
            time: times.to_vec(),
            virion: Vec::with_capacity(times.len()),
            dip: Vec::with_capacity(times.len()),
            both: Vec::with_capacity(times.len()),
            susceptible: Vec::with_capacity(times.len()),
        }
    }

    /// Counts from the nearest simulation row to each time. Susceptible
    /// cells are converted from a percentage of the `GRID_SIZE²` lattice.
    pub fn from_simulation(
        sim: &RunTable,
        time_col: &str,
        times: &[f64],
    ) -> Result<Self, TableError> {
        let mut out = Self::empty(times);
        for &t in times {
            let row = sim.nearest_row(time_col, t)?;
            let get = |name: &str| -> Result<f64, TableError> {
                Ok(sim.value_at(row, name)?.unwrap_or(f64::NAN))
            };
            let grid = get(GRID_SIZE_COLUMN)?;
            out.virion.push(get("virionOnlyInfected")?);
            out.dip.push(get("dipOnlyInfected")?);
            out.both.push(get("bothInfected")?);
            let pct = get("Percentage Susceptible Cells")?;
            out.susceptible.push((pct * grid * grid / 100.0).trunc());
        }
        Ok(out)
    }

    /// Counts from the experiment table (`time` column). Susceptible cells
    /// are rescaled to the simulated lattice: `GRID_SIZE² - (total - susceptible)`.
    pub fn from_experiment(
        exp: &RunTable,
        sim: &RunTable,
        sim_time_col: &str,
        times: &[f64],
    ) -> Result<Self, TableError> {
        let mut out = Self::empty(times);
        for &t in times {
            let row = exp.nearest_row("time", t)?;
            let get = |name: &str| -> Result<f64, TableError> {
                Ok(exp.value_at(row, name)?.unwrap_or(f64::NAN))
            };
            out.virion.push(get("virion_counts")?);
            out.dip.push(get("dip_counts")?);
            out.both.push(get("both_infected_counts")?);
            let susceptible = get("susceptible_counts")?;
            let rescaled = match sim.nearest_row(sim_time_col, t) {
                Ok(sim_row) => {
                    let grid = sim
                        .value_at(sim_row, GRID_SIZE_COLUMN)?
                        .unwrap_or(f64::NAN);
                    grid * grid - (get("total_cells")? - susceptible)
                }
                Err(_) => susceptible,
            };
            out.susceptible.push(rescaled);
        }
        Ok(out)
    }

    pub fn ln_clamped(&self) -> Self {
        let ln = |v: &[f64]| -> Vec<f64> { v.iter().map(|x| x.max(1.0).ln()).collect() };
        Self {
            time: self.time.clone(),
            virion: ln(&self.virion),
            dip: ln(&self.dip),
            both: ln(&self.both),
            susceptible: ln(&self.susceptible),
        }
    }

    /// Panel title and series, in figure order.
    pub fn panels(&self) -> [(&'static str, &[f64]); 4] {
        [
            ("Virion-Infected Cells", self.virion.as_slice()),
            ("DIP-Infected Cells", self.dip.as_slice()),
            ("Dual-Infected Cells", self.both.as_slice()),
            ("Susceptible Cells", self.susceptible.as_slice()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim() -> RunTable {
        RunTable::parse(
            "Time,virionOnlyInfected,dipOnlyInfected,bothInfected,Percentage Susceptible Cells,GRID_SIZE,Plaque Percentage\n\
             0,0,0,0,100,10,0\n\
             6,1,0,0,99,10,0\n\
             12,5,1,0,90.55,10,1.5\n\
             24,20,2,1,50,10,3\n",
        )
        .unwrap()
    }

    #[test]
    fn test_simulation_counts_use_nearest_row() {
        let counts = InfectionCounts::from_simulation(&sim(), "Time", &[7.0, 13.0]).unwrap();
        assert_eq!(counts.virion, vec![1.0, 5.0]);
        assert_eq!(counts.dip, vec![0.0, 1.0]);
        // 90.55% of 100 cells, truncated.
        assert_eq!(counts.susceptible, vec![99.0, 90.0]);
    }

    #[test]
    fn test_experiment_susceptible_rescaled() {
        let exp = RunTable::parse(
            "time,virion_counts,dip_counts,both_infected_counts,total_cells,susceptible_counts\n\
             7,0,0,0,7020,7020\n\
             25,2033,21,55,7020,4911\n",
        )
        .unwrap();
        let counts = InfectionCounts::from_experiment(&exp, &sim(), "Time", &[7.0, 25.0]).unwrap();
        assert_eq!(counts.virion, vec![0.0, 2033.0]);
        assert_eq!(counts.susceptible, vec![100.0, 100.0 - (7020.0 - 4911.0)]);
    }

    #[test]
    fn test_ln_clamped_floors_at_one() {
        let ln = InfectionCounts::fallback().ln_clamped();
        assert_eq!(ln.virion[0], 0.0);
        assert!((ln.virion[3] - 2033f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_plaque_series_exact_times() {
        let times = [0.0, 12.0, 48.0];
        let series =
            plaque_series(&sim(), "Time", "Plaque Percentage", &times, &[0.0, 1.0, 2.0]).unwrap();
        assert_eq!(series.time, vec![0.0, 12.0]);
        assert_eq!(series.simulated, vec![0.0, 1.5]);
        assert_eq!(series.experiment, vec![0.0, 1.0]);
    }

    #[test]
    fn test_plaque_file_name() {
        let table = RunTable::parse(
            "Time,max_global_IFN,v_pfu_initial,d_pfu_initial,RHO,BURST_SIZE,DIP_BURST_PCT\n0,-1,1,0,0.1,50,10\n",
        )
        .unwrap();
        assert_eq!(
            plaque_file_name(&table).unwrap(),
            "5_Vero_RHO=0.1_VInt=1_DInt=0_VBt=50_DBt=10.png"
        );
    }
}
