use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use dipfig_shared::config::{ColumnConfig, GroupingConfig, SEED_FILE_NAME};
use dipfig_shared::result::{rank_sweep, Peak, PeakRecord, PeakSet, SweepRecord};
use dipfig_shared::table::{format_value, quote_field};
use dipfig_shared::{RunTable, TableError, TagPattern};

use crate::aggregate::{load_group, mean_tables};
use crate::discover::{numbered_runs, replicate_dirs, sweep_groups, DiscoverError};

pub const PEAK_HEADER: [&str; 6] = [
    "burst_size_DIP",
    "replicate_id",
    "seed",
    "peak_IFN",
    "t_peak_IFN",
    "scenario",
];

pub const SWEEP_HEADER: [&str; 4] = [
    "BurstSize",
    "End_IFN_Concentration",
    "Max_IFN_Concentration",
    "Order",
];

#[derive(Debug, thiserror::Error)]
pub enum PeakError {
    #[error(transparent)]
    Discover(#[from] DiscoverError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("no replicate directories matching `{0}`")]
    NoReplicates(String),
    #[error("no simulation runs could be processed")]
    NoRuns,
    #[error("peak table row {row}: bad `{column}` value `{value}`")]
    BadField {
        row: usize,
        column: &'static str,
        value: String,
    },
}

/// Row holding the maximum of `value_col`. Ties keep the first row; cells that
/// do not parse to a finite number are ignored.
pub fn find_peak(table: &RunTable, time_col: &str, value_col: &str) -> Result<Peak, TableError> {
    let values = table.numeric_column(value_col)?;
    let times = table.numeric_column(time_col)?;
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.iter().enumerate() {
        let Some(v) = *v else { continue };
        if best.map_or(true, |(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    let (row, value) = best.ok_or(TableError::Empty)?;
    Ok(Peak {
        row,
        time: times[row].unwrap_or(f64::NAN),
        value,
    })
}

fn read_seed(dir: &Path) -> i64 {
    let path = dir.join(SEED_FILE_NAME);
    match fs::read_to_string(&path).map(|s| s.trim().parse::<i64>()) {
        Ok(Ok(seed)) => seed,
        _ => {
            tracing::warn!(path = %path.display(), "could not read seed");
            -1
        }
    }
}

/// Peak of one simulation directory, or `None` (with a warning) when its run
/// file is missing, empty, or lacks the columns.
fn peak_of_run(dir: &Path, run_file: &str, columns: &ColumnConfig) -> Option<Peak> {
    let path = dir.join(run_file);
    if !path.exists() {
        tracing::warn!(path = %path.display(), "run file not found");
        return None;
    }
    let peak = RunTable::read(&path).and_then(|t| find_peak(&t, &columns.time, &columns.value));
    match peak {
        Ok(peak) => Some(peak),
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "skipping run");
            None
        }
    }
}

pub fn collect_peaks(
    root: &Path,
    base: &str,
    scenario: &str,
    config: &GroupingConfig,
) -> Result<PeakSet, PeakError> {
    let replicates = replicate_dirs(root, base)?;
    if replicates.is_empty() {
        return Err(PeakError::NoReplicates(base.to_string()));
    }
    tracing::info!(count = replicates.len(), "replicate directories");

    let pattern = TagPattern::new(&config.tag);
    let mut records = Vec::new();
    for (replicate_id, rep_dir) in &replicates {
        for (burst_size, run_dir) in numbered_runs(rep_dir, &pattern)? {
            if !config.allows(burst_size) {
                continue;
            }
            let seed = read_seed(&run_dir);
            let Some(peak) = peak_of_run(&run_dir, &config.run_file, &config.columns) else {
                continue;
            };
            records.push(PeakRecord {
                burst_size,
                replicate_id: *replicate_id,
                seed,
                peak: peak.value,
                t_peak: peak.time,
                scenario: scenario.to_string(),
            });
        }
    }
    if records.is_empty() {
        return Err(PeakError::NoRuns);
    }
    Ok(PeakSet::from_records(records))
}

pub fn write_peaks(peaks: &PeakSet, path: &Path) -> Result<(), TableError> {
    let mut out = String::new();
    let _ = writeln!(out, "{}", PEAK_HEADER.join(","));
    for r in &peaks.records {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{}",
            r.burst_size,
            r.replicate_id,
            r.seed,
            format_value(r.peak),
            format_value(r.t_peak),
            quote_field(&r.scenario)
        );
    }
    fs::write(path, out).map_err(|source| TableError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_peaks(path: &Path) -> Result<PeakSet, PeakError> {
    let table = RunTable::read(path)?;
    let idx: Vec<usize> = PEAK_HEADER
        .iter()
        .map(|c| table.require_column(c))
        .collect::<Result<_, _>>()?;

    let mut records = Vec::with_capacity(table.n_rows());
    for (i, row) in table.rows().iter().enumerate() {
        let field = |k: usize| row.get(idx[k]).map(|s| s.trim()).unwrap_or_default();
        let bad = |k: usize| PeakError::BadField {
            row: i + 1,
            column: PEAK_HEADER[k],
            value: field(k).to_string(),
        };
        let parse_f = |k: usize| field(k).parse::<f64>().map_err(|_| bad(k));
        records.push(PeakRecord {
            burst_size: field(0).parse().map_err(|_| bad(0))?,
            replicate_id: field(1).parse().map_err(|_| bad(1))?,
            seed: field(2).parse().unwrap_or(-1),
            peak: parse_f(3)?,
            t_peak: parse_f(4)?,
            scenario: field(5).to_string(),
        });
    }
    Ok(PeakSet::from_records(records))
}

pub fn peak_of_summaries(
    summaries: &[(u32, RunTable)],
    columns: &ColumnConfig,
) -> Vec<(u32, Peak)> {
    summaries
        .iter()
        .filter_map(|(key, table)| match find_peak(table, &columns.time, &columns.value) {
            Ok(peak) => Some((*key, peak)),
            Err(err) => {
                tracing::warn!(key, %err, "summary has no peak");
                None
            }
        })
        .collect()
}

/// Averaged time course of one group and the mean of its members' peaks.
#[derive(Debug, Clone)]
pub struct GroupDynamics {
    pub key: u32,
    pub time: Vec<f64>,
    pub mean: Vec<f64>,
    pub member_peaks: Vec<f64>,
}

impl GroupDynamics {
    pub fn from_tables(key: u32, tables: &[RunTable], columns: &ColumnConfig) -> Option<Self> {
        let summary = mean_tables(tables, &columns.time)?;
        let time = summary.values(&columns.time).ok()?;
        let mean = summary.values(&columns.value).ok()?;
        let member_peaks = tables
            .iter()
            .filter_map(|t| find_peak(t, &columns.time, &columns.value).ok())
            .map(|p| p.value)
            .collect();
        Some(Self {
            key,
            time,
            mean,
            member_peaks,
        })
    }

    pub fn mean_peak(&self) -> f64 {
        if self.member_peaks.is_empty() {
            return f64::NAN;
        }
        self.member_peaks.iter().sum::<f64>() / self.member_peaks.len() as f64
    }
}

pub fn group_dynamics(
    groups: &BTreeMap<u32, Vec<PathBuf>>,
    columns: &ColumnConfig,
) -> Vec<GroupDynamics> {
    let mut out = Vec::with_capacity(groups.len());
    for (&key, paths) in groups {
        let tables = load_group(paths);
        match GroupDynamics::from_tables(key, &tables, columns) {
            Some(dynamics) => out.push(dynamics),
            None => tracing::warn!(key, "no usable runs for group"),
        }
    }
    out
}

/// Key of the group with the highest mean member peak; first wins on ties.
pub fn max_group(dynamics: &[GroupDynamics]) -> Option<u32> {
    let mut best: Option<(u32, f64)> = None;
    for d in dynamics {
        let m = d.mean_peak();
        if m.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, b)| m > b) {
            best = Some((d.key, m));
        }
    }
    best.map(|(k, _)| k)
}

/// One run per tag value from a sweep folder: end value, max value and rank.
pub fn sweep_runs(root: &Path, config: &GroupingConfig) -> Result<Vec<SweepRecord>, PeakError> {
    let runs = sweep_groups(root, config)?;
    let mut records = Vec::with_capacity(runs.len());
    for (burst_size, path) in runs
        .into_iter()
        .flat_map(|(key, paths)| paths.into_iter().map(move |p| (key, p)))
    {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "run file not found");
            continue;
        }
        let table = match RunTable::read(&path) {
            Ok(t) => t,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "skipping run");
                continue;
            }
        };
        let peak = match find_peak(&table, &config.columns.time, &config.columns.value) {
            Ok(p) => p,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "skipping run");
                continue;
            }
        };
        let end_value = table
            .values(&config.columns.value)
            .ok()
            .and_then(|v| v.last().copied())
            .unwrap_or(f64::NAN);
        records.push(SweepRecord {
            burst_size,
            end_value,
            max_value: peak.value,
            rank: 0,
        });
    }
    if records.is_empty() {
        return Err(PeakError::NoRuns);
    }
    rank_sweep(&mut records);
    Ok(records)
}

/// Writes the sweep table; the last row repeats the maximum run with the
/// marker `Max IFN BurstSize` in place of its rank.
pub fn write_sweep(records: &[SweepRecord], path: &Path) -> Result<(), TableError> {
    let mut out = String::new();
    let _ = writeln!(out, "{}", SWEEP_HEADER.join(","));
    for r in records {
        let _ = writeln!(
            out,
            "{},{},{},{}",
            r.burst_size,
            format_value(r.end_value),
            format_value(r.max_value),
            r.rank
        );
    }
    if let Some(top) = records.iter().find(|r| r.rank == 1) {
        let _ = writeln!(
            out,
            "{},{},{},Max IFN BurstSize",
            top.burst_size,
            format_value(top.end_value),
            format_value(top.max_value)
        );
    }
    fs::write(path, out).map_err(|source| TableError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(values: &[f64]) -> RunTable {
        let times: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
        RunTable::from_columns(&[("Time", &times), ("IFN", values)])
    }

    #[test]
    fn test_find_peak() {
        let peak = find_peak(&table(&[0.1, 0.5, 0.3]), "Time", "IFN").unwrap();
        assert_eq!(peak.value, 0.5);
        assert_eq!(peak.time, 1.0);
        assert_eq!(peak.row, 1);
    }

    #[test]
    fn test_find_peak_first_tie_and_nan() {
        let t = RunTable::parse("Time,IFN\n0,nan\n1,2\n2,2\n3,\n").unwrap();
        let peak = find_peak(&t, "Time", "IFN").unwrap();
        assert_eq!(peak.row, 1);
    }

    #[test]
    fn test_find_peak_errors() {
        let empty = RunTable::parse("Time,IFN\n").unwrap();
        assert!(matches!(find_peak(&empty, "Time", "IFN"), Err(TableError::Empty)));
        assert!(matches!(
            find_peak(&table(&[1.0]), "Time", "Other"),
            Err(TableError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_max_group_uses_member_peaks() {
        let cols = ColumnConfig {
            time: "Time".into(),
            value: "IFN".into(),
        };
        let low = [table(&[0.0, 1.0]), table(&[0.0, 1.0])];
        let high = [table(&[3.0, 0.0]), table(&[0.0, 3.0])];
        let low = GroupDynamics::from_tables(1, &low, &cols).unwrap();
        let high = GroupDynamics::from_tables(2, &high, &cols).unwrap();
        // Mean series of `high` peaks at 1.5 but its members peak at 3.
        assert_eq!(high.mean, vec![1.5, 1.5]);
        assert_eq!(max_group(&[low, high]), Some(2));
    }

    #[test]
    fn test_scenario_with_comma_and_quote_reads_back() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("peaks.csv");
        let scenario = "low,dose \"b\"";
        let peaks = PeakSet::from_records(vec![PeakRecord {
            burst_size: 100,
            replicate_id: 2,
            seed: 7,
            peak: 0.5,
            t_peak: 12.0,
            scenario: scenario.to_string(),
        }]);
        write_peaks(&peaks, &path).unwrap();
        let back = read_peaks(&path).unwrap();
        assert_eq!(back.records.len(), 1);
        assert_eq!(back.records[0].scenario, scenario);
        assert_eq!(back.records[0].peak, 0.5);
    }

    #[test]
    fn test_dynamics_mean_follows_time() {
        let cols = ColumnConfig {
            time: "Time".into(),
            value: "IFN".into(),
        };
        let a = RunTable::parse("Time,IFN\n0,1\n1,2\n2,3\n").unwrap();
        let b = RunTable::parse("Time,IFN\n1,10\n2,20\n3,30\n").unwrap();
        let dynamics = GroupDynamics::from_tables(5, &[a, b], &cols).unwrap();
        assert_eq!(dynamics.time, vec![0.0, 1.0, 2.0]);
        assert_eq!(dynamics.mean, vec![1.0, 6.0, 11.5]);
    }

    #[test]
    fn test_sweep_file_marks_maximum() {
        let tmp = tempfile::tempdir().unwrap();
        let mut records = vec![
            SweepRecord { burst_size: 100, end_value: 0.1, max_value: 0.4, rank: 0 },
            SweepRecord { burst_size: 200, end_value: 0.2, max_value: 0.9, rank: 0 },
        ];
        rank_sweep(&mut records);
        let path = tmp.path().join("sweep.csv");
        write_sweep(&records, &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "BurstSize,End_IFN_Concentration,Max_IFN_Concentration,Order");
        assert_eq!(lines[1], "100,0.1,0.4,2");
        assert_eq!(lines[3], "200,0.2,0.9,Max IFN BurstSize");
    }
}
