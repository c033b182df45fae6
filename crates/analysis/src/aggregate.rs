use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use dipfig_shared::config::GroupingConfig;
use dipfig_shared::result::GroupSummary;
use dipfig_shared::table::{format_value, parse_cell};
use dipfig_shared::{RunTable, TableError, TagPattern};

#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    #[error("group {key}: none of {attempted} run files could be read")]
    NoReadableRuns { key: u32, attempted: usize },
}

#[derive(Debug, Default)]
pub struct AggregateReport {
    pub summaries: Vec<GroupSummary>,
    pub failures: Vec<GroupError>,
    /// Groups whose readable member count differs from the expected one.
    pub short_groups: Vec<(u32, usize)>,
}

impl AggregateReport {
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }
}

/// Reads every run file of a group, skipping the ones that are missing or
/// unreadable.
pub fn load_group(paths: &[PathBuf]) -> Vec<RunTable> {
    let mut tables = Vec::with_capacity(paths.len());
    for path in paths {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "run file not found");
            continue;
        }
        match RunTable::read(path) {
            Ok(table) if table.is_empty() => {
                tracing::warn!(path = %path.display(), "run file has no rows");
            }
            Ok(table) => tables.push(table),
            Err(err) => tracing::warn!(path = %path.display(), %err, "skipping run file"),
        }
    }
    tables
}

fn time_index(table: &RunTable, time_col: &str) -> HashMap<u64, usize> {
    let mut index = HashMap::new();
    if let Some(col) = table.column_index(time_col) {
        for r in 0..table.n_rows() {
            if let Some(t) = table.cell(r, col).and_then(parse_cell) {
                index.entry(time_key(t)).or_insert(r);
            }
        }
    }
    index
}

#[inline]
fn time_key(t: f64) -> u64 {
    // -0.0 and 0.0 are the same time.
    (t + 0.0).to_bits()
}

/// Element-wise mean of tables aligned on the time column.
///
/// Columns and rows come from the first table and the time column is copied
/// from it. Each member contributes the row whose time equals the first
/// table's time exactly; every other cell is the mean of the parsable values
/// of the aligned members that have that column. A cell with no parsable value
/// keeps the first table's text. Values are summed in sorted order so the
/// result does not depend on member order.
pub fn mean_tables(tables: &[RunTable], time_col: &str) -> Option<RunTable> {
    let first = tables.first()?;
    if tables.len() == 1 {
        return Some(first.clone());
    }

    let columns = first.columns().to_vec();
    // Column position of each first-table column in every member.
    let positions: Vec<Vec<Option<usize>>> = columns
        .iter()
        .map(|name| tables.iter().map(|t| t.column_index(name)).collect())
        .collect();
    let indices: Vec<HashMap<u64, usize>> =
        tables.iter().map(|t| time_index(t, time_col)).collect();
    let first_time = first.column_index(time_col);
    let mut missing = vec![0usize; tables.len()];

    let mut rows = Vec::with_capacity(first.n_rows());
    let mut aligned: Vec<Option<usize>> = Vec::with_capacity(tables.len());
    let mut values = Vec::with_capacity(tables.len());
    for (r, first_row) in first.rows().iter().enumerate() {
        let time = first_time.and_then(|c| first.cell(r, c)).and_then(parse_cell);
        aligned.clear();
        for (m, index) in indices.iter().enumerate() {
            let row = match time {
                _ if m == 0 => Some(r),
                Some(t) => index.get(&time_key(t)).copied(),
                None => None,
            };
            if row.is_none() && time.is_some() {
                missing[m] += 1;
            }
            aligned.push(row);
        }

        let mut row = Vec::with_capacity(columns.len());
        for (c, name) in columns.iter().enumerate() {
            let text = first_row.get(c).cloned().unwrap_or_default();
            if name == time_col {
                row.push(text);
                continue;
            }
            values.clear();
            for ((table, pos), member_row) in tables.iter().zip(&positions[c]).zip(&aligned) {
                let cell = pos.zip(*member_row).and_then(|(p, mr)| table.cell(mr, p));
                if let Some(v) = cell.and_then(parse_cell) {
                    values.push(v);
                }
            }
            if values.is_empty() {
                row.push(text);
            } else {
                values.sort_by(|a, b| a.total_cmp(b));
                let mean = values.iter().sum::<f64>() / values.len() as f64;
                row.push(format_value(mean));
            }
        }
        rows.push(row);
    }

    for (member, &count) in missing.iter().enumerate().filter(|&(_, &n)| n > 0) {
        tracing::warn!(member, missing = count, "member lacks time points of the first run");
    }
    Some(RunTable::new(columns, rows))
}

pub fn aggregate_group(
    key: u32,
    paths: &[PathBuf],
    config: &GroupingConfig,
) -> Result<GroupSummary, GroupError> {
    let tables = load_group(paths);
    let table = mean_tables(&tables, &config.columns.time).ok_or(GroupError::NoReadableRuns {
        key,
        attempted: paths.len(),
    })?;
    Ok(GroupSummary {
        key,
        members: tables.len(),
        table,
    })
}

/// Aggregates each group independently. Failures are collected, never raised.
pub fn aggregate_all(
    groups: &BTreeMap<u32, Vec<PathBuf>>,
    config: &GroupingConfig,
) -> AggregateReport {
    let mut report = AggregateReport::default();
    for (&key, paths) in groups {
        match aggregate_group(key, paths, config) {
            Ok(summary) => {
                if summary.members != config.expected_replicates {
                    tracing::warn!(
                        key,
                        members = summary.members,
                        expected = config.expected_replicates,
                        "unexpected replicate count"
                    );
                    report.short_groups.push((key, summary.members));
                }
                tracing::info!(key, members = summary.members, "aggregated group");
                report.summaries.push(summary);
            }
            Err(err) => {
                tracing::warn!(%err, "group skipped");
                report.failures.push(err);
            }
        }
    }
    report
}

pub fn write_summaries(
    summaries: &[GroupSummary],
    pattern: &TagPattern,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, TableError> {
    fs::create_dir_all(out_dir).map_err(|source| TableError::Write {
        path: out_dir.to_path_buf(),
        source,
    })?;
    let mut written = Vec::with_capacity(summaries.len());
    for summary in summaries {
        let path = out_dir.join(pattern.summary_file_name(summary.key));
        summary.table.write(&path)?;
        written.push(path);
    }
    Ok(written)
}

pub fn read_summaries(
    dir: &Path,
    pattern: &TagPattern,
) -> Result<Vec<(u32, RunTable)>, TableError> {
    let entries = fs::read_dir(dir).map_err(|source| TableError::Read {
        path: dir.to_path_buf(),
        source,
    })?;
    let prefix = format!("summary_{}", pattern.tag());
    let mut found: Vec<(u32, PathBuf)> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter_map(|p| {
            let name = p.file_name()?.to_str()?;
            if !name.starts_with(&prefix) || !name.ends_with(".csv") {
                return None;
            }
            let key = pattern.parse(name)?;
            Some((key, p))
        })
        .collect();
    found.sort();

    let mut out = Vec::with_capacity(found.len());
    for (key, path) in found {
        match RunTable::read(&path) {
            Ok(table) => out.push((key, table)),
            Err(err) => tracing::warn!(path = %path.display(), %err, "skipping summary"),
        }
    }
    Ok(out)
}
