use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("table has no header")]
    NoHeader,
    #[error("table has no rows")]
    Empty,
    #[error("column `{0}` not found")]
    MissingColumn(String),
    #[error("line {line}: expected {expected} fields, found {found}")]
    Ragged {
        line: usize,
        expected: usize,
        found: usize,
    },
}

/// One simulation output table. Cells stay as text and are parsed on demand,
/// so run-parameter columns that are not numbers survive aggregation as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct RunTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

pub fn quote_field(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[inline]
pub fn parse_cell(cell: &str) -> Option<f64> {
    let v: f64 = cell.trim().parse().ok()?;
    if v.is_finite() {
        Some(v)
    } else {
        None
    }
}

/// Shortest text that reads back as the same `f64`.
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else if v == v.trunc() && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

impl RunTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// Build a table of numeric columns; all columns must have the same length.
    pub fn from_columns(columns: &[(&str, &[f64])]) -> Self {
        let n_rows = columns.first().map_or(0, |(_, v)| v.len());
        let rows = (0..n_rows)
            .map(|i| {
                columns
                    .iter()
                    .map(|(_, values)| values.get(i).map(|v| format_value(*v)).unwrap_or_default())
                    .collect()
            })
            .collect();
        Self {
            columns: columns.iter().map(|(name, _)| name.to_string()).collect(),
            rows,
        }
    }

    pub fn parse(text: &str) -> Result<Self, TableError> {
        let mut lines = text
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty());
        let (_, header) = lines.next().ok_or(TableError::NoHeader)?;
        let columns: Vec<String> = split_record(header.trim_start_matches('\u{feff}'))
            .into_iter()
            .map(|c| c.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (line_no, line) in lines {
            let fields = split_record(line);
            if fields.len() != columns.len() {
                return Err(TableError::Ragged {
                    line: line_no + 1,
                    expected: columns.len(),
                    found: fields.len(),
                });
            }
            rows.push(fields);
        }
        Ok(Self { columns, rows })
    }

    pub fn read(path: &Path) -> Result<Self, TableError> {
        let text = fs::read_to_string(path).map_err(|source| TableError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        let header: Vec<String> = self.columns.iter().map(|c| quote_field(c)).collect();
        let _ = writeln!(out, "{}", header.join(","));
        for row in &self.rows {
            let fields: Vec<String> = row.iter().map(|c| quote_field(c)).collect();
            let _ = writeln!(out, "{}", fields.join(","));
        }
        out
    }

    pub fn write(&self, path: &Path) -> Result<(), TableError> {
        fs::write(path, self.to_csv()).map_err(|source| TableError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize, TableError> {
        self.column_index(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// Cells of a column parsed as numbers; unparsable cells become `None`.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>, TableError> {
        let idx = self.require_column(name)?;
        Ok(self
            .rows
            .iter()
            .map(|r| r.get(idx).and_then(|c| parse_cell(c)))
            .collect())
    }

    pub fn values(&self, name: &str) -> Result<Vec<f64>, TableError> {
        Ok(self
            .numeric_column(name)?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect())
    }

    /// First row whose value in `time_col` is closest to `t`.
    pub fn nearest_row(&self, time_col: &str, t: f64) -> Result<usize, TableError> {
        let times = self.numeric_column(time_col)?;
        let mut best: Option<(usize, f64)> = None;
        for (i, time) in times.iter().enumerate() {
            let Some(time) = time else { continue };
            let dist = (time - t).abs();
            if best.map_or(true, |(_, d)| dist < d) {
                best = Some((i, dist));
            }
        }
        best.map(|(i, _)| i).ok_or(TableError::Empty)
    }

    /// Rows whose time equals one of `ts` exactly, in table order.
    pub fn rows_at(&self, time_col: &str, ts: &[f64]) -> Result<Vec<usize>, TableError> {
        let times = self.numeric_column(time_col)?;
        Ok(times
            .iter()
            .enumerate()
            .filter(|(_, t)| t.map_or(false, |t| ts.contains(&t)))
            .map(|(i, _)| i)
            .collect())
    }

    pub fn value_at(&self, row: usize, name: &str) -> Result<Option<f64>, TableError> {
        let idx = self.require_column(name)?;
        Ok(self.cell(row, idx).and_then(parse_cell))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Time,Global IFN Concentration Per Cell,option\n0,0.1,a\n1,0.5,a\n2,0.3,a\n";

    #[test]
    fn test_parse_and_lookup() {
        let table = RunTable::parse(SAMPLE).unwrap();
        assert_eq!(table.columns().len(), 3);
        assert_eq!(table.n_rows(), 3);
        assert_eq!(
            table.values("Global IFN Concentration Per Cell").unwrap(),
            vec![0.1, 0.5, 0.3]
        );
        assert_eq!(table.numeric_column("option").unwrap(), vec![None, None, None]);
        assert!(matches!(
            table.values("missing"),
            Err(TableError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_ragged_row_is_rejected() {
        let err = RunTable::parse("a,b\n1,2\n3\n").unwrap_err();
        assert!(matches!(
            err,
            TableError::Ragged {
                line: 3,
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(RunTable::parse(""), Err(TableError::NoHeader)));
        assert!(RunTable::parse("a,b\n").unwrap().is_empty());
    }

    #[test]
    fn test_quoted_fields_survive_write() {
        let table = RunTable::parse("name,\"x,y\"\n\"say \"\"hi\"\"\",1\n").unwrap();
        assert_eq!(table.columns()[1], "x,y");
        assert_eq!(table.cell(0, 0), Some("say \"hi\""));
        let reread = RunTable::parse(&table.to_csv()).unwrap();
        assert_eq!(reread, table);
    }

    #[test]
    fn test_nearest_row_prefers_first_on_tie() {
        let table = RunTable::parse("Time,v\n6,1\n8,2\n13,3\n").unwrap();
        assert_eq!(table.nearest_row("Time", 7.0).unwrap(), 0);
        assert_eq!(table.nearest_row("Time", 12.0).unwrap(), 2);
    }

    #[test]
    fn test_rows_at_exact_times() {
        let table = RunTable::parse("Time,v\n0,1\n12,2\n24,3\n48,4\n").unwrap();
        assert_eq!(table.rows_at("Time", &[0.0, 24.0, 96.0]).unwrap(), vec![0, 2]);
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(2.0), "2");
        assert_eq!(format_value(0.25), "0.25");
        assert_eq!(format_value(f64::NAN), "");
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = RunTable::read(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, TableError::Read { .. }));
    }
}
