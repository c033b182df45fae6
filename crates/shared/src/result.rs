use std::collections::BTreeMap;

use crate::table::RunTable;

/// Time-aligned mean of one replicate group.
#[derive(Debug, Clone)]
pub struct GroupSummary {
    pub key: u32,
    pub members: usize,
    pub table: RunTable,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub row: usize,
    pub time: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeakRecord {
    pub burst_size: u32,
    pub replicate_id: u32,
    pub seed: i64,
    pub peak: f64,
    pub t_peak: f64,
    pub scenario: String,
}

#[derive(Debug, Clone, Default)]
pub struct PeakSet {
    pub records: Vec<PeakRecord>,
}

impl PeakSet {
    pub fn from_records(mut records: Vec<PeakRecord>) -> Self {
        // Stable: within a burst size, discovery order is kept.
        records.sort_by_key(|r| r.burst_size);
        Self { records }
    }

    pub fn n_runs(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn by_burst_size(&self) -> BTreeMap<u32, Vec<f64>> {
        let mut groups: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        for r in &self.records {
            groups.entry(r.burst_size).or_default().push(r.peak);
        }
        groups
    }

    pub fn mean_peak_by_burst_size(&self) -> BTreeMap<u32, f64> {
        self.by_burst_size()
            .into_iter()
            .map(|(k, v)| (k, v.iter().sum::<f64>() / v.len() as f64))
            .collect()
    }

    /// Distinct replicate ids seen per burst size.
    pub fn replicates_by_burst_size(&self) -> BTreeMap<u32, usize> {
        let mut ids: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
        for r in &self.records {
            let entry = ids.entry(r.burst_size).or_default();
            if !entry.contains(&r.replicate_id) {
                entry.push(r.replicate_id);
            }
        }
        ids.into_iter().map(|(k, v)| (k, v.len())).collect()
    }
}

/// One run of a burst-size sweep: maximum and final value of the measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepRecord {
    pub burst_size: u32,
    pub end_value: f64,
    pub max_value: f64,
    pub rank: usize,
}

/// Rank by `max_value` descending; ties share the lowest rank.
pub fn rank_sweep(records: &mut [SweepRecord]) {
    let maxima: Vec<f64> = records.iter().map(|r| r.max_value).collect();
    for r in records.iter_mut() {
        r.rank = 1 + maxima.iter().filter(|&&m| m > r.max_value).count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(burst_size: u32, replicate_id: u32, peak: f64) -> PeakRecord {
        PeakRecord {
            burst_size,
            replicate_id,
            seed: -1,
            peak,
            t_peak: 0.0,
            scenario: "baseline".to_string(),
        }
    }

    #[test]
    fn test_peak_set_groups() {
        let set = PeakSet::from_records(vec![
            record(200, 1, 0.4),
            record(100, 1, 0.1),
            record(100, 2, 0.3),
            record(200, 1, 0.2),
        ]);
        assert_eq!(set.records[0].burst_size, 100);
        assert_eq!(set.n_runs(), 4);
        let means = set.mean_peak_by_burst_size();
        assert!((means[&100] - 0.2).abs() < 1e-12);
        assert!((means[&200] - 0.3).abs() < 1e-12);
        let reps = set.replicates_by_burst_size();
        assert_eq!(reps[&100], 2);
        assert_eq!(reps[&200], 1);
    }

    #[test]
    fn test_rank_sweep_ties_share_rank() {
        let mut records: Vec<SweepRecord> = [0.2, 0.5, 0.5, 0.1]
            .iter()
            .enumerate()
            .map(|(i, &m)| SweepRecord {
                burst_size: (i as u32 + 1) * 100,
                end_value: 0.0,
                max_value: m,
                rank: 0,
            })
            .collect();
        rank_sweep(&mut records);
        let ranks: Vec<usize> = records.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![3, 1, 1, 4]);
    }
}
