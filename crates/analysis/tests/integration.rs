use std::fs;
use std::path::Path;

use dipfig_analysis::aggregate::{mean_tables, read_summaries, write_summaries};
use dipfig_analysis::peak::{read_peaks, sweep_runs, write_peaks};
use dipfig_analysis::{aggregate_all, collect_peaks, discover_runs, PeakError};
use dipfig_shared::config::GroupingConfig;
use dipfig_shared::{RunTable, TagPattern};
use proptest::prelude::*;

const HEADER: &str = "Time,Global IFN Concentration Per Cell,Plaque Percentage";

fn write_run(dir: &Path, ifn: &[f64]) {
    fs::create_dir_all(dir).unwrap();
    let mut text = String::from(HEADER);
    text.push('\n');
    for (t, v) in ifn.iter().enumerate() {
        text.push_str(&format!("{},{},{}\n", t, v, t * 2));
    }
    fs::write(dir.join("simulation_output.csv"), text).unwrap();
}

#[test]
fn test_average_pipeline() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    write_run(&root.join("1_Dinit0_DIPBst100_a"), &[1.0, 2.0, 3.0]);
    write_run(&root.join("2_Dinit0_DIPBst100_b"), &[3.0, 2.0, 1.0]);
    write_run(&root.join("3_Dinit0_DIPBst100_c"), &[2.0, 2.0, 2.0]);
    write_run(&root.join("4_Dinit0_DIPBst200_a"), &[0.5, 0.25, 0.0]);
    // Tagged directory without a run file.
    fs::create_dir(root.join("5_Dinit0_DIPBst300_a")).unwrap();

    let config = GroupingConfig {
        expected_replicates: 3,
        ..GroupingConfig::default()
    };
    let groups = discover_runs(root, &config).unwrap();
    assert_eq!(groups.len(), 3);

    let report = aggregate_all(&groups, &config);
    assert_eq!(report.summaries.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.short_groups, vec![(200, 1)]);

    let hundred = &report.summaries[0];
    assert_eq!(hundred.key, 100);
    assert_eq!(hundred.members, 3);
    assert_eq!(
        hundred.table.values("Global IFN Concentration Per Cell").unwrap(),
        vec![2.0, 2.0, 2.0]
    );

    let out = root.join("summaries");
    let pattern = TagPattern::new("DIPBst");
    let written = write_summaries(&report.summaries, &pattern, &out).unwrap();
    assert!(written[0].ends_with("summary_DIPBst100.csv"));

    let reread = read_summaries(&out, &pattern).unwrap();
    assert_eq!(reread.len(), 2);
    assert_eq!(reread[1].0, 200);
    assert_eq!(reread[1].1, report.summaries[1].table);
}

#[test]
fn test_peak_pipeline() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    let base = "exp_option1";
    let rep1 = root.join(base);
    let rep2 = root.join(base).join(format!("{}_2", base));
    write_run(&rep1.join("1_DIPBst200_x"), &[0.1, 0.5, 0.3]);
    write_run(&rep1.join("2_DIPBst100_x"), &[0.2, 0.1, 0.0]);
    write_run(&rep2.join("1_DIPBst100_x"), &[0.0, 0.0, 0.4]);
    fs::write(rep1.join("1_DIPBst200_x").join("seed.txt"), "1234\n").unwrap();

    let peaks = collect_peaks(root, base, "baseline", &GroupingConfig::default()).unwrap();
    assert_eq!(peaks.n_runs(), 3);
    assert_eq!(peaks.records[0].burst_size, 100);
    assert_eq!(peaks.records[2].burst_size, 200);
    assert_eq!(peaks.records[2].peak, 0.5);
    assert_eq!(peaks.records[2].t_peak, 1.0);
    assert_eq!(peaks.records[2].seed, 1234);
    assert_eq!(peaks.records[0].seed, -1);
    assert_eq!(peaks.replicates_by_burst_size()[&100], 2);

    let path = root.join("peaks.csv");
    write_peaks(&peaks, &path).unwrap();
    let header = fs::read_to_string(&path).unwrap();
    assert!(header.starts_with("burst_size_DIP,replicate_id,seed,peak_IFN,t_peak_IFN,scenario\n"));
    let reread = read_peaks(&path).unwrap();
    assert_eq!(reread.records, peaks.records);
}

#[test]
fn test_peaks_without_replicates() {
    let tmp = tempfile::tempdir().unwrap();
    let err = collect_peaks(tmp.path(), "exp_option1", "baseline", &GroupingConfig::default());
    assert!(matches!(err, Err(PeakError::NoReplicates(_))));
}

#[test]
fn test_sweep_ranks_runs() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    write_run(&root.join("1_DIPBst100_x"), &[0.1, 0.3, 0.2]);
    write_run(&root.join("2_DIPBst200_x"), &[0.1, 0.9, 0.4]);
    write_run(&root.join("3_DIPBst300_x"), &[0.3, 0.3, 0.3]);

    let records = sweep_runs(root, &GroupingConfig::default()).unwrap();
    let ranks: Vec<usize> = records.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![2, 1, 2]);
    assert_eq!(records[1].end_value, 0.4);
}

fn table_of(values: &[f64]) -> RunTable {
    let times: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    RunTable::from_columns(&[("Time", &times), ("IFN", values)])
}

proptest! {
    #[test]
    fn prop_mean_is_order_independent(
        runs in prop::collection::vec(prop::collection::vec(-1e3f64..1e3, 6), 1..8),
        rotate in 0usize..8,
    ) {
        let tables: Vec<RunTable> = runs.iter().map(|r| table_of(r)).collect();
        let mut shuffled = tables.clone();
        let k = rotate % shuffled.len();
        shuffled.rotate_left(k);
        shuffled.reverse();

        let a = mean_tables(&tables, "Time").unwrap();
        let b = mean_tables(&shuffled, "Time").unwrap();
        prop_assert_eq!(a.values("IFN").unwrap(), b.values("IFN").unwrap());
    }

    #[test]
    fn prop_single_member_is_identity(values in prop::collection::vec(-1e3f64..1e3, 1..20)) {
        let table = table_of(&values);
        let mean = mean_tables(std::slice::from_ref(&table), "Time").unwrap();
        prop_assert_eq!(mean, table);
    }
}
