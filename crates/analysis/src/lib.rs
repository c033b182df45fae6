pub mod aggregate;
pub mod analysis;
pub mod compare;
pub mod discover;
pub mod peak;
pub mod stats;

pub use aggregate::{aggregate_all, aggregate_group, AggregateReport, GroupError};
pub use analysis::PeakAnalysis;
pub use discover::discover_runs;
pub use peak::{collect_peaks, find_peak, PeakError};
