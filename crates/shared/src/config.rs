// Simulation output layout
pub const RUN_FILE_NAME: &str = "simulation_output.csv";
pub const SEED_FILE_NAME: &str = "seed.txt";
pub const TIME_COLUMN: &str = "Time";
pub const IFN_COLUMN: &str = "Global IFN Concentration Per Cell";
pub const PLAQUE_COLUMN: &str = "Plaque Percentage";

// Experiment layout
pub const DIP_BURST_TAG: &str = "DIPBst";
pub const VIRION_BURST_TAG: &str = "VBst";
pub const EXPERIMENT_BASE: &str = "IFNclr3_30runs_global_celltocell_tau95_option1";
pub const EXPECTED_REPLICATES: usize = 30;
pub const VIRION_BURST_SIZE: f64 = 50.0;
pub const PEAK_SCENARIO: &str = "baseline";
pub const PEAK_TABLE_NAME: &str = "ifn_peak_vs_dipburst_baseline.csv";

// Figure defaults
pub const DYNAMICS_X_MAX: f64 = 500.0;
pub const DYNAMICS_Y_MAX: f64 = 0.22;

// Statistics
pub const BOOTSTRAP_SAMPLES: usize = 1_000;
pub const PERMUTATION_SAMPLES: usize = 10_000;
pub const CI_LEVEL: f64 = 0.95;
pub const OPTIMUM_GRID_POINTS: usize = 500;
pub const SPLINE_BASIS: usize = 20;
pub const SPLINE_LAMBDA: f64 = 0.6;
pub const LOWESS_FRAC: f64 = 0.5;
pub const LOWESS_ITERS: usize = 1;

// Plaque comparison (Vero, 50 virions)
pub const PLAQUE_TIME_POINTS: [f64; 7] = [0.0, 24.0, 48.0, 72.0, 96.0, 120.0, 144.0];
pub const PLAQUE_EXPERIMENT: [f64; 7] = [
    0.0,
    0.0,
    0.704717105910202,
    1.795833997483578,
    3.5070185136826266,
    4.288143985511917,
    3.5190749602357716,
];

// Infection count comparison
pub const INFECTION_TIME_POINTS: [f64; 4] = [7.0, 13.0, 19.0, 25.0];
pub const INFECTION_EXPERIMENT_FILE: &str = "infection_counts_by_time.csv";
pub const GRID_SIZE_COLUMN: &str = "GRID_SIZE";
// Used when the experiment table cannot be read.
pub const INFECTION_FALLBACK_VIRION: [f64; 4] = [0.0, 3.0, 253.0, 2033.0];
pub const INFECTION_FALLBACK_DIP: [f64; 4] = [0.0, 0.0, 0.0, 21.0];
pub const INFECTION_FALLBACK_BOTH: [f64; 4] = [0.0, 0.0, 0.0, 55.0];
pub const INFECTION_FALLBACK_SUSCEPTIBLE: [f64; 4] = [7020.0, 7017.0, 6767.0, 4911.0];

/// Burst sizes plotted by the dynamics figures: 100, 200, ..., 1600.
pub fn default_burst_sizes() -> Vec<u32> {
    (1..=16).map(|i| i * 100).collect()
}

#[derive(Debug, Clone)]
pub struct ColumnConfig {
    pub time: String,
    pub value: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            time: TIME_COLUMN.to_string(),
            value: IFN_COLUMN.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GroupingConfig {
    pub tag: String,
    pub run_file: String,
    pub expected_replicates: usize,
    /// Only groups with these keys are kept. `None` keeps every tagged directory.
    pub allow: Option<Vec<u32>>,
    pub columns: ColumnConfig,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            tag: DIP_BURST_TAG.to_string(),
            run_file: RUN_FILE_NAME.to_string(),
            expected_replicates: EXPECTED_REPLICATES,
            allow: None,
            columns: ColumnConfig::default(),
        }
    }
}

impl GroupingConfig {
    pub fn allows(&self, key: u32) -> bool {
        self.allow.as_ref().map_or(true, |keys| keys.contains(&key))
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub virion_burst_size: f64,
    pub bootstrap_samples: usize,
    pub permutation_samples: usize,
    pub ci_level: f64,
    pub grid_points: usize,
    pub spline_basis: usize,
    pub spline_lambda: f64,
    pub lowess_frac: f64,
    pub lowess_iters: usize,
    pub seed: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            virion_burst_size: VIRION_BURST_SIZE,
            bootstrap_samples: BOOTSTRAP_SAMPLES,
            permutation_samples: PERMUTATION_SAMPLES,
            ci_level: CI_LEVEL,
            grid_points: OPTIMUM_GRID_POINTS,
            spline_basis: SPLINE_BASIS,
            spline_lambda: SPLINE_LAMBDA,
            lowess_frac: LOWESS_FRAC,
            lowess_iters: LOWESS_ITERS,
            seed: 0,
        }
    }
}

impl AnalysisConfig {
    #[inline]
    pub fn relative_yield(&self, burst_size: u32) -> f64 {
        burst_size as f64 / self.virion_burst_size
    }
}
