mod commands;
mod output;

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dipfig_shared::config::{
    BOOTSTRAP_SAMPLES, DIP_BURST_TAG, DYNAMICS_X_MAX, EXPECTED_REPLICATES, EXPERIMENT_BASE,
    INFECTION_EXPERIMENT_FILE, PEAK_SCENARIO, PEAK_TABLE_NAME, PERMUTATION_SAMPLES,
    RUN_FILE_NAME, VIRION_BURST_SIZE,
};

#[derive(Parser)]
#[command(name = "dipfig", about = "Figures and statistics for DIP/IFN simulation output")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Average replicate runs per tag value into summary tables
    Average {
        /// Folder holding the tagged run directories
        #[arg(long, default_value = ".")]
        root: PathBuf,
        #[arg(long, default_value = DIP_BURST_TAG)]
        tag: String,
        /// Only keep these tag values (comma separated)
        #[arg(long, value_delimiter = ',')]
        bursts: Option<Vec<u32>>,
        #[arg(long, default_value_t = EXPECTED_REPLICATES)]
        replicates: usize,
        /// Output directory for summary_<TAG><n>.csv
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Extract the peak of every replicate run into a peak table
    Peaks {
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Experiment folder name; replicate folders start with it
        #[arg(long, default_value = EXPERIMENT_BASE)]
        base: String,
        #[arg(long, default_value = DIP_BURST_TAG)]
        tag: String,
        #[arg(long, default_value = PEAK_SCENARIO)]
        scenario: String,
        #[arg(long, default_value = PEAK_TABLE_NAME)]
        out: PathBuf,
    },
    /// Fit peak against relative yield and test for a non-monotone optimum
    Analyze {
        #[arg(long, default_value = PEAK_TABLE_NAME)]
        input: PathBuf,
        #[arg(long, default_value_t = BOOTSTRAP_SAMPLES)]
        bootstrap: usize,
        #[arg(long, default_value_t = PERMUTATION_SAMPLES)]
        permutations: usize,
        #[arg(long, default_value = "0")]
        seed: u64,
        /// Number of parallel workers (0 = auto)
        #[arg(long, default_value = "0")]
        workers: usize,
        #[arg(long, default_value_t = VIRION_BURST_SIZE)]
        virion_burst: f64,
        /// Output directory for the PNG and SVG figures
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Plot the averaged dynamics of each burst size group
    Dynamics {
        #[arg(long, default_value = ".")]
        root: PathBuf,
        #[arg(long, default_value = DIP_BURST_TAG)]
        tag: String,
        /// Burst sizes to plot (default 100..=1600 step 100)
        #[arg(long, value_delimiter = ',')]
        bursts: Option<Vec<u32>>,
        #[arg(long, default_value_t = VIRION_BURST_SIZE)]
        virion_burst: f64,
        #[arg(long, default_value_t = DYNAMICS_X_MAX)]
        x_max: f64,
        #[arg(long, default_value = "6_avg_ifn_dynamics.png")]
        out: PathBuf,
    },
    /// Dynamics panel next to the peak fit panel
    Combined {
        #[arg(long, default_value = ".")]
        root: PathBuf,
        #[arg(long, default_value = DIP_BURST_TAG)]
        tag: String,
        #[arg(long, value_delimiter = ',')]
        bursts: Option<Vec<u32>>,
        #[arg(long, default_value_t = VIRION_BURST_SIZE)]
        virion_burst: f64,
        #[arg(long, default_value = "7_combined_ifn_analysis.png")]
        out: PathBuf,
    },
    /// Stem plot of the maximum of each summary table
    Stems {
        /// Folder holding summary_<TAG><n>.csv files
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        #[arg(long, default_value = DIP_BURST_TAG)]
        tag: String,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Single-run burst size sweep: dynamics, stems and ranked maxima table
    Sweep {
        #[arg(long)]
        root: PathBuf,
        #[arg(long, default_value = DIP_BURST_TAG)]
        tag: String,
        #[arg(long, value_delimiter = ',')]
        bursts: Option<Vec<u32>>,
        /// Output directory (defaults to the sweep folder)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Compare simulated plaque percentage with the experiment
    Plaque {
        #[arg(long, default_value = RUN_FILE_NAME)]
        csv: PathBuf,
        /// Output directory; writes comparison_plot.png there instead of a
        /// parameter-named file in the current directory
        output_dir: Option<PathBuf>,
    },
    /// Compare simulated infection counts with the experiment
    Infection {
        /// Simulation folder holding simulation_output.csv
        #[arg(default_value = ".")]
        folder: PathBuf,
        #[arg(long, default_value = INFECTION_EXPERIMENT_FILE)]
        experiment: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Average {
            root,
            tag,
            bursts,
            replicates,
            out,
        } => commands::average::run(&root, &tag, bursts, replicates, &out),
        Commands::Peaks {
            root,
            base,
            tag,
            scenario,
            out,
        } => commands::peaks::run(&root, &base, &tag, &scenario, &out),
        Commands::Analyze {
            input,
            bootstrap,
            permutations,
            seed,
            workers,
            virion_burst,
            out,
        } => commands::analyze::run(
            &input,
            bootstrap,
            permutations,
            seed,
            workers,
            virion_burst,
            &out,
        ),
        Commands::Dynamics {
            root,
            tag,
            bursts,
            virion_burst,
            x_max,
            out,
        } => commands::dynamics::run(&root, &tag, bursts, virion_burst, x_max, &out),
        Commands::Combined {
            root,
            tag,
            bursts,
            virion_burst,
            out,
        } => commands::combined::run(&root, &tag, bursts, virion_burst, &out),
        Commands::Stems { dir, tag, out } => commands::stems::run(&dir, &tag, &out),
        Commands::Sweep {
            root,
            tag,
            bursts,
            out,
        } => commands::sweep::run(&root, &tag, bursts, out.as_deref()),
        Commands::Plaque { csv, output_dir } => commands::plaque::run(&csv, output_dir.as_deref()),
        Commands::Infection { folder, experiment } => {
            commands::infection::run(&folder, &experiment)
        }
    }
}
