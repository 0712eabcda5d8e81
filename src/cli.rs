//! Command-line interface of the `papa` binary, defined with `clap`.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Post-processing tools for the C1D PAPA runs
#[derive(Parser, Debug)]
#[command(
    name = "papa",
    version,
    about = "Post-processing tools for the C1D PAPA ocean column runs"
)]
pub struct Args {
    /// Enable verbose output.
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Number of threads to use for parallel processing. Defaults to number of CPU cores.
    #[arg(short = 't', long, global = true)]
    pub threads: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Plot model minus reference for a variable as a depth-time heatmap
    Diff {
        /// Reference (LES) dataset
        #[arg(long)]
        reference: PathBuf,

        /// Model (DNN) dataset
        #[arg(long)]
        model: PathBuf,

        /// Preset tag or variable name, may be repeated. Defaults to all presets.
        #[arg(short, long)]
        preset: Vec<String>,

        /// JSON file with extra presets
        #[arg(long)]
        presets_file: Option<PathBuf>,

        /// Output frequency tag used in file names
        #[arg(long, default_value = "1d")]
        freq: String,

        /// Directory receiving the PNG files
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// List the available plot presets
    Presets {
        /// JSON file with extra presets
        #[arg(long)]
        presets_file: Option<PathBuf>,
    },

    /// Relative humidity from temperature, pressure and specific humidity
    Rh {
        #[command(flatten)]
        input: RhInput,

        /// Write the result to a NetCDF file instead of printing a summary
        #[arg(long)]
        output_netcdf: Option<PathBuf>,
    },

    /// MSE and R² of a prediction variable against a truth variable
    Stats {
        /// Dataset holding the prediction
        #[arg(long)]
        pred_file: PathBuf,

        /// Prediction variable
        #[arg(long)]
        pred: String,

        /// Dataset holding the truth, defaults to the prediction dataset
        #[arg(long)]
        truth_file: Option<PathBuf>,

        /// Truth variable
        #[arg(long)]
        truth: String,

        /// Ignore pairs where either value is NaN
        #[arg(long, default_value_t = false)]
        skip_nan: bool,
    },

    /// Print the cruise catalogue
    Cruises {
        /// Only cruises at sea during this month (YYYYMM)
        #[arg(long)]
        month: Option<String>,

        /// Emit JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Animate a variable over its first (time) dimension as a GIF
    Animate {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(long)]
        var: String,

        #[arg(short, long, default_value = "my-animation.gif")]
        output: PathBuf,

        #[arg(long, default_value_t = 18.0)]
        fps: f64,

        /// Number of repeats, 0 loops forever
        #[arg(long = "loop", default_value_t = 0)]
        loop_count: u16,

        /// Pixel magnification of each frame
        #[arg(long, default_value_t = 1)]
        scale: u32,

        #[arg(long, allow_negative_numbers = true)]
        vmin: f64,

        #[arg(long, allow_negative_numbers = true)]
        vmax: f64,

        #[arg(long, value_enum, default_value_t = ColormapArg::Viridis)]
        colormap: ColormapArg,
    },

    /// Copy a dataset storing data variables as zlib-compressed float32
    Compress {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Run a registered inference model on dataset variables
    ApplyModel {
        #[arg(short, long)]
        file: PathBuf,

        /// Registered model name
        #[arg(short, long)]
        model: String,

        /// Input variables, in model order
        #[arg(long, value_delimiter = ',', required = true)]
        vars: Vec<String>,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Wrap longitudes onto 0-360 and sort a variable along them
    SortLon {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(long)]
        var: String,

        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
pub struct RhInput {
    /// Dataset with temperature, pressure and humidity variables
    #[arg(short, long)]
    pub file: PathBuf,

    /// Air temperature variable (°C)
    #[arg(long, default_value = "ta")]
    pub ta: String,

    /// Pressure variable (mb)
    #[arg(long, default_value = "p")]
    pub p: String,

    /// Specific humidity variable
    #[arg(long, default_value = "qa")]
    pub qa: String,

    /// Specific humidity is given in g/kg
    #[arg(long, default_value_t = false)]
    pub g_per_kg: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum ColormapArg {
    Balance,
    Viridis,
}
