//! papa_tools: post-processing for the C1D PAPA ocean column experiments
//!
//! A small toolbox used around coupled ocean runs with neural-network
//! closures at Ocean Station PAPA. Every module is independent and stateless:
//!
//! - [`models`]: the contract inference models follow, and the reference `add_100` model
//! - [`diff`]: model-minus-reference error fields on the depth-time plane
//! - [`plot`]: colour-mapped PNG heatmaps of those fields
//! - [`animation`]: GIF animations assembled from rendered frames
//! - [`humidity`]: COARE saturation vapour pressure and relative humidity
//! - [`statistics`]: MSE / R² skill scores
//! - [`cruises`]: the research cruise catalogue of the flux dataset
//! - [`longitude`]: wrapping longitudes onto 0-360 and sorting data accordingly
//! - [`netcdf_io`]: NetCDF reading, time decoding and compressed writing
//! - [`presets`]: figure presets for the error plots
//! - [`parallel`]: Rayon thread pool configuration
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use papa_tools::prelude::*;
//! use std::path::Path;
//!
//! let presets = papa_tools::presets::builtin_presets();
//! let preset = papa_tools::presets::find_preset(&presets, "T").unwrap();
//! papa_tools::diff::run_diff_plot(
//!     Path::new("C1D_PAPA_1d_20100615_20110614_grid_T.nc"),
//!     Path::new("C1D_PAPA_DNN_1d_20100615_20110614_grid_T.nc"),
//!     preset,
//!     "1d",
//!     Path::new("."),
//! )
//! .unwrap();
//!
//! let rh = rhcalc(20.0, 1000.0, 0.0088);
//! assert!(rh > 55.0 && rh < 65.0);
//! ```

pub mod animation;
pub mod cruises;
pub mod diff;
pub mod errors;
pub mod humidity;
pub mod longitude;
pub mod models;
pub mod netcdf_io;
pub mod parallel;
pub mod plot;
pub mod presets;
pub mod statistics;

pub use errors::{PapaError, Result};

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::animation::{create_animation, AnimationOptions};
    pub use crate::diff::ProfileDiff;
    pub use crate::errors::{PapaError, Result};
    pub use crate::humidity::{qsat, rhcalc, HumidityUnits};
    pub use crate::models::{InferenceModel, ModelRegistry};
    pub use crate::parallel::ParallelConfig;
    pub use crate::plot::{Colormap, HeatmapOptions, Normalize};
    pub use crate::statistics::mse_r2;
}
