//! Model-minus-reference error fields on the depth-time plane
//!
//! Column runs store profiles as `(time_counter, depth, y, x)` with a single
//! horizontal point. The surface column `[:, :, 0, 0]` is pulled out and
//! transposed so rows are depth levels and columns are time steps.

use crate::errors::{PapaError, Result};
use crate::netcdf_io::{read_depth, read_time_counter, read_variable_f64};
use crate::plot::{save_heatmap, HeatmapLayout};
use crate::presets::PlotPreset;
use chrono::NaiveDateTime;
use ndarray::{s, Array2, ArrayD, Axis, Ix2};
use netcdf::open;
use std::path::{Path, PathBuf};

/// `(depth, time)` profile of a `(time, depth[, y, x])` variable.
pub fn surface_profile(data: &ArrayD<f64>, name: &str) -> Result<Array2<f64>> {
    let column = match data.ndim() {
        4 => data.slice(s![.., .., 0, 0]).into_dimensionality::<Ix2>()?,
        2 => data.view().into_dimensionality::<Ix2>()?,
        n => {
            return Err(PapaError::InvalidArgument(format!(
                "'{}' must be (time, depth, y, x) or (time, depth), got {} dimensions",
                name, n
            )))
        }
    };
    Ok(column.t().to_owned())
}

/// Error field of one variable
#[derive(Debug, Clone)]
pub struct ProfileDiff {
    pub variable: String,
    pub times: Vec<NaiveDateTime>,
    pub depth_name: String,
    pub depth: Vec<f64>,
    /// `model - reference`, shape `(depth, time)`
    pub diff: Array2<f64>,
}

impl ProfileDiff {
    /// Computes `model - reference` for `var_name`.
    ///
    /// The time and depth axes come from the model dataset.
    pub fn compute(reference: &netcdf::File, model: &netcdf::File, var_name: &str) -> Result<Self> {
        let times = read_time_counter(model)?;
        let (depth_name, depth) = read_depth(model)?;

        let (ref_data, _) = read_variable_f64(reference, var_name)?;
        let (model_data, _) = read_variable_f64(model, var_name)?;
        let ref_profile = surface_profile(&ref_data, var_name)?;
        let model_profile = surface_profile(&model_data, var_name)?;

        if ref_profile.shape() != model_profile.shape() {
            return Err(PapaError::ShapeMismatch {
                context: format!("'{}' in reference and model", var_name),
                left: ref_profile.shape().to_vec(),
                right: model_profile.shape().to_vec(),
            });
        }
        if model_profile.dim() != (depth.len(), times.len()) {
            return Err(PapaError::ShapeMismatch {
                context: format!("'{}' against ({}, time_counter)", var_name, depth_name),
                left: model_profile.shape().to_vec(),
                right: vec![depth.len(), times.len()],
            });
        }

        Ok(Self {
            variable: var_name.to_string(),
            times,
            depth_name,
            depth,
            diff: model_profile - ref_profile,
        })
    }

    /// Reorders rows so depth increases downward.
    pub fn depth_ascending(mut self) -> Self {
        let descending = self.depth.windows(2).all(|w| w[0] > w[1]) && self.depth.len() > 1;
        if descending {
            self.depth.reverse();
            self.diff.invert_axis(Axis(0));
        }
        self
    }

    /// Largest absolute error, ignoring NaN
    pub fn max_abs(&self) -> f64 {
        self.diff
            .iter()
            .filter(|v| !v.is_nan())
            .fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }
}

/// Result of [`run_diff_plot`]
#[derive(Debug, Clone)]
pub struct DiffPlot {
    pub path: PathBuf,
    pub layout: HeatmapLayout,
    pub max_abs: f64,
}

/// Opens both datasets, computes the error field and writes the heatmap to
/// `<out_dir>/C1D_PAPA_DNN_<freq>_<fig_name>_error.png`.
pub fn run_diff_plot(
    reference_path: &Path,
    model_path: &Path,
    preset: &PlotPreset,
    freq: &str,
    out_dir: &Path,
) -> Result<DiffPlot> {
    let model = open(model_path)?;
    let reference = open(reference_path)?;

    let profile = ProfileDiff::compute(&reference, &model, &preset.variable)?.depth_ascending();
    let max_abs = profile.max_abs();
    log::info!(
        "{}: max |model - reference| = {:.4} over {} levels x {} steps",
        preset.variable,
        max_abs,
        profile.depth.len(),
        profile.times.len()
    );

    let path = out_dir.join(preset.output_name(freq));
    let layout = save_heatmap(
        &path,
        &preset.title,
        &profile.diff,
        &profile.times,
        &preset.heatmap_options()?,
    )?;
    Ok(DiffPlot {
        path,
        layout,
        max_abs,
    })
}
