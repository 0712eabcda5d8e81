//! Plot presets for the model-minus-reference error figures
//!
//! The two built-in presets cover the temperature and salinity profiles of
//! the PAPA column. Extra presets can be read from a JSON file holding an
//! array of preset objects:
//!
//! ```json
//! [{ "fig_name": "U", "variable": "vozocrtx", "title": "U_DNN - U_LES (m/s)",
//!    "vmin": -0.1, "vmax": 0.1 }]
//! ```

use crate::errors::{PapaError, Result};
use crate::plot::{Colormap, HeatmapOptions, Normalize, Transform};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Settings of one error figure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotPreset {
    /// Short tag used in the output file name
    pub fig_name: String,
    pub variable: String,
    pub title: String,
    pub vmin: f64,
    pub vmax: f64,
    #[serde(default)]
    pub colormap: Colormap,
    #[serde(default)]
    pub transform: Transform,
}

impl PlotPreset {
    pub fn heatmap_options(&self) -> Result<HeatmapOptions> {
        let mut opts = HeatmapOptions::new(Normalize::new(self.vmin, self.vmax)?);
        opts.colormap = self.colormap;
        opts.transform = self.transform;
        Ok(opts)
    }

    /// `C1D_PAPA_DNN_<freq>_<fig_name>_error.png`
    pub fn output_name(&self, freq: &str) -> String {
        format!("C1D_PAPA_DNN_{}_{}_error.png", freq, self.fig_name)
    }
}

/// Temperature and salinity error presets
pub fn builtin_presets() -> Vec<PlotPreset> {
    vec![
        PlotPreset {
            fig_name: "T".to_string(),
            variable: "votemper".to_string(),
            title: "T_DNN - T_LES (ºC)".to_string(),
            vmin: -1.5,
            vmax: 1.5,
            colormap: Colormap::Balance,
            transform: Transform::Identity,
        },
        PlotPreset {
            fig_name: "S".to_string(),
            variable: "vosaline".to_string(),
            title: "S_DNN - S_LES (psu)".to_string(),
            vmin: -0.2,
            vmax: 0.2,
            colormap: Colormap::Balance,
            transform: Transform::Identity,
        },
    ]
}

/// Reads presets from a JSON file and validates their colour ranges.
pub fn load_presets(path: &Path) -> Result<Vec<PlotPreset>> {
    let text = fs::read_to_string(path)?;
    let presets: Vec<PlotPreset> = serde_json::from_str(&text)?;
    for preset in &presets {
        preset.heatmap_options().map_err(|e| {
            PapaError::ConfigError(format!("preset '{}': {}", preset.fig_name, e))
        })?;
    }
    log::debug!("loaded {} presets from {}", presets.len(), path.display());
    Ok(presets)
}

/// Finds a preset by figure tag or variable name.
pub fn find_preset<'a>(presets: &'a [PlotPreset], key: &str) -> Result<&'a PlotPreset> {
    presets
        .iter()
        .find(|p| p.fig_name == key || p.variable == key)
        .ok_or_else(|| PapaError::ConfigError(format!("no preset named '{}'", key)))
}
