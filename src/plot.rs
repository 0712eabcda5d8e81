//! Colour-mapped raster rendering of depth-time fields
//!
//! A field of shape `(depth, time)` becomes an image with one block of
//! pixels per cell, depth increasing downward, and a vertical colour bar on
//! the right running from `vmax` at the top to `vmin` at the bottom.

use crate::errors::{PapaError, Result};
use chrono::{Datelike, NaiveDateTime};
use image::{Rgb, RgbImage};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Colour used for NaN cells
const NAN_COLOUR: Rgb<u8> = Rgb([128, 128, 128]);
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
/// Pixels between the field and the colour bar
const COLORBAR_GAP: u32 = 8;

/// Linear mapping of `[vmin, vmax]` onto `[0, 1]` with clamping
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalize {
    pub vmin: f64,
    pub vmax: f64,
}

impl Normalize {
    pub fn new(vmin: f64, vmax: f64) -> Result<Self> {
        if !(vmin.is_finite() && vmax.is_finite()) || vmin >= vmax {
            return Err(PapaError::InvalidArgument(format!(
                "colour range must satisfy vmin < vmax, got {}..{}",
                vmin, vmax
            )));
        }
        Ok(Self { vmin, vmax })
    }

    /// Symmetric range around zero, for error fields
    pub fn symmetric(limit: f64) -> Result<Self> {
        Self::new(-limit.abs(), limit.abs())
    }

    /// NaN stays NaN
    pub fn apply(&self, value: f64) -> f64 {
        if value.is_nan() {
            return f64::NAN;
        }
        ((value - self.vmin) / (self.vmax - self.vmin)).clamp(0.0, 1.0)
    }
}

/// Transform applied to the field before normalisation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    #[default]
    Identity,
    Abs,
    Log10,
}

impl Transform {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Self::Identity => value,
            Self::Abs => value.abs(),
            // non-positive values become NaN and render grey
            Self::Log10 if value > 0.0 => value.log10(),
            Self::Log10 => f64::NAN,
        }
    }
}

/// Built-in colour maps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    /// Diverging navy-white-maroon, for signed errors
    #[default]
    Balance,
    /// Sequential purple-green-yellow
    Viridis,
}

const BALANCE: [(f64, [u8; 3]); 9] = [
    (0.0, [24, 28, 67]),
    (0.125, [12, 79, 174]),
    (0.25, [59, 127, 196]),
    (0.375, [158, 179, 213]),
    (0.5, [241, 236, 236]),
    (0.625, [222, 161, 144]),
    (0.75, [199, 87, 63]),
    (0.875, [155, 26, 37]),
    (1.0, [60, 9, 18]),
];

const VIRIDIS: [(f64, [u8; 3]); 5] = [
    (0.0, [68, 1, 84]),
    (0.25, [59, 82, 139]),
    (0.5, [33, 145, 140]),
    (0.75, [94, 201, 98]),
    (1.0, [253, 231, 37]),
];

impl Colormap {
    fn anchors(self) -> &'static [(f64, [u8; 3])] {
        match self {
            Self::Balance => &BALANCE,
            Self::Viridis => &VIRIDIS,
        }
    }

    /// Colour at position `x` in `[0, 1]`; NaN maps to grey.
    pub fn colour(self, x: f64) -> Rgb<u8> {
        if x.is_nan() {
            return NAN_COLOUR;
        }
        let x = x.clamp(0.0, 1.0);
        let anchors = self.anchors();
        let upper = anchors
            .iter()
            .position(|(pos, _)| *pos >= x)
            .unwrap_or(anchors.len() - 1)
            .max(1);
        let (p0, c0) = anchors[upper - 1];
        let (p1, c1) = anchors[upper];
        let t = if p1 > p0 { (x - p0) / (p1 - p0) } else { 0.0 };
        let mix = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8;
        Rgb([mix(c0[0], c1[0]), mix(c0[1], c1[1]), mix(c0[2], c1[2])])
    }
}

/// How a field is turned into pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatmapOptions {
    pub norm: Normalize,
    pub colormap: Colormap,
    pub transform: Transform,
    pub cell_width: u32,
    pub cell_height: u32,
    /// Zero disables the colour bar
    pub colorbar_width: u32,
}

impl HeatmapOptions {
    pub fn new(norm: Normalize) -> Self {
        Self {
            norm,
            colormap: Colormap::Balance,
            transform: Transform::Identity,
            cell_width: 3,
            cell_height: 8,
            colorbar_width: 16,
        }
    }
}

/// Indices of time steps falling on the 15th, with `%Y-%m` labels.
pub fn month_ticks(times: &[NaiveDateTime]) -> Vec<(usize, String)> {
    times
        .iter()
        .enumerate()
        .filter(|(_, t)| t.day() == 15)
        .map(|(i, t)| (i, t.format("%Y-%m").to_string()))
        .collect()
}

/// `%Y-%m-%d` label for every time step
pub fn time_labels(times: &[NaiveDateTime]) -> Vec<String> {
    times
        .iter()
        .map(|t| t.format("%Y-%m-%d").to_string())
        .collect()
}

/// Renders a `(depth, time)` field.
pub fn render_heatmap(data: &Array2<f64>, opts: &HeatmapOptions) -> Result<RgbImage> {
    let (n_depth, n_time) = data.dim();
    if n_depth == 0 || n_time == 0 {
        return Err(PapaError::InvalidArgument(
            "cannot render an empty field".to_string(),
        ));
    }
    if opts.cell_width == 0 || opts.cell_height == 0 {
        return Err(PapaError::InvalidArgument(
            "cell size must be positive".to_string(),
        ));
    }

    let too_large = || {
        PapaError::InvalidArgument(format!(
            "heatmap of {}x{} cells does not fit in an image",
            n_time, n_depth
        ))
    };
    let field_width = u32::try_from(n_time)
        .ok()
        .and_then(|n| n.checked_mul(opts.cell_width))
        .ok_or_else(too_large)?;
    let height = u32::try_from(n_depth)
        .ok()
        .and_then(|n| n.checked_mul(opts.cell_height))
        .ok_or_else(too_large)?;
    let width = if opts.colorbar_width > 0 {
        field_width
            .checked_add(COLORBAR_GAP)
            .and_then(|w| w.checked_add(opts.colorbar_width))
            .ok_or_else(too_large)?
    } else {
        field_width
    };

    let colours = data.mapv(|v| {
        opts.colormap
            .colour(opts.norm.apply(opts.transform.apply(v)))
    });

    let bar_start = field_width + COLORBAR_GAP;
    let img = RgbImage::from_fn(width, height, |x, y| {
        if x < field_width {
            let time = (x / opts.cell_width) as usize;
            let depth = (y / opts.cell_height) as usize;
            colours[[depth, time]]
        } else if opts.colorbar_width > 0 && x >= bar_start {
            // top of the bar is vmax
            let frac = if height > 1 {
                1.0 - f64::from(y) / f64::from(height - 1)
            } else {
                0.5
            };
            opts.colormap.colour(frac)
        } else {
            BACKGROUND
        }
    });
    Ok(img)
}

/// Pixel layout and time axis of a saved heatmap
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapLayout {
    pub width: u32,
    pub height: u32,
    pub ticks: Vec<(usize, String)>,
}

/// Renders the field and writes it as PNG.
pub fn save_heatmap(
    path: &Path,
    title: &str,
    data: &Array2<f64>,
    times: &[NaiveDateTime],
    opts: &HeatmapOptions,
) -> Result<HeatmapLayout> {
    if times.len() != data.ncols() {
        return Err(PapaError::ShapeMismatch {
            context: "time axis of heatmap".to_string(),
            left: vec![times.len()],
            right: vec![data.ncols()],
        });
    }
    let img = render_heatmap(data, opts)?;
    img.save(path)?;

    let ticks = month_ticks(times);
    log::info!(
        "{}: {}x{} px, {} month ticks ({})",
        title,
        img.width(),
        img.height(),
        ticks.len(),
        ticks
            .iter()
            .map(|(_, label)| label.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(HeatmapLayout {
        width: img.width(),
        height: img.height(),
        ticks,
    })
}
