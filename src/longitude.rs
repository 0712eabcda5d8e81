//! Longitude wrapping onto the 0-360 convention

use crate::errors::{PapaError, Result};
use crate::netcdf_io::{read_variable_f64, variable_attributes, NetCDFWriter, Storage};
use ndarray::{ArrayD, Axis};
use netcdf::File;
use std::path::Path;

/// Positive longitudes are kept, anything else is shifted by 360.
///
/// Zero maps to 360, so the wrapped coordinate lies in `(0, 360]` for inputs
/// in `[-180, 180]`.
pub fn wrap_longitude(lon: f64) -> f64 {
    if lon > 0.0 {
        lon
    } else {
        360.0 + lon
    }
}

/// Stable ascending order of the wrapped coordinate. NaN sorts last.
pub fn sort_permutation(lon: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..lon.len()).collect();
    order.sort_by(|&a, &b| lon[a].total_cmp(&lon[b]));
    order
}

/// Wraps `lon` and reorders `data` along `axis` so longitude increases.
pub fn sort_longitude(
    lon: &[f64],
    data: &ArrayD<f64>,
    axis: usize,
) -> Result<(Vec<f64>, ArrayD<f64>)> {
    if axis >= data.ndim() {
        return Err(PapaError::InvalidArgument(format!(
            "axis {} out of bounds for {}-d array",
            axis,
            data.ndim()
        )));
    }
    if data.len_of(Axis(axis)) != lon.len() {
        return Err(PapaError::ShapeMismatch {
            context: "longitude axis".to_string(),
            left: vec![lon.len()],
            right: vec![data.len_of(Axis(axis))],
        });
    }

    let wrapped: Vec<f64> = lon.iter().copied().map(wrap_longitude).collect();
    let order = sort_permutation(&wrapped);
    let sorted_lon = order.iter().map(|&i| wrapped[i]).collect();
    Ok((sorted_lon, data.select(Axis(axis), &order)))
}

/// Writes `var_name` and the `lon` coordinate of `input`, sorted by wrapped
/// longitude, to `output`.
pub fn sort_longitude_netcdf(input: &File, var_name: &str, output: &Path) -> Result<()> {
    let (lon, lon_dims) = read_variable_f64(input, "lon")?;
    let lon_dim = lon_dims.first().cloned().ok_or_else(|| {
        PapaError::InvalidArgument("'lon' must be a 1-d coordinate".to_string())
    })?;
    let (data, dims) = read_variable_f64(input, var_name)?;
    let axis = dims
        .iter()
        .position(|d| *d == lon_dim)
        .ok_or_else(|| PapaError::ShapeMismatch {
            context: format!("'{}' has no '{}' dimension", var_name, lon_dim),
            left: data.shape().to_vec(),
            right: vec![lon.len()],
        })?;

    let lon: Vec<f64> = lon.iter().copied().collect();
    let (sorted_lon, sorted) = sort_longitude(&lon, &data, axis)?;

    let mut writer = NetCDFWriter::create(output)?;
    let lon_attrs = input
        .variable("lon")
        .map(|v| variable_attributes(&v))
        .unwrap_or_default();
    writer.put_variable(
        "lon",
        &ArrayD::from_shape_vec(vec![sorted_lon.len()], sorted_lon)?,
        &lon_dims,
        Storage::Double,
        &lon_attrs,
    )?;
    let var_attrs = input
        .variable(var_name)
        .map(|v| variable_attributes(&v))
        .unwrap_or_default();
    writer.put_variable(var_name, &sorted, &dims, Storage::Double, &var_attrs)?;
    writer.finish(None)
}
