//! Saturation vapour pressure and relative humidity
//!
//! Transcription of the COARE bulk flux package formulas. Temperatures are in
//! degrees Celsius, pressures in millibar and specific humidity in kg/kg
//! unless [`HumidityUnits::GPerKg`] is requested.
//!
//! The array forms follow NumPy broadcasting, so a scalar surface pressure can
//! be combined with a full temperature field.

use crate::errors::{PapaError, Result};
use crate::netcdf_io::{read_variable_f64, write_variable_f64};
use ndarray::{ArrayD, ArrayViewD, IxDyn, Zip};
use netcdf::File;
use std::path::Path;

/// Ratio of the molecular weights of water vapour and dry air
const EPSILON: f64 = 0.622;

/// Unit of the specific humidity input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HumidityUnits {
    #[default]
    KgPerKg,
    GPerKg,
}

impl HumidityUnits {
    fn to_kg_per_kg(self, q: f64) -> f64 {
        match self {
            Self::KgPerKg => q,
            Self::GPerKg => q / 1000.0,
        }
    }
}

/// Saturation vapour pressure (mb) at temperature `t` (°C) and pressure `p` (mb).
///
/// After Buck, 1981: J. Appl. Meteor., 20, 1527-1532.
pub fn qsat(t: f64, p: f64) -> f64 {
    let es = 6.1121 * (17.502 * t / (240.97 + t)).exp();
    es * (1.0007 + p * 3.46e-6)
}

/// Relative humidity (%) for temperature `t` (°C), pressure `p` (mb) and
/// specific humidity `q` (kg/kg).
pub fn rhcalc(t: f64, p: f64, q: f64) -> f64 {
    let es = qsat(t, p);
    let em = p * q / (EPSILON + (1.0 - EPSILON) * q);
    100.0 * em / es
}

/// Common shape of several arrays under NumPy broadcasting rules.
pub(crate) fn broadcast_shape(shapes: &[&[usize]]) -> Option<Vec<usize>> {
    let ndim = shapes.iter().map(|s| s.len()).max().unwrap_or(0);
    let mut out = vec![1usize; ndim];
    for shape in shapes {
        let offset = ndim - shape.len();
        for (i, &len) in shape.iter().enumerate() {
            let slot = &mut out[offset + i];
            if *slot == 1 {
                *slot = len;
            } else if len != 1 && len != *slot {
                return None;
            }
        }
    }
    Some(out)
}

fn broadcast_all<'a>(
    context: &str,
    arrays: &[&'a ArrayD<f64>],
) -> Result<(Vec<usize>, Vec<ArrayViewD<'a, f64>>)> {
    let shapes: Vec<&[usize]> = arrays.iter().map(|a| a.shape()).collect();
    let shape = broadcast_shape(&shapes).ok_or_else(|| PapaError::ShapeMismatch {
        context: context.to_string(),
        left: shapes[0].to_vec(),
        right: shapes.get(1).map(|s| s.to_vec()).unwrap_or_default(),
    })?;

    let views = arrays
        .iter()
        .map(|a| {
            a.broadcast(IxDyn(&shape))
                .ok_or_else(|| PapaError::ShapeMismatch {
                    context: context.to_string(),
                    left: a.shape().to_vec(),
                    right: shape.clone(),
                })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((shape, views))
}

/// Element-wise [`qsat`] with broadcasting.
pub fn qsat_array(t: &ArrayD<f64>, p: &ArrayD<f64>) -> Result<ArrayD<f64>> {
    let (shape, views) = broadcast_all("qsat", &[t, p])?;
    let mut es = ArrayD::<f64>::zeros(IxDyn(&shape));
    Zip::from(&mut es)
        .and(&views[0])
        .and(&views[1])
        .par_for_each(|out, &t, &p| *out = qsat(t, p));
    Ok(es)
}

/// Element-wise [`rhcalc`] with broadcasting.
pub fn rhcalc_array(
    t: &ArrayD<f64>,
    p: &ArrayD<f64>,
    q: &ArrayD<f64>,
    units: HumidityUnits,
) -> Result<ArrayD<f64>> {
    let (shape, views) = broadcast_all("rhcalc", &[t, p, q])?;
    let mut rh = ArrayD::<f64>::zeros(IxDyn(&shape));
    Zip::from(&mut rh)
        .and(&views[0])
        .and(&views[1])
        .and(&views[2])
        .par_for_each(|out, &t, &p, &q| *out = rhcalc(t, p, units.to_kg_per_kg(q)));
    Ok(rh)
}

/// Names of the temperature, pressure and humidity variables in a dataset
#[derive(Debug, Clone)]
pub struct HumidityFields {
    pub temperature: String,
    pub pressure: String,
    pub specific_humidity: String,
}

impl Default for HumidityFields {
    fn default() -> Self {
        Self {
            temperature: "ta".to_string(),
            pressure: "p".to_string(),
            specific_humidity: "qa".to_string(),
        }
    }
}

/// Relative humidity for a whole dataset.
///
/// Returns the field together with the dimension names of the temperature
/// variable, which the result is laid out on.
pub fn rhcalc_netcdf(
    file: &File,
    fields: &HumidityFields,
    units: HumidityUnits,
) -> Result<(ArrayD<f64>, Vec<String>)> {
    let (ta, dims) = read_variable_f64(file, &fields.temperature)?;
    let (p, _) = read_variable_f64(file, &fields.pressure)?;
    let (qa, _) = read_variable_f64(file, &fields.specific_humidity)?;

    let rh = rhcalc_array(&ta, &p, &qa, units)?;
    if rh.shape() != ta.shape() {
        return Err(PapaError::ShapeMismatch {
            context: format!("relative humidity on '{}'", fields.temperature),
            left: rh.shape().to_vec(),
            right: ta.shape().to_vec(),
        });
    }
    log::info!("computed relative humidity over {} points", rh.len());
    Ok((rh, dims))
}

/// Compute relative humidity from `input` and store it as `rh` in `output`.
pub fn write_rh_netcdf(
    input: &File,
    output: &Path,
    fields: &HumidityFields,
    units: HumidityUnits,
) -> Result<()> {
    let (rh, dims) = rhcalc_netcdf(input, fields, units)?;
    let ta = input
        .variable(&fields.temperature)
        .ok_or_else(|| PapaError::VariableNotFound {
            var: fields.temperature.clone(),
        })?;
    let as_double = matches!(
        ta.vartype(),
        netcdf::types::NcVariableType::Float(netcdf::types::FloatType::F64)
    );
    write_variable_f64(
        output,
        "rh",
        &rh,
        &dims,
        &[("units", "%"), ("long_name", "relative humidity")],
        as_double,
    )
}
