//! NetCDF reading and writing helpers
//!
//! Reading goes through `get_values` into plain vectors which are then shaped
//! into `ndarray` arrays using the variable's dimension lengths. Writing goes
//! through [`NetCDFWriter`], which owns the output file and stamps a
//! `history` attribute when finished.

use crate::errors::{PapaError, Result};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta, Utc};
use ndarray::{ArrayD, IxDyn};
use netcdf::types::NcVariableType;
use netcdf::{create, AttributeValue, File, FileMut, Variable};
use std::{collections::BTreeSet, fs, path::Path};

/// Depth coordinates of NEMO grid T, U and V files, in lookup order.
pub const DEPTH_CANDIDATES: [&str; 3] = ["deptht", "depthu", "depthv"];

/// Name of the NEMO time coordinate
pub const TIME_COUNTER: &str = "time_counter";

fn variable<'f>(file: &'f File, name: &str) -> Result<Variable<'f>> {
    file.variable(name)
        .ok_or_else(|| PapaError::VariableNotFound {
            var: name.to_string(),
        })
}

fn dims_and_shape(var: &Variable) -> (Vec<String>, Vec<usize>) {
    var.dimensions()
        .iter()
        .map(|d| (d.name().to_string(), d.len()))
        .unzip()
}

/// CF masking and packing attributes of a variable
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CfCoding {
    /// `_FillValue` followed by every `missing_value` entry
    pub fill_values: Vec<f64>,
    pub scale_factor: Option<f64>,
    pub add_offset: Option<f64>,
}

impl CfCoding {
    pub fn from_attributes(attributes: &[(String, AttributeValue)]) -> Self {
        let mut coding = Self::default();
        let mut missing = Vec::new();
        for (name, value) in attributes {
            match name.as_str() {
                "_FillValue" => coding.fill_values = numbers(value),
                "missing_value" => missing = numbers(value),
                "scale_factor" => coding.scale_factor = numbers(value).first().copied(),
                "add_offset" => coding.add_offset = numbers(value).first().copied(),
                _ => {}
            }
        }
        coding.fill_values.extend(missing);
        coding
    }

    pub fn is_identity(&self) -> bool {
        self.fill_values.is_empty() && self.scale_factor.is_none() && self.add_offset.is_none()
    }

    /// Stored value to physical value; fill and missing values become NaN.
    pub fn decode(&self, raw: f64) -> f64 {
        if raw.is_nan() || self.fill_values.contains(&raw) {
            return f64::NAN;
        }
        raw * self.scale_factor.unwrap_or(1.0) + self.add_offset.unwrap_or(0.0)
    }

    /// Physical value to stored value; NaN becomes the first fill value.
    pub fn encode(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.fill_values.first().copied().unwrap_or(f64::NAN);
        }
        (value - self.add_offset.unwrap_or(0.0)) / self.scale_factor.unwrap_or(1.0)
    }
}

fn numbers(value: &AttributeValue) -> Vec<f64> {
    match value {
        AttributeValue::Float(v) => vec![f64::from(*v)],
        AttributeValue::Floats(v) => v.iter().map(|&x| f64::from(x)).collect(),
        AttributeValue::Double(v) => vec![*v],
        AttributeValue::Doubles(v) => v.clone(),
        AttributeValue::Short(v) => vec![f64::from(*v)],
        AttributeValue::Shorts(v) => v.iter().map(|&x| f64::from(x)).collect(),
        AttributeValue::Int(v) => vec![f64::from(*v)],
        AttributeValue::Ints(v) => v.iter().map(|&x| f64::from(x)).collect(),
        _ => Vec::new(),
    }
}

/// Reads a whole variable as `f64`, with its dimension names.
///
/// Fill and missing values are masked to NaN and `scale_factor`/`add_offset`
/// are applied.
pub fn read_variable_f64(file: &File, name: &str) -> Result<(ArrayD<f64>, Vec<String>)> {
    let var = variable(file, name)?;
    let (dims, shape) = dims_and_shape(&var);
    let mut values: Vec<f64> = var.get_values::<f64, _>(..)?;
    let coding = CfCoding::from_attributes(&variable_attributes(&var));
    if !coding.is_identity() {
        values.iter_mut().for_each(|v| *v = coding.decode(*v));
    }
    Ok((ArrayD::from_shape_vec(IxDyn(&shape), values)?, dims))
}

/// Value of a string attribute, if present.
pub fn string_attribute(var: &Variable, attr: &str) -> Option<String> {
    match var.attribute(attr)?.value().ok()? {
        AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

fn unit_seconds(unit: &str) -> Option<f64> {
    match unit.trim().to_lowercase().as_str() {
        "second" | "seconds" | "sec" | "secs" | "s" => Some(1.0),
        "minute" | "minutes" | "min" | "mins" => Some(60.0),
        "hour" | "hours" | "hr" | "hrs" | "h" => Some(3600.0),
        "day" | "days" | "d" => Some(86_400.0),
        _ => None,
    }
}

fn parse_reference_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim().trim_end_matches('Z').trim_end_matches(" UTC");
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Decodes CF time values given a `"<unit> since <reference>"` string.
pub fn decode_time(values: &[f64], units: &str) -> Result<Vec<NaiveDateTime>> {
    let (unit, reference) = units
        .split_once(" since ")
        .ok_or_else(|| PapaError::TimeDecoding(format!("unsupported units '{}'", units)))?;
    let factor = unit_seconds(unit)
        .ok_or_else(|| PapaError::TimeDecoding(format!("unknown time unit '{}'", unit)))?;
    let origin = parse_reference_date(reference).ok_or_else(|| {
        PapaError::TimeDecoding(format!("cannot parse reference date '{}'", reference))
    })?;

    values
        .iter()
        .map(|&v| {
            if !v.is_finite() {
                return Err(PapaError::TimeDecoding(format!("non-finite time value {}", v)));
            }
            let millis = (v * factor * 1000.0).round() as i64;
            TimeDelta::try_milliseconds(millis)
                .and_then(|delta| origin.checked_add_signed(delta))
                .ok_or_else(|| PapaError::TimeDecoding(format!("time value {} out of range", v)))
        })
        .collect()
}

/// Reads and decodes the `time_counter` coordinate.
pub fn read_time_counter(file: &File) -> Result<Vec<NaiveDateTime>> {
    let var = variable(file, TIME_COUNTER)?;
    let units = string_attribute(&var, "units").ok_or_else(|| PapaError::AttributeNotFound {
        var: TIME_COUNTER.to_string(),
        attr: "units".to_string(),
    })?;
    let values: Vec<f64> = var.get_values::<f64, _>(..)?;
    decode_time(&values, &units)
}

/// Reads the first depth coordinate present in the dataset.
pub fn read_depth(file: &File) -> Result<(String, Vec<f64>)> {
    for name in DEPTH_CANDIDATES {
        if let Some(var) = file.variable(name) {
            log::debug!("using depth coordinate '{}'", name);
            return Ok((name.to_string(), var.get_values::<f64, _>(..)?));
        }
    }
    Err(PapaError::NoDepthCoordinate {
        tried: DEPTH_CANDIDATES.iter().map(|s| s.to_string()).collect(),
    })
}

fn is_numeric(var: &Variable) -> bool {
    matches!(var.vartype(), NcVariableType::Int(_) | NcVariableType::Float(_))
}

/// A variable named after its only dimension, or listed in another
/// variable's `coordinates` attribute
fn is_coordinate(var: &Variable, auxiliary: &BTreeSet<String>) -> bool {
    let dims = var.dimensions();
    (dims.len() == 1 && dims[0].name() == var.name()) || auxiliary.contains(&var.name())
}

/// Names listed in the `coordinates` attribute of any variable
pub fn auxiliary_coordinates(file: &File) -> BTreeSet<String> {
    file.variables()
        .filter_map(|var| string_attribute(&var, "coordinates"))
        .flat_map(|list| {
            list.split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// How a variable is stored by [`NetCDFWriter::put_variable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// 64-bit float, uncompressed
    Double,
    /// 32-bit float, uncompressed
    Float,
    /// 32-bit float with zlib compression and shuffle
    FloatCompressed,
}

/// Output NetCDF file under construction
pub struct NetCDFWriter {
    file: FileMut,
}

impl NetCDFWriter {
    /// Create the output file, replacing any existing one.
    pub fn create(output_path: &Path) -> Result<Self> {
        if output_path.exists() {
            fs::remove_file(output_path)?;
        }
        Ok(Self {
            file: create(output_path)?,
        })
    }

    /// Add a dimension unless one with the same name and length exists.
    pub fn ensure_dimension(&mut self, name: &str, len: usize) -> Result<()> {
        let existing = self.file.dimension(name).map(|d| d.len());
        match existing {
            Some(found) if found == len => Ok(()),
            Some(found) if self.is_unlimited(name) && found == 0 => Ok(()),
            Some(found) => Err(PapaError::ShapeMismatch {
                context: format!("dimension '{}'", name),
                left: vec![found],
                right: vec![len],
            }),
            None => {
                self.file.add_dimension(name, len)?;
                Ok(())
            }
        }
    }

    /// Add an unlimited dimension unless it already exists.
    pub fn ensure_unlimited_dimension(&mut self, name: &str) -> Result<()> {
        if self.file.dimension(name).is_none() {
            self.file.add_unlimited_dimension(name)?;
        }
        Ok(())
    }

    fn is_unlimited(&self, name: &str) -> bool {
        self.file
            .dimension(name)
            .map(|d| d.is_unlimited())
            .unwrap_or(false)
    }

    /// Write a variable laid out on `dims`, creating missing dimensions.
    pub fn put_variable(
        &mut self,
        name: &str,
        data: &ArrayD<f64>,
        dims: &[String],
        storage: Storage,
        attributes: &[(String, AttributeValue)],
    ) -> Result<()> {
        if dims.len() != data.ndim() {
            return Err(PapaError::ShapeMismatch {
                context: format!("dimensions of '{}'", name),
                left: vec![dims.len()],
                right: vec![data.ndim()],
            });
        }
        for (dim, &len) in dims.iter().zip(data.shape()) {
            self.ensure_dimension(dim, len)?;
        }

        let dim_refs: Vec<&str> = dims.iter().map(|s| s.as_str()).collect();
        let start = vec![0usize; data.ndim()];
        let count = data.shape().to_vec();
        let coding = CfCoding::from_attributes(attributes);
        let values: Vec<f64> = if coding.is_identity() {
            data.iter().copied().collect()
        } else {
            data.iter().map(|&v| coding.encode(v)).collect()
        };

        match storage {
            Storage::Double => {
                let mut var = self.file.add_variable::<f64>(name, &dim_refs)?;
                put_attributes(&mut var, attributes, false)?;
                var.put_values(&values, (start.as_slice(), count.as_slice()))?;
            }
            Storage::Float | Storage::FloatCompressed => {
                let mut var = self.file.add_variable::<f32>(name, &dim_refs)?;
                if storage == Storage::FloatCompressed {
                    var.set_compression(4, true)?;
                }
                put_attributes(&mut var, attributes, true)?;
                let narrowed: Vec<f32> = values.iter().map(|&v| v as f32).collect();
                var.put_values(&narrowed, (start.as_slice(), count.as_slice()))?;
            }
        }
        Ok(())
    }

    pub fn put_global_attribute(&mut self, name: &str, value: AttributeValue) -> Result<()> {
        self.file.add_attribute(name, value)?;
        Ok(())
    }

    /// Stamp the `history` attribute and close the file.
    pub fn finish(mut self, previous_history: Option<String>) -> Result<()> {
        let stamp = format!("Created by papa_tools on {}", Utc::now().to_rfc3339());
        let history = match previous_history {
            Some(prev) if !prev.is_empty() => format!("{}\n{}", stamp, prev),
            _ => stamp,
        };
        self.file.add_attribute("history", history)?;
        Ok(())
    }
}

fn put_attributes(
    var: &mut netcdf::VariableMut,
    attributes: &[(String, AttributeValue)],
    narrow_fill: bool,
) -> Result<()> {
    for (name, value) in attributes {
        let value = match (name.as_str(), value) {
            ("_FillValue" | "missing_value", v) => match numbers(v).as_slice() {
                [] => continue,
                [fill] if narrow_fill => AttributeValue::Float(*fill as f32),
                [fill] => AttributeValue::Double(*fill),
                many if narrow_fill => {
                    AttributeValue::Floats(many.iter().map(|&f| f as f32).collect())
                }
                many => AttributeValue::Doubles(many.to_vec()),
            },
            _ => value.clone(),
        };
        var.put_attribute(name, value)?;
    }
    Ok(())
}

/// All readable attributes of a variable
pub fn variable_attributes(var: &Variable) -> Vec<(String, AttributeValue)> {
    var.attributes()
        .filter_map(|attr| match attr.value() {
            Ok(value) => Some((attr.name().to_string(), value)),
            Err(e) => {
                log::warn!("skipped unreadable attribute '{}': {}", attr.name(), e);
                None
            }
        })
        .collect()
}

fn global_history(file: &File) -> Option<String> {
    match file.attribute("history")?.value().ok()? {
        AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

/// Writes a single `f64` field to a fresh file.
pub fn write_variable_f64(
    output: &Path,
    name: &str,
    data: &ArrayD<f64>,
    dims: &[String],
    attributes: &[(&str, &str)],
    as_double: bool,
) -> Result<()> {
    let attrs: Vec<(String, AttributeValue)> = attributes
        .iter()
        .map(|(k, v)| (k.to_string(), AttributeValue::Str(v.to_string())))
        .collect();
    let storage = if as_double {
        Storage::Double
    } else {
        Storage::Float
    };
    let mut writer = NetCDFWriter::create(output)?;
    writer.put_variable(name, data, dims, storage, &attrs)?;
    writer.finish(None)
}

/// Summary of a [`save_compressed`] run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompressionReport {
    pub compressed: Vec<String>,
    pub coordinates: Vec<String>,
    pub skipped: Vec<String>,
}

/// Copies a dataset, storing every data variable as zlib-compressed `f32`.
///
/// Coordinate variables, including those named in a `coordinates`
/// attribute, keep double precision. Unlimited dimensions stay unlimited. Non-numeric variables are
/// skipped with a warning.
pub fn save_compressed(input: &File, output_path: &Path) -> Result<CompressionReport> {
    let mut writer = NetCDFWriter::create(output_path)?;
    let mut report = CompressionReport::default();

    for dim in input.dimensions() {
        if dim.is_unlimited() {
            writer.ensure_unlimited_dimension(&dim.name())?;
        } else {
            writer.ensure_dimension(&dim.name(), dim.len())?;
        }
    }
    let auxiliary = auxiliary_coordinates(input);

    for var in input.variables() {
        let name = var.name().to_string();
        if !is_numeric(&var) {
            log::warn!("skipped non-numeric variable '{}'", name);
            report.skipped.push(name);
            continue;
        }
        let (data, dims) = read_variable_f64(input, &name)?;
        let attrs = variable_attributes(&var);
        if is_coordinate(&var, &auxiliary) {
            writer.put_variable(&name, &data, &dims, Storage::Double, &attrs)?;
            report.coordinates.push(name);
        } else {
            writer.put_variable(&name, &data, &dims, Storage::FloatCompressed, &attrs)?;
            report.compressed.push(name);
        }
    }

    for attr in input.attributes() {
        if attr.name() == "history" {
            continue;
        }
        writer.put_global_attribute(attr.name(), attr.value()?)?;
    }
    writer.finish(global_history(input))?;

    log::info!(
        "wrote {} compressed and {} coordinate variables to {}",
        report.compressed.len(),
        report.coordinates.len(),
        output_path.display()
    );
    Ok(report)
}
