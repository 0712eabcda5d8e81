//! Inference and analytic models applied to coupled-run fields
//!
//! A model takes N input arrays and hands back its outputs as arrays. When at
//! least one input is missing the model must answer with a missing value for
//! every awaited output, so the caller never receives a partial result.
//! Inputs may be reshaped or transformed freely inside the model.

use crate::errors::{PapaError, Result};
use crate::netcdf_io::{variable_attributes, NetCDFWriter, Storage};
use ndarray::ArrayD;
use netcdf::File;
use std::collections::BTreeMap;
use std::path::Path;

/// A field that may be absent
pub type Field = Option<ArrayD<f64>>;

/// True when at least one input is missing.
pub fn is_none(inputs: &[Field]) -> bool {
    inputs.iter().any(Option::is_none)
}

/// Adds 100 to every element of the field (Liang et al. 2022 reference model).
pub fn add_100(field: Option<&ArrayD<f64>>) -> Field {
    field.map(|f| f + 100.0)
}

/// Contract every inference model satisfies
pub trait InferenceModel: Send + Sync {
    fn name(&self) -> &str;

    fn n_inputs(&self) -> usize;

    fn n_outputs(&self) -> usize;

    /// Run the model on fully present inputs.
    fn compute(&self, inputs: &[ArrayD<f64>]) -> Result<Vec<ArrayD<f64>>>;

    /// Run the model, honouring the missing-input rule.
    fn infer(&self, inputs: &[Field]) -> Result<Vec<Field>> {
        if inputs.len() != self.n_inputs() {
            return Err(PapaError::InvalidArgument(format!(
                "model '{}' expects {} inputs, got {}",
                self.name(),
                self.n_inputs(),
                inputs.len()
            )));
        }
        if is_none(inputs) {
            log::debug!("model '{}' received a missing input", self.name());
            return Ok(vec![None; self.n_outputs()]);
        }

        let present: Vec<ArrayD<f64>> = inputs.iter().flatten().cloned().collect();
        let outputs = self.compute(&present)?;
        if outputs.len() != self.n_outputs() {
            return Err(PapaError::Generic(format!(
                "model '{}' produced {} outputs, declared {}",
                self.name(),
                outputs.len(),
                self.n_outputs()
            )));
        }
        Ok(outputs.into_iter().map(Some).collect())
    }
}

/// Trivial SST model: `sst + 100`
#[derive(Debug, Default, Clone, Copy)]
pub struct Add100;

impl InferenceModel for Add100 {
    fn name(&self) -> &str {
        "add_100"
    }

    fn n_inputs(&self) -> usize {
        1
    }

    fn n_outputs(&self) -> usize {
        1
    }

    fn compute(&self, inputs: &[ArrayD<f64>]) -> Result<Vec<ArrayD<f64>>> {
        Ok(add_100(inputs.first()).into_iter().collect())
    }
}

/// Models available by name
pub struct ModelRegistry {
    models: BTreeMap<String, Box<dyn InferenceModel>>,
}

impl ModelRegistry {
    pub fn empty() -> Self {
        Self {
            models: BTreeMap::new(),
        }
    }

    /// Registry with the built-in models
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(Add100));
        registry
    }

    pub fn register(&mut self, model: Box<dyn InferenceModel>) {
        self.models.insert(model.name().to_string(), model);
    }

    pub fn get(&self, name: &str) -> Result<&dyn InferenceModel> {
        self.models
            .get(name)
            .map(|m| m.as_ref())
            .ok_or_else(|| PapaError::UnknownModel {
                name: name.to_string(),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Outcome of [`apply_model_to_netcdf`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelRun {
    /// Outputs were written under these names
    Written(Vec<String>),
    /// An input variable was absent, nothing was written
    MissingInput(Vec<String>),
}

/// Feeds dataset variables to a model and writes the outputs to `output`.
///
/// Variables absent from `input` are passed to the model as missing fields.
/// Outputs are laid out on the dimensions of the first input; a single-output
/// model keeps the first input's name and attributes.
pub fn apply_model_to_netcdf(
    input: &File,
    output: &Path,
    model: &dyn InferenceModel,
    var_names: &[String],
) -> Result<ModelRun> {
    let mut fields = Vec::with_capacity(var_names.len());
    let mut missing = Vec::new();
    let mut layout: Option<Vec<String>> = None;

    for name in var_names {
        if input.variable(name).is_none() {
            log::warn!("variable '{}' not found, passing it as missing", name);
            missing.push(name.clone());
            fields.push(None);
            continue;
        }
        let (data, dims) = crate::netcdf_io::read_variable_f64(input, name)?;
        layout.get_or_insert(dims);
        fields.push(Some(data));
    }

    let outputs = model.infer(&fields)?;
    if is_none(&outputs) {
        return Ok(ModelRun::MissingInput(missing));
    }

    let dims = layout.unwrap_or_default();
    let single = outputs.len() == 1;
    let attrs = match (single, var_names.first().and_then(|n| input.variable(n))) {
        (true, Some(var)) => variable_attributes(&var),
        _ => Vec::new(),
    };

    let mut writer = NetCDFWriter::create(output)?;
    let mut written = Vec::with_capacity(outputs.len());
    for (i, out) in outputs.into_iter().flatten().enumerate() {
        let name = if single {
            var_names[0].clone()
        } else {
            format!("{}_{}", model.name(), i)
        };
        if out.ndim() != dims.len() {
            return Err(PapaError::ShapeMismatch {
                context: format!("output '{}' of model '{}'", name, model.name()),
                left: out.shape().to_vec(),
                right: vec![dims.len()],
            });
        }
        writer.put_variable(&name, &out, &dims, Storage::Double, &attrs)?;
        written.push(name);
    }
    writer.finish(None)?;
    Ok(ModelRun::Written(written))
}
