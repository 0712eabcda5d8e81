//! Centralized error handling for papa_tools
//!
//! Every fallible operation in the crate returns [`Result`], whose error type
//! keeps the NetCDF, I/O and image errors it wraps available via `source()`.

use std::fmt;

/// Main error type for papa_tools operations
#[derive(Debug)]
pub enum PapaError {
    /// NetCDF file operation errors
    NetCDFError(netcdf::Error),

    /// I/O operation errors
    IoError(std::io::Error),

    /// Variable not found in a NetCDF file
    VariableNotFound { var: String },

    /// Attribute missing on a variable
    AttributeNotFound { var: String, attr: String },

    /// None of the candidate depth coordinates exist in the dataset
    NoDepthCoordinate { tried: Vec<String> },

    /// Two arrays that must line up do not
    ShapeMismatch { context: String, left: Vec<usize>, right: Vec<usize> },

    /// CF time axis could not be decoded
    TimeDecoding(String),

    /// Bad user supplied argument
    InvalidArgument(String),

    /// Model name not present in the registry
    UnknownModel { name: String },

    /// Preset file or preset lookup problem
    ConfigError(String),

    /// PNG or GIF encoding errors
    ImageError(image::ImageError),

    /// JSON (de)serialization errors
    JsonError(serde_json::Error),

    /// Thread pool configuration error
    ThreadPoolError(String),

    /// Array shape or dimension error
    ArrayError(ndarray::ShapeError),

    /// Anything else
    Generic(String),
}

impl fmt::Display for PapaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PapaError::NetCDFError(e) => write!(f, "NetCDF error: {}", e),
            PapaError::IoError(e) => write!(f, "I/O error: {}", e),
            PapaError::VariableNotFound { var } => write!(f, "Variable '{}' not found in file", var),
            PapaError::AttributeNotFound { var, attr } => {
                write!(f, "Attribute '{}' not found on variable '{}'", attr, var)
            }
            PapaError::NoDepthCoordinate { tried } => {
                write!(f, "No depth coordinate found (tried {})", tried.join(", "))
            }
            PapaError::ShapeMismatch { context, left, right } => {
                write!(f, "Shape mismatch in {}: {:?} vs {:?}", context, left, right)
            }
            PapaError::TimeDecoding(msg) => write!(f, "Time decoding error: {}", msg),
            PapaError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            PapaError::UnknownModel { name } => write!(f, "Unknown model '{}'", name),
            PapaError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            PapaError::ImageError(e) => write!(f, "Image error: {}", e),
            PapaError::JsonError(e) => write!(f, "JSON error: {}", e),
            PapaError::ThreadPoolError(msg) => write!(f, "Thread pool error: {}", msg),
            PapaError::ArrayError(e) => write!(f, "Array error: {}", e),
            PapaError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for PapaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PapaError::NetCDFError(e) => Some(e),
            PapaError::IoError(e) => Some(e),
            PapaError::ImageError(e) => Some(e),
            PapaError::JsonError(e) => Some(e),
            PapaError::ArrayError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<netcdf::Error> for PapaError {
    fn from(error: netcdf::Error) -> Self {
        PapaError::NetCDFError(error)
    }
}

impl From<std::io::Error> for PapaError {
    fn from(error: std::io::Error) -> Self {
        PapaError::IoError(error)
    }
}

impl From<ndarray::ShapeError> for PapaError {
    fn from(error: ndarray::ShapeError) -> Self {
        PapaError::ArrayError(error)
    }
}

impl From<image::ImageError> for PapaError {
    fn from(error: image::ImageError) -> Self {
        PapaError::ImageError(error)
    }
}

impl From<serde_json::Error> for PapaError {
    fn from(error: serde_json::Error) -> Self {
        PapaError::JsonError(error)
    }
}

impl From<String> for PapaError {
    fn from(error: String) -> Self {
        PapaError::Generic(error)
    }
}

impl From<&str> for PapaError {
    fn from(error: &str) -> Self {
        PapaError::Generic(error.to_string())
    }
}

/// Result type alias for papa_tools operations
pub type Result<T> = std::result::Result<T, PapaError>;
