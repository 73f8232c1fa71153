use thiserror::Error;

/// Errors that stop a run before any packing starts. Parts that do not fit
/// are reported in the solution instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlannerError {
    #[error("stock dimensions must be positive, got {length}x{width}")]
    InvalidStock { length: f64, width: f64 },

    #[error("parameter {name} must be a non-negative number, got {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("{count} pieces requested, at most {limit} per run")]
    TooManyPieces { count: u64, limit: u64 },

    #[error("squaring cut of {squaring} leaves no usable length on a {length} panel")]
    NoUsableArea { squaring: f64, length: f64 },
}
