use thiserror::Error;

/// Stage-level failures. File and parse problems at the I/O boundary are
/// reported through `anyhow` instead; everything here aborts the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid bounding box [{west}, {south}, {east}, {north}]: min must be strictly below max on both axes")]
    InvalidBoundingBox {
        west: f64,
        south: f64,
        east: f64,
        north: f64,
    },

    #[error("invalid cell side {0}: hexagon edge length must be positive")]
    InvalidCellSide(f64),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("insufficient data: {values} values cannot fill {classes} classes")]
    InsufficientData { values: usize, classes: usize },

    #[error("count {count} is above the largest symbol breakpoint {max_break}")]
    UnboundedCount { count: u32, max_break: f64 },
}
