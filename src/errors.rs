//! Error types for library generation.

use thiserror::Error;

/// Result type alias for dualguide operations
pub type Result<T> = std::result::Result<T, DualGuideError>;

/// Error type for dualguide operations
#[derive(Error, Debug)]
pub enum DualGuideError {
    /// A guide sequence contains a character outside A/C/G/T
    #[error("Invalid sequence '{sequence}' for '{label}': unexpected base '{base}'")]
    InvalidSequence {
        /// The offending sequence
        sequence: String,
        /// Gene symbol or control label carried by the record
        label: String,
        /// First character that is not A, C, G or T
        base: char,
    },

    /// A control pool is smaller than a single requested draw
    #[error("Control pool '{pool}' holds {available} sequences but {requested} were requested")]
    InsufficientPool {
        /// Name of the pool
        pool: String,
        /// Size of the full, reset pool
        available: usize,
        /// Number of controls requested
        requested: usize,
    },

    /// A gene pair field does not split into exactly two symbols
    #[error("Malformed gene pair '{value}' on row {row}: {reason}")]
    MalformedSpec {
        /// The raw field value
        value: String,
        /// 1-based data row in the input table
        row: usize,
        /// Explanation of the problem
        reason: String,
    },

    /// A serialized output field does not decompose into its parts
    #[error("Malformed output field '{value}': {reason}")]
    MalformedRecord {
        /// The raw field value
        value: String,
        /// Explanation of the problem
        reason: String,
    },

    /// A gene symbol or control label contains the record delimiter
    #[error("Label '{label}' may not contain ':'")]
    InvalidLabel {
        /// The offending label
        label: String,
    },

    /// A required column is absent from an input table
    #[error("Table '{table}' has no column named '{column}'")]
    MissingColumn {
        /// Path or name of the table
        table: String,
        /// Column that was looked for
        column: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
