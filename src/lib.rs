//! Combinatorial paired-guide libraries for dual-targeting CRISPR screens.
//!
//! Requested gene pairs are expanded into every guide x guide combination,
//! each gene is paired with a sample of control guides, control pairs are added
//! for background calibration, and every pair sharing too long a stretch of
//! sequence with its partner is dropped.

pub mod design;
pub mod enumerate;
pub mod errors;
pub mod gene_pairs;
pub mod guide;
pub mod output;
pub mod overlap;
pub mod pool;
pub mod processor;
pub mod table;

pub use errors::{DualGuideError, Result};
