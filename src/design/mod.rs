//! Library designs: how gene pairs become guide pairs for each nuclease setup.

pub mod cas12a;
pub mod dual;

pub use cas12a::{Cas12aConfig, Cas12aDesign, ASCAS12A_DIRECT_REPEAT};
pub use dual::{DualConfig, DualNucleaseDesign};

/// Pools at or below this size are refilled before a control-by-control draw.
pub const CALIBRATION_REUSE_MARGIN: usize = 100;
