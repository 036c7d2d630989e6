//! Domain types for drug interaction analysis.

mod analysis;
mod patient;
mod rule;
mod severity;

pub use analysis::*;
pub use patient::*;
pub use rule::*;
pub use severity::*;
