//! TUI tab implementations

pub mod delta;
pub mod national;

pub use delta::DeltaTab;
pub use national::{ChartSource, NationalTab};
