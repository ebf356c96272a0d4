// Vitals analysis: pure, synchronous functions over fully materialized readings.
// Storage and transport stay outside; every call recomputes from its inputs.

pub mod distribution;
pub mod report;
pub mod thresholds;
pub mod trend;

pub use distribution::distribute;
pub use report::assemble;
pub use thresholds::evaluate;
pub use trend::{AverageMode, most_common_posture, summarize, summarize_with};
