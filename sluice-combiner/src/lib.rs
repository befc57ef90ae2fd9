//! Sluice Call Combiner
//!
//! A per-call serialization primitive for filter pipelines

mod call_combiner;

pub use call_combiner::{CallCombiner, Task};
