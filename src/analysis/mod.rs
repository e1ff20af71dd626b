//! The classification engine.
//!
//! - `names`: canonical qualified names (`App.Models.Outer+Inner`)
//! - `closure`: assignability closure of a type
//! - `markers`: test marker detection by closure name matching
//! - `classify`: tested/untested verdicts over the reverse call graph
//! - `runner`: per-project driver that builds the partitions

mod classify;
mod closure;
mod markers;
mod names;
mod runner;
mod types;

pub use classify::{Classifier, Propagation};
pub use closure::{assignability_closure, AnalysisError};
pub use markers::{MarkerDetector, MarkerSet};
pub use names::qualified_name;
pub use runner::Runner;
pub use types::{AnalysisResult, ClassifiedMethod, SkippedProject};
