//! Testtrace - static test reachability for compiled solutions.
//!
//! Testtrace classifies every method of a multi-project solution as
//! tested or untested without running anything. A method is tested when
//! it carries a test marker attribute, or when a marked method calls it,
//! directly or through any chain of other methods.
//!
//! # Architecture
//!
//! - `model`: the `ProgramModel` trait and the `Snapshot` implementation
//!   loaded from YAML/JSON solution descriptions
//! - `analysis`: qualified names, assignability closure, marker detection,
//!   classification and the per-project runner
//! - `config`: YAML configuration (marker types, propagation mode)
//! - `coverage`: tested-share summary and threshold check
//! - `report`: output formatting (text, pretty, JSON)
//!
//! # Plugging in another front end
//!
//! Implement `model::ProgramModel` over your compiler's semantic model and
//! hand it to `analysis::Runner`. Caller lookup must be solution-wide.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod coverage;
pub mod model;
pub mod report;

pub use analysis::{
    assignability_closure, qualified_name, AnalysisError, AnalysisResult, ClassifiedMethod,
    Classifier, MarkerDetector, MarkerSet, Propagation, Runner,
};
pub use config::Config;
pub use coverage::CoverageSummary;
pub use model::{CancelToken, ModelError, ProgramModel, Snapshot, SymbolId, SymbolTree};

/// Install the stderr log subscriber.
///
/// Honors `RUST_LOG`; defaults to warnings only. Call this once at startup.
pub fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    // A subscriber may already be installed when embedded in another tool.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
