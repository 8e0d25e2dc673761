//! Correlates a day's anomalies with campaign and news context and decides,
//! per anomaly, whether that context plausibly explains it.

pub mod alignment;
pub mod classifier;
pub mod day;
pub mod index;
pub mod merger;
pub mod prompt;
pub mod runner;

pub use alignment::{is_eligible, Direction};
pub use classifier::{
    Candidate, Classifier, ClassifierConfig, GenerationRequest, GenerationResponse, ModelTransport,
    SemanticClassifier, TransportError, Verdict,
};
pub use day::yesterday_in;
pub use index::ContextIndex;
pub use merger::merge;
pub use runner::{BatchRunner, RunError, RunOptions, RunResult, RunState, RunStatus, RunnerConfig};
