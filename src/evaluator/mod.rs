//! Evaluator Module
//!
//! Compares original/replacement logo pairs and aggregates batches of them.

mod batch;
mod export;
mod pair;

pub use batch::{BatchOptions, BatchProgress, BatchReport, BatchRunner, IdRange, PairSource};
pub use export::write_exports;
pub use pair::{
    is_below_threshold, validate_threshold, EvaluatorSettings, PairEvaluator, PairRequest,
    PairResult,
};
