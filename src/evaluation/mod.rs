

pub mod models;
pub mod runner;

pub use models::{
    load_test_set, Comparison, EvaluationResult, EvaluationSummary, TestCase, Tolerances,
    ZERO_TRUTH_ALLOWANCE,
};
pub use runner::Evaluator;
