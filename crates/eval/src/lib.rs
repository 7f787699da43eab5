//! Scoring of LM-KBC predictions against a ground truth.

pub mod metrics;
pub mod plots;
pub mod report;
pub mod scoring;

pub use plots::generate_plots;
pub use scoring::{
    Aggregate, EvaluationResults, Evaluator, MissingPolicy, PairScore, ScoreError, Scores, ScoringVariant,
};
