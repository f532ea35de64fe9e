

pub mod classifier;

pub use classifier::{classify, is_complete, quality_score, QualityTier, MAX_REALISTIC_MARKUP_PCT};
