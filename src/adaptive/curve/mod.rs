pub mod struggle;
pub mod tracker;
pub mod trend;

pub use struggle::{detect_struggles, struggle_severity};
pub use tracker::{compute_confidence, recommend_difficulty, CurveKey, LearningCurveTracker};
pub use trend::TrendAnalyzer;
