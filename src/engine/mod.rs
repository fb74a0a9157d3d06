pub mod adjust;
pub mod bias;
pub mod error;
pub mod feedback;
pub mod gate;
pub mod lifecycle;
pub mod prediction;
pub mod recommend;
pub mod segments;
pub mod thresholds;
pub mod tuning;

pub use bias::{apply_bias, BiasCorrection};
pub use error::EngineError;
pub use feedback::{generate_config_from_feedback, SegmentationReport};
pub use gate::{check_performance_gate, PerformanceGateResult};
pub use lifecycle::ConfigManager;
pub use prediction::{OddsSnapshot, PredictionInput};
pub use recommend::{generate_tuned_recommendations, Recommendation};
pub use segments::{ats_summary, build_segmentation_report};
pub use tuning::{Rollout, RolloutMode, TuningConfig};
