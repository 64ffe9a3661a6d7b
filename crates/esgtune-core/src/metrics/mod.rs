pub mod classification;
pub mod report;

pub use classification::{
    Average, LabelConfusion, apply_threshold, apply_thresholds, exact_match_accuracy, f1_score,
    per_label_f1,
};
pub use report::{MetricsAggregator, MetricsReport};
