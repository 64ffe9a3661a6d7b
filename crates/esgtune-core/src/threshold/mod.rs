pub mod bounded;
pub mod optimizer;

pub use bounded::{BoundedMinimum, BoundedMinimizer};
pub use optimizer::{
    DEFAULT_THRESHOLD, LabelThreshold, SEARCH_LOWER, SEARCH_UPPER, ThresholdOptimizer,
    ThresholdSearch, binary_f1,
};
