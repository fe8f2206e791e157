pub mod keywords;
pub mod relevance;

pub use keywords::extract_keywords;
pub use relevance::{ValidationThresholds, validate, video_keywords};
