use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("No account values to roll up")]
    EmptyInput,

    #[error("Bucket interval must be positive and at most 50 years, got {0}")]
    InvalidInterval(String),

    #[error("{buckets} buckets requested, at most {max} allowed; use a wider interval")]
    TooManyBuckets { buckets: i128, max: usize },

    #[error("Failed to round timestamp to the bucket grid: {0}")]
    Rounding(String),
}
