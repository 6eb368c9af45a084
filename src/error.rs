//! Error types for the aggregation pipeline.

use thiserror::Error;

/// Errors raised while computing summary tables.
///
/// `MissingColumn` and `NonNumericColumn` are schema violations and abort the
/// run. `NoNumericData` is the only recoverable condition: the correlation
/// stage turns it into a user-visible message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A column the stage relies on is absent from the dataset
    #[error("column '{column}' not found (required by {stage})")]
    MissingColumn { column: String, stage: &'static str },

    /// A column the stage averages or groups numerically holds text
    #[error("column '{column}' is not numeric (required by {stage})")]
    NonNumericColumn { column: String, stage: &'static str },

    /// The dataset has no numeric columns to correlate
    #[error("no numeric columns found in the dataset")]
    NoNumericData,
}

impl PipelineError {
    /// Whether the run should stop on this error
    pub fn is_fatal(&self) -> bool {
        !matches!(self, PipelineError::NoNumericData)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_message() {
        let err = PipelineError::MissingColumn {
            column: "rating".to_string(),
            stage: "rating distribution",
        };
        assert_eq!(
            err.to_string(),
            "column 'rating' not found (required by rating distribution)"
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_no_numeric_data_is_not_fatal() {
        assert!(!PipelineError::NoNumericData.is_fatal());
    }
}
