use std::fmt;

use thiserror::Error;

/// Which model call an inference failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelStage {
    Classification,
    Regression,
    Importance,
}

impl fmt::Display for ModelStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ModelStage::Classification => "classification",
            ModelStage::Regression => "regression",
            ModelStage::Importance => "feature-importance",
        };
        f.write_str(label)
    }
}

/// Failures raised by a loaded model bundle while transforming or scoring a record.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("column `{0}` is missing from the feature record")]
    MissingColumn(String),

    #[error("column `{column}` expected a {expected} value")]
    TypeMismatch {
        column: String,
        expected: &'static str,
    },

    #[error("schema mismatch: model expects {expected} features, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },

    #[error("malformed model output: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum AssessmentError {
    #[error("invalid value for `{field}`: {message}")]
    Validation { field: String, message: String },

    #[error("{stage} model failed: {source}")]
    Inference {
        stage: ModelStage,
        #[source]
        source: ModelError,
    },

    #[error("model artifact {artifact} is misconfigured: {message}")]
    Configuration { artifact: String, message: String },
}

impl AssessmentError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AssessmentError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn inference(stage: ModelStage, source: ModelError) -> Self {
        AssessmentError::Inference { stage, source }
    }

    pub fn configuration(artifact: impl Into<String>, message: impl Into<String>) -> Self {
        AssessmentError::Configuration {
            artifact: artifact.into(),
            message: message.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AssessmentError::Validation { .. })
    }
}

pub type Result<T> = std::result::Result<T, AssessmentError>;
