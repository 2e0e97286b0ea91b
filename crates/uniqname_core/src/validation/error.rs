use thiserror::Error;

use crate::validation::infrastructure::subject::SubjectId;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ValidationError {
    #[error("Validation error, internal coordination error")]
    InternalError,

    #[error("Validation error, directory query failed ({0})")]
    DirectoryQueryFailure(String),

    #[error("Validation error, no message for key {key} (locale: {locale})")]
    LocalizationFailure { locale: String, key: String },

    #[error("Validation error, wait for last name cancelled (subject: {0})")]
    WaitCancelled(SubjectId),

    #[error("Validation error, coordination state poisoned (subject: {0})")]
    CoordinationStatePoisoned(SubjectId),
}
