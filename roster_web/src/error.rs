use shared::error::InitializationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MainError {
    #[error(transparent)]
    Init(#[from] InitializationError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Per-field problems found before a duty is sent to the service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Data jest wymagana")]
    MissingDate,
    #[error("Nieprawidłowa data: {0}")]
    InvalidDate(String),
    #[error("Wybierz typ dyżuru")]
    MissingType,
    #[error("Nieznany typ dyżuru: {0}")]
    UnknownType(String),
    #[error("Wybierz kuriera")]
    MissingWorker,
    #[error("Nieznany kurier: {0}")]
    UnknownWorker(String),
}
