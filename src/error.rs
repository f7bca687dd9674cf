//! Error types shared across the library.
//!
//! Each layer has its own enum so that a caller only ever sees the
//! failures that make sense at that level. Backend details (HTTP status
//! codes, io error kinds) are folded into `StorageError` and never reach
//! the project store's callers as anything but "not found" or
//! "backend unavailable".

use thiserror::Error;

/// Failures reported by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    Conflict(String),

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ProjectStoreError {
    #[error("Projekt '{0}' existiert bereits")]
    AlreadyExists(String),

    #[error("'{0}' nicht gefunden")]
    NotFound(String),

    #[error("ungültiger Name: '{0}'")]
    InvalidName(String),

    #[error("Speicher nicht erreichbar: {0}")]
    BackendUnavailable(String),
}

/// Failures while reading or writing a record table.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("Mängeltabelle ungültig: {0}")]
    Csv(#[from] csv::Error),

    #[error("Mängeltabelle konnte nicht geschrieben werden: {0}")]
    Io(#[from] std::io::Error),

    #[error("keine freie ID mehr nach {0}")]
    IdExhausted(u64),

    #[error(transparent)]
    Store(#[from] ProjectStoreError),
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Bild konnte nicht gelesen werden: {0}")]
    MalformedUpload(String),

    #[error("JPEG konnte nicht erzeugt werden: {0}")]
    Encode(#[from] image::ImageError),

    #[error(transparent)]
    Store(#[from] ProjectStoreError),
}

/// Everything that can abort a form submission.
///
/// All variants are non-fatal: the form stays as entered and can be
/// submitted again.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Store(#[from] ProjectStoreError),
}
