//! Defect ("Mangel") tracking for construction and apartment acceptance.
//!
//! Projects live on a storage backend (local folder tree or Dropbox). Each
//! project keeps its photos, its floor plans and one CSV table with a row
//! per recorded defect.

pub mod annotation;
pub mod compositor;
pub mod config;
pub mod error;
pub mod logging;
pub mod media;
pub mod project;
pub mod record;
pub mod storage;
pub mod submission;

pub use error::{MediaError, ProjectStoreError, StorageError, SubmitError, TableError};
pub use project::{ProjectHandle, ProjectStore};
pub use record::{Record, RecordTable};
pub use submission::{DefectForm, PhotoUpload, PlanMarkup, Submission, Submitted};
