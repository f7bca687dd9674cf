//! Project store: a namespace of named projects on a storage backend.
//!
//! Layout per project:
//! ```text
//! /{name}/
//! ├── Fotos/                  photos and annotated plans of all defects
//! ├── Pläne/                  uploaded floor plans
//! └── mangelmanagement.csv    the record table
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::error::{ProjectStoreError, StorageError, TableError};
use crate::record::RecordTable;
use crate::storage::{join_path, StorageBackend, WriteMode};

pub const PHOTO_DIR: &str = "Fotos";
pub const PLAN_DIR: &str = "Pläne";
pub const TABLE_FILE: &str = "mangelmanagement.csv";

/// An existing project, addressed by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectHandle {
    name: String,
}

impl ProjectHandle {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> String {
        join_path("/", &self.name)
    }

    pub fn photo_dir(&self) -> String {
        join_path(&self.root(), PHOTO_DIR)
    }

    pub fn plan_dir(&self) -> String {
        join_path(&self.root(), PLAN_DIR)
    }

    pub fn table_path(&self) -> String {
        join_path(&self.root(), TABLE_FILE)
    }
}

pub struct ProjectStore {
    backend: Arc<dyn StorageBackend>,
    plan_extensions: Vec<String>,
    // One mutex per project guarding next_id + append
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// Project and file names become path segments, so they may not be empty
/// or contain separators.
fn validate_name(name: &str) -> Result<&str, ProjectStoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(|c| c == '/' || c == '\\')
    {
        return Err(ProjectStoreError::InvalidName(name.to_string()));
    }
    Ok(trimmed)
}

fn unavailable(err: StorageError) -> ProjectStoreError {
    match err {
        StorageError::Unavailable(msg) => ProjectStoreError::BackendUnavailable(msg),
        other => ProjectStoreError::BackendUnavailable(other.to_string()),
    }
}

impl ProjectStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            plan_extensions: vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_plan_extensions(mut self, extensions: Vec<String>) -> Self {
        self.plan_extensions = extensions;
        self
    }

    pub fn backend(&self) -> &dyn StorageBackend {
        self.backend.as_ref()
    }

    /// Provision a new project: root folder, photo folder, plan folder and
    /// a record table holding only the header row.
    pub fn create_project(&self, name: &str) -> Result<ProjectHandle, ProjectStoreError> {
        let name = validate_name(name)?;
        let project = ProjectHandle::new(name);

        match self.backend.create_folder(&project.root()) {
            Ok(()) => {}
            Err(StorageError::Conflict(_)) => {
                return Err(ProjectStoreError::AlreadyExists(name.to_string()))
            }
            Err(e) => return Err(unavailable(e)),
        }

        self.backend
            .create_folder(&project.photo_dir())
            .map_err(unavailable)?;
        self.backend
            .create_folder(&project.plan_dir())
            .map_err(unavailable)?;

        let header = RecordTable::default()
            .to_csv()
            .map_err(|e| ProjectStoreError::BackendUnavailable(e.to_string()))?;
        self.backend
            .upload(&project.table_path(), &header, WriteMode::Add)
            .map_err(unavailable)?;

        info!(
            "Created project '{}' on {} backend",
            name,
            self.backend.backend_name()
        );
        Ok(project)
    }

    /// Names of all projects, sorted.
    pub fn list_projects(&self) -> Result<Vec<String>, ProjectStoreError> {
        let entries = match self.backend.list_folder("/") {
            Ok(entries) => entries,
            // Nothing has been created yet
            Err(StorageError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(unavailable(e)),
        };

        let mut names: Vec<String> = entries
            .into_iter()
            .filter(|e| e.is_folder())
            .map(|e| e.name)
            .collect();
        names.sort_by_key(|n| n.to_lowercase());
        Ok(names)
    }

    pub fn open_project(&self, name: &str) -> Result<ProjectHandle, ProjectStoreError> {
        let name = validate_name(name)?;
        if self.list_projects()?.iter().any(|p| p == name) {
            Ok(ProjectHandle::new(name))
        } else {
            Err(ProjectStoreError::NotFound(name.to_string()))
        }
    }

    /// Load the project's record table.
    ///
    /// A missing table file yields an empty table with the canonical
    /// columns instead of an error.
    pub fn load_table(&self, project: &ProjectHandle) -> Result<RecordTable, TableError> {
        match self.backend.download(&project.table_path()) {
            Ok(bytes) => RecordTable::from_csv(&bytes),
            Err(StorageError::NotFound(_)) => {
                warn!(
                    "Record table of project '{}' is missing, using an empty table",
                    project.name()
                );
                Ok(RecordTable::default())
            }
            Err(e) => Err(TableError::Store(unavailable(e))),
        }
    }

    /// Replace the project's record table file with `table`.
    pub fn save_table(&self, project: &ProjectHandle, table: &RecordTable) -> Result<(), TableError> {
        let bytes = table.to_csv()?;
        self.backend
            .upload(&project.table_path(), &bytes, WriteMode::Overwrite)
            .map_err(|e| TableError::Store(unavailable(e)))
    }

    pub fn is_plan_file(&self, filename: &str) -> bool {
        let Some((_, ext)) = filename.rsplit_once('.') else {
            return false;
        };
        let ext = ext.to_lowercase();
        self.plan_extensions.iter().any(|e| e.to_lowercase() == ext)
    }

    /// Store a floor plan in the project's plan folder, replacing a plan of
    /// the same name. Returns the stored filename.
    pub fn upload_plan(
        &self,
        project: &ProjectHandle,
        filename: &str,
        contents: &[u8],
    ) -> Result<String, ProjectStoreError> {
        let filename = validate_name(filename)?;
        if !self.is_plan_file(filename) {
            return Err(ProjectStoreError::InvalidName(filename.to_string()));
        }

        self.backend
            .upload(
                &join_path(&project.plan_dir(), filename),
                contents,
                WriteMode::Overwrite,
            )
            .map_err(unavailable)?;

        info!("Uploaded plan '{}' to project '{}'", filename, project.name());
        Ok(filename.to_string())
    }

    /// Plan filenames of a project, sorted.
    pub fn list_plans(&self, project: &ProjectHandle) -> Result<Vec<String>, ProjectStoreError> {
        let entries = match self.backend.list_folder(&project.plan_dir()) {
            Ok(entries) => entries,
            Err(StorageError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(unavailable(e)),
        };

        let mut plans: Vec<String> = entries
            .into_iter()
            .filter(|e| e.is_file() && self.is_plan_file(&e.name))
            .map(|e| e.name)
            .collect();
        plans.sort_by_key(|n| n.to_lowercase());
        Ok(plans)
    }

    pub fn download_plan(
        &self,
        project: &ProjectHandle,
        filename: &str,
    ) -> Result<Vec<u8>, ProjectStoreError> {
        let filename = validate_name(filename)?;
        match self.backend.download(&join_path(&project.plan_dir(), filename)) {
            Ok(bytes) => Ok(bytes),
            Err(StorageError::NotFound(_)) => Err(ProjectStoreError::NotFound(filename.to_string())),
            Err(e) => Err(unavailable(e)),
        }
    }

    /// Write a file into the project's photo folder, replacing any file of
    /// the same name.
    pub fn put_photo(
        &self,
        project: &ProjectHandle,
        filename: &str,
        contents: &[u8],
    ) -> Result<(), ProjectStoreError> {
        self.backend
            .upload(
                &join_path(&project.photo_dir(), filename),
                contents,
                WriteMode::Overwrite,
            )
            .map_err(unavailable)
    }

    /// Mutex serializing submissions to one project within this process.
    pub fn submission_lock(&self, project: &ProjectHandle) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(project.name().to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::{MediaError, SubmitError};
    use crate::storage::{Entry, LocalBackend};
    use crate::submission::{DefectForm, PhotoUpload, Submission};
    use chrono::NaiveDate;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;
    use tempfile::tempdir;

    fn local_store(dir: &std::path::Path) -> ProjectStore {
        ProjectStore::new(Arc::new(LocalBackend::new(dir.join("Projekte"))))
    }

    /// A backend whose service cannot be reached at all
    struct OfflineBackend;

    impl StorageBackend for OfflineBackend {
        fn create_folder(&self, path: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable(format!("offline: {}", path)))
        }

        fn upload(&self, path: &str, _contents: &[u8], _mode: WriteMode) -> Result<(), StorageError> {
            Err(StorageError::Unavailable(format!("offline: {}", path)))
        }

        fn download(&self, path: &str) -> Result<Vec<u8>, StorageError> {
            Err(StorageError::Unavailable(format!("offline: {}", path)))
        }

        fn list_folder(&self, path: &str) -> Result<Vec<Entry>, StorageError> {
            Err(StorageError::Unavailable(format!("offline: {}", path)))
        }

        fn backend_name(&self) -> &'static str {
            "offline"
        }
    }

    /// Reads go to a local tree, every write fails
    struct ReadOnlyBackend(LocalBackend);

    impl StorageBackend for ReadOnlyBackend {
        fn create_folder(&self, path: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable(format!("read-only: {}", path)))
        }

        fn upload(&self, path: &str, _contents: &[u8], _mode: WriteMode) -> Result<(), StorageError> {
            Err(StorageError::Unavailable(format!("read-only: {}", path)))
        }

        fn download(&self, path: &str) -> Result<Vec<u8>, StorageError> {
            self.0.download(path)
        }

        fn list_folder(&self, path: &str) -> Result<Vec<Entry>, StorageError> {
            self.0.list_folder(path)
        }

        fn backend_name(&self) -> &'static str {
            "read-only"
        }
    }

    fn form_with_photo() -> DefectForm {
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(4, 4))
            .write_to(&mut bytes, ImageFormat::Png)
            .unwrap();

        let mut form = DefectForm::new(NaiveDate::from_ymd_opt(2024, 5, 14).unwrap());
        form.contractor = "Meier".to_string();
        form.photos.push(PhotoUpload {
            name: "riss.png".to_string(),
            bytes: bytes.into_inner(),
        });
        form
    }

    fn is_unavailable(err: &ProjectStoreError) -> bool {
        matches!(err, ProjectStoreError::BackendUnavailable(_))
    }

    #[test]
    fn test_create_project_provisions_layout() {
        let dir = tempdir().unwrap();
        let store = local_store(dir.path());

        let project = store.create_project("Ostflügel").unwrap();
        assert_eq!(project.name(), "Ostflügel");

        let root = dir.path().join("Projekte").join("Ostflügel");
        assert!(root.join(PHOTO_DIR).is_dir());
        assert!(root.join(PLAN_DIR).is_dir());

        let header = std::fs::read_to_string(root.join(TABLE_FILE)).unwrap();
        assert_eq!(
            header.trim_end(),
            "ID,Erfassungsdatum,Unternehmer,Gewerk,Mangelname,Mangelbeschreibung,Wohnung,Zimmer,Ort,Fotos,Plan,Bemerkung,Zu erledigen bis"
        );

        let table = store.load_table(&project).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_create_duplicate_project() {
        let dir = tempdir().unwrap();
        let store = local_store(dir.path());

        store.create_project("Haus A").unwrap();
        let err = store.create_project("Haus A").unwrap_err();
        assert!(matches!(err, ProjectStoreError::AlreadyExists(ref n) if n == "Haus A"));
    }

    #[test]
    fn test_invalid_project_names() {
        let dir = tempdir().unwrap();
        let store = local_store(dir.path());

        for name in ["", "   ", "..", "a/b", "a\\b"] {
            assert!(matches!(
                store.create_project(name),
                Err(ProjectStoreError::InvalidName(_))
            ));
        }
        assert!(store.list_projects().unwrap().is_empty());
    }

    #[test]
    fn test_list_projects() {
        let dir = tempdir().unwrap();
        let store = local_store(dir.path());
        assert!(store.list_projects().unwrap().is_empty());

        store.create_project("Westflügel").unwrap();
        store.create_project("Ostflügel").unwrap();

        assert_eq!(store.list_projects().unwrap(), vec!["Ostflügel", "Westflügel"]);
        assert!(store.open_project("Ostflügel").is_ok());
        assert!(matches!(
            store.open_project("Nordflügel"),
            Err(ProjectStoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_missing_table_yields_empty_table() {
        let dir = tempdir().unwrap();
        let store = local_store(dir.path());
        let project = store.create_project("Ostflügel").unwrap();

        std::fs::remove_file(dir.path().join("Projekte/Ostflügel").join(TABLE_FILE)).unwrap();

        let table = store.load_table(&project).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_plans() {
        let dir = tempdir().unwrap();
        let store = local_store(dir.path());
        let project = store.create_project("Ostflügel").unwrap();

        assert!(store.list_plans(&project).unwrap().is_empty());

        store.upload_plan(&project, "OG.png", b"png").unwrap();
        store.upload_plan(&project, "EG.JPG", b"jpg").unwrap();
        assert!(matches!(
            store.upload_plan(&project, "notes.txt", b"txt"),
            Err(ProjectStoreError::InvalidName(_))
        ));

        assert_eq!(store.list_plans(&project).unwrap(), vec!["EG.JPG", "OG.png"]);
        assert_eq!(store.download_plan(&project, "OG.png").unwrap(), b"png");
        assert!(matches!(
            store.download_plan(&project, "DG.png"),
            Err(ProjectStoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_submission_lock_is_per_project() {
        let dir = tempdir().unwrap();
        let store = local_store(dir.path());
        let a = store.create_project("A").unwrap();
        let b = store.create_project("B").unwrap();

        assert!(Arc::ptr_eq(&store.submission_lock(&a), &store.submission_lock(&a)));
        assert!(!Arc::ptr_eq(&store.submission_lock(&a), &store.submission_lock(&b)));
    }

    #[test]
    fn test_unreachable_backend_surfaces_as_unavailable() {
        let store = Arc::new(ProjectStore::new(Arc::new(OfflineBackend)));

        assert!(is_unavailable(&store.create_project("Ostflügel").unwrap_err()));
        assert!(is_unavailable(&store.list_projects().unwrap_err()));
        assert!(is_unavailable(&store.open_project("Ostflügel").unwrap_err()));

        let project = ProjectHandle::new("Ostflügel");
        assert!(matches!(
            store.load_table(&project),
            Err(TableError::Store(ref e)) if is_unavailable(e)
        ));
        assert!(is_unavailable(&store.list_plans(&project).unwrap_err()));

        let submission = Submission::from_config(store.clone(), &Config::default());
        let err = submission.submit(&project, &form_with_photo()).unwrap_err();
        assert!(matches!(err, SubmitError::Table(TableError::Store(ref e)) if is_unavailable(e)));
    }

    #[test]
    fn test_failed_write_aborts_submission_without_a_trace() {
        let dir = tempdir().unwrap();
        local_store(dir.path()).create_project("Ostflügel").unwrap();

        let store = Arc::new(ProjectStore::new(Arc::new(ReadOnlyBackend(LocalBackend::new(
            dir.path().join("Projekte"),
        )))));
        let project = store.open_project("Ostflügel").unwrap();

        assert!(is_unavailable(&store.create_project("Westflügel").unwrap_err()));
        assert!(!dir.path().join("Projekte/Westflügel").exists());

        let submission = Submission::from_config(store.clone(), &Config::default());
        let err = submission.submit(&project, &form_with_photo()).unwrap_err();
        assert!(matches!(err, SubmitError::Media(MediaError::Store(ref e)) if is_unavailable(e)));

        let root = dir.path().join("Projekte/Ostflügel");
        assert_eq!(std::fs::read_dir(root.join(PHOTO_DIR)).unwrap().count(), 0);
        assert!(store.load_table(&project).unwrap().is_empty());
    }
}
