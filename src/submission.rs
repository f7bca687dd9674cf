//! Form submission: turn a filled-in defect form into a stored record.

use chrono::NaiveDate;
use image::RgbaImage;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::error::{MediaError, SubmitError};
use crate::media::{decode_image, MediaStore};
use crate::project::{ProjectHandle, ProjectStore};
use crate::record::{self, Record, RecordTable};

/// A photo as received from a file input or camera, not yet decoded
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// A drawing made on one of the project's plans
#[derive(Debug, Clone)]
pub struct PlanMarkup {
    pub plan: String,
    pub annotation: RgbaImage,
}

#[derive(Debug, Clone)]
pub struct DefectForm {
    pub capture_date: NaiveDate,
    pub contractor: String,
    pub trade: String,
    pub defect_name: String,
    pub description: String,
    pub unit: String,
    pub room: String,
    pub location: String,
    pub photos: Vec<PhotoUpload>,
    pub markup: Option<PlanMarkup>,
    pub remarks: String,
    pub due_date: NaiveDate,
}

impl DefectForm {
    /// An empty form with both dates set to `today`
    pub fn new(today: NaiveDate) -> Self {
        Self {
            capture_date: today,
            contractor: String::new(),
            trade: String::new(),
            defect_name: String::new(),
            description: String::new(),
            unit: String::new(),
            room: String::new(),
            location: String::new(),
            photos: Vec::new(),
            markup: None,
            remarks: String::new(),
            due_date: today,
        }
    }
}

/// Result of a successful submission
#[derive(Debug, Clone)]
pub struct Submitted {
    pub record: Record,
    pub table: RecordTable,
}

pub struct Submission {
    store: Arc<ProjectStore>,
    media: MediaStore,
    start_id: u64,
}

impl Submission {
    pub fn new(store: Arc<ProjectStore>, media: MediaStore, start_id: u64) -> Self {
        Self {
            store,
            media,
            start_id,
        }
    }

    pub fn from_config(store: Arc<ProjectStore>, config: &Config) -> Self {
        let media = MediaStore::new(store.clone()).with_jpeg_quality(config.media.jpeg_quality);
        Self::new(store, media, config.records.start_id)
    }

    pub fn store(&self) -> &Arc<ProjectStore> {
        &self.store
    }

    pub fn media(&self) -> &MediaStore {
        &self.media
    }

    /// Store the form's media and append its record to the project table.
    ///
    /// Uploads are decoded before anything is written, so a broken photo
    /// or plan leaves the project untouched. Once writing has started there
    /// is no rollback: a storage failure midway keeps the media written so
    /// far.
    pub fn submit(&self, project: &ProjectHandle, form: &DefectForm) -> Result<Submitted, SubmitError> {
        let photos = form
            .photos
            .iter()
            .map(|p| {
                decode_image(&p.bytes).map_err(|e| match e {
                    MediaError::MalformedUpload(msg) => {
                        MediaError::MalformedUpload(format!("{}: {}", p.name, msg))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let plan = match &form.markup {
            Some(markup) => Some((self.media.load_plan(project, &markup.plan)?, &markup.annotation)),
            None => None,
        };

        let lock = self.store.submission_lock(project);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let table = self.store.load_table(project)?;
        let id = table.next_id(self.start_id)?;

        let photo_filenames = self.media.save_photos(
            project,
            &photos,
            id,
            form.capture_date,
            &form.contractor,
            &form.unit,
            &form.room,
        )?;

        let plan_filename = match plan {
            Some((background, annotation)) => {
                self.media.save_plan_image(project, &background, annotation, id)?
            }
            None => String::new(),
        };

        let record = Record {
            id,
            capture_date: form.capture_date,
            contractor: form.contractor.clone(),
            trade: form.trade.clone(),
            defect_name: form.defect_name.clone(),
            description: form.description.clone(),
            unit: form.unit.clone(),
            room: form.room.clone(),
            location: form.location.clone(),
            photo_filenames,
            plan_filename,
            remarks: form.remarks.clone(),
            due_date: form.due_date,
        };

        let table = record::append(&self.store, project, table, record.clone())?;
        info!(
            "Defect {} submitted to project '{}' with {} photo(s)",
            id,
            project.name(),
            record.photo_filenames.len()
        );

        Ok(Submitted { record, table })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TableError;
    use crate::project::PHOTO_DIR;
    use crate::storage::LocalBackend;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba};
    use std::collections::HashSet;
    use std::io::Cursor;
    use tempfile::{tempdir, TempDir};

    fn png_upload(name: &str, color: [u8; 3]) -> PhotoUpload {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 10, Rgb(color)));
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        PhotoUpload {
            name: name.to_string(),
            bytes: bytes.into_inner(),
        }
    }

    fn setup() -> (TempDir, Submission) {
        let dir = tempdir().unwrap();
        let store = Arc::new(ProjectStore::new(Arc::new(LocalBackend::new(
            dir.path().to_path_buf(),
        ))));
        let submission = Submission::from_config(store, &Config::default());
        (dir, submission)
    }

    fn form() -> DefectForm {
        let mut form = DefectForm::new(NaiveDate::from_ymd_opt(2024, 5, 14).unwrap());
        form.contractor = "Meier".to_string();
        form.trade = "Maler".to_string();
        form.defect_name = "Fleck".to_string();
        form.unit = "W3".to_string();
        form.room = "Flur".to_string();
        form.due_date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        form
    }

    #[test]
    fn test_end_to_end_ostfluegel() {
        let (dir, submission) = setup();
        let store = submission.store().clone();

        let project = store.create_project("Ostflügel").unwrap();
        let table = store.load_table(&project).unwrap();
        assert_eq!(table.len(), 0);
        assert_eq!(table.next_id(Config::default().records.start_id).unwrap(), 1000);

        let mut first = form();
        first.photos = vec![png_upload("a.png", [255, 0, 0]), png_upload("b.png", [0, 255, 0])];
        let submitted = submission.submit(&project, &first).unwrap();

        assert_eq!(submitted.table.len(), 1);
        assert_eq!(submitted.record.id, 1000);
        assert_eq!(
            submitted.record.photo_filenames,
            vec![
                "1000-2024-05-14-Meier-W3-Flur-1.jpg",
                "1000-2024-05-14-Meier-W3-Flur-2.jpg"
            ]
        );
        assert_eq!(submitted.record.plan_filename, "");
        for name in &submitted.record.photo_filenames {
            assert!(dir.path().join("Ostflügel").join(PHOTO_DIR).join(name).is_file());
        }

        let reloaded = store.load_table(&project).unwrap();
        assert_eq!(reloaded.last(), Some(&submitted.record));

        let second = submission.submit(&project, &form()).unwrap();
        assert_eq!(second.record.id, 1001);
        assert!(second.record.photo_filenames.is_empty());
        assert_eq!(store.load_table(&project).unwrap().len(), 2);
    }

    #[test]
    fn test_submit_with_plan_markup() {
        let (dir, submission) = setup();
        let store = submission.store().clone();
        let project = store.create_project("Haus B").unwrap();

        let plan = png_upload("EG.png", [255, 255, 255]);
        store.upload_plan(&project, "EG.png", &plan.bytes).unwrap();

        let mut annotation = RgbaImage::new(4, 2);
        annotation.put_pixel(0, 0, Rgba([255, 0, 0, 255]));

        let mut with_plan = form();
        with_plan.markup = Some(PlanMarkup {
            plan: "EG.png".to_string(),
            annotation,
        });

        let submitted = submission.submit(&project, &with_plan).unwrap();
        assert_eq!(submitted.record.plan_filename, "1000-Plan.jpg");

        let saved = image::open(dir.path().join("Haus B").join(PHOTO_DIR).join("1000-Plan.jpg")).unwrap();
        assert_eq!((saved.width(), saved.height()), (20, 10));
    }

    #[test]
    fn test_malformed_photo_writes_nothing() {
        let (dir, submission) = setup();
        let store = submission.store().clone();
        let project = store.create_project("P").unwrap();

        let mut broken = form();
        broken.photos = vec![
            png_upload("ok.png", [0, 0, 0]),
            PhotoUpload {
                name: "kaputt.jpg".to_string(),
                bytes: b"\xff\xd8 not really a jpeg".to_vec(),
            },
        ];

        let err = submission.submit(&project, &broken).unwrap_err();
        assert!(matches!(err, SubmitError::Media(MediaError::MalformedUpload(_))));

        assert!(store.load_table(&project).unwrap().is_empty());
        let photo_dir = dir.path().join("P").join(PHOTO_DIR);
        assert_eq!(std::fs::read_dir(photo_dir).unwrap().count(), 0);

        // The same form can be fixed and submitted again
        broken.photos.pop();
        assert_eq!(submission.submit(&project, &broken).unwrap().record.id, 1000);
    }

    #[test]
    fn test_exhausted_ids_abort_before_writing() {
        let (dir, submission) = setup();
        let project = submission.store().create_project("P").unwrap();
        std::fs::write(
            dir.path().join("P").join(crate::project::TABLE_FILE),
            format!("ID,Erfassungsdatum,Zu erledigen bis\n{},2024-03-01,2024-03-02\n", u64::MAX),
        )
        .unwrap();

        let mut with_photo = form();
        with_photo.photos = vec![png_upload("a.png", [255, 0, 0])];

        let err = submission.submit(&project, &with_photo).unwrap_err();
        assert!(matches!(err, SubmitError::Table(TableError::IdExhausted(_))));
        assert_eq!(std::fs::read_dir(dir.path().join("P").join(PHOTO_DIR)).unwrap().count(), 0);
        assert_eq!(submission.store().load_table(&project).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_plan_is_reported() {
        let (_dir, submission) = setup();
        let project = submission.store().create_project("P").unwrap();

        let mut with_plan = form();
        with_plan.markup = Some(PlanMarkup {
            plan: "fehlt.png".to_string(),
            annotation: RgbaImage::new(1, 1),
        });

        assert!(submission.submit(&project, &with_plan).is_err());
        assert!(submission.store().load_table(&project).unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_submissions_get_unique_ids() {
        let (_dir, submission) = setup();
        let project = submission.store().create_project("P").unwrap();
        let submission = Arc::new(submission);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let submission = submission.clone();
                let project = project.clone();
                std::thread::spawn(move || submission.submit(&project, &form()).unwrap().record.id)
            })
            .collect();

        let ids: HashSet<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(ids, (1000..1008).collect::<HashSet<u64>>());

        let table = submission.store().load_table(&project).unwrap();
        assert_eq!(table.len(), 8);
    }
}
