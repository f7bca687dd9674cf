//! Photo and plan-markup persistence.
//!
//! Images are re-encoded as JPEG and written into the project's photo
//! folder under deterministic names. Only the filenames end up in the
//! record table.

use chrono::NaiveDate;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use std::io::Cursor;
use std::sync::Arc;
use tracing::debug;

use crate::compositor;
use crate::error::MediaError;
use crate::project::{ProjectHandle, ProjectStore};
use crate::record::{DATE_FORMAT, PHOTO_DELIMITER};

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Keep a form value usable inside a filename: path separators and the
/// photo delimiter are replaced.
fn sanitize_component(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c == PHOTO_DELIMITER => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// `{id}-{date}-{contractor}-{unit}-{room}-{index}.jpg`, index 1-based
pub fn photo_filename(
    id: u64,
    date: NaiveDate,
    contractor: &str,
    unit: &str,
    room: &str,
    index: usize,
) -> String {
    format!(
        "{}-{}-{}-{}-{}-{}.jpg",
        id,
        date.format(DATE_FORMAT),
        sanitize_component(contractor),
        sanitize_component(unit),
        sanitize_component(room),
        index
    )
}

pub fn plan_filename(id: u64) -> String {
    format!("{}-Plan.jpg", id)
}

/// Decode an uploaded image and turn it upright according to its EXIF
/// orientation tag.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, MediaError> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| MediaError::MalformedUpload(e.to_string()))?;

    Ok(match exif_orientation(bytes) {
        Some(2) => image.fliph(),
        Some(3) => image.rotate180(),
        Some(4) => image.flipv(),
        Some(5) => image.rotate90().fliph(),
        Some(6) => image.rotate90(),
        Some(7) => image.rotate270().fliph(),
        Some(8) => image.rotate270(),
        _ => image,
    })
}

fn exif_orientation(bytes: &[u8]) -> Option<u32> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;
    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?
        .value
        .get_uint(0)
}

/// Encode as an opaque baseline JPEG.
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, MediaError> {
    let mut bytes = Vec::new();
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100)))?;
    Ok(bytes)
}

pub struct MediaStore {
    store: Arc<ProjectStore>,
    jpeg_quality: u8,
}

impl MediaStore {
    pub fn new(store: Arc<ProjectStore>) -> Self {
        Self {
            store,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    /// Write each photo as JPEG into the project's photo folder and return
    /// the generated filenames in input order. Existing files with the same
    /// name are replaced.
    #[allow(clippy::too_many_arguments)]
    pub fn save_photos(
        &self,
        project: &ProjectHandle,
        images: &[DynamicImage],
        id: u64,
        date: NaiveDate,
        contractor: &str,
        unit: &str,
        room: &str,
    ) -> Result<Vec<String>, MediaError> {
        let mut filenames = Vec::with_capacity(images.len());

        for (idx, image) in images.iter().enumerate() {
            let filename = photo_filename(id, date, contractor, unit, room, idx + 1);
            let bytes = encode_jpeg(image, self.jpeg_quality)?;
            self.store.put_photo(project, &filename, &bytes)?;
            debug!("Saved photo {} ({} bytes)", filename, bytes.len());
            filenames.push(filename);
        }

        Ok(filenames)
    }

    /// Flatten `annotation` onto the plan and store it as `{id}-Plan.jpg`.
    pub fn save_plan_image(
        &self,
        project: &ProjectHandle,
        background: &DynamicImage,
        annotation: &RgbaImage,
        id: u64,
    ) -> Result<String, MediaError> {
        let flattened = DynamicImage::ImageRgb8(compositor::composite(background, annotation));
        let filename = plan_filename(id);
        let bytes = encode_jpeg(&flattened, self.jpeg_quality)?;
        self.store.put_photo(project, &filename, &bytes)?;
        debug!("Saved plan markup {} ({} bytes)", filename, bytes.len());
        Ok(filename)
    }

    pub fn load_plan(&self, project: &ProjectHandle, filename: &str) -> Result<DynamicImage, MediaError> {
        let bytes = self.store.download_plan(project, filename)?;
        decode_image(&bytes)
    }
}
