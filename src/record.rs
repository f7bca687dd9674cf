//! Defect records and the per-project record table.
//!
//! The table is a plain value: it is loaded fresh for every interaction,
//! `append` returns the updated table and the file is always rewritten in
//! full. Rows are stored in the column layout below, one row per defect.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::TableError;
use crate::project::{ProjectHandle, ProjectStore};

/// Column headers of `mangelmanagement.csv`, in order
pub const COLUMNS: [&str; 13] = [
    "ID",
    "Erfassungsdatum",
    "Unternehmer",
    "Gewerk",
    "Mangelname",
    "Mangelbeschreibung",
    "Wohnung",
    "Zimmer",
    "Ort",
    "Fotos",
    "Plan",
    "Bemerkung",
    "Zu erledigen bis",
];

/// Separator between photo filenames in the `Fotos` column
pub const PHOTO_DELIMITER: char = ';';

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One defect report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "ID", deserialize_with = "id_format::deserialize")]
    pub id: u64,

    #[serde(rename = "Erfassungsdatum", with = "date_format")]
    pub capture_date: NaiveDate,

    #[serde(rename = "Unternehmer", default)]
    pub contractor: String,

    #[serde(rename = "Gewerk", default)]
    pub trade: String,

    #[serde(rename = "Mangelname", default)]
    pub defect_name: String,

    #[serde(rename = "Mangelbeschreibung", default)]
    pub description: String,

    #[serde(rename = "Wohnung", default)]
    pub unit: String,

    #[serde(rename = "Zimmer", default)]
    pub room: String,

    #[serde(rename = "Ort", default)]
    pub location: String,

    #[serde(rename = "Fotos", with = "photo_list", default)]
    pub photo_filenames: Vec<String>,

    /// Older tables have no `Plan` column
    #[serde(rename = "Plan", default)]
    pub plan_filename: String,

    #[serde(rename = "Bemerkung", default)]
    pub remarks: String,

    #[serde(rename = "Zu erledigen bis", with = "date_format")]
    pub due_date: NaiveDate,
}

impl Record {
    /// Every column as a `(header, value)` pair, in table order. Photos are
    /// joined with the `Fotos` delimiter.
    pub fn columns(&self) -> [(&'static str, String); 13] {
        [
            (COLUMNS[0], self.id.to_string()),
            (COLUMNS[1], self.capture_date.format(DATE_FORMAT).to_string()),
            (COLUMNS[2], self.contractor.clone()),
            (COLUMNS[3], self.trade.clone()),
            (COLUMNS[4], self.defect_name.clone()),
            (COLUMNS[5], self.description.clone()),
            (COLUMNS[6], self.unit.clone()),
            (COLUMNS[7], self.room.clone()),
            (COLUMNS[8], self.location.clone()),
            (COLUMNS[9], self.photo_filenames.join(&PHOTO_DELIMITER.to_string())),
            (COLUMNS[10], self.plan_filename.clone()),
            (COLUMNS[11], self.remarks.clone()),
            (COLUMNS[12], self.due_date.format(DATE_FORMAT).to_string()),
        ]
    }
}

mod date_format {
    use super::DATE_FORMAT;
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(DATE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_date(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid date '{}'", raw)))
    }
}

mod id_format {
    use serde::{de, Deserialize, Deserializer};

    /// Spreadsheet tools sometimes write integer columns as `1000.0`.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let trimmed = raw.trim();

        if let Ok(id) = trimmed.parse::<u64>() {
            return Ok(id);
        }

        match trimmed.parse::<f64>() {
            Ok(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Ok(f as u64),
            _ => Err(de::Error::custom(format!("invalid ID '{}'", raw))),
        }
    }
}

mod photo_list {
    use super::PHOTO_DELIMITER;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(photos: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&photos.join(&PHOTO_DELIMITER.to_string()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw
            .split(PHOTO_DELIMITER)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect())
    }
}

/// Parse a stored date. Accepts ISO dates, ISO timestamps (only the date
/// part is kept) and German `dd.mm.yyyy`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();

    if let Some(prefix) = trimmed.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, DATE_FORMAT) {
            return Some(date);
        }
    }

    NaiveDate::parse_from_str(trimmed, "%d.%m.%Y").ok()
}

/// Ordered defect records of one project
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordTable {
    records: Vec<Record>,
}

impl RecordTable {
    pub fn from_csv(bytes: &[u8]) -> Result<Self, TableError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let mut records = Vec::new();
        for row in reader.deserialize::<Record>() {
            records.push(row?);
        }

        Ok(Self { records })
    }

    /// Serialize with the canonical header row, even when empty.
    pub fn to_csv(&self) -> Result<Vec<u8>, TableError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());

        writer.write_record(COLUMNS)?;
        for record in &self.records {
            writer.serialize(record)?;
        }

        writer.into_inner().map_err(|e| TableError::Io(e.into_error()))
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&Record> {
        self.records.last()
    }

    /// Identifier for the next record: `start` for an empty table,
    /// otherwise one more than the largest existing id.
    pub fn next_id(&self, start: u64) -> Result<u64, TableError> {
        match self.records.iter().map(|r| r.id).max() {
            None => Ok(start),
            Some(max) => max.checked_add(1).ok_or(TableError::IdExhausted(max)),
        }
    }

    /// The table with `record` added as the last row. Ids are not checked.
    pub fn with_record(mut self, record: Record) -> Self {
        self.records.push(record);
        self
    }
}

/// Add `record` as the last row and rewrite the project's table file.
pub fn append(
    store: &ProjectStore,
    project: &ProjectHandle,
    table: RecordTable,
    record: Record,
) -> Result<RecordTable, TableError> {
    let id = record.id;
    let table = table.with_record(record);
    store.save_table(project, &table)?;

    info!(
        "Appended defect {} to project '{}' ({} rows)",
        id,
        project.name(),
        table.len()
    );
    Ok(table)
}
