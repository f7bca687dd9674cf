//! Dropbox HTTP API v2 backend.
//!
//! Only the four calls the application needs are implemented:
//! `create_folder_v2`, `upload`, `download` and `list_folder` (with
//! `list_folder/continue` for large folders).

use serde::Deserialize;
use serde_json::json;
use std::io::Read;
use std::time::Duration;
use tracing::debug;

use super::{Entry, EntryKind, StorageBackend, WriteMode};
use crate::error::StorageError;

const API_URL: &str = "https://api.dropboxapi.com/2";
const CONTENT_URL: &str = "https://content.dropboxapi.com/2";

pub struct DropboxBackend {
    agent: ureq::Agent,
    token: String,
}

#[derive(Debug, Deserialize)]
struct ListFolderResult {
    entries: Vec<Metadata>,
    cursor: String,
    has_more: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = ".tag", rename_all = "lowercase")]
enum Metadata {
    File { name: String },
    Folder { name: String },
    Deleted {},
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    error_summary: String,
}

impl DropboxBackend {
    pub fn new(token: String, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent, token }
    }

    fn rpc(&self, endpoint: &str, body: serde_json::Value) -> Result<ureq::Response, StorageError> {
        let url = format!("{}/{}", API_URL, endpoint);
        self.agent
            .post(&url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .send_json(body)
            .map_err(|e| map_error(e, endpoint))
    }

    fn content_request(&self, endpoint: &str, arg: serde_json::Value) -> ureq::Request {
        let url = format!("{}/{}", CONTENT_URL, endpoint);
        self.agent
            .post(&url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("Dropbox-API-Arg", &api_arg(&arg))
    }
}

/// Dropbox wants the root folder as the empty string.
fn api_path(path: &str) -> String {
    if path == "/" {
        String::new()
    } else {
        path.to_string()
    }
}

/// Serialize a `Dropbox-API-Arg` header value.
///
/// HTTP headers must be ASCII, so every non-ASCII character is written as
/// a JSON `\uXXXX` escape (surrogate pairs outside the BMP).
pub(crate) fn api_arg(arg: &serde_json::Value) -> String {
    let raw = arg.to_string();
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii() {
            escaped.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                escaped.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    escaped
}

fn map_error(err: ureq::Error, context: &str) -> StorageError {
    match err {
        ureq::Error::Status(409, response) => {
            let summary = response
                .into_json::<ApiError>()
                .map(|e| e.error_summary)
                .unwrap_or_default();
            classify_conflict(&summary, context)
        }
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            StorageError::Unavailable(format!("{} failed with HTTP {}: {}", context, code, body.trim()))
        }
        ureq::Error::Transport(transport) => {
            StorageError::Unavailable(format!("{} failed: {}", context, transport))
        }
    }
}

/// Dropbox reports endpoint-specific errors as HTTP 409 with a summary such
/// as `path/conflict/folder/..` or `path/not_found/..`.
fn classify_conflict(summary: &str, context: &str) -> StorageError {
    if summary.contains("not_found") {
        StorageError::NotFound(format!("{}: {}", context, summary))
    } else if summary.contains("conflict") {
        StorageError::Conflict(format!("{}: {}", context, summary))
    } else {
        StorageError::Unavailable(format!("{}: {}", context, summary))
    }
}

impl StorageBackend for DropboxBackend {
    fn create_folder(&self, path: &str) -> Result<(), StorageError> {
        debug!("dropbox create_folder {}", path);
        self.rpc(
            "files/create_folder_v2",
            json!({ "path": api_path(path), "autorename": false }),
        )?;
        Ok(())
    }

    fn upload(&self, path: &str, contents: &[u8], mode: WriteMode) -> Result<(), StorageError> {
        debug!("dropbox upload {} ({} bytes, {:?})", path, contents.len(), mode);
        let mode = match mode {
            WriteMode::Add => "add",
            WriteMode::Overwrite => "overwrite",
        };
        self.content_request(
            "files/upload",
            json!({ "path": path, "mode": mode, "autorename": false, "mute": true }),
        )
        .set("Content-Type", "application/octet-stream")
        .send_bytes(contents)
        .map_err(|e| map_error(e, "files/upload"))?;
        Ok(())
    }

    fn download(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        debug!("dropbox download {}", path);
        let response = self
            .content_request("files/download", json!({ "path": path }))
            .call()
            .map_err(|e| map_error(e, "files/download"))?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| StorageError::Unavailable(format!("files/download: {}", e)))?;
        Ok(bytes)
    }

    fn list_folder(&self, path: &str) -> Result<Vec<Entry>, StorageError> {
        let mut entries = Vec::new();
        let mut page: ListFolderResult = self
            .rpc("files/list_folder", json!({ "path": api_path(path) }))?
            .into_json()
            .map_err(|e| StorageError::Unavailable(format!("files/list_folder: {}", e)))?;

        loop {
            for metadata in page.entries {
                match metadata {
                    Metadata::File { name } => entries.push(Entry { name, kind: EntryKind::File }),
                    Metadata::Folder { name } => entries.push(Entry { name, kind: EntryKind::Folder }),
                    Metadata::Deleted {} => {}
                }
            }

            if !page.has_more {
                break;
            }

            page = self
                .rpc("files/list_folder/continue", json!({ "cursor": page.cursor }))?
                .into_json()
                .map_err(|e| StorageError::Unavailable(format!("files/list_folder/continue: {}", e)))?;
        }

        Ok(entries)
    }

    fn backend_name(&self) -> &'static str {
        "dropbox"
    }
}
