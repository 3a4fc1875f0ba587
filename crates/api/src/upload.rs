//! Multipart form parsing and upload storage shared by the handlers that
//! accept files.

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::storage::{object_key, validate_upload, UploadKind, UploadedFile};

/// A fully read multipart form: text fields plus file fields by name.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    /// Read every field. A part with a filename is treated as a file.
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or("").to_string();
            if name.is_empty() {
                continue;
            }
            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                    form.files.insert(
                        name,
                        UploadedFile {
                            filename,
                            content_type,
                            bytes: bytes.to_vec(),
                        },
                    );
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    /// Trimmed, non-empty text field.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn required(&self, name: &str) -> AppResult<String> {
        self.text(name)
            .ok_or_else(|| AppError::BadRequest(format!("Missing required field '{name}'")))
    }

    /// Parse an optional field with `FromStr`.
    pub fn parsed<T: std::str::FromStr>(&self, name: &str) -> AppResult<Option<T>> {
        match self.text(name) {
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| AppError::BadRequest(format!("Invalid value for '{name}': {raw}"))),
            None => Ok(None),
        }
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }
}

/// Validate and store an upload under `prefix`, returning its public URL.
pub async fn store_upload(
    state: &AppState,
    file: &UploadedFile,
    kind: UploadKind,
    prefix: &str,
) -> AppResult<String> {
    let ext = validate_upload(file, kind, state.config.storage.max_upload_bytes)
        .map_err(AppError::BadRequest)?;
    let key = object_key(prefix, &file.bytes, &ext);
    let url = state
        .storage
        .put(&key, &file.bytes, file.content_type.as_deref())
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    Ok(url)
}
