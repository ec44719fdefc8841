use axum::{
    body::Bytes,
    extract::{Multipart, multipart::MultipartRejection},
};

use crate::error::AppError;

pub const FILE_FIELD: &str = "file";
pub const MAX_FILE_SIZE: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Pulls the `file` part out of a multipart body. Other parts are skipped.
/// A missing part or a body that is not multipart at all is a validation
/// error.
pub async fn read_file(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<UploadedFile, AppError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!(error = %e, "request is not multipart");
        AppError::MissingFile
    })?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await?;

        tracing::debug!(%filename, %content_type, size = bytes.len(), "received upload");
        return Ok(UploadedFile { filename, content_type, bytes });
    }

    Err(AppError::MissingFile)
}
