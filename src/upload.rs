//! Bounds-checked multipart intake for the convert endpoint.
//! The file field is buffered entirely into memory; buffering stops the
//! moment the ceiling is crossed rather than truncating. A missing file field
//! is not an intake error: the handler's validation path audits it.

use axum::extract::multipart::{Multipart, MultipartError};

use crate::error::{AppError, AppResult};

/// Hard ceiling on buffered file bytes.
pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

/// A single uploaded file, held in memory for the duration of one request.
#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub original_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct ConvertForm {
    pub file: Option<UploadPayload>,
    pub target_type: Option<String>,
}

/// Drain the multipart request into a [`ConvertForm`]. Unknown fields are
/// consumed and ignored; malformed framing maps to a user error.
pub async fn read_convert_form(mut multipart: Multipart) -> AppResult<ConvertForm> {
    let mut form = ConvertForm::default();
    while let Some(mut field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let original_name = field.file_name().unwrap_or("unknown").to_string();
                let mut bytes: Vec<u8> = Vec::new();
                while let Some(chunk) = field.chunk().await.map_err(malformed)? {
                    if bytes.len() + chunk.len() > MAX_FILE_BYTES {
                        return Err(AppError::too_large(
                            "file_too_large",
                            "file exceeds the 10 MiB upload limit",
                        ));
                    }
                    bytes.extend_from_slice(&chunk);
                }
                form.file = Some(UploadPayload { original_name, bytes });
            }
            Some("targetType") => {
                let value = field.text().await.map_err(malformed)?;
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    form.target_type = Some(trimmed.to_string());
                }
            }
            _ => {
                while field.chunk().await.map_err(malformed)?.is_some() {}
            }
        }
    }
    Ok(form)
}

fn malformed(err: MultipartError) -> AppError {
    AppError::user("bad_multipart".to_string(), format!("malformed multipart body: {err}"))
}
