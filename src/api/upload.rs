use super::caller_with_role;
use crate::entity::Role;
use crate::error::ApiError;
use crate::http::multipart::{self, Part};
use crate::http::{HttpRequest, HttpResponse};
use crate::state::AppState;
use crate::upload::{public_id, UploadError, MAX_FILE_SIZE};
use serde_json::json;

const FILE_FIELD: &str = "file";

/// The `file` part of a multipart body, checked for type and size.
fn image_part(req: &HttpRequest) -> Result<Part, ApiError> {
    let file_required = || ApiError::bad_request("File is required");

    let boundary = req
        .header("content-type")
        .and_then(multipart::boundary)
        .ok_or_else(file_required)?;
    let parts = multipart::parse(&req.body, &boundary).map_err(|e| {
        log::debug!("unreadable upload body: {e}");
        file_required()
    })?;
    let part = parts
        .into_iter()
        .find(|p| p.name == FILE_FIELD && p.filename.is_some())
        .ok_or_else(file_required)?;

    let is_image = part
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"));
    if !is_image {
        return Err(ApiError::bad_request("Only image files are allowed"));
    }
    if part.data.len() > MAX_FILE_SIZE {
        return Err(ApiError::PayloadTooLarge("File too large".to_string()));
    }
    if part.data.is_empty() {
        return Err(file_required());
    }
    Ok(part)
}

/// `POST /upload`: store an image and return its public URL.
pub fn upload(state: &AppState, req: &HttpRequest) -> Result<HttpResponse, ApiError> {
    caller_with_role(state, req, &[Role::Admin])?;
    let part = image_part(req)?;
    let uploader = state.uploader.as_ref().ok_or(UploadError::NotConfigured)?;

    let Part {
        filename,
        content_type,
        data,
        ..
    } = part;
    let name = filename.unwrap_or_default();
    let id = public_id(&name, chrono::Utc::now().timestamp_millis(), &mut rand::thread_rng());
    let content_type = content_type.unwrap_or_else(|| "application/octet-stream".to_string());

    let size = data.len();
    let url = uploader.upload(data, &content_type, &id)?;
    log::info!("uploaded {name} ({size} bytes) as {id}");
    Ok(HttpResponse::created(&json!({ "url": url })))
}
