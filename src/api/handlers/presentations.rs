//! Presentation download, listing and upload endpoints

use actix_web::http::header::{
    ContentDisposition, DispositionParam, DispositionType, CONTENT_ENCODING, LOCATION,
    RETRY_AFTER,
};
use actix_web::{web, HttpResponse};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::storage::{ArtifactId, StorageError, PPTX_CONTENT_TYPE};
use crate::AppState;

/// Seconds clients should wait before retrying a transient failure
const RETRY_AFTER_SECS: &str = "5";

/// Error response
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ApiError,
}

#[derive(Serialize, ToSchema)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

/// A stored presentation
#[derive(Serialize, ToSchema)]
pub struct PresentationSummary {
    pub id: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub download_url: String,
}

/// Response for listing presentations
#[derive(Serialize, ToSchema)]
pub struct PresentationsListResponse {
    pub success: bool,
    pub data: Vec<PresentationSummary>,
    pub count: usize,
}

/// Response for a stored upload
#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    pub success: bool,
    pub artifact_id: String,
    pub download_url: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// Query parameters for uploads
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UploadQuery {
    /// Suggested base name; sanitized and made unique
    pub name: Option<String>,
}

/// Map a storage failure to its HTTP status and JSON body
pub fn storage_error_response(err: &StorageError) -> HttpResponse {
    let mut builder = match err {
        StorageError::NotFound(_) | StorageError::InvalidArtifactId(_) => {
            debug!(error = %err, "Presentation not found");
            HttpResponse::NotFound()
        }
        StorageError::EmptyPayload => HttpResponse::BadRequest(),
        StorageError::TransientIo { .. } => {
            warn!(error = %err, "Transient storage failure");
            HttpResponse::ServiceUnavailable()
        }
        StorageError::AccessDenied { .. } => {
            error!(error = %err, "Object store rejected credentials");
            HttpResponse::BadGateway()
        }
        StorageError::Write { .. } | StorageError::Configuration(_) => {
            error!(error = %err, "Storage failure");
            HttpResponse::InternalServerError()
        }
    };

    if err.is_retryable() {
        builder.insert_header((RETRY_AFTER, RETRY_AFTER_SECS));
    }

    builder.json(ErrorResponse {
        success: false,
        error: ApiError {
            code: err.code().to_string(),
            message: err.to_string(),
        },
    })
}

/// GET /presentations/{artifact_id} - Download a presentation
#[utoipa::path(
    get,
    path = "/presentations/{artifact_id}",
    tag = "presentations",
    params(
        ("artifact_id" = String, Path, description = "Artifact id, with or without the .pptx extension")
    ),
    responses(
        (
            status = 200,
            description = "Presentation bytes (application/vnd.openxmlformats-officedocument.presentationml.presentation)"
        ),
        (status = 404, description = "Presentation not found", body = ErrorResponse),
        (status = 503, description = "Storage temporarily unavailable", body = ErrorResponse)
    )
)]
pub async fn download_presentation(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    let id = match ArtifactId::from_request_path(&path) {
        Ok(id) => id,
        Err(e) => return storage_error_response(&StorageError::from(e)),
    };

    match state.store.fetch(&id).await {
        Ok(artifact) => {
            info!(id = %id, size = artifact.info.size, "Serving presentation");
            HttpResponse::Ok()
                .content_type(PPTX_CONTENT_TYPE)
                // .pptx is already a zip archive
                .insert_header((CONTENT_ENCODING, "identity"))
                .insert_header(ContentDisposition {
                    disposition: DispositionType::Attachment,
                    parameters: vec![DispositionParam::Filename(id.file_name())],
                })
                .body(artifact.bytes)
        }
        Err(e) => storage_error_response(&e),
    }
}

/// HEAD /presentations/{artifact_id} - Check whether a presentation exists
#[utoipa::path(
    head,
    path = "/presentations/{artifact_id}",
    tag = "presentations",
    params(
        ("artifact_id" = String, Path, description = "Artifact id, with or without the .pptx extension")
    ),
    responses(
        (status = 200, description = "Presentation is stored"),
        (status = 404, description = "Presentation not found"),
        (status = 503, description = "Storage temporarily unavailable", body = ErrorResponse)
    )
)]
pub async fn head_presentation(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    let Ok(id) = ArtifactId::from_request_path(&path) else {
        return HttpResponse::NotFound().finish();
    };

    match state.store.exists(&id).await {
        Ok(true) => HttpResponse::Ok().content_type(PPTX_CONTENT_TYPE).finish(),
        Ok(false) => HttpResponse::NotFound().finish(),
        Err(e) => storage_error_response(&e),
    }
}

/// DELETE /presentations/{artifact_id} - Remove a stored presentation
#[utoipa::path(
    delete,
    path = "/presentations/{artifact_id}",
    tag = "presentations",
    params(
        ("artifact_id" = String, Path, description = "Artifact id, with or without the .pptx extension")
    ),
    responses(
        (status = 204, description = "Presentation removed, or was already gone"),
        (status = 404, description = "Not a valid artifact id", body = ErrorResponse),
        (status = 503, description = "Storage temporarily unavailable", body = ErrorResponse)
    )
)]
pub async fn delete_presentation(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    let id = match ArtifactId::from_request_path(&path) {
        Ok(id) => id,
        Err(e) => return storage_error_response(&StorageError::from(e)),
    };

    match state.store.remove(&id).await {
        Ok(()) => {
            info!(id = %id, "Presentation removed");
            HttpResponse::NoContent().finish()
        }
        Err(e) => storage_error_response(&e),
    }
}

/// GET /presentations - List stored presentations
#[utoipa::path(
    get,
    path = "/presentations",
    tag = "presentations",
    responses(
        (
            status = 200,
            description = "Stored presentations, newest first",
            body = PresentationsListResponse
        ),
        (status = 503, description = "Storage temporarily unavailable", body = ErrorResponse)
    )
)]
pub async fn list_presentations(state: web::Data<AppState>) -> HttpResponse {
    match state.store.list().await {
        Ok(listed) => {
            let data: Vec<PresentationSummary> = listed
                .into_iter()
                .map(|p| PresentationSummary {
                    id: p.info.id.to_string(),
                    size_bytes: p.info.size,
                    created_at: p.info.created_at,
                    download_url: p.download_url.into_string(),
                })
                .collect();

            HttpResponse::Ok().json(PresentationsListResponse {
                success: true,
                count: data.len(),
                data,
            })
        }
        Err(e) => storage_error_response(&e),
    }
}

/// POST /presentations - Store an uploaded presentation
#[utoipa::path(
    post,
    path = "/presentations",
    tag = "presentations",
    params(UploadQuery),
    request_body(
        content = Vec<u8>,
        description = "Raw .pptx file",
        content_type = "application/octet-stream"
    ),
    responses(
        (status = 201, description = "Presentation stored", body = UploadResponse),
        (status = 400, description = "Empty body", body = ErrorResponse),
        (status = 413, description = "Body exceeds MAX_UPLOAD_BYTES"),
        (status = 500, description = "Write failed", body = ErrorResponse),
        (status = 503, description = "Storage temporarily unavailable", body = ErrorResponse)
    )
)]
pub async fn upload_presentation(
    state: web::Data<AppState>,
    query: web::Query<UploadQuery>,
    body: Bytes,
) -> HttpResponse {
    match state.store.publish(query.name.as_deref(), body).await {
        Ok(published) => HttpResponse::Created()
            .insert_header((LOCATION, published.download_url.as_str()))
            .json(UploadResponse {
                success: true,
                artifact_id: published.id.to_string(),
                download_url: published.download_url.into_string(),
                size_bytes: published.size,
                created_at: published.created_at,
            }),
        Err(e) => storage_error_response(&e),
    }
}
