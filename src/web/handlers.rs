//! HTTP handlers for the hoard web boundary.
//!
//! The handlers own transport concerns only: multipart parsing, type
//! coercion of form fields, and rendering the service's typed results
//! into status codes. Everything else is delegated to the
//! [`StorageService`] facade.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::header,
    response::Response,
    Json,
};
use chrono::Utc;
use tokio_util::io::ReaderStream;

use crate::service::{StorageService, StoreChunkRequest};
use crate::web::dto::{
    ApiResponse, ChunkUploadResponse, DeleteResponse, MergeBody, MergeResponse, ScanResponse,
    StatusResponse, TreeQuery, TreeResponse,
};
use crate::web::error::ApiError;

/// Shared application state: the service facade.
pub struct AppState {
    /// The storage service every handler delegates to.
    pub service: StorageService,
}

impl AppState {
    /// Create the shared state.
    pub fn new(service: StorageService) -> Self {
        Self { service }
    }
}

/// Generate a safe Content-Disposition header value for downloads.
///
/// Control characters are stripped so a stored filename can never inject
/// headers; non-ASCII names get the RFC 5987 `filename*` parameter.
fn content_disposition_header(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' => '_',
            '\\' => '_',
            _ => c,
        })
        .collect();

    if filename.is_ascii() && !filename.chars().any(|c| c.is_control() || c == '"' || c == '\\') {
        return format!("attachment; filename=\"{filename}\"");
    }

    let encoded = urlencoding::encode(filename);
    format!("attachment; filename=\"{sanitized}\"; filename*=UTF-8''{encoded}")
}

/// GET /status - health check.
pub async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: "hoard is running".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// POST /upload - accept one chunk of a chunked upload.
///
/// Multipart fields: `chunk` (the payload), `filename` (target path),
/// `chunk_index`, `total_chunks`, and optionally `owner_id` and
/// `is_public`.
pub async fn upload_chunk(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<ChunkUploadResponse>>, ApiError> {
    let mut payload: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut chunk_index: Option<u32> = None;
    let mut total_chunks: Option<u32> = None;
    let mut owner_id: Option<i64> = None;
    let mut is_public = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "chunk" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("unreadable chunk field: {e}")))?;
                payload = Some(bytes.to_vec());
            }
            "filename" => filename = Some(read_text_field(field, "filename").await?),
            "chunk_index" => {
                chunk_index = Some(parse_field(read_text_field(field, "chunk_index").await?, "chunk_index")?)
            }
            "total_chunks" => {
                total_chunks =
                    Some(parse_field(read_text_field(field, "total_chunks").await?, "total_chunks")?)
            }
            "owner_id" => {
                owner_id = Some(parse_field(read_text_field(field, "owner_id").await?, "owner_id")?)
            }
            "is_public" => {
                is_public = parse_field(read_text_field(field, "is_public").await?, "is_public")?
            }
            _ => {}
        }
    }

    let payload = payload.ok_or_else(|| ApiError::unprocessable("missing chunk field"))?;
    let filename = filename.ok_or_else(|| ApiError::unprocessable("missing filename field"))?;
    let chunk_index =
        chunk_index.ok_or_else(|| ApiError::unprocessable("missing chunk_index field"))?;
    let total_chunks =
        total_chunks.ok_or_else(|| ApiError::unprocessable("missing total_chunks field"))?;

    let outcome = state
        .service
        .store_chunk(StoreChunkRequest {
            target_path: filename.clone(),
            index: chunk_index,
            total_chunks,
            payload,
            owner_id,
            is_public,
        })
        .await?;

    Ok(Json(ApiResponse::new(ChunkUploadResponse {
        path: filename,
        chunk_index,
        total_chunks,
        session_complete: outcome.session_complete,
    })))
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>, name: &str) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("unreadable {name} field: {e}")))
}

fn parse_field<T: std::str::FromStr>(raw: String, name: &str) -> Result<T, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::unprocessable(format!("invalid {name}: {raw}")))
}

/// POST /merge - assemble a completed upload into its final artifact.
pub async fn merge(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MergeBody>,
) -> Result<Json<ApiResponse<MergeResponse>>, ApiError> {
    let outcome = state
        .service
        .merge(
            &body.filename,
            body.total_chunks,
            body.size,
            body.owner_id,
            body.is_public,
        )
        .await?;

    Ok(Json(ApiResponse::new(MergeResponse {
        file: outcome.record.into(),
        size_mismatch: outcome.size_mismatch,
    })))
}

/// GET /files - list the folder tree, optionally scoped to a subtree.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TreeQuery>,
) -> Result<Json<ApiResponse<TreeResponse>>, ApiError> {
    let listing = state.service.list_tree(query.subtree.as_deref()).await?;
    Ok(Json(ApiResponse::new(listing.into())))
}

/// GET /download/*path - stream a stored file.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    let target = state.service.open_download(&path).await?;

    let file = tokio::fs::File::open(&target.absolute_path)
        .await
        .map_err(|e| {
            tracing::error!(path = %target.absolute_path.display(), error = %e, "failed to open artifact");
            ApiError::internal("Failed to open file")
        })?;

    let body = Body::from_stream(ReaderStream::new(file));

    Response::builder()
        .header(header::CONTENT_TYPE, target.mime_type.as_str())
        .header(header::CONTENT_LENGTH, target.size)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&target.filename),
        )
        .body(body)
        .map_err(|e| {
            tracing::error!(error = %e, "failed to build download response");
            ApiError::internal("Failed to build response")
        })
}

/// DELETE /delete/*path - delete a file or folder subtree.
pub async fn delete_path(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Json<ApiResponse<DeleteResponse>>, ApiError> {
    state.service.delete_path(&path).await?;
    Ok(Json(ApiResponse::new(DeleteResponse { path })))
}

/// POST /scan - run one reconciliation pass over the storage tree.
pub async fn scan(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<ScanResponse>>, ApiError> {
    let report = state.service.reconcile().await?;
    Ok(Json(ApiResponse::new(ScanResponse {
        folders_created: report.folders_created,
        files_created: report.files_created,
        entries_skipped: report.entries_skipped,
    })))
}
