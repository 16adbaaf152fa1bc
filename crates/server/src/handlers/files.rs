//! File transfer handlers: upload, merge, download, size and info.

use crate::error::{ApiError, ApiResult};
use crate::metrics::{
    BYTES_DOWNLOADED, BYTES_UPLOADED, MERGE_DURATION, MERGES, UPLOADS, record_transfer_error,
};
use crate::state::AppState;
use axum::Json;
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use depot_core::{ByteRange, DownloadDescriptor, FileInfo, UploadDescriptor};
use depot_storage::{MergeOutcome, StorageResult};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Query parameters of an upload.
#[derive(Debug, Default, Deserialize)]
pub struct UploadParams {
    /// Declared chunk count; absent or <= 0 stores a whole file.
    pub chunks: Option<i32>,
    /// Ordinal of this chunk.
    pub chunk: Option<u32>,
}

/// Response to a stored upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub file_name: String,
    pub bytes_written: u64,
    pub chunked: bool,
}

/// Body of a merge trigger.
#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub chunks: i32,
}

/// Response to a merge trigger.
#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MergeResponse {
    Merged { size: u64, chunks: usize },
    Incomplete { declared: i32, observed: usize },
}

/// Query parameters of a download.
#[derive(Debug, Default, Deserialize)]
pub struct DownloadParams {
    pub begin: Option<u64>,
    pub length: Option<u64>,
}

/// Response to a size query.
#[derive(Debug, Serialize)]
pub struct SizeResponse {
    pub size: u64,
}

/// Count storage failures by type before handing them to the error mapper.
fn observe<T>(result: StorageResult<T>) -> ApiResult<T> {
    result.map_err(|e| {
        record_transfer_error(e.error_type());
        ApiError::from(e)
    })
}

/// PUT /v1/files/{category}/{file_name} - Store a whole file or one chunk.
///
/// The request body is streamed straight to disk.
pub async fn upload_file(
    State(state): State<AppState>,
    Path((category, file_name)): Path<(String, String)>,
    Query(params): Query<UploadParams>,
    body: Body,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let desc = UploadDescriptor {
        category,
        file_name,
        total_chunks: params.chunks,
        ordinal: params.chunk,
    };
    let source = body.into_data_stream().map_err(std::io::Error::other);

    let receipt = observe(state.transfer.upload(&desc, source).await)?;

    let kind = if receipt.chunked { "chunk" } else { "whole" };
    UPLOADS.with_label_values(&[kind]).inc();
    BYTES_UPLOADED.inc_by(receipt.bytes_written);

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            file_name: desc.file_name,
            bytes_written: receipt.bytes_written,
            chunked: receipt.chunked,
        }),
    ))
}

/// POST /v1/files/{category}/{file_name}/merge - Reassemble uploaded chunks.
///
/// Returns 200 once merged and 202 while chunks are still missing.
pub async fn merge_file(
    State(state): State<AppState>,
    Path((category, file_name)): Path<(String, String)>,
    payload: Result<Json<MergeRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MergeResponse>)> {
    let Json(req) = payload?;
    let started = Instant::now();
    let result = state
        .transfer
        .merge(&category, &file_name, req.chunks)
        .await;
    MERGE_DURATION.observe(started.elapsed().as_secs_f64());

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            MERGES.with_label_values(&["failed"]).inc();
            return observe(Err(e));
        }
    };

    match outcome {
        MergeOutcome::Merged { size, chunks, .. } => {
            MERGES.with_label_values(&["merged"]).inc();
            Ok((StatusCode::OK, Json(MergeResponse::Merged { size, chunks })))
        }
        MergeOutcome::Incomplete { declared, observed } => {
            MERGES.with_label_values(&["incomplete"]).inc();
            Ok((
                StatusCode::ACCEPTED,
                Json(MergeResponse::Incomplete { declared, observed }),
            ))
        }
    }
}

/// GET /v1/files/{category}/{file_name} - Stream a file or a byte range of it.
pub async fn download_file(
    State(state): State<AppState>,
    Path((category, file_name)): Path<(String, String)>,
    Query(params): Query<DownloadParams>,
) -> ApiResult<Response> {
    let desc = DownloadDescriptor {
        category,
        file_name,
        range: ByteRange::from_parts(params.begin, params.length),
    };
    let download = observe(state.transfer.open_download(&desc).await)?;

    let disposition = content_disposition(&download.file_name);

    let body_stream = download.stream.inspect_ok(|bytes| {
        BYTES_DOWNLOADED.inc_by(bytes.len() as u64);
    });

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
            (CONTENT_DISPOSITION, disposition),
            (CONTENT_LENGTH, HeaderValue::from(download.content_length)),
        ],
        Body::from_stream(body_stream),
    )
        .into_response())
}

/// `attachment` disposition naming the file.
///
/// Printable ASCII names go in a quoted string with `"` and `\` escaped;
/// anything else uses the RFC 5987 `filename*` form.
fn content_disposition(file_name: &str) -> HeaderValue {
    let value = if file_name.bytes().all(|b| (0x20..0x7f).contains(&b)) {
        let escaped = file_name.replace('\\', "\\\\").replace('"', "\\\"");
        format!("attachment; filename=\"{escaped}\"")
    } else {
        format!("attachment; filename*=UTF-8''{}", percent_encode(file_name))
    };
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len() * 3);
    for b in value.bytes() {
        if b.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&b) {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

/// GET /v1/files/{category}/{file_name}/size - Size in bytes, 0 when absent.
pub async fn file_size(
    State(state): State<AppState>,
    Path((category, file_name)): Path<(String, String)>,
) -> ApiResult<Json<SizeResponse>> {
    let desc = DownloadDescriptor::new(category, file_name);
    let size = observe(state.transfer.file_size(&desc).await)?;
    Ok(Json(SizeResponse { size }))
}

/// GET /v1/files/{category}/{file_name}/info - Cached content metadata.
pub async fn file_info(
    State(state): State<AppState>,
    Path((category, file_name)): Path<(String, String)>,
) -> ApiResult<Json<FileInfo>> {
    let desc = DownloadDescriptor::new(category, file_name);
    match observe(state.transfer.file_info(&desc).await)? {
        Some(info) => Ok(Json(info)),
        None => Err(ApiError::NotFound(format!("file not found: {}", desc.file_name))),
    }
}
