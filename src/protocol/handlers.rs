//! HTTP handlers
//!
//! One handler per route. Each parses its request, runs the store operation
//! and wraps the outcome in an [`Envelope`]. Downloads answer with the file
//! as an attachment, or a bare 404 on any failure.

use std::io;

use axum::Json;
use axum::body::Body;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use futures::TryStreamExt;
use log::{debug, warn};
use tokio_util::io::{ReaderStream, StreamReader};

use crate::error::StoreError;
use crate::protocol::commands::{
    BucketPageRequest, FileListRequest, FilePageRequest, FileRequest, optional, required,
};
use crate::protocol::responses::{Envelope, reply};
use crate::server::AppState;
use crate::storage::{FileEntry, collect_buckets, collect_files, list_buckets, list_files};
use crate::transfer::{
    Download, StagedUpload, commit_upload, delete_file, discard_upload, get_direct, get_file,
    stage_upload,
};

/// `GET /hello`
pub async fn handle_hello() -> Response {
    (StatusCode::OK, Json(Envelope::message("hello"))).into_response()
}

/// `bucket/list`: every bucket, unpaged
pub async fn handle_bucket_list(State(state): State<AppState>) -> Response {
    let sandbox = state.sandbox.clone();
    let depth = state.config.max_bucket_depth;
    reply(run_blocking(move || collect_buckets(&sandbox, None, depth)).await)
}

/// `bucket/pagelist`
pub async fn handle_bucket_page(
    State(state): State<AppState>,
    payload: Result<Json<BucketPageRequest>, JsonRejection>,
) -> Response {
    let request = match parse(payload) {
        Ok(request) => request,
        Err(e) => return reply::<()>(Err(e)),
    };
    let sandbox = state.sandbox.clone();
    let depth = state.config.max_bucket_depth;
    reply(
        run_blocking(move || {
            list_buckets(
                &sandbox,
                optional(&request.pattern),
                request.offset,
                request.limit,
                depth,
            )
        })
        .await,
    )
}

/// `file/list`: every matching file of a bucket, unpaged
pub async fn handle_file_list(
    State(state): State<AppState>,
    payload: Result<Json<FileListRequest>, JsonRejection>,
) -> Response {
    let request = match parse(payload) {
        Ok(request) => request,
        Err(e) => return reply::<()>(Err(e)),
    };
    let sandbox = state.sandbox.clone();
    reply(
        run_blocking(move || {
            collect_files(&sandbox, &request.bucket, optional(&request.pattern))
        })
        .await,
    )
}

/// `file/pagelist`
pub async fn handle_file_page(
    State(state): State<AppState>,
    payload: Result<Json<FilePageRequest>, JsonRejection>,
) -> Response {
    let request = match parse(payload) {
        Ok(request) => request,
        Err(e) => return reply::<()>(Err(e)),
    };
    let sandbox = state.sandbox.clone();
    reply(
        run_blocking(move || {
            list_files(
                &sandbox,
                &request.bucket,
                optional(&request.pattern),
                request.offset,
                request.limit,
            )
        })
        .await,
    )
}

/// `file/put`: multipart form with `bucket`, `filename` and `file`
pub async fn handle_file_put(
    State(state): State<AppState>,
    payload: Result<Multipart, MultipartRejection>,
) -> Response {
    let multipart = match payload {
        Ok(multipart) => multipart,
        Err(e) => return reply::<()>(Err(StoreError::validation("request", e.body_text()))),
    };
    reply(store_upload(&state, multipart).await.map(|entry| vec![entry]))
}

/// `file/get`
pub async fn handle_file_get(
    State(state): State<AppState>,
    payload: Result<Json<FileRequest>, JsonRejection>,
) -> Response {
    let outcome = match parse(payload) {
        Ok(request) => match request.filename() {
            Ok(filename) => get_file(&state.sandbox, &request.bucket, filename).await,
            Err(e) => Err(e),
        },
        Err(e) => Err(e),
    };
    attachment(outcome, state.config.buffer_size)
}

/// `file/down/*path`
pub async fn handle_file_down(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    attachment(
        get_direct(&state.sandbox, &path).await,
        state.config.buffer_size,
    )
}

/// `file/drop`
pub async fn handle_file_drop(
    State(state): State<AppState>,
    payload: Result<Json<FileRequest>, JsonRejection>,
) -> Response {
    let outcome = match parse(payload) {
        Ok(request) => match request.filename() {
            Ok(filename) => delete_file(&state.sandbox, &request.bucket, filename).await,
            Err(e) => Err(e),
        },
        Err(e) => Err(e),
    };
    reply(outcome.map(|()| Vec::<FileEntry>::new()))
}

#[derive(Default)]
struct UploadForm {
    bucket: String,
    filename: String,
    staged: Option<StagedUpload>,
}

/// Reads the whole form before the upload gets its final name, so fields may
/// arrive in any order.
async fn store_upload(state: &AppState, multipart: Multipart) -> Result<FileEntry, StoreError> {
    let mut form = UploadForm::default();
    if let Err(e) = read_form(state, multipart, &mut form).await {
        if let Some(staged) = form.staged {
            discard_upload(staged).await;
        }
        return Err(e);
    }

    let Some(staged) = form.staged else {
        required("filename", &form.filename)?;
        return Err(StoreError::validation("file", "field is required"));
    };
    let filename = match required("filename", &form.filename) {
        Ok(filename) => filename,
        Err(e) => {
            discard_upload(staged).await;
            return Err(e);
        }
    };
    commit_upload(&state.sandbox, &form.bucket, filename, staged).await
}

async fn read_form(
    state: &AppState,
    mut multipart: Multipart,
    form: &mut UploadForm,
) -> Result<(), StoreError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "bucket" => form.bucket = field.text().await.map_err(multipart_error)?,
            "filename" => form.filename = field.text().await.map_err(multipart_error)?,
            "file" => {
                if form.staged.is_some() {
                    return Err(StoreError::validation("file", "field given more than once"));
                }
                let reader = StreamReader::new(field.map_err(io::Error::other));
                tokio::pin!(reader);
                let staged =
                    stage_upload(&state.sandbox, reader, &state.config.transfer_options()).await?;
                form.staged = Some(staged);
            }
            other => debug!("Ignoring multipart field {other:?}"),
        }
    }
    Ok(())
}

fn attachment(outcome: Result<Download, StoreError>, buffer_size: usize) -> Response {
    let download = match outcome {
        Ok(download) => download,
        Err(e) => {
            warn!("Download refused: {e}");
            return StatusCode::NOT_FOUND.into_response();
        }
    };

    let disposition = format!(
        "attachment; filename=\"{}\"",
        download.name.replace(['"', '\\'], "_")
    );
    let size = download.size;
    let stream = ReaderStream::with_capacity(download.file, buffer_size.max(1));

    let mut response = Body::from_stream(stream).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );
    response
}

fn parse<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, StoreError> {
    payload
        .map(|Json(request)| request)
        .map_err(|e| StoreError::validation("request", e.body_text()))
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> StoreError {
    StoreError::validation("request", err.body_text())
}

async fn run_blocking<T, F>(task: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| StoreError::IoError(io::Error::other(e)))?
}
