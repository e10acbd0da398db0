//! Module `file_ops`
//!
//! Stores, serves and removes files inside buckets. Uploads are written to a
//! hidden temporary file and renamed into place, so a reader never sees a
//! partially written file under its final name.

use std::io;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use tokio::fs::{self, DirBuilder, File, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use crate::error::StoreError;
use crate::storage::filesystem::{is_upload_temp, staging_path, upload_temp_path};
use crate::storage::{FileEntry, Sandbox};
use crate::transfer::results::{Download, StagedUpload};

/// Default chunk size for reading and writing file contents
pub const BUFFER_SIZE: usize = 128 * 1024;

#[cfg(unix)]
const BUCKET_DIR_MODE: u32 = 0o750;

/// Limits applied while moving bytes
#[derive(Debug, Clone, Copy)]
pub struct TransferOptions {
    pub buffer_size: usize,
    /// Uploads growing past this many bytes are aborted.
    pub max_upload_bytes: Option<u64>,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            buffer_size: BUFFER_SIZE,
            max_upload_bytes: None,
        }
    }
}

struct Target {
    bucket_path: PathBuf,
    file_path: PathBuf,
    name: String,
}

/// Stores `reader` as `bucket/filename`, creating the bucket when needed.
pub async fn put_file<R>(
    sandbox: &Sandbox,
    bucket: &str,
    filename: &str,
    reader: R,
    options: &TransferOptions,
) -> Result<FileEntry, StoreError>
where
    R: AsyncRead + Unpin,
{
    let target = resolve_target(sandbox, bucket, filename)?;
    create_bucket_dir(&target.bucket_path).await?;
    let staged = stage(upload_temp_path(&target.file_path), reader, options).await?;
    commit(target, staged).await
}

/// Writes `reader` to a hidden file in the store root before its destination
/// is known. Finish with [`commit_upload`] or [`discard_upload`].
pub async fn stage_upload<R>(
    sandbox: &Sandbox,
    reader: R,
    options: &TransferOptions,
) -> Result<StagedUpload, StoreError>
where
    R: AsyncRead + Unpin,
{
    stage(staging_path(sandbox.root()), reader, options).await
}

/// Moves a staged upload to `bucket/filename`. The staged file is removed if
/// the destination is refused.
pub async fn commit_upload(
    sandbox: &Sandbox,
    bucket: &str,
    filename: &str,
    staged: StagedUpload,
) -> Result<FileEntry, StoreError> {
    let target = match resolve_target(sandbox, bucket, filename) {
        Ok(target) => target,
        Err(e) => {
            discard_upload(staged).await;
            return Err(e);
        }
    };
    if let Err(e) = create_bucket_dir(&target.bucket_path).await {
        discard_upload(staged).await;
        return Err(e);
    }
    commit(target, staged).await
}

/// Drops a staged upload that will not be committed.
pub async fn discard_upload(staged: StagedUpload) {
    discard_temp(&staged.temp_path).await;
}

/// Opens `bucket/filename` for reading.
pub async fn get_file(
    sandbox: &Sandbox,
    bucket: &str,
    filename: &str,
) -> Result<Download, StoreError> {
    let file_path = sandbox.resolve_file(bucket, filename)?;
    let what = format!("file {}", join_name(bucket, filename));
    if is_upload_temp(&base_name(&file_path)) {
        return Err(StoreError::NotFound(what));
    }
    open_download(&file_path, &what).await
}

/// Opens a file addressed by its path relative to the store root.
pub async fn get_direct(sandbox: &Sandbox, path: &str) -> Result<Download, StoreError> {
    let file_path = sandbox.resolve_direct(path)?;
    let what = format!("file {}", path.trim_matches('/'));
    if is_upload_temp(&base_name(&file_path)) {
        return Err(StoreError::NotFound(what));
    }
    open_download(&file_path, &what).await
}

/// Removes `bucket/filename` and then the bucket directory if it became empty.
pub async fn delete_file(sandbox: &Sandbox, bucket: &str, filename: &str) -> Result<(), StoreError> {
    let bucket_path = sandbox.resolve_bucket(bucket)?;
    let file_path = sandbox.resolve_file(bucket, filename)?;
    let display_name = join_name(bucket, filename);

    // Uploads in flight belong to their writer
    if is_upload_temp(&base_name(&file_path)) {
        return Err(StoreError::NotFound(format!("file {display_name}")));
    }

    let metadata = match fs::symlink_metadata(&file_path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(StoreError::NotFound(format!("file {display_name}")));
        }
        Err(e) => return Err(e.into()),
    };
    if metadata.is_dir() {
        return Err(StoreError::NotARegularFile(display_name));
    }

    fs::remove_file(&file_path).await?;

    match fs::symlink_metadata(&file_path).await {
        Ok(_) => {
            return Err(StoreError::IoError(io::Error::other(format!(
                "{} still present after removal",
                file_path.display()
            ))));
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    if bucket_path != sandbox.root() {
        if let Err(e) = fs::remove_dir(&bucket_path).await {
            debug!("Keeping bucket {}: {e}", bucket_path.display());
        }
    }

    info!("Deleted file {display_name} (real: {})", file_path.display());
    Ok(())
}

fn resolve_target(sandbox: &Sandbox, bucket: &str, filename: &str) -> Result<Target, StoreError> {
    let bucket_path = sandbox.resolve_bucket(bucket)?;
    let file_path = sandbox.resolve_file(bucket, filename)?;
    let name = base_name(&file_path);
    if is_upload_temp(&name) {
        return Err(StoreError::validation(
            "filename",
            format!("{filename} is reserved for uploads in progress"),
        ));
    }
    Ok(Target {
        bucket_path,
        file_path,
        name,
    })
}

async fn create_bucket_dir(path: &Path) -> Result<(), StoreError> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(BUCKET_DIR_MODE);
    builder.create(path).await.map_err(|e| {
        error!("Failed to create bucket directory {}: {e}", path.display());
        StoreError::from(e)
    })
}

async fn stage<R>(
    temp_path: PathBuf,
    reader: R,
    options: &TransferOptions,
) -> Result<StagedUpload, StoreError>
where
    R: AsyncRead + Unpin,
{
    info!("Starting upload into {}", temp_path.display());
    match write_temp(reader, &temp_path, options).await {
        Ok(size) => Ok(StagedUpload { temp_path, size }),
        Err(e) => {
            discard_temp(&temp_path).await;
            Err(e)
        }
    }
}

async fn commit(target: Target, staged: StagedUpload) -> Result<FileEntry, StoreError> {
    let Target { file_path, name, .. } = target;

    if let Err(e) = fs::rename(&staged.temp_path, &file_path).await {
        error!(
            "Failed to rename {} to {}: {e}",
            staged.temp_path.display(),
            file_path.display()
        );
        discard_temp(&staged.temp_path).await;
        return Err(e.into());
    }

    let metadata = fs::metadata(&file_path).await?;
    if !metadata.is_file() {
        return Err(StoreError::NotARegularFile(file_path.display().to_string()));
    }

    info!(
        "Upload completed: {} ({} bytes)",
        file_path.display(),
        staged.size
    );
    Ok(FileEntry::from_metadata(name, &metadata)?)
}

async fn write_temp<R>(
    mut reader: R,
    temp_path: &Path,
    options: &TransferOptions,
) -> Result<u64, StoreError>
where
    R: AsyncRead + Unpin,
{
    let mut temp_file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp_path)
        .await
        .map_err(|e| {
            error!("Failed to create temporary file {}: {e}", temp_path.display());
            StoreError::from(e)
        })?;

    let mut buffer = vec![0u8; options.buffer_size.max(1)];
    let mut total_bytes_received = 0u64;

    loop {
        let n = reader.read(&mut buffer).await?;
        if n == 0 {
            break;
        }

        // Check the size limit before writing
        total_bytes_received += n as u64;
        if let Some(limit) = options.max_upload_bytes {
            if total_bytes_received > limit {
                warn!("Upload size limit exceeded: {total_bytes_received} bytes > {limit} bytes");
                return Err(StoreError::validation(
                    "file",
                    format!("upload exceeds {limit} bytes"),
                ));
            }
        }

        temp_file.write_all(&buffer[..n]).await?;
    }

    temp_file.flush().await?;
    temp_file.sync_all().await?;
    Ok(total_bytes_received)
}

async fn discard_temp(temp_path: &Path) {
    if let Err(e) = fs::remove_file(temp_path).await {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Failed to remove temporary file {}: {e}", temp_path.display());
        }
    }
}

async fn open_download(path: &Path, what: &str) -> Result<Download, StoreError> {
    let metadata = match fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(StoreError::NotFound(what.to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    if !metadata.is_file() {
        return Err(StoreError::NotFound(what.to_string()));
    }

    let file = File::open(path).await?;
    info!("Serving {} ({} bytes)", path.display(), metadata.len());
    Ok(Download {
        file,
        name: base_name(path),
        size: metadata.len(),
    })
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn join_name(bucket: &str, filename: &str) -> String {
    let bucket = bucket.trim_matches('/');
    if bucket.is_empty() {
        filename.to_string()
    } else {
        format!("{bucket}/{filename}")
    }
}
