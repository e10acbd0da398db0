//! Store API client
//!
//! One method per route. JSON replies are unwrapped from their envelope;
//! an error envelope becomes [`ClientError::Store`].

use std::path::Path;

use log::{debug, info, warn};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use crate::client::error::ClientError;
use crate::protocol::Envelope;
use crate::protocol::commands::{BucketPageRequest, FileListRequest, FilePageRequest, FileRequest};
use crate::storage::{Bucket, FileEntry, Page};
use crate::transfer::BUFFER_SIZE;

const API_PATH: &str = "api/v1";

#[derive(Debug, Clone)]
pub struct StoreClient {
    base: Url,
    http: Client,
    buffer_size: usize,
}

impl StoreClient {
    /// Client for the store at `node`, either `host:port` or a full URL.
    pub fn new(node: &str) -> Result<Self, ClientError> {
        let node = if node.contains("://") {
            node.to_string()
        } else {
            format!("http://{node}")
        };
        let mut base = Url::parse(&node)
            .map_err(|e| ClientError::InvalidArgument(format!("{node}: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            base,
            http: Client::builder().build()?,
            buffer_size: BUFFER_SIZE,
        })
    }

    /// Chunk size used when streaming uploads
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Full URL of an API route such as `file/list`.
    pub fn endpoint(&self, route: &str) -> Result<Url, ClientError> {
        self.base
            .join(&format!("{API_PATH}/{route}"))
            .map_err(|e| ClientError::InvalidArgument(format!("{route}: {e}")))
    }

    pub async fn hello(&self) -> Result<String, ClientError> {
        let response = self.http.get(self.endpoint("hello")?).send().await?;
        let status = response.status();
        let envelope: Envelope<()> = decode(status, &response.bytes().await?)?;
        Ok(envelope.message.unwrap_or_default())
    }

    /// Every top-level bucket
    pub async fn list_buckets(&self) -> Result<Vec<Bucket>, ClientError> {
        self.call("bucket/list", &BucketPageRequest::default()).await
    }

    pub async fn bucket_page(
        &self,
        pattern: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Page<Bucket>, ClientError> {
        let request = BucketPageRequest {
            pattern: pattern.to_string(),
            offset,
            limit,
        };
        self.call("bucket/pagelist", &request).await
    }

    pub async fn list_files(&self, bucket: &str, pattern: &str) -> Result<Vec<FileEntry>, ClientError> {
        let request = FileListRequest {
            bucket: bucket.to_string(),
            pattern: pattern.to_string(),
        };
        self.call("file/list", &request).await
    }

    pub async fn file_page(
        &self,
        bucket: &str,
        pattern: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Page<FileEntry>, ClientError> {
        let request = FilePageRequest {
            bucket: bucket.to_string(),
            pattern: pattern.to_string(),
            offset,
            limit,
        };
        self.call("file/pagelist", &request).await
    }

    /// Uploads the local file at `path` into `bucket` under its own base name.
    pub async fn put(&self, bucket: &str, path: &Path) -> Result<FileEntry, ClientError> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                ClientError::InvalidArgument(format!("{} has no file name", path.display()))
            })?
            .to_string();

        let file = File::open(path).await?;
        let size = file.metadata().await?.len();
        let body = Body::wrap_stream(ReaderStream::with_capacity(file, self.buffer_size));
        let part = Part::stream_with_length(body, size)
            .file_name(filename.clone())
            .mime_str("application/octet-stream")?;
        let form = Form::new()
            .text("bucket", bucket.to_string())
            .text("filename", filename)
            .part("file", part);

        debug!("Uploading {} ({size} bytes) to bucket {bucket:?}", path.display());
        let response = self
            .http
            .post(self.endpoint("file/put")?)
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        let entries: Vec<FileEntry> = read_reply(response).await?;
        entries.into_iter().next().ok_or(ClientError::Status(status))
    }

    /// Downloads `bucket/filename` into `dest`. A partial file is removed on
    /// failure.
    pub async fn get(&self, bucket: &str, filename: &str, dest: &Path) -> Result<u64, ClientError> {
        let request = FileRequest {
            bucket: bucket.to_string(),
            filename: filename.to_string(),
        };
        let mut response = self
            .http
            .post(self.endpoint("file/get")?)
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status));
        }

        let mut file = File::create(dest).await?;
        match copy_body(&mut response, &mut file).await {
            Ok(total_bytes_received) => {
                info!("Downloaded {} ({total_bytes_received} bytes)", dest.display());
                Ok(total_bytes_received)
            }
            Err(e) => {
                drop(file);
                if let Err(rm) = fs::remove_file(dest).await {
                    warn!("Failed to remove partial download {}: {rm}", dest.display());
                }
                Err(e)
            }
        }
    }

    pub async fn delete(&self, bucket: &str, filename: &str) -> Result<(), ClientError> {
        let request = FileRequest {
            bucket: bucket.to_string(),
            filename: filename.to_string(),
        };
        let _: Vec<FileEntry> = self.call("file/drop", &request).await?;
        Ok(())
    }

    async fn call<B, T>(&self, route: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("POST {route}");
        let response = self
            .http
            .post(self.endpoint(route)?)
            .json(body)
            .send()
            .await?;
        read_reply(response).await
    }
}

async fn read_reply<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    let envelope: Envelope<T> = decode(status, &response.bytes().await?)?;
    if envelope.error {
        return Err(ClientError::Store {
            status,
            message: envelope.message.unwrap_or_default(),
        });
    }
    envelope.result.ok_or(ClientError::Status(status))
}

fn decode<T: DeserializeOwned>(status: StatusCode, bytes: &[u8]) -> Result<Envelope<T>, ClientError> {
    match serde_json::from_slice(bytes) {
        Ok(envelope) => Ok(envelope),
        Err(e) if status.is_success() => Err(e.into()),
        Err(_) => Err(ClientError::Status(status)),
    }
}

async fn copy_body(response: &mut Response, file: &mut File) -> Result<u64, ClientError> {
    let mut total_bytes_received = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        total_bytes_received += chunk.len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;
    Ok(total_bytes_received)
}
