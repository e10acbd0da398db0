//! Transfer result types
//!
//! Defines result structures returned by transfer operations.

use std::path::PathBuf;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// An opened stored file, positioned at offset 0
#[derive(Debug)]
pub struct Download {
    pub file: File,
    /// Base name to offer as the attachment name.
    pub name: String,
    pub size: u64,
}

impl Download {
    /// Copy the whole file into `writer`, `buffer_size` bytes at a time.
    pub async fn copy_to<W>(mut self, writer: &mut W, buffer_size: usize) -> std::io::Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let mut buffer = vec![0u8; buffer_size.max(1)];
        let mut total_bytes_sent = 0u64;
        loop {
            let n = self.file.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            writer.write_all(&buffer[..n]).await?;
            total_bytes_sent += n as u64;
        }
        writer.flush().await?;
        Ok(total_bytes_sent)
    }
}

/// Upload body written to a hidden temporary file, waiting for its final name
#[derive(Debug)]
pub struct StagedUpload {
    pub(crate) temp_path: PathBuf,
    pub size: u64,
}
