//! Transfer module
//!
//! Moves file contents in and out of buckets: upload, download and delete.

pub mod file_ops;
pub mod results;

pub use file_ops::{
    BUFFER_SIZE, TransferOptions, commit_upload, delete_file, discard_upload, get_direct, get_file,
    put_file, stage_upload,
};
pub use results::{Download, StagedUpload};
