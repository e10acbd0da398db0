//! Bucket store - command line client

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::error;
use serde::Serialize;

use bucket_store::client::{ClientError, StoreClient};

#[derive(Parser, Debug)]
#[command(name = "bucket-cli")]
#[command(about = "List, upload, download and drop files in a bucket store")]
struct Args {
    /// Store address, `host:port` or a full URL
    #[arg(long, global = true, default_value = "localhost:8080")]
    node: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List files of a bucket
    List {
        #[arg(long, default_value = "")]
        bucket: String,

        /// Glob matched against file names
        #[arg(long, default_value = "*")]
        pattern: String,
    },
    /// Upload a local file
    Put {
        #[arg(long, default_value = "")]
        bucket: String,

        /// Local file, stored under its base name
        #[arg(long)]
        file: PathBuf,
    },
    /// Download a file into the current directory
    Get {
        #[arg(long, default_value = "")]
        bucket: String,

        #[arg(long)]
        file: String,

        /// Destination path instead of `./<file>`
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Delete a file
    Drop {
        #[arg(long, default_value = "")]
        bucket: String,

        #[arg(long)]
        file: String,
    },
    /// List buckets
    Listb {
        /// Substring searched for in bucket names
        #[arg(long, default_value = "")]
        pattern: String,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    match run(args).await {
        Ok(output) => println!("{output}"),
        Err(e) => {
            error!("Command failed: {e}");
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

async fn run(args: Args) -> Result<String, ClientError> {
    let client = StoreClient::new(&args.node)?;

    match args.command {
        Command::List { bucket, pattern } => pretty(&client.list_files(&bucket, &pattern).await?),
        Command::Put { bucket, file } => pretty(&client.put(&bucket, &file).await?),
        Command::Get {
            bucket,
            file,
            output,
        } => {
            let dest = match output {
                Some(path) => path,
                None => PathBuf::from(&file)
                    .file_name()
                    .map(PathBuf::from)
                    .ok_or_else(|| ClientError::InvalidArgument(format!("{file} has no file name")))?,
            };
            let size = client.get(&bucket, &file, &dest).await?;
            Ok(format!("{} ({size} bytes)", dest.display()))
        }
        Command::Drop { bucket, file } => {
            client.delete(&bucket, &file).await?;
            Ok(format!("dropped {file}"))
        }
        Command::Listb {
            pattern,
            offset,
            limit,
        } => pretty(&client.bucket_page(&pattern, offset, limit).await?),
    }
}

fn pretty<T: Serialize>(value: &T) -> Result<String, ClientError> {
    Ok(serde_json::to_string_pretty(value)?)
}
