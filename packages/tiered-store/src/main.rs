use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tiered_store::io_utils;
use tiered_store::{FileSystemStorage, ObjectKey, StorageBackend, StorageConfig};
use tokio::fs;

#[derive(Parser)]
#[command(name = "tstore")]
#[command(about = "Key-addressed object storage on a local filesystem", long_about = None)]
#[command(version)]
struct Cli {
    /// Storage root (defaults to TSTORE_ROOT, then the config file)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a file under a key
    Upload {
        /// Object key, e.g. topic/0/00000000000000000000.log
        key: ObjectKey,

        /// Path to the file to store
        file: PathBuf,

        /// Fail unless exactly this many bytes are stored
        #[arg(long)]
        expected_length: Option<u64>,
    },

    /// Write an object, or a byte range of it, to stdout or a file
    Fetch {
        /// Object key
        key: ObjectKey,

        /// First byte to return
        #[arg(long)]
        start: Option<u64>,

        /// Byte after the last one to return
        #[arg(long)]
        end: Option<u64>,

        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete objects and prune directories they leave empty
    Delete {
        /// Object keys
        #[arg(required = true)]
        keys: Vec<ObjectKey>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so fetched bytes on stdout stay clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match cli.root {
        Some(root) => StorageConfig::new(root),
        None => StorageConfig::load().await?,
    };
    let storage = FileSystemStorage::configure(config)?;

    match cli.command {
        Commands::Upload {
            key,
            file,
            expected_length,
        } => {
            let mut source = fs::File::open(&file)
                .await
                .with_context(|| format!("Failed to open file: {}", file.display()))?;

            let stored = storage
                .upload(&key, &mut source, expected_length)
                .await
                .with_context(|| format!("Failed to upload {}", key))?;

            println!("{}", stored);
            Ok(())
        }
        Commands::Fetch {
            key,
            start,
            end,
            output,
        } => {
            let mut source = match (start, end) {
                (None, None) => storage.fetch(&key).await?,
                (start, end) => {
                    storage
                        .fetch_range(&key, start.unwrap_or(0), end.unwrap_or(u64::MAX))
                        .await?
                }
            };

            let copied = match output {
                Some(path) => {
                    let mut file = fs::File::create(&path)
                        .await
                        .with_context(|| format!("Failed to create file: {}", path.display()))?;
                    let copied = io_utils::copy_all(&mut source, &mut file).await?;
                    file.sync_all().await?;
                    copied
                }
                None => io_utils::copy_all(&mut source, &mut tokio::io::stdout()).await?,
            };

            tracing::debug!("Fetched {} bytes of {}", copied, key);
            Ok(())
        }
        Commands::Delete { keys } => {
            storage.delete_all(&keys).await?;
            Ok(())
        }
    }
}
