/*!
 * Narrow interfaces to the world outside the pipeline.
 *
 * - `MediaSource`: where the submitted video comes from
 * - `Delivery`: where the finished video goes
 * - `StatusSink`: best-effort, one-line progress updates
 *
 * File-based implementations are provided for the command line tool.
 */

use async_trait::async_trait;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::info;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::errors::ProviderError;

/// Provides the submitted video
#[async_trait]
pub trait MediaSource: Send + Sync + Debug {
    /// Size of the video before it is fetched
    fn file_size_bytes(&self) -> Result<u64, ProviderError>;

    /// Short name for logs and captions
    fn display_name(&self) -> String;

    /// Copy the video to `dest`
    async fn fetch(&self, dest: &Path) -> Result<(), ProviderError>;
}

/// Where a delivered video ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub location: String,
}

/// Hands the rendered video to the requester
#[async_trait]
pub trait Delivery: Send + Sync + Debug {
    async fn deliver(&self, output: &Path, caption: &str) -> Result<DeliveryReceipt, ProviderError>;
}

/// Receives status lines; must never fail or block for long
pub trait StatusSink: Send + Sync + Debug {
    fn report(&self, job_id: &str, status: &str);

    /// Called once when the job is over
    fn finish(&self, _job_id: &str, _final_status: &str) {}
}

/// A video already on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalFileSource {
    path: PathBuf,
}

impl LocalFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MediaSource for LocalFileSource {
    fn file_size_bytes(&self) -> Result<u64, ProviderError> {
        std::fs::metadata(&self.path)
            .map(|m| m.len())
            .map_err(|e| ProviderError::RequestFailed(format!("{}: {}", self.path.display(), e)))
    }

    fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    async fn fetch(&self, dest: &Path) -> Result<(), ProviderError> {
        let mut target = tokio::fs::File::create(dest)
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("{}: {}", dest.display(), e)))?;
        copy_into(&self.path, &mut target)
            .await
            .map(|_| ())
            .map_err(|e| ProviderError::RequestFailed(format!("{}: {}", self.path.display(), e)))
    }
}

/// Copies the rendered video to a fixed destination path
#[derive(Debug, Clone)]
pub struct FileDelivery {
    destination: PathBuf,
    // @field: Replace an existing file at the destination
    overwrite: bool,
}

impl FileDelivery {
    pub fn new(destination: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            destination: destination.into(),
            overwrite,
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }
}

#[async_trait]
impl Delivery for FileDelivery {
    async fn deliver(&self, output: &Path, caption: &str) -> Result<DeliveryReceipt, ProviderError> {
        if self.destination.exists() && !self.overwrite {
            return Err(ProviderError::RequestFailed(format!(
                "{} already exists (use -f to force overwrite)",
                self.destination.display()
            )));
        }
        let parent = match self.destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        // The destination only ever appears complete; a dropped copy takes
        // its temp file with it
        let staged = tempfile::Builder::new()
            .prefix(".subburn-")
            .suffix(".part")
            .tempfile_in(&parent)
            .map_err(|e| ProviderError::RequestFailed(format!("{}: {}", parent.display(), e)))?;
        let handle = staged
            .as_file()
            .try_clone()
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        let mut target = tokio::fs::File::from_std(handle);
        copy_into(output, &mut target)
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("{}: {}", self.destination.display(), e)))?;
        drop(target);
        // Same mode as the rendered file, like a plain copy
        let permissions = tokio::fs::metadata(output)
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?
            .permissions();
        tokio::fs::set_permissions(staged.path(), permissions)
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let persisted = if self.overwrite {
            staged.persist(&self.destination)
        } else {
            staged.persist_noclobber(&self.destination)
        };
        persisted.map_err(|e| {
            ProviderError::RequestFailed(format!("{}: {}", self.destination.display(), e.error))
        })?;

        info!("{} → {}", caption, self.destination.display());
        Ok(DeliveryReceipt {
            location: self.destination.display().to_string(),
        })
    }
}

/// Copy `source` into `target` chunk by chunk, stopping when dropped
async fn copy_into(source: &Path, target: &mut tokio::fs::File) -> std::io::Result<u64> {
    let mut reader = tokio::fs::File::open(source).await?;
    let copied = tokio::io::copy(&mut reader, target).await?;
    target.flush().await?;
    target.sync_all().await?;
    Ok(copied)
}

/// Writes status lines to the log
#[derive(Debug, Default, Clone)]
pub struct LogStatusSink;

impl StatusSink for LogStatusSink {
    fn report(&self, job_id: &str, status: &str) {
        info!("[{}] {}", job_id, status);
    }
}

/// One spinner per job on a shared terminal display
#[derive(Debug, Default)]
pub struct ProgressStatusSink {
    multi: MultiProgress,
    bars: Mutex<HashMap<String, ProgressBar>>,
}

impl ProgressStatusSink {
    pub fn new(multi: MultiProgress) -> Self {
        Self {
            multi,
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn bar_for(&self, job_id: &str) -> ProgressBar {
        let mut bars = self.bars.lock();
        bars.entry(job_id.to_string())
            .or_insert_with(|| {
                let bar = self.multi.add(ProgressBar::new_spinner());
                let style = ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {prefix} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner());
                bar.set_style(style);
                bar.set_prefix(job_id.to_string());
                bar.enable_steady_tick(Duration::from_millis(120));
                bar
            })
            .clone()
    }
}

impl StatusSink for ProgressStatusSink {
    fn report(&self, job_id: &str, status: &str) {
        self.bar_for(job_id).set_message(status.to_string());
    }

    fn finish(&self, job_id: &str, final_status: &str) {
        if let Some(bar) = self.bars.lock().remove(job_id) {
            bar.finish_with_message(final_status.to_string());
        }
    }
}
