/*!
 * Per-job artifact ownership.
 *
 * Every file a job creates is registered here at creation time and lives
 * inside the job's private temporary workspace. `release_all` removes each
 * artifact independently (one failure never stops the others) and then the
 * workspace itself; `Drop` runs the same release if the job never did.
 */

use log::{debug, warn};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// What an on-disk artifact holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    SourceVideo,
    ExtractedAudio,
    PartialOutput,
    RenderedOutput,
}

impl ArtifactKind {
    /// File name inside the job workspace
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::SourceVideo => "source.video",
            Self::ExtractedAudio => "audio.mp3",
            Self::PartialOutput => "output.partial.mp4",
            Self::RenderedOutput => "output.mp4",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SourceVideo => "source video",
            Self::ExtractedAudio => "extracted audio",
            Self::PartialOutput => "partial output",
            Self::RenderedOutput => "rendered output",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone)]
struct Artifact {
    kind: ArtifactKind,
    path: PathBuf,
}

/// An artifact that could not be removed
#[derive(Debug, Clone)]
pub struct ReleaseFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of releasing everything a job owned
#[derive(Debug, Clone, Default)]
pub struct ReleaseReport {
    pub released: Vec<PathBuf>,
    pub failures: Vec<ReleaseFailure>,
}

impl ReleaseReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Owns the workspace and every artifact of one job
#[derive(Debug)]
pub struct ArtifactRegistry {
    job_id: String,
    // @field: Workspace path, kept after the TempDir is closed for reporting
    root: PathBuf,
    workspace: Option<TempDir>,
    artifacts: Vec<Artifact>,
}

impl ArtifactRegistry {
    /// Create a private workspace for `job_id` under `parent`
    pub fn create(parent: &Path, job_id: &str) -> io::Result<Self> {
        std::fs::create_dir_all(parent)?;
        let workspace = tempfile::Builder::new()
            .prefix(&format!("subburn-{}-", job_id))
            .tempdir_in(parent)?;
        let root = workspace.path().to_path_buf();
        debug!("Job {} workspace: {}", job_id, root.display());

        Ok(Self {
            job_id: job_id.to_string(),
            root,
            workspace: Some(workspace),
            artifacts: Vec::new(),
        })
    }

    pub fn workspace(&self) -> &Path {
        &self.root
    }

    /// Path where an artifact of `kind` lives
    pub fn path_for(&self, kind: ArtifactKind) -> PathBuf {
        self.root.join(kind.file_name())
    }

    /// Register an artifact before the file is written, returning its path
    pub fn register(&mut self, kind: ArtifactKind) -> PathBuf {
        let path = self.path_for(kind);
        if !self.artifacts.iter().any(|a| a.kind == kind) {
            self.artifacts.push(Artifact {
                kind,
                path: path.clone(),
            });
        }
        path
    }

    pub fn is_registered(&self, kind: ArtifactKind) -> bool {
        self.artifacts.iter().any(|a| a.kind == kind)
    }

    /// Registered artifacts that still exist on disk
    pub fn live(&self) -> Vec<PathBuf> {
        self.artifacts
            .iter()
            .filter(|a| a.path.exists())
            .map(|a| a.path.clone())
            .collect()
    }

    /// Release a single artifact early, once its stage no longer needs it
    pub fn release(&mut self, kind: ArtifactKind) -> io::Result<()> {
        let Some(pos) = self.artifacts.iter().position(|a| a.kind == kind) else {
            return Ok(());
        };
        let artifact = self.artifacts.remove(pos);
        match remove_file(&artifact.path) {
            Ok(()) => {
                debug!("Job {}: released {}", self.job_id, kind);
                Ok(())
            }
            Err(e) => {
                // Keep it registered so release_all tries again
                self.artifacts.push(artifact);
                Err(e)
            }
        }
    }

    /// Remove every artifact and the workspace, independently of each other
    pub fn release_all(&mut self) -> ReleaseReport {
        let mut report = ReleaseReport::default();

        for artifact in self.artifacts.drain(..) {
            match remove_file(&artifact.path) {
                Ok(()) => report.released.push(artifact.path),
                Err(e) => {
                    warn!(
                        "Job {}: failed to release {} at {}: {}",
                        self.job_id,
                        artifact.kind,
                        artifact.path.display(),
                        e
                    );
                    report.failures.push(ReleaseFailure {
                        path: artifact.path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if let Some(workspace) = self.workspace.take() {
            match workspace.close() {
                Ok(()) => report.released.push(self.root.clone()),
                Err(e) => {
                    warn!(
                        "Job {}: failed to remove workspace {}: {}",
                        self.job_id,
                        self.root.display(),
                        e
                    );
                    report.failures.push(ReleaseFailure {
                        path: self.root.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        report
    }

    pub fn is_released(&self) -> bool {
        self.workspace.is_none() && self.artifacts.is_empty()
    }
}

impl Drop for ArtifactRegistry {
    fn drop(&mut self) {
        if !self.is_released() {
            warn!("Job {}: artifacts released on drop", self.job_id);
            self.release_all();
        }
    }
}

/// Remove a file, treating "already gone" as success
fn remove_file(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
