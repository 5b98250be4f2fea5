//! Installation progress events
//!
//! The core is synchronous; a front-end that wants live progress passes a
//! channel sender and renders events on its own thread.

use crossbeam_channel::{Sender, TrySendError};
use log::warn;
use std::cell::Cell;

use super::artifact::ArtifactType;
use super::version::Version;

/// Phase of a single artifact install
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadPhase {
    Downloading, // Streaming archive bytes
    Extracting,  // Unpacking into the owned directory
    Complete,    // Extracted and archive removed
}

/// One progress update for the artifact currently being installed
#[derive(Debug, Clone)]
pub struct InstallProgress {
    pub artifact: ArtifactType,
    /// 1-based position in the requested artifact list
    pub artifact_index: usize,
    pub total_artifacts: usize,
    pub bytes_downloaded: u64,
    /// From `Content-Length`; 0 when the server did not send one
    pub total_bytes: u64,
    pub phase: DownloadPhase,
    pub version: Version,
}

impl InstallProgress {
    /// Overall progress across all artifacts, 0.0 to 1.0
    pub fn overall(&self) -> f32 {
        let current = match self.phase {
            DownloadPhase::Downloading if self.total_bytes > 0 => {
                (self.bytes_downloaded as f64 / self.total_bytes as f64) as f32
            }
            DownloadPhase::Downloading => 0.0,
            DownloadPhase::Extracting => 1.0,
            DownloadPhase::Complete => 1.0,
        };
        let completed = self.artifact_index.saturating_sub(1) as f32;
        ((completed + current) / self.total_artifacts.max(1) as f32).clamp(0.0, 1.0)
    }

    /// Human-readable one-liner
    pub fn message(&self) -> String {
        match self.phase {
            DownloadPhase::Downloading => {
                let mb_downloaded = self.bytes_downloaded as f64 / 1_048_576.0;
                if self.total_bytes > 0 {
                    let mb_total = self.total_bytes as f64 / 1_048_576.0;
                    format!(
                        "Downloading {} ({:.1} MB / {:.1} MB)",
                        self.artifact, mb_downloaded, mb_total
                    )
                } else {
                    format!("Downloading {} ({:.1} MB)", self.artifact, mb_downloaded)
                }
            }
            DownloadPhase::Extracting => format!("Extracting {}...", self.artifact),
            DownloadPhase::Complete => format!("{} {} installed", self.artifact, self.version),
        }
    }
}

/// Best-effort progress sink.
///
/// A receiver that went away never fails an install; after the first
/// disconnect further updates are dropped silently.
pub struct ProgressReporter {
    tx: Option<Sender<InstallProgress>>,
    disabled: Cell<bool>,
}

impl ProgressReporter {
    pub fn new(tx: Option<Sender<InstallProgress>>) -> Self {
        Self {
            tx,
            disabled: Cell::new(false),
        }
    }

    pub fn silent() -> Self {
        Self::new(None)
    }

    pub fn send(&self, progress: InstallProgress) {
        let Some(tx) = &self.tx else { return };
        if self.disabled.get() {
            return;
        }
        if let Err(TrySendError::Disconnected(_)) = tx.try_send(progress) {
            warn!("Progress receiver closed, continuing install without updates");
            self.disabled.set(true);
        }
    }
}
