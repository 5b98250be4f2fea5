//! Chrome for Testing installation
//!
//! Everything needed to keep `<root>/chrome` at the latest stable Chrome for
//! Testing release: version discovery, archive download with retries, safe
//! extraction and the install manifest. [`Updater`] ties them together.

mod artifact;
mod download;
mod extract;
mod http;
mod manifest;
mod platform;
mod progress;
mod updater;
mod version;

pub use artifact::{ArtifactType, InstallProfile};
pub use download::{ArchiveFetcher, Slot, archive_url};
pub use extract::{CleanupWarning, ExtractSummary, delete_archive, extract};
pub use http::{HttpClient, MAX_RETRY_DELAY_MS, RequestFailure, RetryPolicy};
pub use manifest::{InstallManifest, MANIFEST_FILE};
pub use platform::Platform;
pub use progress::{DownloadPhase, InstallProgress, ProgressReporter};
pub use updater::{
    InstallReport, InstallStatus, InstalledArtifact, OWNED_DIR_NAME, UpdateOutcome, Updater,
};
pub use version::{Version, fetch_latest_version, read_current_version};
