//! Keeps a local Chrome for Testing install up to date.
//!
//! ```no_run
//! use cft_updater::{ArtifactType, Platform, Updater};
//!
//! # fn main() -> cft_updater::Result<()> {
//! let updater = Updater::new("/opt/tools", Platform::detect()?)?;
//! let outcome = updater.update(&[ArtifactType::Chrome, ArtifactType::Chromedriver], false)?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod install;

pub use config::UpdaterConfig;
pub use error::{Result, UpdaterError};
pub use install::{
    ArtifactType, CleanupWarning, DownloadPhase, InstallManifest, InstallProfile, InstallProgress,
    InstallReport, InstallStatus, Platform, UpdateOutcome, Updater, Version,
};
