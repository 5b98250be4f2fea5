//! Install orchestration: compare, fetch, extract, record
//!
//! ```text
//! Idle -> Comparing -> UpToDate                    (no download)
//!                   -> Installing -> Installed     (manifest written)
//!                                 -> Failed        (error returned)
//! ```

use crossbeam_channel::Sender;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use super::artifact::ArtifactType;
use super::download::{ArchiveFetcher, Slot};
use super::extract::{self, CleanupWarning, ExtractSummary};
use super::http::HttpClient;
use super::manifest::InstallManifest;
use super::platform::Platform;
use super::progress::{DownloadPhase, InstallProgress, ProgressReporter};
use super::version::{self, Version};
use crate::config::UpdaterConfig;
use crate::error::{Result, UpdaterError};

/// Fixed directory the updater owns beneath the install root
pub const OWNED_DIR_NAME: &str = "chrome";

/// One artifact that made it onto disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledArtifact {
    pub artifact: ArtifactType,
    /// `<owned>/<artifact>-<platform>`
    pub path: PathBuf,
    pub summary: ExtractSummary,
}

/// Result of a successful [`Updater::install`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub version: Version,
    pub platform: Platform,
    pub installed: Vec<InstalledArtifact>,
    /// Archives that could not be deleted; the install is still complete
    pub warnings: Vec<CleanupWarning>,
}

/// Terminal states of [`Updater::update`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Nothing downloaded
    UpToDate { version: Version },
    Installed {
        previous: Option<Version>,
        report: InstallReport,
    },
}

/// What is on disk right now, for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallStatus {
    pub owned_dir: PathBuf,
    pub platform: Platform,
    pub current_version: Option<Version>,
    pub manifest: Option<InstallManifest>,
    /// Artifact directories that belong to the recorded install. Without a
    /// manifest every directory that exists for this platform is listed.
    pub present: Vec<(ArtifactType, PathBuf)>,
    /// Directories on disk that the manifest does not record
    pub stale: Vec<(ArtifactType, PathBuf)>,
}

/// Keeps one install root up to date for one platform.
///
/// Root and platform are fixed for the lifetime of the value. Independent
/// roots can be updated from independent threads; nothing is shared.
#[derive(Debug)]
pub struct Updater {
    root: PathBuf,
    owned_dir: PathBuf,
    platform: Platform,
    config: UpdaterConfig,
    http: HttpClient,
    progress_tx: Option<Sender<InstallProgress>>,
}

impl Updater {
    /// Updater with the default endpoints and timeouts
    pub fn new(root: impl AsRef<Path>, platform: Platform) -> Result<Self> {
        Self::with_config(root, platform, UpdaterConfig::default())
    }

    /// Validate `root` and create `<root>/chrome` if it does not exist.
    ///
    /// Pointing the root at a directory that is itself named `chrome` is
    /// rejected: the caller most likely selected the owned directory.
    pub fn with_config(
        root: impl AsRef<Path>,
        platform: Platform,
        config: UpdaterConfig,
    ) -> Result<Self> {
        config.validate()?;
        let root = std::path::absolute(root.as_ref()).map_err(|e| {
            UpdaterError::config(format!(
                "Invalid install root {}: {e}",
                root.as_ref().display()
            ))
        })?;

        if root.file_name().is_some_and(|name| name == OWNED_DIR_NAME) {
            return Err(UpdaterError::config(format!(
                "Select the parent directory of '{OWNED_DIR_NAME}' or delete the '{OWNED_DIR_NAME}' directory ({})",
                root.display()
            )));
        }

        let owned_dir = root.join(OWNED_DIR_NAME);
        if !owned_dir.is_dir() {
            fs::create_dir_all(&owned_dir).map_err(|e| {
                UpdaterError::config(format!(
                    "Failed to create directory at {}: {e}",
                    owned_dir.display()
                ))
            })?;
            info!("Created directory at: {}", owned_dir.display());
        }

        let http = HttpClient::from_config(&config)?;

        Ok(Self {
            root,
            owned_dir,
            platform,
            config,
            http,
            progress_tx: None,
        })
    }

    /// Send [`InstallProgress`] events to `tx` during installs
    pub fn with_progress(mut self, tx: Sender<InstallProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn owned_dir(&self) -> &Path {
        &self.owned_dir
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// Latest stable version published upstream
    pub fn latest_version(&self) -> Result<Version> {
        version::fetch_latest_version(&self.http, &self.config.version_url)
    }

    /// Installed version, `None` if nothing usable is installed
    pub fn current_version(&self) -> Option<Version> {
        version::read_current_version(&self.owned_dir, self.platform)
    }

    /// Fetch, extract and clean up each artifact in order, then record
    /// `version` in the manifest.
    ///
    /// The first failing download or extraction aborts the remaining
    /// artifacts and is returned as is; the manifest is only written when
    /// every artifact succeeded. Moving to a new version removes the
    /// directories of artifacts that were not installed again.
    pub fn install(&self, version: &Version, artifacts: &[ArtifactType]) -> Result<InstallReport> {
        if artifacts.is_empty() {
            return Err(UpdaterError::config("no artifacts selected for install"));
        }
        let previous = self.current_version();

        let progress = ProgressReporter::new(self.progress_tx.clone());
        let fetcher = ArchiveFetcher::new(
            &self.http,
            self.config.download_base(),
            self.platform,
            &self.owned_dir,
        );

        let mut installed = Vec::with_capacity(artifacts.len());
        let mut warnings = Vec::new();

        for (i, &artifact) in artifacts.iter().enumerate() {
            let slot = Slot {
                index: i + 1,
                total: artifacts.len(),
            };
            let event = |phase| InstallProgress {
                artifact,
                artifact_index: slot.index,
                total_artifacts: slot.total,
                bytes_downloaded: 0,
                total_bytes: 0,
                phase,
                version: version.clone(),
            };

            let archive = fetcher.download(version, artifact, slot, &progress)?;

            info!("Extracting {artifact}");
            progress.send(event(DownloadPhase::Extracting));
            let (path, summary) = match self.extract_into_place(&archive, artifact) {
                Ok(done) => done,
                Err(e) => {
                    // The archive is useless once extraction failed
                    if let Some(warning) = extract::delete_archive(&archive) {
                        warn!("{warning}");
                    }
                    return Err(e);
                }
            };

            if let Some(warning) = extract::delete_archive(&archive) {
                warnings.push(warning);
            }

            info!("{artifact} downloaded and extracted successfully.");
            progress.send(event(DownloadPhase::Complete));
            installed.push(InstalledArtifact {
                artifact,
                path,
                summary,
            });
        }

        self.record(version, artifacts)?;
        if previous.as_ref() != Some(version) {
            warnings.extend(self.prune_stale(artifacts));
        }

        Ok(InstallReport {
            version: version.clone(),
            platform: self.platform,
            installed,
            warnings,
        })
    }

    /// Compare the installed version with the latest one and install when
    /// they differ (string equality), or unconditionally with `force`.
    ///
    /// An install at the latest version that lacks some of the requested
    /// artifacts is not up to date.
    pub fn update(&self, artifacts: &[ArtifactType], force: bool) -> Result<UpdateOutcome> {
        let latest = self.latest_version()?;
        let current = self.current_version();

        if !force && current.as_ref() == Some(&latest) && self.has_artifacts(&latest, artifacts) {
            info!("Already up-to-date: Version {latest}");
            return Ok(UpdateOutcome::UpToDate { version: latest });
        }

        match &current {
            Some(current) if *current == latest => {
                info!("Installing {latest} for {} (reinstall)", self.platform)
            }
            Some(current) => info!("Updating {current} -> {latest} for {}", self.platform),
            None => info!("Installing {latest} for {}", self.platform),
        }

        let report = self.install(&latest, artifacts)?;
        info!("Installation successful: Version {latest}");
        Ok(UpdateOutcome::Installed {
            previous: current,
            report,
        })
    }

    pub fn status(&self) -> InstallStatus {
        let manifest = InstallManifest::load(&self.owned_dir).unwrap_or_else(|e| {
            warn!("{e}");
            None
        });
        let (present, stale): (Vec<_>, Vec<_>) = ArtifactType::ALL
            .into_iter()
            .map(|a| (a, self.owned_dir.join(a.stem(self.platform))))
            .filter(|(_, path)| path.is_dir())
            .partition(|(a, _)| match &manifest {
                Some(m) if m.platform == self.platform => m.artifacts.contains(a),
                _ => true,
            });

        InstallStatus {
            owned_dir: self.owned_dir.clone(),
            platform: self.platform,
            current_version: self.current_version(),
            manifest,
            present,
            stale,
        }
    }

    /// Whether the requested artifacts are on disk at `version`.
    ///
    /// Installs without a canonical manifest only know their browser
    /// version, so they are trusted as long as the directories exist.
    fn has_artifacts(&self, version: &Version, artifacts: &[ArtifactType]) -> bool {
        match InstallManifest::load(&self.owned_dir) {
            Ok(Some(manifest)) => manifest.version == *version && manifest.covers(artifacts),
            _ => artifacts
                .iter()
                .all(|a| self.owned_dir.join(a.stem(self.platform)).is_dir()),
        }
    }

    /// Extract into a staging directory, then swap it in for the artifact's
    /// directory. An existing install survives a failed extraction, and
    /// files from an older version never linger.
    fn extract_into_place(
        &self,
        archive: &Path,
        artifact: ArtifactType,
    ) -> Result<(PathBuf, ExtractSummary)> {
        let stem = artifact.stem(self.platform);
        let target = self.owned_dir.join(&stem);
        let staging = self.owned_dir.join(format!(".{stem}.staging"));

        remove_dir_if_present(&staging)?;
        let summary = match extract::extract(archive, &staging) {
            Ok(summary) => summary,
            Err(e) => {
                let _ = fs::remove_dir_all(&staging);
                return Err(e);
            }
        };

        remove_dir_if_present(&target)?;
        fs::rename(&staging, &target).map_err(|e| {
            UpdaterError::extraction(
                format!("Failed to move {} into place", target.display()),
                &target,
                e,
            )
        })?;

        Ok((target, summary))
    }

    /// Remove artifact directories of this platform outside `kept`.
    ///
    /// Runs after the manifest is written, so a directory that cannot be
    /// removed is reported and left for the user.
    fn prune_stale(&self, kept: &[ArtifactType]) -> Vec<CleanupWarning> {
        let mut warnings = Vec::new();
        for artifact in ArtifactType::ALL {
            if kept.contains(&artifact) {
                continue;
            }
            let stem = artifact.stem(self.platform);
            let path = self.owned_dir.join(&stem);
            if !path.is_dir() {
                continue;
            }
            match fs::remove_dir_all(&path) {
                Ok(()) => info!("Removed {stem} left from the previous version"),
                Err(e) => {
                    let warning = CleanupWarning {
                        file_name: stem,
                        location: path,
                        reason: e.to_string(),
                    };
                    warn!("{warning}");
                    warnings.push(warning);
                }
            }
        }
        warnings
    }

    /// Write the manifest, keeping artifacts recorded earlier at the same version
    fn record(&self, version: &Version, artifacts: &[ArtifactType]) -> Result<()> {
        let mut recorded: Vec<ArtifactType> = match InstallManifest::load(&self.owned_dir) {
            Ok(Some(previous)) if previous.version == *version => previous
                .artifacts
                .into_iter()
                .filter(|a| self.owned_dir.join(a.stem(self.platform)).is_dir())
                .collect(),
            _ => Vec::new(),
        };
        for &artifact in artifacts {
            if !recorded.contains(&artifact) {
                recorded.push(artifact);
            }
        }

        InstallManifest::new(version.clone(), self.platform, recorded).save(&self.owned_dir)
    }
}

fn remove_dir_if_present(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(UpdaterError::io(
            format!("Failed to remove {}", path.display()),
            e,
        )),
    }
}
