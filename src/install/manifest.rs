//! Canonical install manifest
//!
//! `<root>/chrome/cft-manifest.toml` is the only state that survives a
//! restart. It is written by the orchestrator after the last artifact has been
//! extracted, so its presence means the recorded version is fully installed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::artifact::ArtifactType;
use super::platform::Platform;
use super::version::Version;
use crate::error::{Result, UpdaterError};

pub const MANIFEST_FILE: &str = "cft-manifest.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallManifest {
    pub version: Version,
    pub platform: Platform,
    /// Artifacts installed at `version`, in install order
    pub artifacts: Vec<ArtifactType>,
    pub installed_at: DateTime<Utc>,
}

impl InstallManifest {
    pub fn new(version: Version, platform: Platform, artifacts: Vec<ArtifactType>) -> Self {
        Self {
            version,
            platform,
            artifacts,
            installed_at: Utc::now(),
        }
    }

    pub fn path(owned_dir: &Path) -> PathBuf {
        owned_dir.join(MANIFEST_FILE)
    }

    /// `Ok(None)` when no manifest has been written yet
    pub fn load(owned_dir: &Path) -> Result<Option<Self>> {
        let path = Self::path(owned_dir);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(UpdaterError::manifest(
                    format!("Failed to read {}", path.display()),
                    Some(Box::new(e)),
                ));
            }
        };

        toml::from_str(&text).map(Some).map_err(|e| {
            UpdaterError::manifest(
                format!("Failed to parse {}", path.display()),
                Some(Box::new(e)),
            )
        })
    }

    /// Write atomically: a reader sees either the old record or the new one.
    pub fn save(&self, owned_dir: &Path) -> Result<()> {
        let path = Self::path(owned_dir);
        let text = toml::to_string_pretty(self).map_err(|e| {
            UpdaterError::manifest("Failed to serialize install manifest", Some(Box::new(e)))
        })?;

        let write_err = |e: std::io::Error| {
            UpdaterError::manifest(
                format!("Failed to write {}", path.display()),
                Some(Box::new(e)),
            )
        };

        let mut tmp = tempfile::Builder::new()
            .prefix(".cft-manifest")
            .suffix(".tmp")
            .tempfile_in(owned_dir)
            .map_err(write_err)?;
        tmp.write_all(text.as_bytes()).map_err(write_err)?;
        tmp.flush().map_err(write_err)?;
        tmp.persist(&path).map_err(|e| write_err(e.error))?;

        log::debug!("Recorded version {} in {}", self.version, path.display());
        Ok(())
    }

    /// Whether every artifact in `wanted` is recorded
    pub fn covers(&self, wanted: &[ArtifactType]) -> bool {
        wanted.iter().all(|a| self.artifacts.contains(a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> InstallManifest {
        InstallManifest::new(
            Version::parse("125.0.1.1").unwrap(),
            Platform::MacArm64,
            vec![ArtifactType::ChromeHeadlessShell, ArtifactType::Chromedriver],
        )
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let written = manifest();
        written.save(dir.path()).unwrap();

        let text = std::fs::read_to_string(InstallManifest::path(dir.path())).unwrap();
        assert!(text.contains("version = \"125.0.1.1\""));
        assert!(text.contains("platform = \"mac-arm64\""));
        assert!(text.contains("chrome-headless-shell"));

        let loaded = InstallManifest::load(dir.path()).unwrap();
        assert_eq!(loaded, Some(written));
    }

    #[test]
    fn missing_manifest_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(InstallManifest::load(dir.path()).unwrap(), None);
    }

    #[test]
    fn invalid_version_in_manifest_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            InstallManifest::path(dir.path()),
            "version = \"\"\nplatform = \"linux64\"\nartifacts = []\ninstalled_at = \"2024-05-01T10:00:00Z\"\n",
        )
        .unwrap();
        let err = InstallManifest::load(dir.path()).unwrap_err();
        assert!(matches!(err, UpdaterError::Manifest { .. }));
    }

    #[test]
    fn save_overwrites_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        manifest().save(dir.path()).unwrap();
        let mut newer = manifest();
        newer.version = Version::parse("126.0.0.0").unwrap();
        newer.save(dir.path()).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from(MANIFEST_FILE)]);
        assert_eq!(
            InstallManifest::load(dir.path()).unwrap().map(|m| m.version),
            Some(Version::parse("126.0.0.0").unwrap())
        );
    }

    #[test]
    fn covers_checks_every_artifact() {
        let m = manifest();
        assert!(m.covers(&[ArtifactType::Chromedriver]));
        assert!(!m.covers(&[ArtifactType::Chrome, ArtifactType::Chromedriver]));
    }
}
