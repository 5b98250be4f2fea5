//! Distribution components and install profiles

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::platform::Platform;
use crate::error::{Result, UpdaterError};

/// A component published for every Chrome for Testing release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactType {
    Chrome,
    Chromedriver,
    ChromeHeadlessShell,
}

impl ArtifactType {
    pub const ALL: [ArtifactType; 3] = [
        ArtifactType::Chrome,
        ArtifactType::Chromedriver,
        ArtifactType::ChromeHeadlessShell,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::Chrome => "chrome",
            ArtifactType::Chromedriver => "chromedriver",
            ArtifactType::ChromeHeadlessShell => "chrome-headless-shell",
        }
    }

    /// `<artifact>-<platform>`: the upstream zip name without extension, the
    /// archive's top-level directory and the local install directory name.
    pub fn stem(&self, platform: Platform) -> String {
        format!("{}-{}", self.as_str(), platform)
    }

    /// File name of the downloaded archive, e.g. `chromedriver-linux64.zip`
    pub fn archive_file_name(&self, platform: Platform) -> String {
        format!("{}.zip", self.stem(platform))
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactType {
    type Err = UpdaterError;

    fn from_str(s: &str) -> Result<Self> {
        ArtifactType::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| {
                UpdaterError::config(format!(
                    "unknown artifact '{s}' (expected chrome, chromedriver or chrome-headless-shell)"
                ))
            })
    }
}

/// Named artifact selections.
///
/// Every profile installs chromedriver; they differ in which browser build
/// comes with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstallProfile {
    /// chrome-headless-shell + chromedriver
    #[default]
    Headless,
    /// chrome + chromedriver
    Headful,
    /// Everything, in upstream order
    All,
}

impl InstallProfile {
    /// Artifacts in install order
    pub fn artifacts(&self) -> Vec<ArtifactType> {
        match self {
            InstallProfile::Headless => {
                vec![ArtifactType::ChromeHeadlessShell, ArtifactType::Chromedriver]
            }
            InstallProfile::Headful => vec![ArtifactType::Chrome, ArtifactType::Chromedriver],
            InstallProfile::All => ArtifactType::ALL.to_vec(),
        }
    }
}

impl FromStr for InstallProfile {
    type Err = UpdaterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "headless" => Ok(InstallProfile::Headless),
            "headful" => Ok(InstallProfile::Headful),
            "all" => Ok(InstallProfile::All),
            other => Err(UpdaterError::config(format!(
                "unknown profile '{other}' (expected headless, headful or all)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_names_follow_upstream_layout() {
        assert_eq!(ArtifactType::Chrome.stem(Platform::Linux64), "chrome-linux64");
        assert_eq!(
            ArtifactType::ChromeHeadlessShell.archive_file_name(Platform::MacArm64),
            "chrome-headless-shell-mac-arm64.zip"
        );
        assert_eq!(
            ArtifactType::Chromedriver.archive_file_name(Platform::Win32),
            "chromedriver-win32.zip"
        );
    }

    #[test]
    fn parse_artifacts() {
        assert_eq!(
            "chrome-headless-shell".parse::<ArtifactType>().ok(),
            Some(ArtifactType::ChromeHeadlessShell)
        );
        assert!("chromium".parse::<ArtifactType>().is_err());
    }

    #[test]
    fn profiles_always_include_the_driver() {
        for profile in [InstallProfile::Headless, InstallProfile::Headful, InstallProfile::All] {
            assert!(profile.artifacts().contains(&ArtifactType::Chromedriver));
        }
        assert_eq!(
            InstallProfile::All.artifacts(),
            vec![
                ArtifactType::Chrome,
                ArtifactType::Chromedriver,
                ArtifactType::ChromeHeadlessShell
            ]
        );
        assert_eq!("headful".parse::<InstallProfile>().ok(), Some(InstallProfile::Headful));
    }
}
