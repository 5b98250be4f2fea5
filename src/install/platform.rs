//! Platform identifiers used in Chrome for Testing download URLs and paths

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, UpdaterError};

/// Platforms published by Chrome for Testing.
///
/// The canonical string form is used verbatim in download URLs and local
/// directory names (`chrome-linux64`, `chromedriver-mac-arm64`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "linux64")]
    Linux64,
    #[serde(rename = "mac-arm64")]
    MacArm64,
    #[serde(rename = "mac-x64")]
    MacX64,
    #[serde(rename = "win32")]
    Win32,
    #[serde(rename = "win64")]
    Win64,
}

/// Host platform, detected once per process
static PLATFORM_CACHE: OnceCell<Platform> = OnceCell::new();

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Linux64,
        Platform::MacArm64,
        Platform::MacX64,
        Platform::Win32,
        Platform::Win64,
    ];

    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux64 => "linux64",
            Platform::MacArm64 => "mac-arm64",
            Platform::MacX64 => "mac-x64",
            Platform::Win32 => "win32",
            Platform::Win64 => "win64",
        }
    }

    /// Detect the host platform (cached after first call)
    pub fn detect() -> Result<Self> {
        PLATFORM_CACHE
            .get_or_try_init(|| Self::from_os_arch(std::env::consts::OS, std::env::consts::ARCH))
            .copied()
    }

    fn from_os_arch(os: &str, arch: &str) -> Result<Self> {
        match (os, arch) {
            ("linux", "x86_64") => Ok(Platform::Linux64),
            ("macos", "aarch64") => Ok(Platform::MacArm64),
            ("macos", "x86_64") => Ok(Platform::MacX64),
            ("windows", "x86") => Ok(Platform::Win32),
            ("windows", "x86_64") => Ok(Platform::Win64),
            ("linux", arch) => Err(UpdaterError::config(format!(
                "Chrome for Testing has no Linux build for {arch}"
            ))),
            (os, arch) => Err(UpdaterError::config(format!(
                "Unsupported platform: {os} {arch}"
            ))),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = UpdaterError;

    fn from_str(s: &str) -> Result<Self> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                UpdaterError::config(format!(
                    "unknown platform '{s}' (expected one of: linux64, mac-arm64, mac-x64, win32, win64)"
                ))
            })
    }
}
