//! Latest-version lookup and installed-version discovery

use log::{debug, info, warn};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::artifact::ArtifactType;
use super::http::{HttpClient, RequestFailure};
use super::manifest::InstallManifest;
use super::platform::Platform;
use crate::error::{Result, UpdaterError};

/// Legacy marker files shipped inside the browser archive: `<version>.manifest`
const LEGACY_MANIFEST_SUFFIX: &str = ".manifest";

/// A Chrome for Testing version such as `124.0.6367.91`.
///
/// The token is opaque: versions are compared for equality only. It is
/// interpolated into URLs, so whitespace and path separators are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version(String);

impl Version {
    pub fn parse(raw: &str) -> Result<Self> {
        let token = raw.trim();
        if token.is_empty() {
            return Err(UpdaterError::config("version must not be empty"));
        }
        if token
            .chars()
            .any(|c| c.is_whitespace() || c == '/' || c == '\\')
        {
            return Err(UpdaterError::config(format!(
                "invalid version '{token}': whitespace and path separators are not allowed"
            )));
        }
        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Version {
    type Err = UpdaterError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = UpdaterError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// GET the latest published version.
///
/// Only a `200 OK` is accepted. The first line of the response body is the
/// version; nothing else is parsed. Every failure is a network error, there
/// is no fallback value.
pub fn fetch_latest_version(http: &HttpClient, version_url: &str) -> Result<Version> {
    let body = http
        .with_retry("Version check", |_| {
            let response = http.get(version_url)?;
            let status = response.status();
            if status != StatusCode::OK {
                return Err(RequestFailure::fatal(
                    format!("HTTP {status} from {version_url}, expected 200 OK"),
                    None,
                ));
            }
            response.text().map_err(|e| {
                RequestFailure::transient(
                    format!("Failed to read response from {version_url}: {e}"),
                    Some(Box::new(e)),
                )
            })
        })
        .map_err(RequestFailure::into_network_error)?;

    let first_line = body.lines().next().unwrap_or_default();
    let version = Version::parse(first_line).map_err(|e| {
        UpdaterError::network(
            format!("Unexpected response from {version_url}: {e}"),
            None,
        )
    })?;

    info!("Latest stable Chrome version: {version}");
    Ok(version)
}

/// Read the installed version beneath the owned directory.
///
/// The canonical manifest wins. Without one, the `<version>.manifest` marker
/// that older installs left inside the browser tree is used. `None` means
/// "needs install": nothing found, or the record could not be read.
pub fn read_current_version(owned_dir: &Path, platform: Platform) -> Option<Version> {
    match InstallManifest::load(owned_dir) {
        Ok(Some(manifest)) => {
            if manifest.platform != platform {
                warn!(
                    "Manifest in {} records platform {}, expected {}",
                    owned_dir.display(),
                    manifest.platform,
                    platform
                );
                return None;
            }
            info!("Current version: {}", manifest.version);
            Some(manifest.version)
        }
        Ok(None) => read_legacy_marker(owned_dir, platform),
        Err(e) => {
            warn!("Ignoring unreadable install manifest: {e}");
            None
        }
    }
}

/// Scan `<owned>/chrome-<platform>/chrome-<platform>/` for `*.manifest`.
///
/// Candidates are sorted so that the pick does not depend on directory
/// listing order.
fn read_legacy_marker(owned_dir: &Path, platform: Platform) -> Option<Version> {
    let stem = ArtifactType::Chrome.stem(platform);
    let marker_dir = owned_dir.join(&stem).join(&stem);

    let entries = match std::fs::read_dir(&marker_dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("No legacy marker directory {}: {e}", marker_dir.display());
            return None;
        }
    };

    let mut candidates: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.ends_with(LEGACY_MANIFEST_SUFFIX))
        .collect();
    candidates.sort();

    if candidates.len() > 1 {
        warn!(
            "Found {} version markers in {}, using {}",
            candidates.len(),
            marker_dir.display(),
            candidates[0]
        );
    }

    let name = candidates.first()?;
    let version = Version::parse(name.strip_suffix(LEGACY_MANIFEST_SUFFIX)?).ok()?;
    info!("Found legacy version marker. Current version: {version}");
    Some(version)
}
