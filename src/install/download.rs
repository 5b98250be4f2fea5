//! Archive download with bounded-buffer streaming

use log::{debug, info};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use super::artifact::ArtifactType;
use super::http::{HttpClient, RequestFailure};
use super::platform::Platform;
use super::progress::{DownloadPhase, InstallProgress, ProgressReporter};
use super::version::Version;
use crate::error::{Result, UpdaterError};

/// Bytes read from the socket per write; archives are never held in memory.
const DOWNLOAD_BUFFER_SIZE: usize = 64 * 1024;

/// Emit progress every 256KB
const PROGRESS_THRESHOLD: u64 = 256 * 1024;

/// `<base>/<version>/<platform>/<artifact>-<platform>.zip`
pub fn archive_url(
    download_base: &str,
    version: &Version,
    platform: Platform,
    artifact: ArtifactType,
) -> String {
    format!(
        "{}/{}/{}/{}",
        download_base.trim_end_matches('/'),
        version,
        platform,
        artifact.archive_file_name(platform)
    )
}

/// Position of the artifact in the current install, for progress events
#[derive(Debug, Clone, Copy)]
pub struct Slot {
    pub index: usize,
    pub total: usize,
}

impl Default for Slot {
    fn default() -> Self {
        Self { index: 1, total: 1 }
    }
}

/// Downloads archives for one platform into the owned directory.
pub struct ArchiveFetcher<'a> {
    http: &'a HttpClient,
    download_base: &'a str,
    platform: Platform,
    owned_dir: &'a Path,
}

impl<'a> ArchiveFetcher<'a> {
    pub fn new(
        http: &'a HttpClient,
        download_base: &'a str,
        platform: Platform,
        owned_dir: &'a Path,
    ) -> Self {
        Self {
            http,
            download_base,
            platform,
            owned_dir,
        }
    }

    /// Download `artifact` at `version` to `<owned>/<artifact>-<platform>.zip`.
    ///
    /// The body is streamed into a temporary file next to the destination and
    /// renamed into place only once complete, so a failed or truncated
    /// transfer never leaves a partial archive behind.
    pub fn download(
        &self,
        version: &Version,
        artifact: ArtifactType,
        slot: Slot,
        progress: &ProgressReporter,
    ) -> Result<PathBuf> {
        let url = archive_url(self.download_base, version, self.platform, artifact);
        let dest = self.owned_dir.join(artifact.archive_file_name(self.platform));

        std::fs::create_dir_all(self.owned_dir).map_err(|e| {
            UpdaterError::download(
                format!("Failed to create directory {}", self.owned_dir.display()),
                Some(Box::new(e)),
            )
        })?;

        info!("Downloading {} from {}", artifact.stem(self.platform), url);

        let bytes = self
            .http
            .with_retry(&format!("Download of {artifact}"), |_| {
                self.try_download(&url, &dest, version, artifact, slot, progress)
            })
            .map_err(RequestFailure::into_download_error)?;

        debug!("Wrote {bytes} bytes to {}", dest.display());
        Ok(dest)
    }

    fn try_download(
        &self,
        url: &str,
        dest: &Path,
        version: &Version,
        artifact: ArtifactType,
        slot: Slot,
        progress: &ProgressReporter,
    ) -> Result<u64, RequestFailure> {
        let mut response = self.http.get(url)?;
        let expected = response.content_length();

        let local_err = |action: &str, e: std::io::Error| {
            RequestFailure::fatal(
                format!("Failed to {action} {}: {e}", dest.display()),
                Some(Box::new(e)),
            )
        };

        // Dropped (and deleted) on every early return below
        let mut part = tempfile::Builder::new()
            .prefix(".")
            .suffix(".zip.part")
            .tempfile_in(self.owned_dir)
            .map_err(|e| local_err("create temporary file for", e))?;

        let event = |bytes_downloaded: u64| InstallProgress {
            artifact,
            artifact_index: slot.index,
            total_artifacts: slot.total,
            bytes_downloaded,
            total_bytes: expected.unwrap_or(0),
            phase: DownloadPhase::Downloading,
            version: version.clone(),
        };
        progress.send(event(0));

        let mut buffer = vec![0u8; DOWNLOAD_BUFFER_SIZE];
        let mut downloaded: u64 = 0;
        let mut last_progress_bytes = 0u64;

        loop {
            let n = match response.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(RequestFailure::transient(
                        format!("Connection lost after {downloaded} bytes from {url}: {e}"),
                        Some(Box::new(e)),
                    ));
                }
            };

            part.write_all(&buffer[..n])
                .map_err(|e| local_err("write", e))?;
            downloaded += n as u64;

            if downloaded - last_progress_bytes >= PROGRESS_THRESHOLD {
                progress.send(event(downloaded));
                last_progress_bytes = downloaded;
            }
        }

        if let Some(expected) = expected
            && expected != downloaded
        {
            return Err(RequestFailure::transient(
                format!("Truncated download from {url}: received {downloaded} of {expected} bytes"),
                None,
            ));
        }

        part.flush().map_err(|e| local_err("flush", e))?;
        part.persist(dest).map_err(|e| local_err("move archive to", e.error))?;

        if last_progress_bytes != downloaded {
            progress.send(event(downloaded));
        }

        Ok(downloaded)
    }
}
