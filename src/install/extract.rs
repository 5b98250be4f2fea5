//! Zip extraction and archive cleanup
//!
//! Entries are written exactly where the archive says, relative to the
//! destination. Nothing is stripped: the installed tree mirrors the upstream
//! layout (`chrome-linux64/chrome-linux64/chrome`, ...).

use log::{debug, info, warn};
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use zip::ZipArchive;

use crate::error::{Result, UpdaterError};

/// What an extraction wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub directories: usize,
    pub symlinks: usize,
    pub bytes: u64,
}

/// A downloaded archive that could not be removed after extraction.
///
/// Not an error: the install itself is complete and consistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupWarning {
    pub file_name: String,
    pub location: PathBuf,
    pub reason: String,
}

impl fmt::Display for CleanupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to delete {} ({}). Delete manually at: {}",
            self.file_name,
            self.reason,
            self.location.display()
        )
    }
}

fn create_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|e| {
        UpdaterError::extraction(
            format!("Failed to create directory {}", path.display()),
            path,
            e,
        )
    })
}

/// Extract every entry of `archive` beneath `destination`.
///
/// Directory entries are created with their ancestors; file entries get
/// their parent created and their bytes copied. A directory that cannot be
/// created is fatal and named in the error. Entries that would land outside
/// `destination`, directly or through a link, are rejected, as are links
/// that point outside it.
pub fn extract(archive: &Path, destination: &Path) -> Result<ExtractSummary> {
    let file = File::open(archive).map_err(|e| {
        UpdaterError::extraction(
            format!("Failed to open archive {}", archive.display()),
            archive,
            e,
        )
    })?;
    let mut zip = ZipArchive::new(file).map_err(|e| {
        UpdaterError::extraction(
            format!("Failed to read ZIP archive {}", archive.display()),
            archive,
            e,
        )
    })?;

    create_dir(destination)?;
    let root = fs::canonicalize(destination).map_err(|e| {
        UpdaterError::extraction(
            format!("Failed to resolve {}", destination.display()),
            destination,
            e,
        )
    })?;
    let mut summary = ExtractSummary::default();

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| {
            UpdaterError::extraction(
                format!("Failed to read entry {i} of {}", archive.display()),
                archive,
                e,
            )
        })?;

        let name = entry.name().to_string();
        let relative = entry
            .enclosed_name()
            .filter(|p| {
                !p.components()
                    .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
            })
            .ok_or_else(|| unsafe_entry(&name, destination))?;
        let out_path = destination.join(&relative);

        if entry.is_dir() {
            ensure_within(&root, &out_path, &name)?;
            create_dir(&out_path)?;
            summary.directories += 1;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            ensure_within(&root, parent, &name)?;
            create_dir(parent)?;
        }

        // Never write through a link left by an earlier entry or extraction
        if fs::symlink_metadata(&out_path).is_ok_and(|m| m.file_type().is_symlink()) {
            fs::remove_file(&out_path).map_err(|e| {
                UpdaterError::extraction(
                    format!("Failed to replace symlink {}", out_path.display()),
                    &out_path,
                    e,
                )
            })?;
        }

        #[cfg(unix)]
        {
            if entry.is_symlink() {
                let mut target = String::new();
                io::Read::read_to_string(&mut entry, &mut target).map_err(|e| {
                    UpdaterError::extraction(
                        format!("Failed to read link target of {name}"),
                        &out_path,
                        e,
                    )
                })?;
                if !link_stays_within(&relative, Path::new(&target)) {
                    return Err(unsafe_entry(&format!("{name} -> {target}"), destination));
                }
                if fs::symlink_metadata(&out_path).is_ok() {
                    let _ = fs::remove_file(&out_path);
                }
                std::os::unix::fs::symlink(&target, &out_path).map_err(|e| {
                    UpdaterError::extraction(
                        format!("Failed to create symlink {}", out_path.display()),
                        &out_path,
                        e,
                    )
                })?;
                summary.symlinks += 1;
                continue;
            }
        }

        let mut out = File::create(&out_path).map_err(|e| {
            UpdaterError::extraction(
                format!("Failed to create file {}", out_path.display()),
                &out_path,
                e,
            )
        })?;
        let written = io::copy(&mut entry, &mut out).map_err(|e| {
            UpdaterError::extraction(
                format!("Failed to extract {}", out_path.display()),
                &out_path,
                e,
            )
        })?;
        summary.files += 1;
        summary.bytes += written;

        // chrome and chromedriver must stay executable
        #[cfg(unix)]
        {
            if let Some(mode) = entry.unix_mode() {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&out_path, fs::Permissions::from_mode(mode & 0o777)).map_err(
                    |e| {
                        UpdaterError::extraction(
                            format!("Failed to set permissions on {}", out_path.display()),
                            &out_path,
                            e,
                        )
                    },
                )?;
            }
        }
    }

    debug!(
        "Extracted {} files, {} directories from {}",
        summary.files,
        summary.directories,
        archive.display()
    );
    Ok(summary)
}

fn unsafe_entry(name: &str, destination: &Path) -> UpdaterError {
    UpdaterError::extraction(
        format!("Refusing to extract entry outside destination: {name}"),
        destination,
        io::Error::new(io::ErrorKind::InvalidData, "unsafe entry path"),
    )
}

/// Fails unless `path` stays beneath `root` once the links already on disk
/// are followed. Missing trailing components are resolved through their
/// nearest existing ancestor.
fn ensure_within(root: &Path, path: &Path, name: &str) -> Result<()> {
    let mut existing = path;
    while fs::symlink_metadata(existing).is_err() {
        match existing.parent() {
            Some(parent) => existing = parent,
            None => break,
        }
    }

    // A dangling link cannot be resolved and is never followed
    let resolved = fs::canonicalize(existing).map_err(|_| unsafe_entry(name, root))?;
    if resolved.starts_with(root) {
        Ok(())
    } else {
        Err(unsafe_entry(name, root))
    }
}

/// Whether a link at `link` (relative to the destination) pointing at
/// `target` resolves inside the destination. Absolute targets never do.
#[cfg(unix)]
fn link_stays_within(link: &Path, target: &Path) -> bool {
    if target.has_root() {
        return false;
    }
    let mut depth = link.parent().map_or(0, |parent| {
        parent
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .count()
    });
    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir if depth > 0 => depth -= 1,
            _ => return false,
        }
    }
    true
}

/// Remove a downloaded archive once it has been extracted.
///
/// Failure is reported, logged and returned, never raised. An archive that
/// is already gone needs no cleanup.
pub fn delete_archive(archive: &Path) -> Option<CleanupWarning> {
    match fs::remove_file(archive) {
        Ok(()) => {
            info!("Deleted {} successfully.", display_name(archive));
            None
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("{} already removed", archive.display());
            None
        }
        Err(e) => {
            let location = std::path::absolute(archive).unwrap_or_else(|_| archive.to_path_buf());
            let warning = CleanupWarning {
                file_name: display_name(archive),
                location,
                reason: e.to_string(),
            };
            warn!("{warning}");
            Some(warning)
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
