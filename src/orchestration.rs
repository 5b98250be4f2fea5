//! Update run with interactive progress tracking
//!
//! The updater itself is blocking; events arrive over a crossbeam channel and
//! are rendered on a dedicated thread.

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::io::Write;
use std::thread;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use cft_updater::{ArtifactType, DownloadPhase, InstallProgress, UpdateOutcome, Updater};

/// Run `update` with progress bars, returning its outcome
pub fn run_update(updater: Updater, artifacts: &[ArtifactType], force: bool) -> Result<UpdateOutcome> {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)));
    let _ = writeln!(stdout, "\nChecking for updates...\n");
    let _ = stdout.reset();

    let multi = MultiProgress::new();

    // Overall progress across every requested artifact
    let pb_overall = multi.add(ProgressBar::new(100));
    pb_overall.set_style(
        ProgressStyle::default_bar()
            .template("\n[{bar:50.cyan/blue}] {pos:>3}%  {msg}\n")
            .context("Invalid progress bar template")?
            .progress_chars("█▓░"),
    );

    // Bytes of the archive currently downloading
    let pb_download = multi.add(ProgressBar::new(0));
    pb_download.set_style(
        ProgressStyle::default_bar()
            .template("   [{bar:50.green/blue}] {bytes}/{total_bytes}  {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("█▓░"),
    );

    let (tx, rx) = crossbeam_channel::bounded::<InstallProgress>(100);
    let renderer = {
        let pb_overall = pb_overall.clone();
        let pb_download = pb_download.clone();
        thread::spawn(move || render(rx, &pb_overall, &pb_download))
    };

    // The sender lives inside the updater; dropping it ends the render loop
    let result = updater.with_progress(tx).update(artifacts, force);

    if renderer.join().is_err() {
        log::warn!("Progress display thread panicked");
    }
    pb_overall.finish_and_clear();
    pb_download.finish_and_clear();

    Ok(result?)
}

fn render(rx: Receiver<InstallProgress>, pb_overall: &ProgressBar, pb_download: &ProgressBar) {
    for progress in rx {
        pb_overall.set_position((progress.overall() * 100.0) as u64);
        pb_overall.set_message(format!(
            "{} {}/{}",
            progress.version, progress.artifact_index, progress.total_artifacts
        ));

        match progress.phase {
            DownloadPhase::Downloading => {
                pb_download.set_length(progress.total_bytes);
                pb_download.set_position(progress.bytes_downloaded);
                pb_download.set_message(format!("📥 {}", progress.artifact));
            }
            DownloadPhase::Extracting => {
                pb_download.set_message(format!("📦 Extracting {}", progress.artifact));
            }
            DownloadPhase::Complete => {
                pb_download.set_message(format!("✅ {}", progress.artifact));
            }
        }
    }
}
