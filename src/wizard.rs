//! Interactive confirmation and coloured summaries

use anyhow::Result;
use inquire::Confirm;
use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use cft_updater::{ArtifactType, InstallStatus, Platform, UpdateOutcome, Version};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Ask before downloading anything; `false` means the user declined
pub fn confirm_install(
    owned_dir: &std::path::Path,
    platform: Platform,
    artifacts: &[ArtifactType],
) -> Result<bool> {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)));
    let _ = writeln!(stdout, "\n{RULE}");
    let _ = stdout.reset();

    let _ = writeln!(stdout, "\nThis will install Chrome for Testing ({platform}):");
    for artifact in artifacts {
        let _ = writeln!(stdout, "  • {artifact}");
    }
    let _ = writeln!(stdout, "\ninto {}\n", owned_dir.display());

    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)));
    let _ = writeln!(stdout, "{RULE}\n");
    let _ = stdout.reset();

    let confirmed = Confirm::new("Continue?")
        .with_default(true)
        .with_help_message("Existing files in these directories will be replaced")
        .prompt()?;
    Ok(confirmed)
}

pub fn show_check(current: Option<&Version>, latest: &Version) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = writeln!(
        stdout,
        "Installed: {}",
        current.map_or_else(|| "none".to_string(), Version::to_string)
    );
    let _ = writeln!(stdout, "Latest:    {latest}");

    if current == Some(latest) {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
        let _ = writeln!(stdout, "✓ Up to date");
    } else {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
        let _ = writeln!(stdout, "⚠ Update available");
    }
    let _ = stdout.reset();
}

pub fn show_outcome(outcome: &UpdateOutcome) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);

    match outcome {
        UpdateOutcome::UpToDate { version } => {
            let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
            let _ = writeln!(stdout, "✓ Already up to date: {version}");
            let _ = stdout.reset();
        }
        UpdateOutcome::Installed { previous, report } => {
            let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
            match previous {
                Some(previous) if *previous != report.version => {
                    let _ = writeln!(stdout, "✓ Updated {previous} -> {}", report.version);
                }
                _ => {
                    let _ = writeln!(stdout, "✓ Installed {}", report.version);
                }
            }
            let _ = stdout.reset();

            for installed in &report.installed {
                let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
                let _ = write!(stdout, "  ✓ {}", installed.artifact);
                let _ = stdout.reset();
                let _ = writeln!(
                    stdout,
                    " ({} files) at {}",
                    installed.summary.files,
                    installed.path.display()
                );
            }

            for warning in &report.warnings {
                let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
                let _ = writeln!(stdout, "  ⚠ {warning}");
                let _ = stdout.reset();
            }
        }
    }
}

pub fn show_status(status: &InstallStatus) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = writeln!(stdout, "Directory: {}", status.owned_dir.display());
    let _ = writeln!(stdout, "Platform:  {}", status.platform);

    let Some(version) = &status.current_version else {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
        let _ = writeln!(stdout, "Not installed");
        let _ = stdout.reset();
        return;
    };
    let _ = writeln!(stdout, "Version:   {version}");

    match &status.manifest {
        Some(manifest) => {
            let _ = writeln!(
                stdout,
                "Installed: {}",
                manifest.installed_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
        None => {
            let _ = writeln!(stdout, "Installed: unknown (no manifest, detected from files)");
        }
    }

    for (artifact, path) in &status.present {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
        let _ = write!(stdout, "  ✓ {artifact}");
        let _ = stdout.reset();
        let _ = writeln!(stdout, " {}", path.display());
    }
    for (artifact, path) in &status.stale {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
        let _ = write!(stdout, "  ! {artifact} (not part of this version)");
        let _ = stdout.reset();
        let _ = writeln!(stdout, " {}", path.display());
    }
}
