use clap::{Parser, Subcommand};
use std::path::PathBuf;

use cft_updater::{ArtifactType, InstallProfile, Platform};

#[derive(Parser, Debug)]
#[command(version, about = "Chrome for Testing updater")]
pub struct Args {
    /// Path to configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub cmd: Cmd,
}

/// Where to install and for which platform
#[derive(clap::Args, Debug, Clone)]
pub struct TargetArgs {
    /// Install root; Chrome lives in `<root>/chrome`
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// linux64, mac-arm64, mac-x64, win32 or win64 (default: this host)
    #[arg(long)]
    pub platform: Option<Platform>,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Show installed and latest stable version
    Check {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Install or update to the latest stable version
    Install {
        #[command(flatten)]
        target: TargetArgs,

        /// headless, headful or all
        #[arg(long, default_value = "headless")]
        profile: InstallProfile,

        /// Install exactly these artifacts instead of a profile (repeatable)
        #[arg(long = "artifact", conflicts_with = "profile")]
        artifacts: Vec<ArtifactType>,

        /// Reinstall even when already up to date
        #[arg(long)]
        force: bool,

        /// Do not ask for confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Show the recorded install
    Status {
        #[command(flatten)]
        target: TargetArgs,
    },
}

impl Cmd {
    pub fn target(&self) -> &TargetArgs {
        match self {
            Cmd::Check { target } | Cmd::Install { target, .. } | Cmd::Status { target } => target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn install_defaults_to_headless_profile() {
        let args = Args::try_parse_from(["cft-updater", "install"]).unwrap();
        match args.cmd {
            Cmd::Install {
                target,
                profile,
                artifacts,
                force,
                yes,
            } => {
                assert_eq!(target.root, PathBuf::from("."));
                assert_eq!(target.platform, None);
                assert_eq!(profile, InstallProfile::Headless);
                assert!(artifacts.is_empty());
                assert!(!force && !yes);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn explicit_artifacts_and_platform() {
        let args = Args::try_parse_from([
            "cft-updater",
            "install",
            "--root",
            "/opt/tools",
            "--platform",
            "mac-arm64",
            "--artifact",
            "chrome",
            "--artifact",
            "chromedriver",
            "--yes",
            "--verbose",
        ])
        .unwrap();
        assert!(args.verbose);
        let Cmd::Install {
            target,
            artifacts,
            yes,
            ..
        } = args.cmd
        else {
            panic!("expected install");
        };
        assert_eq!(target.platform, Some(Platform::MacArm64));
        assert_eq!(artifacts, vec![ArtifactType::Chrome, ArtifactType::Chromedriver]);
        assert!(yes);
    }

    #[test]
    fn profile_and_artifact_conflict() {
        let err = Args::try_parse_from([
            "cft-updater",
            "install",
            "--profile",
            "all",
            "--artifact",
            "chrome",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn unknown_platform_is_rejected() {
        assert!(Args::try_parse_from(["cft-updater", "status", "--platform", "linux-arm64"]).is_err());
    }
}
