mod cli;
mod orchestration;
mod wizard;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use cft_updater::{ArtifactType, Platform, Updater, UpdaterConfig};
use cli::{Cmd, TargetArgs};

fn main() {
    let args = cli::Args::parse();

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(level)
        .parse_default_env()
        .init();

    if let Err(e) = real_main(args) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn real_main(args: cli::Args) -> Result<()> {
    let config = UpdaterConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let updater = open(args.cmd.target(), config)?;

    match args.cmd {
        Cmd::Check { .. } => {
            let latest = updater
                .latest_version()
                .context("Failed to query the latest stable version")?;
            wizard::show_check(updater.current_version().as_ref(), &latest);
        }
        Cmd::Install {
            profile,
            artifacts,
            force,
            yes,
            ..
        } => {
            let artifacts = if artifacts.is_empty() {
                profile.artifacts()
            } else {
                dedup(artifacts)
            };

            if !yes && !wizard::confirm_install(updater.owned_dir(), updater.platform(), &artifacts)? {
                info!("Installation cancelled");
                return Ok(());
            }

            let outcome = orchestration::run_update(updater, &artifacts, force)
                .context("Installation failed")?;
            wizard::show_outcome(&outcome);
        }
        Cmd::Status { .. } => wizard::show_status(&updater.status()),
    }

    Ok(())
}

fn open(target: &TargetArgs, config: UpdaterConfig) -> Result<Updater> {
    let platform = match target.platform {
        Some(platform) => platform,
        None => Platform::detect().context("Pass --platform explicitly")?,
    };
    Updater::with_config(&target.root, platform, config)
        .with_context(|| format!("Cannot use install root {}", target.root.display()))
}

/// Keep the first occurrence of each artifact, in the order given
fn dedup(artifacts: Vec<ArtifactType>) -> Vec<ArtifactType> {
    let mut unique = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        if !unique.contains(&artifact) {
            unique.push(artifact);
        }
    }
    unique
}
