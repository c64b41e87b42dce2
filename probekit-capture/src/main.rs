use anyhow::Context;
use clap::Parser;

use probekit_capture::configs::Settings;
use probekit_capture::services::{topic_groups, ConflictReport, CoordinateLog, GridReport};
use probekit_capture::{run_probe, run_subscriber};

use crate::cli::{Cli, Command};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::new(&cli.config_dir)
        .with_context(|| format!("failed to load settings from {}", cli.config_dir.display()))?;
    cli.command.apply(&mut settings);

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = settings.logger.level.as_str();

            format!("probekit_capture={level},probekit_analyser={level}").into()
        }))
        .with_writer(std::io::stderr)
        .init();

    let result = execute(cli.command, &settings).await;
    if let Err(e) = &result {
        tracing::error!("{:#}", e);
    }

    result
}

async fn execute(command: Command, settings: &Settings) -> anyhow::Result<()> {
    match command {
        Command::Coap(_) => {
            let written = run_probe(settings).await.context("coap probe failed")?;
            tracing::info!("{} responses recorded in {}", written, settings.sink.path);
        }
        Command::Mqtt(_) => {
            let shutdown = async {
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
            };

            let summary = run_subscriber(settings, shutdown).await.context("mqtt capture failed")?;
            tracing::info!(
                "{} messages recorded in {} ({:?})",
                summary.records,
                settings.sink.path,
                summary.reason
            );
        }
        Command::Group { log, text } => {
            let groups = topic_groups(&log, &settings.analyser)?;
            if text {
                print!("{groups}");
            } else {
                println!("{}", serde_json::to_string_pretty(&groups)?);
            }
        }
        Command::Grid { log, format, hits_out, .. } => {
            let report = GridReport::build(&CoordinateLog::new(log, format), &settings.analyser)?;
            if let Some(path) = hits_out {
                report
                    .write_hits(&path)
                    .with_context(|| format!("failed to write hits to {}", path.display()))?;
            }
            print!("{report}");
        }
        Command::Conflicts { left, right, left_format, right_format, left_label, right_label, .. } => {
            let report = ConflictReport::build(
                &CoordinateLog::new(left, left_format).labelled(left_label),
                &CoordinateLog::new(right, right_format).labelled(right_label),
                &settings.analyser,
            )?;
            print!("{report}");
        }
    }

    Ok(())
}
