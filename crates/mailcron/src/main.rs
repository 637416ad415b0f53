//! `mailcron` - periodic mailing scheduler
//!
//! Loads the configuration, opens the campaign database and runs dispatch
//! ticks, either once (for cron) or on a fixed interval.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use mailcron_core::{
    AudienceRepository, CampaignId, CampaignRepository, Config, Database, DeliveryLogRepository,
    MailingService, SmtpTransport, TickReport,
};
use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailcron=info,mailcron_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let db = Database::open(&config.database.path)
        .await
        .with_context(|| format!("opening database {}", config.database.path.display()))?;

    match cli.command {
        Command::Tick => {
            let report = service(&db, &config).tick().await.context("tick failed")?;
            print_report(&report, cli.json)?;
        }
        Command::Run { interval } => {
            let interval = interval.map_or_else(|| config.schedule.interval(), Duration::from_secs);
            if interval.is_zero() {
                bail!("--interval must be at least 1 second");
            }
            run(service(&db, &config), interval).await;
        }
        Command::Status => status(&db, cli.json).await?,
        Command::Log { campaign, limit } => {
            let entries = DeliveryLogRepository::new(&db)
                .list(campaign.map(CampaignId), limit)
                .await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in entries {
                    println!(
                        "{}  campaign={} recipient={} {}{}",
                        entry.timestamp.to_rfc3339(),
                        entry.campaign_id,
                        entry.recipient_id,
                        entry.outcome.status(),
                        entry
                            .outcome
                            .error_message()
                            .map(|m| format!(" ({m})"))
                            .unwrap_or_default()
                    );
                }
            }
        }
        Command::Stop { id } => {
            CampaignRepository::new(&db).stop(CampaignId(id)).await?;
            info!(campaign = id, "Campaign stopped");
        }
        Command::Restart { id } => {
            CampaignRepository::new(&db).restart(CampaignId(id)).await?;
            info!(campaign = id, "Campaign restarted");
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading configuration {}", path.display())),
        None => {
            let path = Config::default_path();
            Config::load_or_default(&path)
                .with_context(|| format!("loading configuration {}", path.display()))
        }
    }
}

fn service(db: &Database, config: &Config) -> MailingService {
    let transport = Arc::new(SmtpTransport::new(config.smtp.clone()));
    MailingService::from_database(db, transport, config)
}

/// Ticks until Ctrl-C. A failed tick is logged and the next one still runs.
async fn run(service: MailingService, interval: Duration) {
    info!(interval_secs = interval.as_secs(), "Starting scheduler");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = service.tick().await {
                    error!(error = %e, "Tick failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping scheduler");
                return;
            }
        }
    }
}

async fn status(db: &Database, json: bool) -> anyhow::Result<()> {
    let counts = CampaignRepository::new(db).status_counts().await?;
    let recipients = AudienceRepository::new(db).count_recipients().await?;

    if json {
        let value = serde_json::json!({
            "campaigns": counts,
            "total_campaigns": counts.total(),
            "recipients": recipients,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("campaigns:  {}", counts.total());
        println!("  created:  {}", counts.created);
        println!("  started:  {}", counts.started);
        println!("  finished: {}", counts.finished);
        println!("recipients: {recipients}");
    }
    Ok(())
}

fn print_report(report: &TickReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!(
            "status changes: {}, campaigns: {}, sent: {} ok / {} failed / {} errors, skipped: {}",
            report.status_changes,
            report.campaigns,
            report.succeeded,
            report.failed,
            report.errored,
            report.skipped
        );
    }
    Ok(())
}
