//! inq - Inquisitor command-line tool
//!
//! Builds and queries an intelligence database of an organization's
//! registrants, network blocks, hosts, email addresses and LinkedIn
//! profiles. Logs go to stderr; command output (status table, dump JSON,
//! report path) goes to stdout.

use anyhow::{Context, Result};
use clap::Parser;
use inq_common::config::{resolve_database_path, TomlConfig};
use inq_engine::assets::AssetRegistry;
use inq_engine::cli::{Cli, Command};
use inq_engine::commands::{self, REPORT_FILE_NAME};
use inq_engine::config::ScanOverrides;
use inq_engine::lookup::{NetworkLookup, OfflineLookup, RdapLookup};
use inq_engine::IntelligenceRepository;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let toml_config = TomlConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    // -v wins, then RUST_LOG, then the config file level
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&toml_config.logging.level))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        "inq v{} [{}] ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE")
    );

    let db_path = resolve_database_path(cli.command.database().map(|p| p.as_path()), &toml_config);
    info!("Database: {}", db_path.display());
    let pool = inq_common::db::init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let lookup: Arc<dyn NetworkLookup> = if cli.offline {
        info!("Offline mode: DNS and RDAP lookups disabled");
        Arc::new(OfflineLookup)
    } else {
        let timeout = Duration::from_secs(toml_config.scan.request_timeout_secs.max(1));
        Arc::new(RdapLookup::new(timeout)?)
    };

    let repo = Arc::new(IntelligenceRepository::new(pool, AssetRegistry::standard(), lookup));

    match &cli.command {
        Command::Scan { options, .. } => {
            let cancel = CancellationToken::new();
            let token = cancel.clone();
            tokio::spawn(async move {
                if signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received; finishing in-flight queries and saving progress");
                    token.cancel();
                }
            });

            let report = commands::scan(repo, &ScanOverrides::from(options), &toml_config, cancel).await?;
            println!("New assets found: {}", report.new_assets);
            if report.cancelled {
                warn!("Scan cancelled; completed transforms were saved and will not be re-queried");
            }
        }
        Command::Status { strong, .. } => {
            let report = commands::status(&repo, *strong).await?;
            println!("{}", report);
        }
        Command::Classify { targets, .. } => {
            let request = targets.to_request();
            if request.is_empty() {
                warn!("Nothing to classify; pass --accept-*, --unmark-* or --reject-* values");
                return Ok(());
            }
            let report = commands::classify(&repo, &request).await?;
            info!(classified = report.classified, created = report.created, "Classification complete");
        }
        Command::Dump { json, all, .. } => {
            commands::dump_to(&repo, json.as_deref(), *all).await?;
        }
        Command::Visualize { output, .. } => {
            let path = match output {
                Some(path) => path.clone(),
                None => db_path
                    .parent()
                    .map(|dir| dir.join(REPORT_FILE_NAME))
                    .unwrap_or_else(|| REPORT_FILE_NAME.into()),
            };
            commands::visualize_to(&repo, &path).await?;
            println!("{}", path.display());
        }
    }

    Ok(())
}
