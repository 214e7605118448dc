//! Subcommand handlers

use anyhow::{Context, Result, bail};
use decks::config::DATABASE_FILE;
use decks::{
    CrucibleClient, DeckStore, DokClient, ImportTarget, LogSink, Service, Settings, SiteSnapshot,
    SqliteDeckStore, SyncConfig, SyncReport, SyncService, TargetResult, ThreadSleeper,
    VaultClient, capture_and_relay, open_login_page, relay_token,
};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

use crate::Commands;

pub fn run(command: Commands, db_path: Option<PathBuf>) -> Result<()> {
    match command {
        Commands::Login { service } => return open_login_page(service),
        Commands::Settings { dok, tco, daily } => return settings(dok, tco, daily),
        _ => {}
    }

    let store: Arc<dyn DeckStore> = Arc::new(open_store(db_path)?);
    match command {
        Commands::Sync { json } => sync(store, json, false),
        Commands::Auto => sync(store, false, true),
        Commands::Capture { service, snapshot } => {
            let snapshot = SiteSnapshot::from_file(&snapshot)?;
            if !capture_and_relay(store.as_ref(), &LogSink, service, &snapshot)? {
                bail!(
                    "No {} session in snapshot; log in at {} first",
                    service.display_name(),
                    service.login_url()
                );
            }
            Ok(())
        }
        Commands::Token { service, value } => {
            relay_token(store.as_ref(), &LogSink, service, value.trim())
        }
        Commands::Logout { service } => {
            store.delete_credential(service)?;
            info!("Forgot {} token", service.display_name());
            Ok(())
        }
        Commands::Status { decks } => status(store.as_ref(), decks),
        Commands::Clear { yes } => {
            if !yes {
                bail!("This deletes every stored deck, token and sync record; re-run with --yes");
            }
            store.clear()?;
            info!("Cleared all stored data");
            Ok(())
        }
        Commands::Login { .. } | Commands::Settings { .. } => Ok(()),
    }
}

fn open_store(db_path: Option<PathBuf>) -> Result<SqliteDeckStore> {
    let path = match db_path {
        Some(path) => path,
        None => {
            config::ensure_config_dir()?;
            config::config_path(DATABASE_FILE).context("Could not determine config directory")?
        }
    };
    SqliteDeckStore::new(&path)
        .with_context(|| format!("Failed to open deck database at {}", path.display()))
}

/// Run a full pass; with `only_if_due`, skip unless the daily auto-sync is due
fn sync(store: Arc<dyn DeckStore>, json: bool, only_if_due: bool) -> Result<()> {
    let settings = Settings::load()?;
    let config = SyncConfig::load()?;

    let vault = VaultClient::new(store.clone(), &config);
    let dok = DokClient::new(store.clone(), &config);
    let tco = CrucibleClient::new(store.clone(), &config);
    let targets: [&dyn ImportTarget; 2] = [&dok, &tco];

    let service = SyncService::new(store, Arc::new(LogSink), Arc::new(ThreadSleeper), config);
    if only_if_due && !service.auto_sync_due(&settings)? {
        if settings.auto_sync_daily {
            info!("Last sync was less than a day ago, nothing to do");
        } else {
            info!("Daily auto-sync is disabled (keysync settings --daily true)");
        }
        return Ok(());
    }

    let Some(report) = service.sync_all(&vault, &targets, &settings)? else {
        info!("A sync is already running");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
    } else {
        print_report(&report);
    }

    let failed = report.failed();
    if !failed.is_empty() {
        let names: Vec<_> = failed.iter().map(|s| s.display_name()).collect();
        bail!("Sync failed for {}", names.join(", "));
    }
    Ok(())
}

fn settings(dok: Option<bool>, tco: Option<bool>, daily: Option<bool>) -> Result<()> {
    let mut settings = Settings::load()?;
    let changed = dok.is_some() || tco.is_some() || daily.is_some();

    if let Some(value) = dok {
        settings.sync_dok = value;
    }
    if let Some(value) = tco {
        settings.sync_tco = value;
    }
    if let Some(value) = daily {
        settings.auto_sync_daily = value;
    }
    if changed {
        settings.save()?;
    }

    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

fn status(store: &dyn DeckStore, list_decks: bool) -> Result<()> {
    let settings = Settings::load()?;
    let source_total = store.count_settled(Service::MasterVault)?;

    for service in Service::ALL {
        let logged_in = store.get_credential(service)?.is_some();
        let settled = store.count_settled(service)?;
        let last_sync = store
            .get_sync_state(service)?
            .map(|s| s.last_sync_at.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "never".to_string());

        let progress = if service.is_source() {
            format!("{} decks owned", settled)
        } else {
            let pending = store.pending_for(service)?.len();
            let enabled = if settings.is_enabled(service) { "" } else { " (disabled)" };
            format!(
                "{}/{} settled, {} pending{}",
                settled.min(source_total),
                source_total,
                pending,
                enabled
            )
        };

        println!(
            "{:<24} {:<16} {:<36} last sync: {}",
            service.display_name(),
            if logged_in { "logged in" } else { "not logged in" },
            progress,
            last_sync
        );
    }

    if list_decks {
        println!("{}", serde_json::to_string_pretty(&store.list_decks()?)?);
    }
    Ok(())
}

fn print_report(report: &SyncReport) {
    println!(
        "Master Vault: {} decks owned ({} pages)",
        report.inventory.owned, report.inventory.pages_fetched
    );
    for (service, result) in &report.targets {
        match result {
            TargetResult::Completed(stats) => println!(
                "{}: {} imported, {} already present, {} unimportable",
                service.display_name(),
                stats.imported,
                stats.already_imported + stats.preseeded,
                stats.unimportable
            ),
            TargetResult::Skipped => {
                println!("{}: already syncing, skipped", service.display_name())
            }
            TargetResult::Failed(e) => println!("{}: failed: {:#}", service.display_name(), e),
        }
    }
}

fn report_json(report: &SyncReport) -> serde_json::Value {
    let targets: serde_json::Map<String, serde_json::Value> = report
        .targets
        .iter()
        .map(|(service, result)| {
            let value = match result {
                TargetResult::Completed(stats) => serde_json::json!({
                    "status": "completed",
                    "preseeded": stats.preseeded,
                    "imported": stats.imported,
                    "already_imported": stats.already_imported,
                    "unimportable": stats.unimportable,
                    "rate_limited": stats.rate_limited,
                }),
                TargetResult::Skipped => serde_json::json!({ "status": "skipped" }),
                TargetResult::Failed(e) => serde_json::json!({
                    "status": "failed",
                    "error": format!("{:#}", e),
                }),
            };
            (service.key().to_string(), value)
        })
        .collect();

    serde_json::json!({
        "inventory": {
            "owned": report.inventory.owned,
            "total": report.inventory.total,
            "pages": report.inventory.pages_fetched,
            "complete": report.inventory.complete,
        },
        "targets": targets,
    })
}
