//! `firecheck` - CLI for offline APSAD R4 inspections
//!
//! This binary records completed checklists, renders and hands over their
//! reports, and manages the local session and offline asset cache.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::{IsTerminal, Read};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{Duration, Utc};
use clap::Parser;

use firecheck::checklist::apsad_r4_template;
use firecheck::cli::{Cli, Command, ConfigCommand, FormatArg, InspectCommand};
use firecheck::delivery::{self, SavePrompt, TerminalPrompt};
use firecheck::precache::AssetCache;
use firecheck::session::{self, GateDecision, MemoryTabStorage};
use firecheck::workflow::{self, Handover, ReportFormat};
use firecheck::{init_logging, Config, IdMinter, InspectionInput, InspectionStore, LocalStorage, ObjectUrls};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Commands that never touch storage
    match &cli.command {
        Command::Template => {
            println!("{}", serde_json::to_string_pretty(&apsad_r4_template())?);
            return Ok(());
        }
        Command::Config(config_cmd) => return handle_config(&config, config_cmd),
        Command::Precache(cmd) => {
            let root = cmd
                .assets
                .clone()
                .unwrap_or_else(|| config.cache.asset_root.clone());
            return handle_precache(&config, &root).await;
        }
        _ => {}
    }

    let storage = LocalStorage::open(config.database_path(), config.storage.quota_bytes)?;

    if let (Some(page), Some(location)) = (cli.command.page(), cli.command.location()) {
        // Each run is its own tab, so the stash is reported rather than resumed.
        let mut tab = MemoryTabStorage::new();
        if let GateDecision::Redirect { to } =
            session::guard(&storage, &mut tab, page, &location, Utc::now())?
        {
            return Err(anyhow::Error::new(firecheck::Error::session_required(location, to))
                .context("run `firecheck login --user <NAME>` first"));
        }
    }

    let urls = Arc::new(ObjectUrls::new());
    match cli.command {
        Command::Inspect(cmd) => handle_inspect(&config, &storage, urls, &cmd).await,
        Command::History(cmd) => handle_history(&storage, cmd.json),
        Command::Show(cmd) => handle_show(&storage, cmd.id, cmd.plain),
        Command::Share(cmd) => handle_share(&config, &storage, urls, cmd.id, cmd.plain).await,
        Command::Login(cmd) => {
            let ttl = cmd
                .hours
                .map_or_else(|| config.session_ttl(), |h| Duration::hours(i64::from(h)));
            let session = session::login(&storage, &cmd.user, Utc::now(), ttl)?;
            println!("Logged in as {} until {}", cmd.user, format_millis(session.expires_at));
            Ok(())
        }
        Command::Logout => {
            if session::logout(&storage)? {
                println!("Logged out.");
            } else {
                println!("No active session.");
            }
            Ok(())
        }
        Command::Session(cmd) => handle_session(&storage, cmd.json),
        Command::Status(cmd) => handle_status(&config, &storage, cmd.json).await,
        Command::Template | Command::Config(_) | Command::Precache(_) => Ok(()),
    }
}

fn read_input(path: &Path) -> anyhow::Result<InspectionInput> {
    let text = if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        text
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
    };
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

async fn handle_inspect(
    config: &Config,
    storage: &LocalStorage,
    urls: Arc<ObjectUrls>,
    cmd: &InspectCommand,
) -> anyhow::Result<()> {
    let input = read_input(&cmd.file)?;
    let mut store = InspectionStore::load(storage)?;
    let mut minter = IdMinter::starting_after(store.last_id().unwrap_or(0));

    let (dispatcher, handover) = if cmd.share {
        (delivery::share_chain(config, urls.clone()), Handover::Share)
    } else {
        let prompt = (config.delivery.save_prompt && std::io::stdin().is_terminal())
            .then(|| Box::new(TerminalPrompt) as Box<dyn SavePrompt>);
        (delivery::save_chain(config, prompt, urls.clone()), Handover::Save)
    };

    let completed = workflow::complete_inspection(
        input,
        &mut store,
        &mut minter,
        &urls,
        &dispatcher,
        ReportFormat::from(FormatArg::from_plain(cmd.plain)),
        handover,
    )
    .await?;

    println!(
        "Inspection {} recorded, report {}",
        completed.id, completed.outcome
    );
    Ok(())
}

fn handle_history(storage: &LocalStorage, json: bool) -> anyhow::Result<()> {
    let store = InspectionStore::load(storage)?;
    if json {
        println!("{}", serde_json::to_string_pretty(store.list())?);
        return Ok(());
    }

    if store.is_empty() {
        println!("No inspections recorded.");
        return Ok(());
    }
    println!("{:<15} {:<17} {:>9}  Title", "Id", "Date", "Conforme");
    for record in store.list() {
        let summary = record.data.summary();
        let tally = format!("{}/{}", summary.conforming, summary.total());
        println!(
            "{:<15} {:<17} {:>9}  {}",
            record.id,
            record.date.format("%d/%m/%Y %H:%M"),
            tally,
            record.title()
        );
    }
    Ok(())
}

fn handle_show(storage: &LocalStorage, id: i64, plain: bool) -> anyhow::Result<()> {
    let store = InspectionStore::load(storage)?;
    let record = store.find(id).ok_or(firecheck::Error::RecordNotFound(id))?;
    let document = workflow::render_record(record);
    let blob = ReportFormat::from(FormatArg::from_plain(plain)).blob(&document);
    println!("{}", String::from_utf8_lossy(blob.bytes()));
    Ok(())
}

async fn handle_share(
    config: &Config,
    storage: &LocalStorage,
    urls: Arc<ObjectUrls>,
    id: i64,
    plain: bool,
) -> anyhow::Result<()> {
    let store = InspectionStore::load(storage)?;
    let record = store.find(id).ok_or(firecheck::Error::RecordNotFound(id))?;
    let dispatcher = delivery::share_chain(config, urls);
    let outcome = workflow::deliver_record(
        record,
        &dispatcher,
        ReportFormat::from(FormatArg::from_plain(plain)),
        Handover::Share,
    )
    .await?;
    println!("Inspection {id} {outcome}");
    Ok(())
}

fn handle_session(storage: &LocalStorage, json: bool) -> anyhow::Result<()> {
    let current = session::current(storage, Utc::now())?;
    if json {
        println!("{}", serde_json::to_string_pretty(&current)?);
        return Ok(());
    }
    match current {
        Some(session) => println!(
            "Logged in as {} until {}",
            session.user().unwrap_or("(unknown)"),
            format_millis(session.expires_at)
        ),
        None => println!("No active session."),
    }
    Ok(())
}

async fn handle_precache(config: &Config, asset_root: &Path) -> anyhow::Result<()> {
    let cache = AssetCache::new(config.cache_dir(), config.cache.cache_name());
    let index = cache
        .install(asset_root)
        .await
        .with_context(|| format!("installing assets from {}", asset_root.display()))?;
    let removed = cache.activate().await?;

    println!("Cached {} assets into {}", index.entries.len(), cache.name());
    for name in removed {
        println!("Removed stale cache {name}");
    }
    Ok(())
}

async fn handle_status(config: &Config, storage: &LocalStorage, json: bool) -> anyhow::Result<()> {
    let stats = storage.stats()?;
    let inspections = InspectionStore::load(storage)?.len();
    let session = session::current(storage, Utc::now())?;
    let cache = AssetCache::new(config.cache_dir(), config.cache.cache_name());
    let cached = cache.index().await?.map(|index| index.entries.len());

    if json {
        let status = serde_json::json!({
            "database_path": storage.path(),
            "inspections": inspections,
            "keys": stats.keys,
            "used_bytes": stats.used_bytes,
            "quota_bytes": stats.quota_bytes,
            "db_size_bytes": stats.db_size_bytes,
            "session_user": session.as_ref().and_then(|s| s.user()),
            "cache": cache.name(),
            "cached_assets": cached,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("firecheck status");
        println!("----------------");
        println!("Database:      {}", storage.path().display());
        println!("Inspections:   {inspections}");
        println!(
            "Storage:       {} / {} bytes ({} keys)",
            stats.used_bytes, stats.quota_bytes, stats.keys
        );
        match &session {
            Some(s) => println!("Session:       {}", s.user().unwrap_or("(unknown)")),
            None => println!("Session:       none"),
        }
        match cached {
            Some(n) => println!("Asset cache:   {} ({n} assets)", cache.name()),
            None => println!("Asset cache:   {} (not installed)", cache.name()),
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: &ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if *json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Quota (bytes):      {}", config.storage.quota_bytes);
                println!();
                println!("[Delivery]");
                println!("  Save prompt:        {}", config.delivery.save_prompt);
                println!("  Downloads dir:      {}", config.downloads_dir().display());
                println!(
                    "  Share command:      {}",
                    config.delivery.share_command.as_deref().unwrap_or("(none)")
                );
                println!(
                    "  Bridge endpoint:    {}",
                    config
                        .delivery
                        .bridge_endpoint
                        .as_ref()
                        .map_or_else(|| "(none)".to_string(), |p| p.display().to_string())
                );
                println!();
                println!("[Session]");
                println!("  TTL (hours):        {}", config.session.ttl_hours);
                println!();
                println!("[Cache]");
                println!("  Name:               {}", config.cache.cache_name());
                println!("  Cache dir:          {}", config.cache_dir().display());
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.clone().unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}

fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map_or_else(|| millis.to_string(), |t| t.format("%d/%m/%Y %H:%M").to_string())
}
