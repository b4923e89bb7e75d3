/*!
# mediashelf

Command-line front end for the media shelf: bookmark URLs, tag them, and keep
sensitive ones in a passcode-protected hidden vault.

## Usage

```text
mediashelf add <URL> -t <TAG>... [--type image|video|other] [--hidden]
mediashelf list [--hidden | --all] [--tag T] [--format F] [--json]
mediashelf update <ID> [--url U] [--name N] [-t TAG]... [--recompute-format]
mediashelf delete|hide|unhide <ID>
mediashelf tags list|hide <TAG>|unhide <TAG>
mediashelf export <PATH> [--include-hidden]
mediashelf import <PATH> [--overwrite] [--with-passcode]
mediashelf vault setup|reconfigure|unlock|lock|status|remember on|off|blur on|off
mediashelf prefs theme|layout [VALUE]
mediashelf destroy --yes
```

## Configuration

See [`mediashelf::config`] for the environment variables. Passcodes are read
without echo, or from `MEDIASHELF_PASSCODE` when set.
*/

use chrono::Utc;
use mediashelf::cli::{
    CliArgs, Command, ExportArgs, ImportArgs, ListArgs, PrefsCommand, TagsCommand, UpdateArgs,
    VaultCommand,
};
use mediashelf::db::destroy_database;
use mediashelf::errors::{AppError, AppResult};
use mediashelf::media::{MediaDraft, MediaFormat, MediaPatch};
use mediashelf::ops::{filter_records, format_table, read_passcode, Shelf};
use mediashelf::store::UpdateOptions;
use mediashelf::transfer::{self, ImportMode, ImportOptions};
use mediashelf::vault::{auto_lock, VaultStatus};
use mediashelf::{logging, Config};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info};

fn main() {
    let args = CliArgs::parse_args();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    let format = args.log_format.as_deref().unwrap_or(&config.log_format);
    let level = if args.verbose { "debug" } else { "warn" };
    logging::init(format, Some(level));

    if let Err(e) = run(args, config) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: CliArgs, config: Config) -> AppResult<()> {
    let now = Utc::now();
    debug!("Running {:?}", args.command);
    let mut shelf = Shelf::open(config, now)?;

    match args.command {
        Command::Add(add) => {
            let mut draft = MediaDraft::new(add.url).with_tags(add.tags);
            draft.media_type = add.media_type.map(Into::into);
            draft.name = add.name;
            draft.thumbnail = add.thumbnail;

            let record = if add.hidden {
                shelf.store.add_hidden_item(draft)?
            } else {
                shelf.store.add_item(draft)?
            };
            println!("{}", record.id);
        }
        Command::List(list) => cmd_list(&mut shelf, list)?,
        Command::Update(update) => cmd_update(&shelf, update)?,
        Command::Delete { id } => {
            require_found(shelf.store.delete_item(&id)?, &id)?;
            println!("Deleted {}", id);
        }
        Command::Hide { id } => {
            require_found(shelf.store.hide_item(&id)?, &id)?;
            println!("Hid {}", id);
        }
        Command::Unhide { id } => {
            shelf.require_unlocked(Utc::now())?;
            require_found(shelf.store.unhide_item(&id)?, &id)?;
            println!("Unhid {}", id);
        }
        Command::Tags(tags) => cmd_tags(&shelf, tags),
        Command::Export(export) => cmd_export(&mut shelf, export)?,
        Command::Import(import) => cmd_import(&mut shelf, import)?,
        Command::Vault(vault) => cmd_vault(shelf, vault)?,
        Command::Prefs(prefs) => cmd_prefs(&shelf, prefs)?,
        Command::Destroy { yes } => {
            if !yes {
                return Err(AppError::Validation(
                    "refusing to delete the database without --yes".to_string(),
                ));
            }
            shelf.store.close_db();
            destroy_database(shelf.store.handle())?;
            println!("Database deleted");
        }
    }

    Ok(())
}

fn require_found(found: bool, id: &str) -> AppResult<()> {
    if found {
        Ok(())
    } else {
        Err(AppError::Validation(format!("no record with id {}", id)))
    }
}

fn cmd_list(shelf: &mut Shelf, list: ListArgs) -> AppResult<()> {
    let format = match list.format.as_deref() {
        Some(raw) => Some(MediaFormat::parse(&raw.to_lowercase()).ok_or_else(|| {
            AppError::Validation(format!("unknown format '{}'", raw))
        })?),
        None => None,
    };

    let records = if list.hidden {
        shelf.require_unlocked(Utc::now())?;
        shelf.store.hidden_items()
    } else if list.all {
        shelf.store.items()
    } else {
        shelf.store.visible_items()
    };
    let records = filter_records(records, list.tag.as_deref(), format);

    if list.json {
        let body = serde_json::to_string_pretty(&records).map_err(std::io::Error::from)?;
        println!("{}", body);
    } else if !records.is_empty() {
        println!("{}", format_table(&records));
    }
    Ok(())
}

fn cmd_update(shelf: &Shelf, update: UpdateArgs) -> AppResult<()> {
    let patch = MediaPatch {
        url: update.url,
        media_type: update.media_type.map(Into::into),
        name: update.name,
        tags: (!update.tags.is_empty()).then_some(update.tags),
        thumbnail: if update.clear_thumbnail {
            Some(None)
        } else {
            update.thumbnail.map(Some)
        },
    };
    if patch.is_empty() && !update.recompute_format {
        return Err(AppError::Validation("nothing to update".to_string()));
    }

    let options = UpdateOptions {
        recompute_format: update.recompute_format,
    };
    match shelf.store.update_item(&update.id, patch, options)? {
        Some(record) => {
            println!("Updated {} ({})", record.id, record.format);
            Ok(())
        }
        None => require_found(false, &update.id),
    }
}

fn cmd_tags(shelf: &Shelf, tags: TagsCommand) {
    match tags {
        TagsCommand::List => {
            let hidden = shelf.store.hidden_tags();
            for tag in shelf.store.all_tags() {
                if hidden.contains(&tag) {
                    println!("{} (hidden)", tag);
                } else {
                    println!("{}", tag);
                }
            }
        }
        TagsCommand::Hide { tag } => shelf.store.hide_tag(&tag),
        TagsCommand::Unhide { tag } => shelf.store.unhide_tag(&tag),
    }
}

fn cmd_export(shelf: &mut Shelf, export: ExportArgs) -> AppResult<()> {
    let now = Utc::now();
    let vault_config = if export.include_hidden {
        shelf.require_unlocked(now)?;
        shelf.vault.config().cloned()
    } else {
        None
    };

    let payload = transfer::export_payload(&shelf.store, vault_config.as_ref(), now);
    transfer::write_export(&export.path, &payload)?;
    println!(
        "Exported {} records{}",
        payload.items.len(),
        payload
            .hidden_items
            .as_ref()
            .map(|h| format!(" and {} hidden", h.len()))
            .unwrap_or_default()
    );
    Ok(())
}

fn cmd_import(shelf: &mut Shelf, import: ImportArgs) -> AppResult<()> {
    let request = transfer::read_import(&import.path)?;
    let options = ImportOptions {
        mode: if import.overwrite {
            ImportMode::Overwrite
        } else {
            ImportMode::Merge
        },
        passcode: if import.with_passcode {
            Some(read_passcode("Passcode for hidden items: ")?)
        } else {
            None
        },
    };

    let report = transfer::import_document(&shelf.store, &mut shelf.vault, &request, &options)?;
    println!("Added {}, skipped {}", report.added, report.skipped);
    if report.hidden_restored > 0 || report.hidden_skipped > 0 {
        println!(
            "Hidden: restored {}, skipped {}",
            report.hidden_restored, report.hidden_skipped
        );
    }
    if report.vault_bootstrapped {
        println!("Vault passcode set from the imported vault");
    }
    Ok(())
}

fn cmd_vault(mut shelf: Shelf, vault: VaultCommand) -> AppResult<()> {
    match vault {
        VaultCommand::Setup => {
            let code = read_passcode("New passcode: ")?;
            shelf.vault.setup_passcode(&code)?;
            println!("Vault passcode set");
        }
        VaultCommand::Reconfigure => {
            let current = read_passcode("Current passcode: ")?;
            if !shelf
                .vault
                .verify_and_unlock(&current, shelf.config.unlock_ttl_minutes, Utc::now())
            {
                return Err(AppError::Validation("incorrect passcode".to_string()));
            }
            let code = read_passcode("New passcode: ")?;
            shelf.vault.reconfigure_passcode(&code)?;
            println!("Vault passcode changed");
        }
        VaultCommand::Unlock { ttl, hold } => {
            let ttl = ttl.unwrap_or(shelf.config.unlock_ttl_minutes);
            let code = read_passcode("Vault passcode: ")?;
            if !shelf.vault.verify_and_unlock(&code, ttl, Utc::now()) {
                return Err(AppError::Validation("incorrect passcode".to_string()));
            }
            match shelf.vault.unlock_until() {
                Some(until) => println!("Unlocked until {}", until.to_rfc3339()),
                None => println!("Unlocked (not remembered; enable with `vault remember on`)"),
            }
            if hold {
                hold_until_locked(shelf.vault)?;
            }
        }
        VaultCommand::Lock => {
            shelf.vault.lock();
            println!("Locked");
        }
        VaultCommand::Status => {
            let settings = shelf.vault.settings().clone();
            match shelf.vault.status(Utc::now()) {
                VaultStatus::Unconfigured => println!("Status: not configured"),
                VaultStatus::Locked => println!("Status: locked"),
                VaultStatus::Unlocked { until: Some(until) } => {
                    println!("Status: unlocked until {}", until.to_rfc3339())
                }
                VaultStatus::Unlocked { until: None } => println!("Status: unlocked"),
            }
            println!("Remember: {}", on_off(settings.remember_ttl));
            println!("Blur hidden: {}", on_off(settings.blur_hidden));
            println!("Hidden records: {}", shelf.store.hidden_items().len());
        }
        VaultCommand::Remember { state } => {
            shelf.vault.set_remember_ttl(state.enabled())?;
            println!("Remember: {}", on_off(state.enabled()));
        }
        VaultCommand::Blur { state } => {
            shelf.vault.set_blur_hidden(state.enabled())?;
            println!("Blur hidden: {}", on_off(state.enabled()));
        }
    }
    Ok(())
}

/// Keeps the process alive until the auto-lock timer fires.
fn hold_until_locked(vault: mediashelf::vault::VaultController) -> AppResult<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let shared = Arc::new(Mutex::new(vault));

    runtime.block_on(async move {
        match auto_lock::spawn_expiry_timer(shared.clone()) {
            Some(timer) => {
                info!("Holding vault open until it expires");
                if let Err(e) = timer.await {
                    error!("Auto-lock timer failed: {}", e);
                }
                println!("Locked");
            }
            None => println!("Nothing to wait for: the unlock has no expiry"),
        }
    });
    Ok(())
}

fn cmd_prefs(shelf: &Shelf, prefs: PrefsCommand) -> AppResult<()> {
    match prefs {
        PrefsCommand::Theme { value: Some(value) } => shelf.prefs.set_theme(&value)?,
        PrefsCommand::Theme { value: None } => {
            println!("{}", shelf.prefs.theme().unwrap_or_else(|| "system".to_string()))
        }
        PrefsCommand::Layout { value: Some(value) } => shelf.prefs.set_layout(&value)?,
        PrefsCommand::Layout { value: None } => {
            println!("{}", shelf.prefs.layout().unwrap_or_else(|| "grid".to_string()))
        }
    }
    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
