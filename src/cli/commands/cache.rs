//! Cache command - inspect and prune the stage-key ledger

use crate::cache::{LayerLedger, LedgerEntry};
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::{Config, ConfigManager};
use crate::error::StrataResult;
use crate::ui::{self, UiContext};
use console::style;
use serde_json::json;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> StrataResult<()> {
    match args.action {
        CacheAction::List { format } => list(format).await,
        CacheAction::Gc { days, dry_run } => gc(config, days, dry_run).await,
        CacheAction::Clear { yes } => clear(yes).await,
    }
}

async fn list(format: OutputFormat) -> StrataResult<()> {
    let ledger = LayerLedger::load(ConfigManager::ledger_path()).await?;

    if ledger.is_empty() {
        println!("No committed stage keys.");
        return Ok(());
    }

    match format {
        OutputFormat::Table => print_table(&ledger),
        OutputFormat::Json => print_json(&ledger)?,
        OutputFormat::Plain => {
            for (key, entry) in ledger.entries() {
                println!("{} {}", key, entry.stage);
            }
        }
    }

    Ok(())
}

fn print_table(ledger: &LayerLedger) {
    println!(
        "{:<14} {:<18} {:<28} {}",
        "KEY", "STAGE", "IMAGE", "COMMITTED"
    );
    println!("{}", "-".repeat(80));
    for (key, entry) in ledger.entries() {
        println!(
            "{:<14} {:<18} {:<28} {}",
            key,
            entry.stage,
            entry.image_tag,
            entry.created_at.format("%Y-%m-%d %H:%M")
        );
    }
}

fn print_json(ledger: &LayerLedger) -> StrataResult<()> {
    let entries: Vec<serde_json::Value> = ledger
        .entries()
        .map(|(key, entry): (&String, &LedgerEntry)| {
            json!({
                "key": key,
                "stage": entry.stage,
                "image_tag": entry.image_tag,
                "created_at": entry.created_at,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

async fn gc(config: &Config, days: Option<u32>, dry_run: bool) -> StrataResult<()> {
    let ctx = UiContext::detect();
    let days = days.unwrap_or(config.ledger.gc_days);
    let mut ledger = LayerLedger::load(ConfigManager::ledger_path()).await?;

    if dry_run {
        let before = ledger.len();
        let would_remove = ledger.prune_older_than(days);
        ui::step_info(
            &ctx,
            &format!(
                "Would remove {} of {} entries older than {} days",
                would_remove, before, days
            ),
        );
        return Ok(());
    }

    let removed = ledger.prune_older_than(days);
    ledger.save().await?;
    ui::step_ok(
        &ctx,
        &format!("Removed {} entries older than {} days", removed, days),
    );
    Ok(())
}

async fn clear(yes: bool) -> StrataResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);
    let mut ledger = LayerLedger::load(ConfigManager::ledger_path()).await?;

    if ledger.is_empty() {
        println!("Ledger is already empty.");
        return Ok(());
    }

    let message = format!(
        "Clear {} committed stage keys? The next build runs every stage.",
        ledger.len()
    );
    if !ui::confirm(&ctx, &message, false).await? {
        println!("{}", style("Aborted.").dim());
        return Ok(());
    }

    let removed = ledger.clear();
    ledger.save().await?;
    ui::step_ok(&ctx, &format!("Cleared {} entries", removed));
    Ok(())
}
