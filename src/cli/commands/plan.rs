//! Plan command - resolve the pipeline and show stage cache keys

use crate::cache::LayerLedger;
use crate::cli::args::{OutputFormat, PlanArgs};
use crate::config::ConfigManager;
use crate::error::StrataResult;
use crate::pipeline::{plan, BuildPlan, PipelineManifest};
use crate::ui::{self, UiContext};
use console::style;
use std::path::Path;

/// Execute the plan command
pub async fn execute(args: PlanArgs, pipeline_path: &Path, context_dir: &Path) -> StrataResult<()> {
    let manifest = PipelineManifest::from_file(pipeline_path).await?;
    let ledger = LayerLedger::load(ConfigManager::ledger_path()).await?;
    let plan = plan::resolve(&manifest, context_dir, &ledger)?;

    match args.format {
        OutputFormat::Table => print_table(&manifest, &plan),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        OutputFormat::Plain => print_plain(&plan),
    }

    Ok(())
}

fn print_table(manifest: &PipelineManifest, plan: &BuildPlan) {
    let ctx = UiContext::detect();

    ui::section(&ctx, "Build plan");
    ui::key_value(&ctx, "image", &manifest.base.reference());
    ui::key_value(&ctx, "tag", &plan.image_tag);
    ui::key_value(&ctx, "context", &plan.context_dir.display().to_string());

    println!();
    println!(
        "  {:<18} {:<14} {}",
        style("STAGE").dim(),
        style("KEY").dim(),
        style("CACHE").dim()
    );
    for stage in &plan.stages {
        let cache = if stage.cached {
            style("hit").green().to_string()
        } else {
            style("miss").yellow().to_string()
        };
        println!(
            "  {:<18} {:<14} {}",
            stage.descriptor.kind, stage.cache_key, cache
        );
    }

    let unpinned = manifest.packages.unpinned();
    if !unpinned.is_empty() {
        println!();
        ui::step_warn(
            &ctx,
            &format!(
                "Unpinned packages ({}) make rebuilds non-reproducible",
                unpinned.join(", ")
            ),
        );
    }
}

fn print_plain(plan: &BuildPlan) {
    for stage in &plan.stages {
        println!(
            "{} {} {}",
            stage.descriptor.kind,
            stage.cache_key,
            if stage.cached { "hit" } else { "miss" }
        );
    }
}
