//! Status command - check pipeline, build tool, and state health

use crate::cache::LayerLedger;
use crate::config::{Config, ConfigManager};
use crate::error::StrataResult;
use crate::pipeline::PipelineManifest;
use crate::runtime::{self, BuildRuntime};
use crate::ui::{self, UiContext};
use std::path::Path;

/// Execute the status command
pub async fn execute(pipeline_path: &Path, config: &Config) -> StrataResult<()> {
    let ctx = UiContext::detect();

    ui::section(&ctx, "Pipeline");
    if pipeline_path.exists() {
        match PipelineManifest::from_file(pipeline_path).await {
            Ok(manifest) => {
                ui::step_ok_detail(
                    &ctx,
                    "Pipeline valid",
                    &format!(
                        "{} -> {}",
                        manifest.base.reference(),
                        manifest.launch.entry_point
                    ),
                );
                let unpinned = manifest.packages.unpinned();
                if !unpinned.is_empty() {
                    ui::step_warn(&ctx, &format!("Unpinned packages: {}", unpinned.join(", ")));
                }
            }
            Err(e) => ui::step_error(&ctx, &format!("Pipeline invalid: {}", e)),
        }
    } else {
        ui::step_warn(
            &ctx,
            &format!("No pipeline at {} (run: strata init)", pipeline_path.display()),
        );
    }

    ui::section(&ctx, "Build tool");
    let tool = runtime::create(&config.runtime);
    if tool.is_available().await {
        match tool.version().await {
            Ok(version) => {
                ui::step_ok_detail(&ctx, tool.name(), &version.to_string());
            }
            Err(e) => ui::step_warn(&ctx, &format!("{}: {}", tool.name(), e)),
        }
    } else {
        ui::step_error(&ctx, &format!("{} not found", tool.name()));
    }

    ui::section(&ctx, "State");
    ui::key_value(
        &ctx,
        "state dir",
        &ConfigManager::state_dir().display().to_string(),
    );
    let ledger = LayerLedger::load(ConfigManager::ledger_path()).await?;
    ui::key_value(&ctx, "ledger keys", &ledger.len().to_string());

    Ok(())
}
