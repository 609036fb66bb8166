//! Build command - execute the pipeline through the container tool
//!
//! Rendering, planning, and the ledger commit wrap a single tool
//! invocation. Any stage failure aborts the whole build with nothing
//! committed; re-running the command is the only retry path.

use crate::cache::LayerLedger;
use crate::cli::args::BuildArgs;
use crate::config::{Config, ConfigManager};
use crate::error::{StrataError, StrataResult};
use crate::pipeline::{plan, render, PipelineManifest};
use crate::runtime::{self, BuildRuntime};
use crate::ui::{self, BuildProgress, UiContext};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Execute the build command
pub async fn execute(
    args: BuildArgs,
    pipeline_path: &Path,
    context_dir: &Path,
    config: &Config,
) -> StrataResult<()> {
    let ctx = UiContext::detect();

    let manifest = PipelineManifest::from_file(pipeline_path).await?;
    let mut ledger = LayerLedger::load(ConfigManager::ledger_path()).await?;
    let mut build_plan = plan::resolve(&manifest, context_dir, &ledger)?;

    if let Some(tag) = args.tag {
        build_plan.image_tag = tag;
    }

    let tool = runtime::create(&config.runtime);
    tool.ensure_ready().await?;

    if !args.no_cache
        && build_plan.fully_cached()
        && tool.image_exists(&build_plan.image_tag).await?
    {
        info!("All stage keys committed and image present, skipping build");
        ui::step_ok_detail(&ctx, "Image up to date", &build_plan.image_tag);
        return Ok(());
    }

    ConfigManager::ensure_state_dirs().await?;
    let build_dir = ConfigManager::builds_dir().join(uuid::Uuid::new_v4().to_string());
    tokio::fs::create_dir_all(&build_dir)
        .await
        .map_err(|e| StrataError::io("creating build directory", e))?;
    let containerfile_path = build_dir.join("Containerfile");
    tokio::fs::write(&containerfile_path, render::containerfile(&manifest))
        .await
        .map_err(|e| StrataError::io("writing Containerfile", e))?;
    debug!("Rendered Containerfile to {}", containerfile_path.display());

    let progress = BuildProgress::new(&ctx, &build_plan.image_tag);
    let tracker = StageTracker::new();
    let result = tool
        .build_image(
            context_dir,
            &containerfile_path,
            &build_plan.image_tag,
            args.no_cache,
            &|line| {
                tracker.observe(line);
                progress.on_line(line);
            },
        )
        .await;
    progress.finish();

    // Clean up the rendered build directory (best-effort)
    let _ = tokio::fs::remove_dir_all(&build_dir).await;

    if let Err(err) = result {
        // Nothing is committed for a failed build
        return Err(match err {
            StrataError::CommandExecution { stderr, .. } => StrataError::BuildFailed {
                stage: tracker.current(),
                reason: stderr,
            },
            other => other,
        });
    }

    ledger.commit_plan(&build_plan);
    if config.ledger.gc_days > 0 {
        let pruned = ledger.prune_older_than(config.ledger.gc_days);
        if pruned > 0 {
            debug!("Pruned {} stale ledger entries", pruned);
        }
    }
    ledger.save().await?;

    ui::outro_success(&ctx, &format!("Built {}", build_plan.image_tag));
    Ok(())
}

/// Tracks which pipeline stage the build tool is currently executing,
/// from the instruction text of its step lines. Used only to attribute
/// a failure to a stage in the error message.
struct StageTracker {
    current: Mutex<String>,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            current: Mutex::new("base".to_string()),
        }
    }

    fn observe(&self, line: &str) {
        let instruction = match line
            .strip_prefix("STEP ")
            .or_else(|| line.strip_prefix("Step "))
            .and_then(|rest| rest.split_once(':'))
        {
            Some((_, instruction)) => instruction.trim(),
            None => return,
        };
        if let Some(stage) = classify_instruction(instruction) {
            if let Ok(mut current) = self.current.lock() {
                *current = stage.to_string();
            }
        }
    }

    fn current(&self) -> String {
        self.current
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|_| "unknown".to_string())
    }
}

/// Map a Containerfile instruction back to its pipeline stage
fn classify_instruction(instruction: &str) -> Option<&'static str> {
    if instruction.starts_with("FROM") {
        Some("base")
    } else if instruction.starts_with("RUN apt-get") {
        Some("system-packages")
    } else if instruction.starts_with("WORKDIR") {
        Some("workspace")
    } else if instruction.starts_with("COPY . .") {
        Some("source")
    } else if instruction.starts_with("COPY") || instruction.starts_with("RUN") {
        Some("dependencies")
    } else if instruction.starts_with("CMD") {
        Some("launch")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_covers_all_stages() {
        assert_eq!(classify_instruction("FROM python:3.11-slim"), Some("base"));
        assert_eq!(
            classify_instruction("RUN apt-get update && apt-get install -y ffmpeg"),
            Some("system-packages")
        );
        assert_eq!(classify_instruction("WORKDIR /app"), Some("workspace"));
        assert_eq!(
            classify_instruction("COPY requirements.txt ./"),
            Some("dependencies")
        );
        assert_eq!(
            classify_instruction("RUN pip install --no-cache-dir -r requirements.txt"),
            Some("dependencies")
        );
        assert_eq!(classify_instruction("COPY . ."), Some("source"));
        assert_eq!(
            classify_instruction("CMD gunicorn --bind 0.0.0.0:$PORT app:app"),
            Some("launch")
        );
    }

    #[test]
    fn tracker_follows_step_lines() {
        let tracker = StageTracker::new();
        assert_eq!(tracker.current(), "base");

        tracker.observe("STEP 2/7: RUN apt-get update && rm -rf /var/lib/apt/lists/*");
        assert_eq!(tracker.current(), "system-packages");

        tracker.observe("Step 5/7 : RUN pip install --no-cache-dir -r requirements.txt");
        assert_eq!(tracker.current(), "dependencies");

        // Non-step output leaves the stage unchanged
        tracker.observe("Collecting flask==3.0.0");
        assert_eq!(tracker.current(), "dependencies");
    }
}
