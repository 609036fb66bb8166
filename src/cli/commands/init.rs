//! Init command - create a starter strata.toml

use crate::cli::args::InitArgs;
use crate::error::{StrataError, StrataResult};
use crate::pipeline::PIPELINE_FILE;
use crate::ui::{self, UiContext};
use tokio::fs;

/// Starter pipeline for a Python web service with media tooling
const INIT_TEMPLATE: &str = r#"# Strata pipeline
# Stages run strictly in order; each produces one cached layer.

[base]
image = "python"
tag = "3.11-slim"

[packages]
install = ["ffmpeg", "curl"]

[workspace]
dir = "/app"

[dependencies]
toolchain = "pip"               # pip | poetry | npm
# manifest = "requirements.txt" # defaults per toolchain

[source]
exclude = [".git"]

[launch]
server = "gunicorn"
port_env = "PORT"
entry_point = "app:app"
# args = ["--workers", "2"]
"#;

/// Execute the init command
pub async fn execute(args: InitArgs) -> StrataResult<()> {
    let ctx = UiContext::detect();

    let target_dir = match args.path {
        Some(ref p) => p.clone(),
        None => std::env::current_dir()
            .map_err(|e| StrataError::io("getting current directory", e))?,
    };

    let pipeline_path = target_dir.join(PIPELINE_FILE);

    if pipeline_path.exists() && !args.force {
        return Err(StrataError::User(format!(
            "{} already exists. Use --force to overwrite.",
            pipeline_path.display()
        )));
    }

    if !target_dir.exists() {
        fs::create_dir_all(&target_dir)
            .await
            .map_err(|e| StrataError::io(format!("creating directory {}", target_dir.display()), e))?;
    }

    fs::write(&pipeline_path, INIT_TEMPLATE)
        .await
        .map_err(|e| StrataError::io(format!("writing {}", pipeline_path.display()), e))?;

    ui::step_ok_detail(
        &ctx,
        "Created pipeline",
        &pipeline_path.display().to_string(),
    );

    Ok(())
}
