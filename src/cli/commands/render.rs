//! Render command - print the generated Containerfile

use crate::cli::args::RenderArgs;
use crate::error::{StrataError, StrataResult};
use crate::pipeline::{render, PipelineManifest};
use std::path::Path;
use tokio::fs;

/// Execute the render command
pub async fn execute(args: RenderArgs, pipeline_path: &Path) -> StrataResult<()> {
    let manifest = PipelineManifest::from_file(pipeline_path).await?;
    let containerfile = render::containerfile(&manifest);

    match args.output {
        Some(path) => {
            fs::write(&path, &containerfile)
                .await
                .map_err(|e| StrataError::io(format!("writing {}", path.display()), e))?;
        }
        None => print!("{}", containerfile),
    }

    Ok(())
}
