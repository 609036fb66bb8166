//! Container build tool abstraction
//!
//! The pipeline never talks to a container engine directly. A
//! `BuildRuntime` implementation owns image building and the layer cache;
//! the production implementation shells out to docker or podman.

mod cli_tool;

pub use cli_tool::CliBuildTool;

use crate::config::schema::RuntimeConfig;
use crate::error::StrataResult;
use async_trait::async_trait;
use std::path::Path;

/// Callback receiving raw build output lines as the tool emits them
pub type LineSink<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// Abstract container build tool interface
#[async_trait]
pub trait BuildRuntime: Send + Sync {
    /// Check if the tool is installed and runnable
    async fn is_available(&self) -> bool;

    /// Require the tool to be present and recent enough
    async fn ensure_ready(&self) -> StrataResult<()>;

    /// Report the tool's version
    async fn version(&self) -> StrataResult<semver::Version>;

    /// Check if an image tag exists locally
    async fn image_exists(&self, tag: &str) -> StrataResult<bool>;

    /// Build an image from a context directory and a Containerfile,
    /// streaming output lines to the sink. Blocks until the tool exits;
    /// cancellation and timeouts are the caller's responsibility.
    async fn build_image(
        &self,
        context: &Path,
        containerfile: &Path,
        tag: &str,
        no_cache: bool,
        on_line: LineSink<'_>,
    ) -> StrataResult<()>;

    /// Human-readable tool name for display
    fn name(&self) -> &str;
}

/// Create the build runtime selected by configuration
pub fn create(config: &RuntimeConfig) -> Box<dyn BuildRuntime> {
    Box::new(CliBuildTool::new(&config.binary))
}
