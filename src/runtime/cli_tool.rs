//! Build tool backed by a container CLI (docker or podman)
//!
//! Shells out via tokio::process. Both tools accept the same build
//! surface used here: `build -f <containerfile> -t <tag> [--no-cache]
//! <context>`, `image inspect`, `--version`.

use crate::error::{StrataError, StrataResult};
use crate::runtime::{BuildRuntime, LineSink};
use async_trait::async_trait;
use semver::Version;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

/// Minimum supported tool version (BuildKit-era docker, podman 4+)
const MIN_VERSION: Version = Version::new(4, 0, 0);

/// Container build tool invoked as a CLI binary
pub struct CliBuildTool {
    binary: String,
}

impl CliBuildTool {
    pub fn new(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
        }
    }

    /// Execute a subcommand and capture its output
    async fn exec(&self, args: &[&str]) -> StrataResult<std::process::Output> {
        debug!("Executing: {} {:?}", self.binary, args);

        Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| StrataError::command_failed(format!("{} {:?}", self.binary, args), e))
    }
}

#[async_trait]
impl BuildRuntime for CliBuildTool {
    async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    async fn ensure_ready(&self) -> StrataResult<()> {
        if !self.is_available().await {
            return Err(StrataError::RuntimeNotFound {
                binary: self.binary.clone(),
                hint: format!("Install {} or set runtime.binary in the config", self.binary),
            });
        }
        let version = self.version().await?;
        if version < MIN_VERSION {
            return Err(StrataError::RuntimeTooOld {
                binary: self.binary.clone(),
                found: version.to_string(),
                required: MIN_VERSION.to_string(),
            });
        }
        Ok(())
    }

    async fn version(&self) -> StrataResult<Version> {
        let output = self.exec(&["--version"]).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_version(&stdout).ok_or_else(|| {
            StrataError::command_exec(
                format!("{} --version", self.binary),
                format!("unparseable version output: {}", stdout.trim()),
            )
        })
    }

    async fn image_exists(&self, tag: &str) -> StrataResult<bool> {
        let output = self.exec(&["image", "inspect", tag]).await?;
        Ok(output.status.success())
    }

    async fn build_image(
        &self,
        context: &Path,
        containerfile: &Path,
        tag: &str,
        no_cache: bool,
        on_line: LineSink<'_>,
    ) -> StrataResult<()> {
        info!("Building {} from {}", tag, context.display());

        let mut args: Vec<String> = vec![
            "build".to_string(),
            "-f".to_string(),
            containerfile.display().to_string(),
            "-t".to_string(),
            tag.to_string(),
        ];
        if no_cache {
            args.push("--no-cache".to_string());
        }
        args.push(context.display().to_string());

        debug!("Running build: {} {:?}", self.binary, args);

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| StrataError::command_failed(format!("{} build", self.binary), e))?;

        // Stream stdout line by line; keep stderr whole for the error path.
        // Docker routes BuildKit progress to stderr, podman to stdout, so
        // feed both to the sink.
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| StrataError::Internal("build stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| StrataError::Internal("build stderr not captured".to_string()))?;

        let mut stderr_buf = String::new();
        let mut stdout_lines = BufReader::new(stdout).lines();
        let mut stderr_reader = BufReader::new(stderr);

        let stderr_task = async {
            let _ = stderr_reader.read_to_string(&mut stderr_buf).await;
            stderr_buf
        };

        let stdout_task = async {
            while let Ok(Some(line)) = stdout_lines.next_line().await {
                on_line(&line);
            }
        };

        let ((), stderr_text) = tokio::join!(stdout_task, stderr_task);
        for line in stderr_text.lines() {
            on_line(line);
        }

        let status = child
            .wait()
            .await
            .map_err(|e| StrataError::command_failed(format!("{} build", self.binary), e))?;

        if status.success() {
            info!("Built image {}", tag);
            Ok(())
        } else {
            Err(StrataError::command_exec(
                format!("{} build -t {}", self.binary, tag),
                last_error_lines(&stderr_text),
            ))
        }
    }

    fn name(&self) -> &str {
        &self.binary
    }
}

/// Keep the tail of the build tool's stderr; full BuildKit transcripts
/// drown the actual error
fn last_error_lines(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let tail = lines.len().saturating_sub(8);
    lines[tail..].join("\n")
}

/// Parse a version out of `docker --version` / `podman --version` output,
/// e.g. "Docker version 27.3.1, build abc" or "podman version 5.2.0"
fn parse_version(output: &str) -> Option<Version> {
    for token in output.split_whitespace() {
        let token = token.trim_end_matches(',');
        let candidate = token.split('-').next().unwrap_or(token);
        if let Ok(version) = Version::parse(candidate) {
            return Some(version);
        }
        // Two-component versions (e.g. "25.0") still compare fine as x.y.0
        let parts: Vec<&str> = candidate.split('.').collect();
        if parts.len() == 2 {
            if let Ok(version) = Version::parse(&format!("{}.0", candidate)) {
                return Some(version);
            }
        }
    }
    None
}
