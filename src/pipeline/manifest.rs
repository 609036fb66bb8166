//! Pipeline manifest parsing
//!
//! A project-local `strata.toml` describes the six-stage build pipeline:
//! base image, system packages, workspace, dependency install, source copy,
//! and the launch command.

use crate::error::{StrataError, StrataResult};
use crate::pipeline::launch::LaunchSpec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Default pipeline file name in the build context
pub const PIPELINE_FILE: &str = "strata.toml";

/// Parsed pipeline definition from strata.toml
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineManifest {
    /// Base image selection
    pub base: BaseSpec,

    /// OS package installation
    #[serde(default)]
    pub packages: PackagesSpec,

    /// Canonical working directory
    #[serde(default)]
    pub workspace: WorkspaceSpec,

    /// Dependency manifest and toolchain
    #[serde(default)]
    pub dependencies: DependenciesSpec,

    /// Source tree copy
    #[serde(default)]
    pub source: SourceSpec,

    /// Launch command declaration
    pub launch: LaunchSpec,
}

/// Base image section
///
/// The tag is mandatory: an unpinned base resolves differently over time
/// and silently invalidates every cached layer.
#[derive(Debug, Clone, Deserialize)]
pub struct BaseSpec {
    /// Image name (e.g., "python")
    pub image: String,

    /// Image tag (e.g., "3.11-slim")
    pub tag: String,
}

impl BaseSpec {
    /// Full image reference ("image:tag")
    pub fn reference(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }
}

/// System packages section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackagesSpec {
    /// Ordered OS package names, optionally pinned as "name=version"
    #[serde(default)]
    pub install: Vec<String>,
}

impl PackagesSpec {
    /// Package names that carry no version pin
    pub fn unpinned(&self) -> Vec<&str> {
        self.install
            .iter()
            .filter(|p| !p.contains('='))
            .map(String::as_str)
            .collect()
    }
}

/// Workspace section
#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceSpec {
    /// Working directory inside the image, root of all later relative paths
    pub dir: String,
}

impl Default for WorkspaceSpec {
    fn default() -> Self {
        Self {
            dir: "/app".to_string(),
        }
    }
}

/// Dependencies section
#[derive(Debug, Clone, Deserialize)]
pub struct DependenciesSpec {
    /// Toolchain used to install declared libraries
    #[serde(default)]
    pub toolchain: Toolchain,

    /// Manifest file name, relative to the build context.
    /// Defaults per toolchain when omitted.
    pub manifest: Option<String>,
}

impl Default for DependenciesSpec {
    fn default() -> Self {
        Self {
            toolchain: Toolchain::default(),
            manifest: None,
        }
    }
}

impl DependenciesSpec {
    /// Effective manifest file name
    pub fn manifest_name(&self) -> &str {
        self.manifest
            .as_deref()
            .unwrap_or_else(|| self.toolchain.default_manifest())
    }
}

/// Source copy section
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSpec {
    /// Paths excluded from the source snapshot (and its digest)
    #[serde(default = "default_excludes")]
    pub exclude: Vec<String>,
}

impl Default for SourceSpec {
    fn default() -> Self {
        Self {
            exclude: default_excludes(),
        }
    }
}

fn default_excludes() -> Vec<String> {
    vec![".git".to_string()]
}

/// Supported dependency toolchains
///
/// Each toolchain knows its default manifest file and an install command
/// that leaves no local package cache in the layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Toolchain {
    /// pip (requirements.txt)
    #[default]
    Pip,
    /// Poetry (pyproject.toml)
    Poetry,
    /// npm (package.json)
    Npm,
}

impl Toolchain {
    /// Default dependency manifest file name
    pub fn default_manifest(&self) -> &'static str {
        match self {
            Self::Pip => "requirements.txt",
            Self::Poetry => "pyproject.toml",
            Self::Npm => "package.json",
        }
    }

    /// Install command for the given manifest, with the toolchain's local
    /// cache disabled so it never persists into the layer
    pub fn install_command(&self, manifest: &str) -> String {
        match self {
            Self::Pip => format!("pip install --no-cache-dir -r {}", manifest),
            Self::Poetry => {
                "pip install --no-cache-dir poetry && \
                 poetry config virtualenvs.create false && \
                 poetry install --no-interaction --no-cache --no-root"
                    .to_string()
            }
            Self::Npm => "npm install --omit=dev && npm cache clean --force".to_string(),
        }
    }
}

impl fmt::Display for Toolchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pip => "pip",
            Self::Poetry => "poetry",
            Self::Npm => "npm",
        };
        write!(f, "{}", name)
    }
}

impl PipelineManifest {
    /// Parse and validate a pipeline from a TOML file on disk
    pub async fn from_file(path: &Path) -> StrataResult<Self> {
        if !path.exists() {
            return Err(StrataError::PipelineNotFound(path.to_path_buf()));
        }
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StrataError::io(format!("reading pipeline {}", path.display()), e))?;
        Self::parse(&content).map_err(|e| match e {
            StrataError::TomlParse(inner) => StrataError::PipelineInvalid {
                path: path.to_path_buf(),
                reason: inner.to_string(),
            },
            other => other,
        })
    }

    /// Parse and validate a pipeline from a TOML string
    pub fn parse(content: &str) -> StrataResult<Self> {
        let manifest: Self = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate cross-field invariants that serde cannot express
    fn validate(&self) -> StrataResult<()> {
        if self.base.image.trim().is_empty() {
            return Err(StrataError::BaseImageInvalid {
                reference: self.base.reference(),
                reason: "image name is empty".to_string(),
            });
        }
        if self.base.tag.trim().is_empty() || self.base.tag == "latest" {
            return Err(StrataError::BaseImageInvalid {
                reference: self.base.reference(),
                reason: "tag must pin a version (not empty, not 'latest')".to_string(),
            });
        }
        for package in &self.packages.install {
            validate_package_name(package)?;
        }
        if !self.workspace.dir.starts_with('/') {
            return Err(StrataError::User(format!(
                "Workspace dir '{}' must be an absolute path",
                self.workspace.dir
            )));
        }
        let manifest_name = self.dependencies.manifest_name();
        if manifest_name.is_empty() || manifest_name.contains('/') || manifest_name.contains("..") {
            return Err(StrataError::User(format!(
                "Dependency manifest '{}' must be a plain file name in the build context",
                manifest_name
            )));
        }
        self.launch.validate()?;
        Ok(())
    }
}

/// Validate an OS package entry ("name" or "name=version")
fn validate_package_name(package: &str) -> StrataResult<()> {
    let name = package.split('=').next().unwrap_or("");
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '+' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(StrataError::PackageNameInvalid(package.to_string()))
    }
}
