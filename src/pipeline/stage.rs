//! Stage descriptors
//!
//! The pipeline is an immutable ordered list of stage descriptors. Each
//! descriptor declares its exact inputs, so a stage's cache key is a pure
//! function of (declared inputs, preceding stage key) rather than ambient
//! build state. Ordering is validated explicitly instead of relying on
//! positional convention.

use crate::error::{StrataError, StrataResult};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// The six stage kinds, in mandatory pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageKind {
    /// Pins the base image reference
    Base,
    /// Installs OS packages and prunes the package index in one unit
    SystemPackages,
    /// Establishes the canonical working directory
    Workspace,
    /// Copies the dependency manifest and installs declared libraries
    Dependencies,
    /// Copies the remaining source tree
    Source,
    /// Declares the default launch command
    Launch,
}

impl StageKind {
    /// Canonical pipeline order
    pub const ORDER: [StageKind; 6] = [
        Self::Base,
        Self::SystemPackages,
        Self::Workspace,
        Self::Dependencies,
        Self::Source,
        Self::Launch,
    ];

    /// Stable name used in cache keys, logs, and plan output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::SystemPackages => "system-packages",
            Self::Workspace => "workspace",
            Self::Dependencies => "dependencies",
            Self::Source => "source",
            Self::Launch => "launch",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared stage input
///
/// Inputs are the only data that may influence a stage's cache key.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum StageInput {
    /// A literal configuration value (image reference, workdir, command)
    Value { name: &'static str, value: String },

    /// The ordered OS package list
    PackageList { packages: Vec<String> },

    /// A single file identified by its content digest
    FileDigest { path: String, digest: String },

    /// A file tree identified by its aggregate digest
    TreeDigest { digest: String },
}

impl StageInput {
    /// Canonical byte form fed into the cache key hash
    fn canonical(&self) -> String {
        match self {
            Self::Value { name, value } => format!("value:{}={}", name, value),
            Self::PackageList { packages } => format!("packages:{}", packages.join("\n")),
            Self::FileDigest { path, digest } => format!("file:{}@{}", path, digest),
            Self::TreeDigest { digest } => format!("tree:{}", digest),
        }
    }
}

/// One stage of the pipeline: a kind plus its declared inputs
#[derive(Debug, Clone, Serialize)]
pub struct StageDescriptor {
    pub kind: StageKind,
    pub inputs: Vec<StageInput>,
}

impl StageDescriptor {
    pub fn new(kind: StageKind, inputs: Vec<StageInput>) -> Self {
        Self { kind, inputs }
    }

    /// Compute this stage's cache key: a truncated SHA256 over the kind,
    /// the canonical inputs, and the preceding stage's key. Chaining the
    /// previous key makes every key transitively depend on all earlier
    /// stage inputs, so a changed base invalidates the whole pipeline
    /// while a source-only edit leaves stages 1-4 untouched.
    pub fn cache_key(&self, previous: Option<&str>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(previous.unwrap_or(""));
        hasher.update(b"\0");
        hasher.update(self.kind.as_str());
        for input in &self.inputs {
            hasher.update(b"\0");
            hasher.update(input.canonical());
        }
        let digest = hasher.finalize();
        hex::encode(&digest[..6])
    }
}

/// Validate that descriptors form the strict six-stage sequence.
///
/// In particular the dependency-manifest copy must precede the source
/// copy, or unrelated source edits would invalidate dependency installs.
pub fn validate_order(stages: &[StageDescriptor]) -> StrataResult<()> {
    if stages.len() != StageKind::ORDER.len() {
        return Err(StrataError::Internal(format!(
            "pipeline has {} stages, expected {}",
            stages.len(),
            StageKind::ORDER.len()
        )));
    }
    for (stage, expected) in stages.iter().zip(StageKind::ORDER) {
        if stage.kind != expected {
            return Err(StrataError::Internal(format!(
                "stage '{}' out of order, expected '{}'",
                stage.kind, expected
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(name: &'static str, v: &str) -> StageInput {
        StageInput::Value {
            name,
            value: v.to_string(),
        }
    }

    fn full_pipeline() -> Vec<StageDescriptor> {
        StageKind::ORDER
            .iter()
            .map(|kind| StageDescriptor::new(*kind, vec![value("x", kind.as_str())]))
            .collect()
    }

    #[test]
    fn cache_key_deterministic() {
        let stage = StageDescriptor::new(StageKind::Base, vec![value("image", "python:3.11-slim")]);
        assert_eq!(stage.cache_key(None), stage.cache_key(None));
        assert_eq!(stage.cache_key(None).len(), 12);
    }

    #[test]
    fn cache_key_changes_with_input() {
        let a = StageDescriptor::new(StageKind::Base, vec![value("image", "python:3.11-slim")]);
        let b = StageDescriptor::new(StageKind::Base, vec![value("image", "python:3.12-slim")]);
        assert_ne!(a.cache_key(None), b.cache_key(None));
    }

    #[test]
    fn cache_key_chains_previous() {
        let stage = StageDescriptor::new(
            StageKind::Workspace,
            vec![value("dir", "/app")],
        );
        assert_ne!(stage.cache_key(Some("aaaa")), stage.cache_key(Some("bbbb")));
    }

    #[test]
    fn package_order_is_significant() {
        let ab = StageDescriptor::new(
            StageKind::SystemPackages,
            vec![StageInput::PackageList {
                packages: vec!["ffmpeg".to_string(), "curl".to_string()],
            }],
        );
        let ba = StageDescriptor::new(
            StageKind::SystemPackages,
            vec![StageInput::PackageList {
                packages: vec!["curl".to_string(), "ffmpeg".to_string()],
            }],
        );
        assert_ne!(ab.cache_key(None), ba.cache_key(None));
    }

    #[test]
    fn validate_order_accepts_canonical() {
        assert!(validate_order(&full_pipeline()).is_ok());
    }

    #[test]
    fn validate_order_rejects_swapped_deps_and_source() {
        let mut stages = full_pipeline();
        stages.swap(3, 4);
        let err = validate_order(&stages).unwrap_err();
        assert!(err.to_string().contains("out of order"));
    }

    #[test]
    fn validate_order_rejects_missing_stage() {
        let mut stages = full_pipeline();
        stages.pop();
        assert!(validate_order(&stages).is_err());
    }

    #[test]
    fn stage_kind_names() {
        assert_eq!(StageKind::SystemPackages.as_str(), "system-packages");
        assert_eq!(StageKind::Launch.to_string(), "launch");
    }
}
