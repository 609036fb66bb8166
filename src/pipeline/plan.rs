//! Pipeline resolution
//!
//! Resolves a pipeline manifest against a build context directory into a
//! build plan: the ordered stage descriptors with their content-addressed
//! cache keys, and the composed image tag derived from the final key.

use crate::cache::LayerLedger;
use crate::error::{StrataError, StrataResult};
use crate::pipeline::manifest::{PipelineManifest, PIPELINE_FILE};
use crate::pipeline::stage::{self, StageDescriptor, StageInput, StageKind};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A stage with its computed cache key and ledger state
#[derive(Debug, Serialize)]
pub struct PlannedStage {
    #[serde(flatten)]
    pub descriptor: StageDescriptor,

    /// Content-addressed key: hash of (declared inputs, preceding key)
    pub cache_key: String,

    /// Whether this key was committed by a previous successful build
    pub cached: bool,
}

/// A fully resolved build plan
#[derive(Debug, Serialize)]
pub struct BuildPlan {
    /// Composed image tag, derived from the final stage key
    pub image_tag: String,

    /// Build context the plan was resolved against
    pub context_dir: PathBuf,

    /// The six stages in pipeline order
    pub stages: Vec<PlannedStage>,
}

impl BuildPlan {
    /// True when every stage key is already committed in the ledger
    pub fn fully_cached(&self) -> bool {
        self.stages.iter().all(|s| s.cached)
    }

    /// All stage cache keys in pipeline order
    pub fn stage_keys(&self) -> Vec<(StageKind, String)> {
        self.stages
            .iter()
            .map(|s| (s.descriptor.kind, s.cache_key.clone()))
            .collect()
    }
}

/// Resolve a manifest against a build context into a build plan.
///
/// Fail-fast: a missing dependency manifest aborts before the source tree
/// is even hashed, so no later stage is planned for a pipeline that cannot
/// complete its dependency stage.
pub fn resolve(
    manifest: &PipelineManifest,
    context_dir: &Path,
    ledger: &LayerLedger,
) -> StrataResult<BuildPlan> {
    if !context_dir.is_dir() {
        return Err(StrataError::ContextNotFound(context_dir.to_path_buf()));
    }

    for package in manifest.packages.unpinned() {
        warn!(
            "Package '{}' is unpinned; rebuilds may not be reproducible",
            package
        );
    }

    let dep_manifest_name = manifest.dependencies.manifest_name();
    let dep_manifest_path = context_dir.join(dep_manifest_name);
    if !dep_manifest_path.is_file() {
        return Err(StrataError::DependencyManifestMissing(dep_manifest_path));
    }
    let dep_digest = hash_file(&dep_manifest_path)?;

    let tree_digest = hash_source_tree(context_dir, &manifest.source.exclude, dep_manifest_name)?;
    debug!(
        "Resolved digests: manifest={} source-tree={}",
        dep_digest, tree_digest
    );

    let stages = vec![
        StageDescriptor::new(
            StageKind::Base,
            vec![StageInput::Value {
                name: "image",
                value: manifest.base.reference(),
            }],
        ),
        StageDescriptor::new(
            StageKind::SystemPackages,
            vec![StageInput::PackageList {
                packages: manifest.packages.install.clone(),
            }],
        ),
        StageDescriptor::new(
            StageKind::Workspace,
            vec![StageInput::Value {
                name: "dir",
                value: manifest.workspace.dir.clone(),
            }],
        ),
        StageDescriptor::new(
            StageKind::Dependencies,
            vec![
                StageInput::FileDigest {
                    path: dep_manifest_name.to_string(),
                    digest: dep_digest,
                },
                StageInput::Value {
                    name: "install",
                    value: manifest
                        .dependencies
                        .toolchain
                        .install_command(dep_manifest_name),
                },
            ],
        ),
        StageDescriptor::new(
            StageKind::Source,
            vec![StageInput::TreeDigest {
                digest: tree_digest,
            }],
        ),
        StageDescriptor::new(
            StageKind::Launch,
            vec![StageInput::Value {
                name: "command",
                value: manifest.launch.command(),
            }],
        ),
    ];

    stage::validate_order(&stages)?;

    let mut planned = Vec::with_capacity(stages.len());
    let mut previous: Option<String> = None;
    for descriptor in stages {
        let cache_key = descriptor.cache_key(previous.as_deref());
        let cached = ledger.contains(&cache_key);
        previous = Some(cache_key.clone());
        planned.push(PlannedStage {
            descriptor,
            cache_key,
            cached,
        });
    }

    // The image tag is content-addressed by the final stage key, which
    // transitively covers every stage input.
    let final_key = &planned
        .last()
        .ok_or_else(|| StrataError::Internal("empty plan".to_string()))?
        .cache_key;
    let image_tag = format!("strata-build-{}", final_key);

    Ok(BuildPlan {
        image_tag,
        context_dir: context_dir.to_path_buf(),
        stages: planned,
    })
}

/// Hash a single file's contents, returning 12 hex chars
fn hash_file(path: &Path) -> StrataResult<String> {
    let contents = fs::read(path)
        .map_err(|e| StrataError::io(format!("reading {}", path.display()), e))?;
    let mut hasher = Sha256::new();
    hasher.update(&contents);
    let digest = hasher.finalize();
    Ok(hex::encode(&digest[..6]))
}

/// Hash the source tree deterministically.
///
/// Files are visited in sorted relative-path order; each contributes its
/// path and contents. Excluded paths, the pipeline file, and the
/// dependency manifest (it belongs to the dependency stage, not the
/// source snapshot) do not contribute, so edits to them cannot invalidate
/// the source stage spuriously.
fn hash_source_tree(root: &Path, excludes: &[String], dep_manifest: &str) -> StrataResult<String> {
    let mut files = Vec::new();
    collect_files(root, root, excludes, dep_manifest, &mut files)?;
    files.sort();

    let mut hasher = Sha256::new();
    for rel in &files {
        let contents = fs::read(root.join(rel))
            .map_err(|e| StrataError::io(format!("reading {}", rel), e))?;
        hasher.update(rel.as_bytes());
        hasher.update(b"\0");
        hasher.update(&contents);
        hasher.update(b"\0");
    }
    let digest = hasher.finalize();
    Ok(hex::encode(&digest[..6]))
}

fn collect_files(
    root: &Path,
    dir: &Path,
    excludes: &[String],
    dep_manifest: &str,
    out: &mut Vec<String>,
) -> StrataResult<()> {
    let entries = fs::read_dir(dir)
        .map_err(|e| StrataError::io(format!("reading directory {}", dir.display()), e))?;

    for entry in entries {
        let entry = entry.map_err(|e| StrataError::io("reading directory entry", e))?;
        let path = entry.path();
        let rel = path
            .strip_prefix(root)
            .map_err(|_| StrataError::Internal("path outside build context".to_string()))?
            .to_string_lossy()
            .replace('\\', "/");

        if is_excluded(&rel, excludes) || rel == PIPELINE_FILE || rel == dep_manifest {
            continue;
        }

        let file_type = entry
            .file_type()
            .map_err(|e| StrataError::io(format!("stat {}", path.display()), e))?;
        if file_type.is_dir() {
            collect_files(root, &path, excludes, dep_manifest, out)?;
        } else if file_type.is_file() {
            out.push(rel);
        } else if file_type.is_symlink() {
            // The container tool still copies the link; its target is not
            // tracked here, so changes behind it never rotate the key
            warn!("Symlink {} is not part of the source digest", rel);
        }
    }
    Ok(())
}

/// Check a relative path against the exclude list (a match on the path
/// itself or any leading directory)
fn is_excluded(rel: &str, excludes: &[String]) -> bool {
    excludes
        .iter()
        .any(|ex| rel == ex || rel.starts_with(&format!("{}/", ex)))
}
