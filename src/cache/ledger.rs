//! Layer ledger
//!
//! The container build tool owns the real layer cache. Strata keeps a
//! ledger of stage cache keys committed by successful builds, persisted as
//! JSON in the state directory, so planning can report per-stage hit/miss
//! and a fully cached build can be skipped outright.
//!
//! Keys are recorded only after the whole build succeeds; a failed build
//! commits nothing.

use crate::error::{StrataError, StrataResult};
use crate::pipeline::plan::BuildPlan;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A committed stage layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Stage kind that produced the layer
    pub stage: String,

    /// Composed image tag of the build that committed this key
    pub image_tag: String,

    /// When the key was committed
    pub created_at: DateTime<Utc>,
}

/// Persisted ledger file format
#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    layers: BTreeMap<String, LedgerEntry>,
}

/// The stage-key ledger
#[derive(Debug)]
pub struct LayerLedger {
    path: PathBuf,
    layers: BTreeMap<String, LedgerEntry>,
}

impl LayerLedger {
    /// Create an empty ledger that will persist to `path`
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            layers: BTreeMap::new(),
        }
    }

    /// Load the ledger from disk; a missing file yields an empty ledger
    pub async fn load(path: PathBuf) -> StrataResult<Self> {
        if !path.exists() {
            debug!("Ledger not found at {}, starting empty", path.display());
            return Ok(Self::new(path));
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| StrataError::io(format!("reading ledger {}", path.display()), e))?;

        let file: LedgerFile =
            serde_json::from_str(&content).map_err(|e| StrataError::LedgerRead {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            path,
            layers: file.layers,
        })
    }

    /// Persist the ledger. Written to a temp file and renamed so a crash
    /// never leaves a truncated ledger behind.
    pub async fn save(&self) -> StrataResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StrataError::io(format!("creating {}", parent.display()), e))?;
        }

        let file = LedgerFile {
            layers: self.layers.clone(),
        };
        let content = serde_json::to_string_pretty(&file)?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &content)
            .await
            .map_err(|e| StrataError::io(format!("writing {}", tmp.display()), e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StrataError::io(format!("renaming {}", tmp.display()), e))?;

        debug!("Ledger saved: {} keys", self.layers.len());
        Ok(())
    }

    /// Check whether a stage key was committed by a previous build
    pub fn contains(&self, key: &str) -> bool {
        self.layers.contains_key(key)
    }

    /// Record every stage key of a successfully built plan
    pub fn commit_plan(&mut self, plan: &BuildPlan) {
        let now = Utc::now();
        for (kind, key) in plan.stage_keys() {
            self.layers.insert(
                key,
                LedgerEntry {
                    stage: kind.to_string(),
                    image_tag: plan.image_tag.clone(),
                    created_at: now,
                },
            );
        }
    }

    /// Iterate over committed keys and their entries
    pub fn entries(&self) -> impl Iterator<Item = (&String, &LedgerEntry)> {
        self.layers.iter()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Remove entries older than the given number of days; returns how
    /// many were removed
    pub fn prune_older_than(&mut self, days: u32) -> usize {
        let cutoff = Utc::now() - Duration::days(i64::from(days));
        let before = self.layers.len();
        self.layers.retain(|_, entry| entry.created_at >= cutoff);
        before - self.layers.len()
    }

    /// Drop every entry; returns how many were removed
    pub fn clear(&mut self) -> usize {
        let count = self.layers.len();
        self.layers.clear();
        count
    }

    /// Ledger file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}
