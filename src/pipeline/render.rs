//! Containerfile rendering
//!
//! Renders a pipeline manifest into a Containerfile whose instruction
//! sequence carries the layering contract:
//!
//! - package install and index cleanup share one RUN, so the index cache
//!   never persists into the layer
//! - the dependency manifest is copied alone, before the source tree, so
//!   source edits cannot invalidate the dependency layer
//! - the CMD is shell form, so the bind port expands from the environment
//!   at container start rather than at build time

use crate::pipeline::manifest::PipelineManifest;

/// Render the Containerfile for a pipeline
pub fn containerfile(manifest: &PipelineManifest) -> String {
    let mut lines = Vec::new();

    lines.push(format!("FROM {}", manifest.base.reference()));
    lines.push(String::new());

    lines.push(packages_unit(&manifest.packages.install));
    lines.push(String::new());

    lines.push(format!("WORKDIR {}", manifest.workspace.dir));
    lines.push(String::new());

    // Manifest only: nothing else may land in this layer
    let dep_manifest = manifest.dependencies.manifest_name();
    lines.push(format!("COPY {} ./", dep_manifest));
    lines.push(format!(
        "RUN {}",
        manifest.dependencies.toolchain.install_command(dep_manifest)
    ));
    lines.push(String::new());

    lines.push("COPY . .".to_string());
    lines.push(String::new());

    lines.push(format!("CMD {}", manifest.launch.command()));
    lines.push(String::new());

    lines.join("\n")
}

/// The atomic package unit: index refresh, install, index cleanup in a
/// single RUN. An empty list still refreshes and cleans up, producing a
/// layer with no added binaries.
fn packages_unit(packages: &[String]) -> String {
    let mut parts = vec!["apt-get update".to_string()];
    if !packages.is_empty() {
        let list = packages
            .iter()
            .map(|p| quote(p))
            .collect::<Vec<_>>()
            .join(" ");
        parts.push(format!(
            "apt-get install -y --no-install-recommends {}",
            list
        ));
    }
    parts.push("rm -rf /var/lib/apt/lists/*".to_string());
    format!("RUN {}", parts.join(" && \\\n    "))
}

/// Quote a value for shell use inside a RUN instruction. Plain
/// alphanumeric values (the common case for package names) pass through
/// unquoted.
fn quote(value: &str) -> String {
    let plain = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.' | '=' | '_' | '/'));
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "'\\''"))
    }
}
