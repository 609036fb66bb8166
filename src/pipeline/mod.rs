//! The six-stage build pipeline: definition, resolution, and rendering

pub mod launch;
pub mod manifest;
pub mod plan;
pub mod render;
pub mod stage;

pub use manifest::{PipelineManifest, Toolchain, PIPELINE_FILE};
pub use plan::{BuildPlan, PlannedStage};
pub use stage::{StageDescriptor, StageInput, StageKind};
