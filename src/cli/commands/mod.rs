//! CLI command implementations

pub mod build;
pub mod cache;
pub mod init;
pub mod plan;
pub mod render;
pub mod status;

pub use build::execute as build;
pub use cache::execute as cache;
pub use init::execute as init;
pub use plan::execute as plan;
pub use render::execute as render;
pub use status::execute as status;
