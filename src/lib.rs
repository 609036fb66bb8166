//! Strata - Layered container build orchestrator
//!
//! Resolves a six-stage build pipeline for containerized web services
//! into content-addressed layers and drives docker or podman to build it.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod runtime;
pub mod ui;

pub use error::{StrataError, StrataResult};
