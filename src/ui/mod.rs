//! CLI output helpers
//!
//! Uses `cliclack` for prompts and `indicatif` for build progress, with
//! automatic fallback to plain output in CI/non-interactive environments.

mod context;
mod output;
mod progress;
mod prompts;

pub use context::UiContext;
pub use output::{
    key_value, outro_success, section, step_error, step_info, step_ok, step_ok_detail, step_warn,
};
pub use progress::BuildProgress;
pub use prompts::confirm;
