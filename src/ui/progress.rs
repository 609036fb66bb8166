//! Build progress display with CI fallback

use super::context::UiContext;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar for container image builds.
///
/// Parses podman `STEP N/M: <instruction>` and classic docker
/// `Step N/M : <instruction>` lines and drives an indicatif bar in
/// interactive mode, or prints plain step lines in CI.
pub struct BuildProgress {
    bar: Option<ProgressBar>,
}

impl BuildProgress {
    pub fn new(ctx: &UiContext, label: &str) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new(0);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("  {spinner:.cyan} Building {prefix}  {bar:20.cyan/dim} {pos}/{len} {msg:.dim}  {elapsed:.dim}")
                    .unwrap()
                    .progress_chars("━╸─"),
            );
            bar.set_prefix(label.to_string());
            bar.enable_steady_tick(std::time::Duration::from_millis(120));
            Some(bar)
        } else {
            println!("Building {}...", label);
            None
        };
        Self { bar }
    }

    /// Process one build output line
    pub fn on_line(&self, line: &str) {
        if let Some((n, total, instruction)) = parse_step_line(line) {
            if let Some(ref bar) = self.bar {
                bar.set_length(total);
                bar.set_position(n);
                bar.set_message(instruction.to_string());
            } else {
                println!("  STEP {}/{}: {}", n, total, instruction);
            }
        } else if let Some(ref bar) = self.bar {
            let trimmed = line.trim();
            if !trimmed.is_empty() && !is_build_noise(trimmed) {
                bar.set_message(truncate_display(trimmed));
            }
        }
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

/// Clamp a message for the bar. Cuts on a char boundary; tool output
/// carries multibyte glyphs (pip's download bars) and a byte slice
/// through one would panic.
fn truncate_display(line: &str) -> String {
    const MAX: usize = 60;
    if line.len() <= MAX {
        return line.to_string();
    }
    let mut end = MAX - 3;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &line[..end])
}

/// Filter build tool internals that aren't useful to display
fn is_build_noise(line: &str) -> bool {
    line.starts_with("--->")
        || line.starts_with("-->")
        || line.starts_with("Removing intermediate")
        || line.starts_with("COMMIT")
        || line.starts_with("#")
}

/// Parse a step line in either tool's format:
/// podman `STEP N/M: INSTR` or docker `Step N/M : INSTR`
fn parse_step_line(line: &str) -> Option<(u64, u64, &str)> {
    let rest = line
        .strip_prefix("STEP ")
        .or_else(|| line.strip_prefix("Step "))?;
    let slash = rest.find('/')?;
    let colon = rest.find(':')?;
    if colon <= slash {
        return None;
    }
    let n: u64 = rest[..slash].trim().parse().ok()?;
    let total: u64 = rest[slash + 1..colon].trim().parse().ok()?;
    let instruction = rest[colon + 1..].trim();
    Some((n, total, instruction))
}
