//! Simple spinner for tasks without known duration.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;
use std::time::Duration;

/// Spinner shown on stderr while a compile runs.
///
/// Hidden when stderr is not a terminal or when running in CI, so piped
/// output stays clean.
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    /// Create and start a spinner with the given message.
    pub fn new(message: &str) -> Self {
        let bar = if super::is_ci() || !console::user_attended_stderr() {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
                bar.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"]));
            }
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        };
        bar.set_message(message.to_string());
        Self { bar }
    }

    /// Update the spinner message.
    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Finish with a success message.
    pub fn finish(self, message: &str) {
        if self.bar.is_hidden() {
            super::success(message);
        } else {
            self.bar
                .finish_with_message(format!("{} {}", "✓".green().bold(), message));
        }
    }

    /// Finish with an error message.
    pub fn fail(self, message: &str) {
        self.bar.finish_and_clear();
        super::error(message);
    }
}
