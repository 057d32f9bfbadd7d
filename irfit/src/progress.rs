//! Progress bar display for the model fits.
//!
//! Drawn on stderr, only when it is a terminal and `--quiet` was not given.

use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;

/// Progress over a fixed number of model fits.
pub struct FitProgress {
    bar: Option<ProgressBar>,
}

impl FitProgress {
    /// Create a progress display for `total` fits.
    pub fn new(total: usize, quiet: bool) -> Self {
        let is_tty = std::io::stderr().is_terminal();
        Self::with_display(total, is_tty && !quiet)
    }

    fn with_display(total: usize, enabled: bool) -> Self {
        if !enabled {
            return Self { bar: None };
        }
        let pb = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{prefix:>12.cyan.bold} [{bar:30.green/dim}] {pos:>2}/{len:2} {msg}")
        {
            pb.set_style(style.progress_chars("━━╺"));
        }
        pb.set_prefix("Fitting");
        pb.tick();
        Self { bar: Some(pb) }
    }

    /// Check if progress display is enabled.
    pub fn is_enabled(&self) -> bool {
        self.bar.is_some()
    }

    /// Record one finished fit.
    pub fn advance(&self, model: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(model.to_string());
            bar.inc(1);
        }
    }

    /// Finish and clear the bar.
    pub fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Drop for FitProgress {
    fn drop(&mut self) {
        self.finish();
    }
}
