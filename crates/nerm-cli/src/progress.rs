//! Terminal progress bars for long-running exports.

use indicatif::{ProgressBar, ProgressStyle};
use nerm_export::ProgressReporter;

/// Progress bar that switches to a spinner when the run has no known bound.
pub struct BarProgress {
    bar: ProgressBar,
    unit: &'static str,
}

impl BarProgress {
    pub fn new(unit: &'static str) -> Self {
        Self {
            bar: ProgressBar::hidden(),
            unit,
        }
    }
}

impl ProgressReporter for BarProgress {
    fn start(&self, total: Option<u64>) {
        match total {
            Some(n) => {
                self.bar.set_length(n);
                if let Ok(style) =
                    ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                {
                    self.bar.set_style(style.progress_chars("#>-"));
                }
            }
            None => {
                if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {pos} {msg}") {
                    self.bar.set_style(style);
                }
            }
        }
        self.bar.set_message(self.unit);
        self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.bar.set_position(0);
    }

    fn advance(&self, position: u64) {
        self.bar.set_position(position);
    }

    fn finish(&self, position: u64) {
        self.bar.set_position(position);
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_tracks_positions() {
        let progress = BarProgress::new("profiles");
        progress.start(Some(250));
        assert_eq!(progress.bar.length(), Some(250));
        progress.advance(100);
        assert_eq!(progress.bar.position(), 100);
        progress.finish(250);
        assert_eq!(progress.bar.position(), 250);
        assert!(progress.bar.is_finished());
    }
}
