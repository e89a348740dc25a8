//! Progress display for dumps
//!
//! The bar is sized by the record count reported before the dump starts.
//! That count is advisory, so the bar may finish short of its length.

use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, eta {eta})";

pub struct ProgressTracker {
    /// Hidden when progress display is disabled
    bar: Option<ProgressBar>,
    processed: u64,
}

impl ProgressTracker {
    pub fn new(total: u64, enabled: bool) -> Self {
        let bar = enabled.then(|| {
            let bar = ProgressBar::new(total);
            let style = ProgressStyle::default_bar()
                .template(TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-");
            bar.set_style(style);
            bar
        });
        Self { bar, processed: 0 }
    }

    pub fn inc(&mut self) {
        self.processed += 1;
        if let Some(ref bar) = self.bar {
            bar.inc(1);
        }
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish();
        }
    }
}
