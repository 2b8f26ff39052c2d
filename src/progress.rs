//! Progress reporting: count-style bars for per-user and per-thread loops.

use indicatif::{ProgressBar, ProgressStyle};

/// Count-style progress bar (items processed out of total), with an optional label.
pub fn make_count_progress(total: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} {msg} {pos}/{len} [{bar:.cyan/blue}] {percent:>3}%  \
         it/s: {per_sec}  elapsed: {elapsed_precise}  eta: {eta_precise}",
    ) {
        pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
    }
    if !label.is_empty() {
        pb.set_message(label.to_string());
    }
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// A progress bar that may be switched off; all methods are no-ops when disabled.
/// Cheap to share across rayon workers (`ProgressBar` is internally synchronized).
pub struct StepProgress {
    pb: Option<ProgressBar>,
}

impl StepProgress {
    pub fn new(enabled: bool, total: usize, label: &str) -> Self {
        let pb = if enabled { Some(make_count_progress(total as u64, label)) } else { None };
        Self { pb }
    }
    #[inline]
    pub fn inc(&self, delta: u64) {
        if let Some(pb) = &self.pb {
            pb.inc(delta);
        }
    }
    pub fn finish(&self) {
        if let Some(pb) = &self.pb {
            pb.finish_and_clear();
        }
    }
}
