//! Progress reporting for the walker
//!
//! Provides a real-time progress display using an indicatif spinner fed
//! from the walk's shared counters.

use crate::walker::WalkProgress;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress reporter that displays walk status
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .expect("Invalid progress template")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display
    pub fn update(&self, progress: &WalkProgress) {
        let msg = format!(
            "Dirs: {} | Entries: {} | Errors: {} | Rate: {:.0}/s | Queue: {} | Workers: {}/{}",
            format_number(progress.dirs),
            format_number(progress.entries),
            format_number(progress.errors),
            progress.entries_per_second(),
            progress.queue_len,
            progress.active_workers,
            progress.live_workers,
        );
        self.bar.set_message(msg);
    }

    /// Clear the display
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let raw = n.to_string();
    let mut out = String::with_capacity(raw.len() + raw.len() / 3);
    for (i, c) in raw.chars().enumerate() {
        if i > 0 && (raw.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Format an elapsed duration as `1h 02m 03s` / `2m 03s` / `3.1s`
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs >= 3600 {
        format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", elapsed.as_secs_f64())
    }
}

/// Print the post-walk summary
pub fn print_summary(stats: &crate::walker::WalkStats, elapsed: Duration) {
    let rate = if elapsed.as_secs_f64() > 0.0 {
        stats.entries_emitted() as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };

    eprintln!();
    eprintln!("{}", style("Walk complete").green().bold());
    eprintln!("  Directories: {}", format_number(stats.dirs_processed));
    eprintln!("  Entries:     {}", format_number(stats.entries_emitted()));
    eprintln!("  Errors:      {}", format_number(stats.entries_failed));
    eprintln!("  Elapsed:     {}", format_elapsed(elapsed));
    eprintln!("  Rate:        {:.0} entries/s", rate);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(3)), "3.0s");
        assert_eq!(format_elapsed(Duration::from_secs(63)), "1m 03s");
        assert_eq!(format_elapsed(Duration::from_secs(3723)), "1h 02m 03s");
    }
}
