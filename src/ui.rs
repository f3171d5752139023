//! Terminal UI for a CLI run, rendered via `indicatif` progress bars.
//!
//! Two bars are stacked vertically: a file bar tracking how many files have
//! completed, and a spinner showing what the current file is going through.
//! The UI doubles as the [`ProcessObserver`] the CLI threads into the batch
//! runner, so display stays in lockstep with the actual sequence of remote
//! calls without any extra plumbing.

use std::time::Duration;

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::processor::ProcessObserver;

pub struct RunUi {
    multi: MultiProgress,
    file_bar: ProgressBar,
    step_bar: ProgressBar,
}

impl Default for RunUi {
    fn default() -> Self {
        Self::new()
    }
}

impl RunUi {
    pub fn new() -> Self {
        let multi = MultiProgress::new();

        let file_style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");

        let file_bar = multi.add(ProgressBar::new(0));
        file_bar.set_style(file_style);
        file_bar.set_prefix("Files");

        let step_style = ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {msg}")
            .expect("progress bar template is a valid static string");

        let step_bar = multi.add(ProgressBar::new_spinner());
        step_bar.set_style(step_style);
        step_bar.set_prefix(" Step");

        Self {
            multi,
            file_bar,
            step_bar,
        }
    }

    /// Print a line above the bars, falling back to `eprintln!` if the rich
    /// UI is unavailable.
    pub fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.println(msg.as_ref()).is_err() {
            eprintln!("{}", msg.as_ref());
        }
    }

    /// Stop the spinner and clear both bars once the run is over.
    pub fn finish(&self) {
        self.step_bar.finish_and_clear();
        self.file_bar.finish_and_clear();
    }
}

impl ProcessObserver for RunUi {
    fn batch_started(&self, total_files: usize) {
        self.file_bar.set_length(total_files as u64);
        self.step_bar.enable_steady_tick(Duration::from_millis(100));
        self.print_line(format!(
            "Processing {} file(s)",
            style(total_files).cyan()
        ));
    }

    fn analysis_started(&self, path: &str) {
        self.step_bar
            .set_message(format!("Analyzing {}", style(path).yellow()));
    }

    fn file_analyzed(&self, path: &str) {
        self.print_line(format!("  {} analyzed {}", style("✓").green(), path));
    }

    fn refactor_started(&self, path: &str) {
        self.step_bar
            .set_message(format!("Refactoring {}", style(path).yellow()));
    }

    fn file_refactored(&self, path: &str) {
        self.print_line(format!("  {} refactored {}", style("✓").green(), path));
    }

    fn file_finished(&self, _path: &str) {
        self.file_bar.inc(1);
        self.step_bar.set_message(String::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observer_events_do_not_panic_without_a_terminal() {
        let ui = RunUi::new();
        ui.batch_started(3);
        ui.analysis_started("a.py");
        ui.file_analyzed("a.py");
        ui.refactor_started("a.py");
        ui.file_refactored("a.py");
        ui.file_finished("a.py");
        ui.print_line("done");
        ui.finish();
    }
}
