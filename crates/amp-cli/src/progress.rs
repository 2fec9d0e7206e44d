//! Progress display for long-running operations.
//!
//! On a terminal the reports drive an `indicatif` bar on stderr. Otherwise
//! each report is printed as one `percent: message` line.

use std::io::{self, IsTerminal};

use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str = "{bar:40.cyan/blue} {percent:>3}% {wide_msg}";

pub struct Progress {
    bar: Option<ProgressBar>,
}

impl Progress {
    /// Bar on an interactive stderr, plain lines otherwise.
    #[must_use]
    pub fn new() -> Self {
        Self::with_bar(io::stderr().is_terminal())
    }

    #[must_use]
    pub fn with_bar(enable: bool) -> Self {
        let bar = enable.then(|| {
            let style = ProgressStyle::with_template(TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            ProgressBar::new(0).with_style(style)
        });
        Self { bar }
    }

    /// Record one progress report.
    pub fn report(&mut self, message: &str, current: u64, total: u64) {
        match &self.bar {
            Some(bar) => {
                bar.set_length(total);
                bar.set_position(current);
                bar.set_message(message.to_string());
            }
            None => eprintln!("{}", format_line(message, current, total)),
        }
    }

    pub fn finish(self) {
        if let Some(bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

/// `" 42.0%: message"`; an empty total counts as done.
#[must_use]
pub fn format_line(message: &str, current: u64, total: u64) -> String {
    let percent = if total == 0 {
        100.0
    } else {
        current as f64 * 100.0 / total as f64
    };
    format!("{percent:5.1}%: {message}")
}
