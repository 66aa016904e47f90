//! Terminal feedback for archive work

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Show a spinner with `message` while `work` runs, then clear it.
pub fn while_busy<T>(message: &str, work: impl FnOnce() -> T) -> T {
    let spinner = ProgressBar::new_spinner().with_message(message.to_owned());
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(80));
    let result = work();
    spinner.finish_and_clear();
    result
}

/// Bar counting archive members as they are extracted.
pub fn member_bar(members: usize) -> ProgressBar {
    let bar = ProgressBar::new(members as u64);
    if let Ok(style) =
        ProgressStyle::with_template("{bar:32.cyan/blue} {pos:>5}/{len} members {wide_msg}")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}
