use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Create a spinner for indeterminate progress, drawn on stderr
///
/// Hidden when stderr is not a terminal.
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Show the directory being scanned with running counts
pub fn update_scan(pb: &ProgressBar, path: &Path, folders: usize, files: usize) {
    pb.set_message(format!(
        "{} folders, {} files | {}",
        folders,
        files,
        path.display()
    ));
}

/// Finish and clear progress bar
pub fn finish_and_clear(pb: &ProgressBar) {
    pb.finish_and_clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_message_updates() {
        let pb = create_spinner("Scanning...");
        update_scan(&pb, Path::new("/data/photos"), 3, 12);
        assert_eq!(pb.message(), "3 folders, 12 files | /data/photos");
        finish_and_clear(&pb);
        assert!(pb.is_finished());
    }
}
