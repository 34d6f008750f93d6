use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const UPLOAD_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] \
                               {bytes}/{total_bytes} ({bytes_per_sec}, ETA {eta})";

/// Create a progress bar for tracking bytes during an upload.
///
/// Renders to stderr (not stdout) so piped output stays clean.
/// Returns a hidden bar if quiet mode is active.
pub fn create_upload_progress(total_bytes: u64, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let style = ProgressStyle::with_template(UPLOAD_TEMPLATE)
        .map(|style| style.progress_chars("=>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());

    let pb = ProgressBar::new(total_bytes);
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(style);
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_bar_is_hidden() {
        assert!(create_upload_progress(100, true).is_hidden());
    }

    #[test]
    fn template_parses() {
        assert!(ProgressStyle::with_template(UPLOAD_TEMPLATE).is_ok());
    }

    #[test]
    fn visible_bar_has_length() {
        let pb = create_upload_progress(4096, false);
        assert_eq!(pb.length(), Some(4096));
        pb.finish_and_clear();
    }
}
