use indicatif::{ProgressBar, ProgressStyle};

/// Returns a progress bar counting output rows.
pub fn bar(prefix: String, n_rows: u64) -> ProgressBar {
    let pb = ProgressBar::new(n_rows);
    pb.set_prefix(prefix);
    pb.set_style(
        ProgressStyle::with_template("{prefix}...\n[{wide_bar:.cyan/blue}] {pos}/{len} rows")
            .expect("incorrect progress bar format string")
            .progress_chars("#>-"),
    );
    pb
}
