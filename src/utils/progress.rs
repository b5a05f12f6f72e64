use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

const ONLY_MESSAGE_TEMPLATE: &str = "{spinner} {wide_msg}";
const COUNT_TEMPLATE: &str = "{spinner} {msg:20} {wide_bar} {pos:>6}/{len}";

pub struct ProgressStyleTemplate;

impl ProgressStyleTemplate {
    pub fn only_message() -> ProgressStyle {
        ProgressStyle::with_template(ONLY_MESSAGE_TEMPLATE).unwrap()
    }

    pub fn count_bar() -> ProgressStyle {
        ProgressStyle::with_template(COUNT_TEMPLATE)
            .unwrap()
            .progress_chars("#>-")
    }
}

pub trait MultiProgressNew {
    fn add_with_style(&self, pb: ProgressBar, style: ProgressStyle) -> ProgressBar;
}

impl MultiProgressNew for MultiProgress {
    fn add_with_style(&self, pb: ProgressBar, style: ProgressStyle) -> ProgressBar {
        let pb = self.add(pb);
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}
