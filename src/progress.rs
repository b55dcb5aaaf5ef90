// src/progress.rs

use indicatif::{ProgressBar, ProgressStyle};
use std::borrow::Cow;
use std::io::IsTerminal;

/// Progress bar for one API batch. Hidden when disabled or when stderr is
/// not a terminal, so logs and redirected output stay clean.
pub fn batch_progress(total: u64, label: &str, enabled: bool) -> ProgressBar {
    if !enabled || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::with_template(
        "{spinner:.green} {prefix:>9.bold} [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_prefix(label.to_string());
    pb
}

pub trait ProgressBarExt {
    fn info(&self, msg: impl Into<Cow<'static, str>>);
    fn error(&self, msg: impl Into<Cow<'static, str>>);
}

impl ProgressBarExt for ProgressBar {
    fn info(&self, msg: impl Into<Cow<'static, str>>) {
        let msg: Cow<'static, str> = msg.into();
        log::info!("{}", msg);
        self.set_message(msg);
    }

    fn error(&self, msg: impl Into<Cow<'static, str>>) {
        let msg: Cow<'static, str> = msg.into();
        log::error!("{}", msg);
        self.set_message(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_progress_is_hidden() {
        let pb = batch_progress(10, "PUFFER", false);
        assert!(pb.is_hidden());
        pb.inc(3);
        assert_eq!(pb.position(), 3);
        pb.info("done");
        pb.finish_and_clear();
    }
}
