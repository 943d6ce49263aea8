/// Progress reporting for the archive scan.
///
/// The normalizer reports each scanned chat to a [`ScanObserver`]. The
/// terminal implementation draws a progress bar on a TTY and falls back to
/// `tracing` lines otherwise.
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;

/// Maximum width for chat names in the progress bar message.
const CHAT_NAME_WIDTH: usize = 38;

/// Receives scan progress: chat `index` (1-based) of `total`.
pub trait ScanObserver {
    fn chat_scanned(&mut self, index: usize, total: usize, name: &str);

    fn finish(&mut self) {}
}

/// Observer that ignores everything.
pub struct NoProgress;

impl ScanObserver for NoProgress {
    fn chat_scanned(&mut self, _index: usize, _total: usize, _name: &str) {}
}

/// Truncates a string to a maximum width with a middle ellipsis if needed,
/// padding shorter strings so messages stay aligned.
fn truncate_middle(s: &str, max_width: usize) -> String {
    // Count characters, not bytes: chat names are often non-ASCII
    let char_count = s.chars().count();
    if char_count <= max_width {
        return format!("{:<width$}", s, width = max_width);
    }

    if max_width <= 1 {
        return s.chars().take(max_width).collect();
    }

    let available = max_width - 1;
    let start_len = available.div_ceil(2);
    let end_len = available / 2;
    let start: String = s.chars().take(start_len).collect();
    let end: String = s.chars().skip(char_count - end_len).collect();
    format!("{}…{}", start, end)
}

/// Progress bar over the chats of an archive.
pub struct ScanProgress {
    bar: Option<ProgressBar>,
}

impl ScanProgress {
    /// Creates a bar for `total_chats` when stderr is a terminal.
    pub fn new(total_chats: usize) -> Self {
        if !std::io::stderr().is_terminal() {
            return ScanProgress { bar: None };
        }

        let bar = ProgressBar::new(total_chats as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("[{bar:40.cyan/blue}] {pos}/{len} chats {msg}")
        {
            bar.set_style(style.progress_chars("█▓░"));
        }
        ScanProgress { bar: Some(bar) }
    }
}

impl ScanObserver for ScanProgress {
    fn chat_scanned(&mut self, index: usize, total: usize, name: &str) {
        match self.bar {
            Some(ref bar) => {
                bar.set_position(index as u64);
                bar.set_message(truncate_middle(name, CHAT_NAME_WIDTH));
            }
            None => tracing::info!("Scanned chat {}/{}: {}", index, total, name),
        }
    }

    fn finish(&mut self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}
