//! The fixed status bar: one blue row pinned to the bottom of the screen
//! showing the caller's name on the left, the system name centered, and the
//! elapsed call time on the right.
//!
//! Install protocol: set a DECSTBM scroll region over rows `1..height-1` so
//! content scrolling can never touch the bar, paint the bar on the last row,
//! and home the cursor. A background ticker then repaints only the nine
//! rightmost columns (the HH:MM:SS counter) once per second, so the bar
//! neither flickers nor disturbs the content area. Full repaints after
//! screen clears are the session writer's job.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::bbs::writer::SessionWriter;
use crate::config::Config;
use crate::ui::colors::ansi;

// The bar's colors are fixed, not part of the configurable palette.
const BLUE_BG: &str = "\x1b[44m";
const WHITE: &str = "\x1b[37m";
const BRIGHT_GREEN: &str = "\x1b[92m";
const BRIGHT_YELLOW: &str = "\x1b[93m";

/// Width of the elapsed-time segment: "HH:MM:SS " (trailing space included).
const TIMER_COLS: u16 = 9;

/// How many consecutive ticker write failures before the ticker gives up.
const TICKER_FAILURE_LIMIT: u32 = 3;

/// Immutable bar data; elapsed time is derived from the start instant at
/// render time.
pub struct StatusBar {
    username: String,
    system_name: String,
    width: usize,
    started: Instant,
}

fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total / 60) % 60,
        total % 60
    )
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max <= 3 {
        return s.chars().take(max).collect();
    }
    let cut: String = s.chars().take(max - 3).collect();
    format!("{}...", cut)
}

impl StatusBar {
    pub fn new(username: &str, config: &Config) -> Self {
        StatusBar {
            username: username.to_string(),
            system_name: config.bbs.system_name.clone(),
            width: config.bbs.max_line_length,
            started: Instant::now(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// The full bar content: cleared line, blue background, username left,
    /// system name centered, elapsed time right.
    pub fn render_line(&self) -> String {
        let left = format!(" {}", self.username);
        let right = format!("{} ", format_elapsed(self.started.elapsed()));
        let mut center = self.system_name.clone();

        let mut used = left.chars().count() + right.chars().count() + center.chars().count();
        if used >= self.width {
            let room = self
                .width
                .saturating_sub(left.chars().count() + right.chars().count() + 2);
            center = truncate(&center, room);
            used = left.chars().count() + right.chars().count() + center.chars().count();
        }
        let total_pad = self.width.saturating_sub(used);
        let left_pad = total_pad / 2;
        let right_pad = total_pad - left_pad;

        format!(
            "{}{}{}{}{}{}{}{}{}{}{}",
            ansi::CLEAR_LINE,
            BLUE_BG,
            WHITE,
            left,
            " ".repeat(left_pad),
            BRIGHT_GREEN,
            center,
            " ".repeat(right_pad),
            BRIGHT_YELLOW,
            right,
            ansi::RESET,
        )
    }

    /// The full install sequence: scroll region, bar paint, cursor home.
    pub fn install_seq(&self, height: u16) -> String {
        format!(
            "{}{}{}{}",
            ansi::scroll_region(1, height.saturating_sub(1)),
            ansi::move_to(height, 1),
            self.render_line(),
            ansi::move_to(1, 1),
        )
    }

    /// A timer-only update touching just the nine rightmost bar columns,
    /// bracketed by cursor save/restore.
    pub fn timer_update(&self, height: u16) -> String {
        let col = (self.width as u16).saturating_sub(TIMER_COLS).max(1);
        format!(
            "{}{}{}{}{}{}{}{} {}{}",
            ansi::SAVE_CURSOR,
            ansi::move_to(height, col),
            BLUE_BG,
            " ".repeat(TIMER_COLS as usize),
            ansi::move_to(height, col),
            BLUE_BG,
            BRIGHT_YELLOW,
            format_elapsed(self.started.elapsed()),
            ansi::RESET,
            ansi::RESTORE_CURSOR,
        )
    }

    /// The uninstall sequence: scroll region back to the full screen, last
    /// row cleared.
    pub fn uninstall_seq(height: u16) -> String {
        format!(
            "{}{}{}",
            ansi::scroll_region(1, height),
            ansi::move_to(height, 1),
            ansi::CLEAR_LINE,
        )
    }
}

/// Owns the installed bar and its once-per-second ticker task.
pub struct StatusBarManager {
    bar: Arc<StatusBar>,
    writer: SessionWriter,
    stop_tx: Option<mpsc::Sender<()>>,
    ticker: Option<JoinHandle<()>>,
}

impl StatusBarManager {
    pub fn new(bar: StatusBar, writer: SessionWriter) -> Self {
        StatusBarManager {
            bar: Arc::new(bar),
            writer,
            stop_tx: None,
            ticker: None,
        }
    }

    /// Install the bar and start the timer ticker.
    pub async fn install(&mut self) -> std::io::Result<()> {
        let height = self.writer.control().size().height;
        self.writer
            .write(self.bar.install_seq(height).as_bytes())
            .await?;
        self.writer.set_status_bar(Some(self.bar.clone()));

        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);
        let bar = self.bar.clone();
        let writer = self.writer.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut failures = 0u32;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let height = writer.control().size().height;
                        match writer.write(bar.timer_update(height).as_bytes()).await {
                            Ok(()) => failures = 0,
                            Err(e) => {
                                failures += 1;
                                if failures >= TICKER_FAILURE_LIMIT {
                                    debug!("Status ticker stopping after repeated write failures: {}", e);
                                    return;
                                }
                            }
                        }
                    }
                    _ = stop_rx.recv() => return,
                }
            }
        });
        self.stop_tx = Some(stop_tx);
        self.ticker = Some(handle);
        Ok(())
    }

    /// Stop the ticker, restore the scroll region, and clear the bar row.
    pub async fn uninstall(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(()).await;
        }
        if let Some(handle) = self.ticker.take() {
            let _ = handle.await;
        }
        self.writer.set_status_bar(None);
        let height = self.writer.control().size().height;
        let _ = self
            .writer
            .write(StatusBar::uninstall_seq(height).as_bytes())
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::colors::ColorScheme;

    fn bar() -> StatusBar {
        StatusBar::new("sysop", &Config::default())
    }

    #[test]
    fn elapsed_formats_as_hh_mm_ss() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_elapsed(Duration::from_secs(59)), "00:00:59");
        assert_eq!(format_elapsed(Duration::from_secs(61)), "00:01:01");
        assert_eq!(format_elapsed(Duration::from_secs(3661)), "01:01:01");
        assert_eq!(format_elapsed(Duration::from_secs(36_000)), "10:00:00");
    }

    #[test]
    fn bar_line_spans_configured_width() {
        let line = bar().render_line();
        assert_eq!(ColorScheme::visible_len(&line), 79);
        let plain = ColorScheme::strip_ansi(&line);
        assert!(plain.starts_with(" sysop"));
        assert!(plain.contains("Driftline BBS"));
        assert!(plain.trim_end().ends_with("00:00:00"));
    }

    #[test]
    fn long_system_name_is_truncated() {
        let mut config = Config::default();
        config.bbs.system_name = "X".repeat(200);
        let bar = StatusBar::new("caller", &config);
        assert_eq!(ColorScheme::visible_len(&bar.render_line()), 79);
    }

    #[test]
    fn install_sets_scroll_region_and_homes_cursor() {
        let seq = bar().install_seq(24);
        assert!(seq.starts_with("\x1b[1;23r"));
        assert!(seq.contains("\x1b[24;1H"));
        assert!(seq.ends_with("\x1b[1;1H"));
    }

    #[test]
    fn uninstall_resets_region_and_clears_last_row() {
        let seq = StatusBar::uninstall_seq(24);
        assert!(seq.starts_with("\x1b[1;24r"));
        assert!(seq.contains("\x1b[24;1H"));
        assert!(seq.ends_with(ansi::CLEAR_LINE));
    }

    #[test]
    fn timer_update_touches_only_the_right_columns() {
        let seq = bar().timer_update(24);
        assert!(seq.starts_with(ansi::SAVE_CURSOR));
        assert!(seq.ends_with(ansi::RESTORE_CURSOR));
        // Positioned at column width - 9 on the bar row.
        assert!(seq.contains("\x1b[24;70H"));
        assert!(!seq.contains("\x1b[2K"));
    }
}
