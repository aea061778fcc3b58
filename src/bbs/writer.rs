//! The per-session output path.
//!
//! Every byte a session emits - menu renders, pager pages, the status-bar
//! ticker - goes through one [`SessionWriter`]. A tokio mutex serializes the
//! main task and the ticker, so concurrent writers can never interleave
//! escape sequences.
//!
//! The writer also watches its own output for screen clears. While a status
//! bar is installed, any write containing a full-screen or content-area
//! clear schedules a bar repaint: immediate if the last repaint is older
//! than the debounce window, otherwise coalesced into a single delayed
//! repaint.

use std::io;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::term::{TermControl, TermSink};
use crate::ui::colors::ansi;
use crate::ui::statusbar::StatusBar;

/// Minimum interval between status-bar repaints triggered by screen clears.
const REPAINT_DEBOUNCE: Duration = Duration::from_millis(100);

struct RepaintState {
    last: Option<Instant>,
    pending: bool,
}

/// Cloneable, internally synchronized writer for one session.
#[derive(Clone)]
pub struct SessionWriter {
    sink: Arc<Mutex<TermSink>>,
    control: TermControl,
    bar: Arc<StdMutex<Option<Arc<StatusBar>>>>,
    repaint: Arc<StdMutex<RepaintState>>,
}

fn contains_clear(data: &[u8]) -> bool {
    const FULL: &[u8] = b"\x1b[2J";
    const CONTENT: &[u8] = b"\x1b[H\x1b[0J";
    let has = |needle: &[u8]| data.windows(needle.len()).any(|w| w == needle);
    has(FULL) || has(CONTENT)
}

impl SessionWriter {
    pub fn new(sink: TermSink, control: TermControl) -> Self {
        SessionWriter {
            sink: Arc::new(Mutex::new(sink)),
            control,
            bar: Arc::new(StdMutex::new(None)),
            repaint: Arc::new(StdMutex::new(RepaintState {
                last: None,
                pending: false,
            })),
        }
    }

    pub fn control(&self) -> &TermControl {
        &self.control
    }

    /// Install or remove the status bar the writer repaints after clears.
    pub fn set_status_bar(&self, bar: Option<Arc<StatusBar>>) {
        *self.bar.lock().expect("status bar lock") = bar;
    }

    /// Write all bytes, then schedule a status-bar repaint if the data
    /// cleared the screen while a bar is installed.
    pub async fn write(&self, data: &[u8]) -> io::Result<()> {
        {
            let mut sink = self.sink.lock().await;
            sink.write_all(data).await?;
            sink.flush().await?;
        }
        let bar_installed = self.bar.lock().expect("status bar lock").is_some();
        if bar_installed && contains_clear(data) {
            self.schedule_repaint().await?;
        }
        Ok(())
    }

    pub async fn write_str(&self, data: &str) -> io::Result<()> {
        self.write(data.as_bytes()).await
    }

    async fn schedule_repaint(&self) -> io::Result<()> {
        enum Action {
            Now,
            Delayed,
            Skip,
        }
        let action = {
            let mut state = self.repaint.lock().expect("repaint lock");
            let now = Instant::now();
            match state.last {
                Some(last) if now.duration_since(last) < REPAINT_DEBOUNCE => {
                    if state.pending {
                        Action::Skip
                    } else {
                        state.pending = true;
                        Action::Delayed
                    }
                }
                _ => {
                    state.last = Some(now);
                    Action::Now
                }
            }
        };
        match action {
            Action::Now => self.repaint_status_bar().await,
            Action::Delayed => {
                let writer = self.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(REPAINT_DEBOUNCE).await;
                    {
                        let mut state = writer.repaint.lock().expect("repaint lock");
                        state.pending = false;
                        state.last = Some(Instant::now());
                    }
                    let _ = writer.repaint_status_bar().await;
                });
                Ok(())
            }
            Action::Skip => Ok(()),
        }
    }

    /// Repaint the status bar in place: save cursor, paint the last row,
    /// restore cursor. Written directly so it cannot re-trigger itself.
    pub async fn repaint_status_bar(&self) -> io::Result<()> {
        let bar = match self.bar.lock().expect("status bar lock").clone() {
            Some(bar) => bar,
            None => return Ok(()),
        };
        let height = self.control.size().height;
        let seq = format!(
            "{}{}{}{}{}",
            ansi::SAVE_CURSOR,
            ansi::move_to(height, 1),
            ansi::CLEAR_LINE,
            bar.render_line(),
            ansi::RESTORE_CURSOR,
        );
        let mut sink = self.sink.lock().await;
        sink.write_all(seq.as_bytes()).await?;
        sink.flush().await
    }

    /// Shut down the underlying stream; subsequent writes fail.
    pub async fn shutdown(&self) {
        let mut sink = self.sink.lock().await;
        let _ = sink.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_detection_matches_both_forms() {
        assert!(contains_clear(b"before \x1b[2J\x1b[H after"));
        assert!(contains_clear(b"\x1b[H\x1b[0J"));
        assert!(!contains_clear(b"\x1b[31mjust color\x1b[0m"));
        assert!(!contains_clear(b"\x1b[2K"));
    }
}
