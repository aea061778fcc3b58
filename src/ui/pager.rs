//! Paged display of long content without disturbing the status bar.
//!
//! The pager positions every line absolutely and leaves a conservative
//! margin at the bottom of the screen: content rows per page are
//! `height - 9` (header, footer, and a buffer that keeps the scroll-region
//! protected status bar untouched), and nothing is ever written below row
//! `height - 5`.

use std::io;

use crate::bbs::writer::SessionWriter;
use crate::term::{Key, KeyReader};
use crate::ui::colors::{ansi, ColorScheme};

/// Header rows, footer row, and status-bar buffer reserved on every page.
const PAGE_MARGIN: usize = 9;
/// Content never extends below `height - CONTENT_GUARD`.
const CONTENT_GUARD: u16 = 6;
/// The footer line sits at `height - FOOTER_OFFSET`.
const FOOTER_OFFSET: u16 = 5;

/// Paginates pre-styled display lines across terminal-sized pages.
pub struct Pager<'a> {
    writer: &'a SessionWriter,
    scheme: &'a ColorScheme,
}

impl<'a> Pager<'a> {
    pub fn new(writer: &'a SessionWriter, scheme: &'a ColorScheme) -> Self {
        Pager { writer, scheme }
    }

    /// Content rows available per page at the given terminal height.
    pub fn rows_per_page(height: u16) -> usize {
        (height as usize).saturating_sub(PAGE_MARGIN).max(1)
    }

    /// Total pages needed for `line_count` lines at the given height.
    pub fn page_count(line_count: usize, height: u16) -> usize {
        let per_page = Self::rows_per_page(height);
        line_count.div_ceil(per_page).max(1)
    }

    /// Show `lines` under `title`, waiting for navigation keys. Content that
    /// fits on one screen is a single page awaiting any key.
    pub async fn display(
        &self,
        keys: &mut KeyReader,
        lines: &[String],
        title: &str,
    ) -> io::Result<()> {
        let height = self.writer.control().size().height;
        let per_page = Self::rows_per_page(height);

        if lines.len() <= per_page {
            return self.single_page(keys, lines, title, height).await;
        }

        let total_pages = Self::page_count(lines.len(), height);
        let mut current = 0usize;

        self.writer.write(ansi::HIDE_CURSOR.as_bytes()).await?;
        let result = loop {
            let start = current * per_page;
            let end = (start + per_page).min(lines.len());
            self.render_page(&lines[start..end], title, current + 1, total_pages, height)
                .await?;

            let key = match keys.read_key().await {
                Ok(key) => key,
                Err(e) => break Err(e),
            };
            match key {
                k if k.is_quit() => break Ok(()),
                Key::Char(' ') | Key::Enter | Key::Down => {
                    if current + 1 < total_pages {
                        current += 1;
                    } else {
                        break Ok(());
                    }
                }
                Key::Char('b') | Key::Char('B') | Key::Up => {
                    current = current.saturating_sub(1);
                }
                _ => {}
            }
        };
        self.writer.write(ansi::SHOW_CURSOR.as_bytes()).await?;
        result
    }

    async fn single_page(
        &self,
        keys: &mut KeyReader,
        lines: &[String],
        title: &str,
        height: u16,
    ) -> io::Result<()> {
        let mut out = String::from(ansi::CLEAR_CONTENT);
        let mut row: u16 = 1;

        let title_line = self.scheme.center(&self.scheme.colorize(title, "primary"), 79);
        out.push_str(&ansi::move_to(row, 1));
        out.push_str(&title_line);
        row += 1;

        let separator = self.scheme.colorize(&"─".repeat(79), "secondary");
        out.push_str(&ansi::move_to(row, 1));
        out.push_str(&separator);
        row += 2;

        let max_row = height.saturating_sub(CONTENT_GUARD);
        for line in lines {
            if row > max_row {
                break;
            }
            out.push_str(&ansi::move_to(row, 1));
            out.push_str(line);
            row += 1;
        }

        let footer = self
            .scheme
            .center(&self.scheme.colorize("Press any key to return...", "text"), 79);
        out.push_str(&ansi::move_to(height.saturating_sub(FOOTER_OFFSET), 1));
        out.push_str(&footer);

        self.writer.write(out.as_bytes()).await?;
        keys.read_key().await?;
        Ok(())
    }

    async fn render_page(
        &self,
        lines: &[String],
        title: &str,
        page: usize,
        total_pages: usize,
        height: u16,
    ) -> io::Result<()> {
        let mut out = String::from(ansi::CLEAR_CONTENT);
        let mut row: u16 = 1;

        let title_line = self.scheme.center(&self.scheme.colorize(title, "primary"), 79);
        out.push_str(&ansi::move_to(row, 1));
        out.push_str(&title_line);
        row += 1;

        let indicator = format!("Page {} of {}", page, total_pages);
        let indicator_line = self
            .scheme
            .center(&self.scheme.colorize(&indicator, "secondary"), 79);
        out.push_str(&ansi::move_to(row, 1));
        out.push_str(&indicator_line);
        row += 1;

        let separator = self.scheme.colorize(&"─".repeat(79), "secondary");
        out.push_str(&ansi::move_to(row, 1));
        out.push_str(&separator);
        row += 2;

        let max_row = height.saturating_sub(CONTENT_GUARD);
        for line in lines {
            if row > max_row {
                break;
            }
            out.push_str(&ansi::move_to(row, 1));
            out.push_str(line);
            row += 1;
        }

        let hints = if page < total_pages {
            if page == 1 {
                "Space: Next | Q: Quit"
            } else {
                "Space: Next | B: Back | Q: Quit"
            }
        } else {
            "Space: Return | B: Back"
        };
        let footer = self.scheme.center(&self.scheme.colorize(hints, "text"), 79);
        out.push_str(&ansi::move_to(height.saturating_sub(FOOTER_OFFSET), 1));
        out.push_str(&footer);

        self.writer.write(out.as_bytes()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_matches_ceiling_division() {
        // height 24 -> 15 rows per page
        assert_eq!(Pager::rows_per_page(24), 15);
        assert_eq!(Pager::page_count(0, 24), 1);
        assert_eq!(Pager::page_count(15, 24), 1);
        assert_eq!(Pager::page_count(16, 24), 2);
        assert_eq!(Pager::page_count(53, 24), 4);
    }

    #[test]
    fn page_count_never_zero_even_for_tiny_terminals() {
        assert_eq!(Pager::page_count(10, 9), 10);
        assert_eq!(Pager::page_count(0, 1), 1);
    }

    #[test]
    fn rows_per_page_scales_with_height() {
        for height in 14u16..60 {
            assert_eq!(Pager::rows_per_page(height), height as usize - 9);
        }
    }
}
