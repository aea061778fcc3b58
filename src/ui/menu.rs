//! Menu rendering on the classic 79-column canvas.
//!
//! The renderer consumes a [`MenuView`] - a plain value holding the title,
//! the already-filtered rows, and the instruction pairs for the footer - so
//! it needs no knowledge of sessions, modules, or configuration. Config
//! menus are turned into views with [`MenuView::from_config`], which applies
//! access-level filtering and hotkey accenting; modules build their views
//! from their loaded options.

use std::io;

use crate::bbs::writer::SessionWriter;
use crate::config::MenuItem;
use crate::ui::colors::{ansi, ColorScheme};

/// Classic BBS canvas width.
const CANVAS_WIDTH: usize = 79;
/// Selection bars never grow wider than this.
const MAX_BAR_WIDTH: usize = 60;

/// One selectable row.
#[derive(Debug, Clone)]
pub struct MenuRow {
    pub id: String,
    /// Display text; may carry accent escapes marking the hotkey letter.
    pub description: String,
}

/// Everything the renderer needs to draw one menu.
#[derive(Debug, Clone)]
pub struct MenuView {
    pub title: String,
    pub rows: Vec<MenuRow>,
    /// Footer guidance as (label, key) pairs, e.g. ("Navigate", "↑↓").
    pub instructions: Vec<(String, String)>,
}

impl MenuView {
    /// Build a view from a config menu: rows the user's access level permits,
    /// with each row's hotkey letter re-colored in the accent color.
    pub fn from_config(
        menu: &MenuItem,
        user_access_level: u8,
        scheme: &ColorScheme,
        instructions: Vec<(String, String)>,
    ) -> MenuView {
        let rows = menu
            .submenu
            .iter()
            .filter(|item| item.access_level <= user_access_level)
            .map(|item| MenuRow {
                id: item.id.clone(),
                description: highlight_hotkey(
                    scheme,
                    &item.description,
                    item.hotkey.as_deref().unwrap_or(""),
                ),
            })
            .collect();
        MenuView {
            title: menu.title.clone(),
            rows,
            instructions,
        }
    }
}

/// Re-color the first occurrence of the hotkey letter (case-insensitive)
/// inside `description` with the accent color.
pub fn highlight_hotkey(scheme: &ColorScheme, description: &str, hotkey: &str) -> String {
    let Some(hot) = hotkey.chars().next() else {
        return description.to_string();
    };
    for (i, c) in description.char_indices() {
        if c.eq_ignore_ascii_case(&hot) {
            let before = &description[..i];
            let after = &description[i + c.len_utf8()..];
            return format!(
                "{}{}{}",
                before,
                scheme.colorize(&c.to_string(), "accent"),
                after
            );
        }
    }
    description.to_string()
}

/// Draws a [`MenuView`] with one row highlighted.
pub struct MenuRenderer {
    scheme: ColorScheme,
    width: usize,
}

impl MenuRenderer {
    pub fn new(scheme: ColorScheme) -> Self {
        MenuRenderer {
            scheme,
            width: CANVAS_WIDTH,
        }
    }

    /// Widest visible row plus padding, clamped to the bar maximum.
    fn max_item_width(&self, rows: &[MenuRow]) -> usize {
        let widest = rows
            .iter()
            .map(|row| ColorScheme::visible_len(&row.description))
            .max()
            .unwrap_or(0);
        (widest + 4).min(MAX_BAR_WIDTH)
    }

    /// Render the full menu: cleared content area, centered title, bordered
    /// rows with the selection bar, and the centered instruction footer.
    pub async fn render(
        &self,
        writer: &SessionWriter,
        view: &MenuView,
        selected_index: usize,
    ) -> io::Result<()> {
        let mut out = String::new();
        out.push_str(ansi::CLEAR_CONTENT);
        out.push_str(ansi::HIDE_CURSOR);

        let title = self.scheme.colorize(&view.title, "primary");
        out.push_str(&self.scheme.center(&title, self.width));
        out.push_str("\r\n\r\n");

        let max_width = self.max_item_width(&view.rows);
        let center_offset = self.width.saturating_sub(max_width) / 2;
        let border = self.scheme.border_pattern(max_width + 8, "-=");
        let border_pad = " ".repeat(self.width.saturating_sub(max_width + 8) / 2);
        let row_pad = " ".repeat(center_offset);

        out.push_str(&border_pad);
        out.push_str(&border);
        out.push_str("\r\n");

        let selected = if selected_index >= view.rows.len() {
            0
        } else {
            selected_index
        };

        for (i, row) in view.rows.iter().enumerate() {
            let line = self
                .scheme
                .highlight_selection(&row.description, i == selected, max_width);
            out.push_str(&row_pad);
            out.push_str(&line);
            out.push_str("\r\n");
        }

        out.push_str(&border_pad);
        out.push_str(&border);
        out.push_str("\r\n");

        out.push_str("\r\n");
        out.push_str(&self.instruction_line(&view.instructions));

        writer.write(out.as_bytes()).await
    }

    /// Center the instruction pairs against their plain width, then color
    /// labels in the text color and keys in the accent color.
    fn instruction_line(&self, instructions: &[(String, String)]) -> String {
        let plain = instructions
            .iter()
            .map(|(label, key)| format!("{}: {}", label, key))
            .collect::<Vec<_>>()
            .join("  ");
        let padding = self
            .width
            .saturating_sub(plain.chars().count())
            / 2;

        let mut line = " ".repeat(padding);
        for (i, (label, key)) in instructions.iter().enumerate() {
            if i > 0 {
                line.push_str("  ");
            }
            line.push_str(&self.scheme.colorize(&format!("{}: ", label), "text"));
            line.push_str(&self.scheme.colorize(key, "accent"));
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn scheme() -> ColorScheme {
        ColorScheme::new(Config::default().bbs.colors)
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(l, k)| (l.to_string(), k.to_string()))
            .collect()
    }

    #[test]
    fn from_config_filters_by_access_level() {
        let config = Config::default();
        let cs = scheme();
        let main = config.find_menu("main").unwrap();

        let low = MenuView::from_config(main, 10, &cs, pairs(&[]));
        assert!(low.rows.iter().all(|r| r.id != "sysop_menu"));

        let high = MenuView::from_config(main, 255, &cs, pairs(&[]));
        assert!(high.rows.iter().any(|r| r.id == "sysop_menu"));
        assert_eq!(high.rows.len(), low.rows.len() + 1);
    }

    #[test]
    fn hotkey_letter_gets_accented() {
        let cs = scheme();
        let marked = highlight_hotkey(&cs, "Bulletins", "b");
        assert_ne!(marked, "Bulletins");
        assert_eq!(ColorScheme::strip_ansi(&marked), "Bulletins");
        assert!(marked.contains(cs.color("accent")));
    }

    #[test]
    fn missing_hotkey_leaves_description_alone() {
        let cs = scheme();
        assert_eq!(highlight_hotkey(&cs, "Bulletins", ""), "Bulletins");
        assert_eq!(highlight_hotkey(&cs, "Bulletins", "z"), "Bulletins");
    }

    #[test]
    fn max_item_width_is_clamped() {
        let cs = scheme();
        let renderer = MenuRenderer::new(cs);
        let long = MenuRow {
            id: "x".into(),
            description: "y".repeat(100),
        };
        assert_eq!(renderer.max_item_width(&[long]), MAX_BAR_WIDTH);

        let short = MenuRow {
            id: "x".into(),
            description: "Bulletins".into(),
        };
        assert_eq!(renderer.max_item_width(&[short]), "Bulletins".len() + 4);
    }

    #[test]
    fn instruction_line_centers_by_plain_width() {
        let cs = scheme();
        let renderer = MenuRenderer::new(cs);
        let line =
            renderer.instruction_line(&pairs(&[("Navigate", "↑↓"), ("Select", "Enter")]));
        let plain = "Navigate: ↑↓  Select: Enter";
        let expected_pad = (CANVAS_WIDTH - plain.chars().count()) / 2;
        assert!(line.starts_with(&" ".repeat(expected_pad)));
        assert_eq!(ColorScheme::strip_ansi(&line).trim_start(), plain);
    }
}
