//! Semantic color scheme and ANSI layout helpers.
//!
//! The scheme maps the nine semantic palette names (`primary`, `secondary`,
//! `accent`, `text`, `background`, `border`, `success`, `error`, `highlight`)
//! from the configuration to concrete SGR sequences, and carries the layout
//! helpers the rest of the UI leans on: centering against visible width,
//! separators, border patterns, the selection bar, and the welcome banner.
//!
//! All escape tables are immutable and owned here; nothing else in the crate
//! hardcodes color codes.

use crate::config::ColorConfig;

/// Screen-control escape sequences shared by the whole UI.
pub mod ansi {
    pub const RESET: &str = "\x1b[0m";
    /// Full-screen clear; triggers a status-bar repaint when one is installed.
    pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";
    /// Home the cursor and clear to end of screen; safe inside a scroll region.
    pub const CLEAR_CONTENT: &str = "\x1b[H\x1b[0J";
    pub const CLEAR_LINE: &str = "\x1b[2K";
    pub const HIDE_CURSOR: &str = "\x1b[?25l";
    pub const SHOW_CURSOR: &str = "\x1b[?25h";
    pub const SAVE_CURSOR: &str = "\x1b[s";
    pub const RESTORE_CURSOR: &str = "\x1b[u";

    pub fn move_to(row: u16, col: u16) -> String {
        format!("\x1b[{};{}H", row, col)
    }

    /// DECSTBM scroll region covering rows `top..=bottom`.
    pub fn scroll_region(top: u16, bottom: u16) -> String {
        format!("\x1b[{};{}r", top, bottom)
    }
}

fn fg_code(name: &str) -> &'static str {
    match name {
        "black" => "\x1b[30m",
        "red" => "\x1b[31m",
        "green" => "\x1b[32m",
        "yellow" => "\x1b[33m",
        "blue" => "\x1b[34m",
        "magenta" => "\x1b[35m",
        "cyan" => "\x1b[36m",
        "white" => "\x1b[37m",
        "bright_black" => "\x1b[90m",
        "bright_red" => "\x1b[91m",
        "bright_green" => "\x1b[92m",
        "bright_yellow" => "\x1b[93m",
        "bright_blue" => "\x1b[94m",
        "bright_magenta" => "\x1b[95m",
        "bright_cyan" => "\x1b[96m",
        "bright_white" => "\x1b[97m",
        "bold" => "\x1b[1m",
        "underline" => "\x1b[4m",
        "reverse" => "\x1b[7m",
        _ => "",
    }
}

fn bg_code(name: &str) -> &'static str {
    // Backgrounds only exist for the base palette; bright variants fall back
    // to their base color.
    match name.strip_prefix("bright_").unwrap_or(name) {
        "black" => "\x1b[40m",
        "red" => "\x1b[41m",
        "green" => "\x1b[42m",
        "yellow" => "\x1b[43m",
        "blue" => "\x1b[44m",
        "magenta" => "\x1b[45m",
        "cyan" => "\x1b[46m",
        "white" => "\x1b[47m",
        _ => "",
    }
}

/// Deterministic mapping from semantic names to SGR sequences, plus layout
/// helpers. Cheap to clone; every session owns one.
#[derive(Clone)]
pub struct ColorScheme {
    palette: ColorConfig,
}

impl ColorScheme {
    pub fn new(palette: ColorConfig) -> Self {
        ColorScheme { palette }
    }

    /// Resolve a semantic name to the configured concrete color name.
    /// Unrecognized names resolve to themselves so literal color names work.
    fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        match name {
            "primary" => &self.palette.primary,
            "secondary" => &self.palette.secondary,
            "accent" => &self.palette.accent,
            "text" => &self.palette.text,
            "background" => &self.palette.background,
            "border" => &self.palette.border,
            "success" => &self.palette.success,
            "error" => &self.palette.error,
            "highlight" => &self.palette.highlight,
            other => other,
        }
    }

    /// Foreground SGR for a semantic or literal color name ("" if unknown).
    pub fn color(&self, name: &str) -> &'static str {
        fg_code(self.resolve(name))
    }

    /// Background SGR for a semantic or literal color name ("" if unknown).
    pub fn bg_color(&self, name: &str) -> &'static str {
        bg_code(self.resolve(name))
    }

    /// Wrap `text` in the named color. Unknown names pass text through.
    pub fn colorize(&self, text: &str, name: &str) -> String {
        let code = self.color(name);
        if code.is_empty() {
            text.to_string()
        } else {
            format!("{}{}{}", code, text, ansi::RESET)
        }
    }

    pub fn colorize_with_bg(&self, text: &str, fg: &str, bg: &str) -> String {
        format!(
            "{}{}{}{}",
            self.color(fg),
            self.bg_color(bg),
            text,
            ansi::RESET
        )
    }

    /// Remove every ANSI escape sequence for width calculations. Handles
    /// concatenated escapes; an unterminated sequence truncates at end of
    /// input instead of panicking.
    pub fn strip_ansi(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '\x1b' {
                out.push(c);
                continue;
            }
            match chars.peek() {
                Some('[') => {
                    chars.next();
                    // CSI: parameter bytes run to the final byte 0x40..=0x7e.
                    for c in chars.by_ref() {
                        if ('\x40'..='\x7e').contains(&c) {
                            break;
                        }
                    }
                }
                // Two-character escape (ESC c, ESC 7, ...); drop both.
                Some(_) => {
                    chars.next();
                }
                None => {}
            }
        }
        out
    }

    /// Character count after stripping escapes.
    pub fn visible_len(text: &str) -> usize {
        Self::strip_ansi(text).chars().count()
    }

    /// Center `text` within `width` columns, padding with leading spaces.
    /// Text at least as wide as `width` is returned unchanged.
    pub fn center(&self, text: &str, width: usize) -> String {
        let visible = Self::visible_len(text);
        if visible >= width {
            return text.to_string();
        }
        let padding = (width - visible) / 2;
        format!("{}{}", " ".repeat(padding), text)
    }

    /// A horizontal run of `ch`, in the border color.
    pub fn draw_separator(&self, width: usize, ch: char) -> String {
        self.colorize(&ch.to_string().repeat(width), "border")
    }

    /// A decorative run built by repeating `pattern` out to `width` columns.
    pub fn border_pattern(&self, width: usize, pattern: &str) -> String {
        if pattern.is_empty() {
            return self.draw_separator(width, '=');
        }
        let repeated: String = pattern.chars().cycle().take(width).collect();
        self.colorize(&repeated, "border")
    }

    /// Render one menu row as a selection bar of exactly `max_width` visible
    /// columns: a leading space, the row text, padding, and a trailing space.
    /// A selected row takes the highlight foreground on the primary-color
    /// background for the whole run; embedded escapes (hotkey accents) keep
    /// their color while the bar continues behind them.
    pub fn highlight_selection(&self, text: &str, selected: bool, max_width: usize) -> String {
        let visible = Self::visible_len(text);
        let pad = max_width.saturating_sub(visible + 2);
        let (fg, bg) = if selected {
            (self.color("highlight"), self.bg_color("primary"))
        } else {
            (self.color("text"), "")
        };
        // Re-arm the bar style after any reset embedded in the row text.
        let resume = format!("{}{}{}", ansi::RESET, bg, fg);
        let body = text.replace(ansi::RESET, &resume);
        format!(
            "{}{} {}{} {}",
            bg,
            fg,
            body,
            " ".repeat(pad),
            ansi::RESET
        )
    }

    /// The pre-login banner: a bordered box around the system name, followed
    /// by the configured welcome message.
    pub fn welcome_banner(&self, system_name: &str, welcome: &str) -> String {
        let width = 78usize;
        let mut banner = String::from(ansi::CLEAR_SCREEN);

        let horizontal = "═".repeat(width - 2);
        banner.push_str(&self.colorize(&format!("╔{}╗", horizontal), "border"));
        banner.push_str("\r\n");

        let name_len = system_name.chars().count().min(width - 2);
        let left = (width - 2 - name_len) / 2;
        let right = width - 2 - name_len - left;
        banner.push_str(&self.colorize("║", "border"));
        banner.push_str(&self.colorize(
            &format!(
                "{}{}{}",
                " ".repeat(left),
                system_name,
                " ".repeat(right)
            ),
            "primary",
        ));
        banner.push_str(&self.colorize("║", "border"));
        banner.push_str("\r\n");

        banner.push_str(&self.colorize(&format!("╚{}╝", horizontal), "border"));
        banner.push_str("\r\n\r\n");

        for line in welcome.lines() {
            banner.push_str(&self.colorize(line, "text"));
            banner.push_str("\r\n");
        }
        banner.push_str("\r\n");
        banner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheme() -> ColorScheme {
        ColorScheme::new(crate::config::Config::default().bbs.colors)
    }

    #[test]
    fn colorize_strip_round_trip() {
        let cs = scheme();
        for name in [
            "primary",
            "secondary",
            "accent",
            "text",
            "background",
            "border",
            "success",
            "error",
            "highlight",
        ] {
            let colored = cs.colorize("hello world", name);
            assert_eq!(ColorScheme::strip_ansi(&colored), "hello world");
        }
    }

    #[test]
    fn unknown_color_passes_through() {
        let cs = scheme();
        assert_eq!(cs.colorize("plain", "no_such_color"), "plain");
    }

    #[test]
    fn strip_handles_concatenated_and_unterminated_escapes() {
        assert_eq!(ColorScheme::strip_ansi("\x1b[31m\x1b[44mhi\x1b[0m"), "hi");
        assert_eq!(ColorScheme::strip_ansi("cut \x1b[3"), "cut ");
        assert_eq!(ColorScheme::strip_ansi("end \x1b"), "end ");
    }

    #[test]
    fn center_pads_by_half_the_slack() {
        let cs = scheme();
        let centered = cs.center("abcd", 10);
        assert_eq!(centered, "   abcd");
        assert_eq!(ColorScheme::visible_len(&centered), 4 + 3);
    }

    #[test]
    fn center_counts_visible_width_only() {
        let cs = scheme();
        let colored = cs.colorize("abcd", "primary");
        let centered = cs.center(&colored, 10);
        assert!(centered.starts_with("   \x1b["));
        assert_eq!(ColorScheme::strip_ansi(&centered), "   abcd");
    }

    #[test]
    fn center_leaves_wide_text_alone() {
        let cs = scheme();
        assert_eq!(cs.center("wide enough", 5), "wide enough");
    }

    #[test]
    fn border_pattern_fills_width() {
        let cs = scheme();
        let pattern = cs.border_pattern(7, "-=");
        assert_eq!(ColorScheme::strip_ansi(&pattern), "-=-=-=-");
    }

    #[test]
    fn selection_bar_has_exact_visible_width() {
        let cs = scheme();
        for selected in [true, false] {
            let bar = cs.highlight_selection("Bulletins", selected, 30);
            assert_eq!(ColorScheme::visible_len(&bar), 30);
        }
    }

    #[test]
    fn selection_bar_keeps_accent_and_bar_style() {
        let cs = scheme();
        let row = format!("{}ulletins", cs.colorize("B", "accent"));
        let bar = cs.highlight_selection(&row, true, 20);
        assert_eq!(ColorScheme::visible_len(&bar), 20);
        // The accent escape survives, and the bar background resumes after
        // the embedded reset.
        assert!(bar.contains(fg_code("yellow")));
        let resume = format!("{}{}", ansi::RESET, cs.bg_color("primary"));
        assert!(bar.contains(&resume));
    }

    #[test]
    fn banner_contains_system_name_and_welcome() {
        let cs = scheme();
        let banner = cs.welcome_banner("Test BBS", "line one\nline two");
        let plain = ColorScheme::strip_ansi(&banner);
        assert!(plain.contains("Test BBS"));
        assert!(plain.contains("line one"));
        assert!(plain.contains("line two"));
        assert!(banner.starts_with(ansi::CLEAR_SCREEN));
    }
}
