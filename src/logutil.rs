//! Log sanitation for caller-controlled text.
//!
//! Usernames, menu commands, and key input arrive straight off the wire and
//! can carry newlines or terminal escape bytes - a caller who types an arrow
//! key mid-prompt puts `ESC [ A` into whatever gets logged. Unescaped, that
//! splits log lines and plays back control sequences on the terminal of
//! whoever tails the file. Session, server, and sysop logging pass every
//! user-originated string through [`escape_log`] first.

use std::fmt::Write;

/// Longest preview of caller input worth keeping in a log line; a username
/// or command fits many times over, bulletin bodies get clipped.
const MAX_PREVIEW: usize = 160;

fn push_escaped(out: &mut String, ch: char) {
    match ch {
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        // The escape byte is common enough in raw key input to earn the
        // short form.
        '\x1b' => out.push_str("\\e"),
        c if c.is_control() => {
            let _ = write!(out, "\\x{:02X}", c as u32);
        }
        c => out.push(c),
    }
}

/// Render caller input as a single-line, control-free log fragment,
/// clipping anything past the preview cap with a `...` marker.
pub fn escape_log(input: &str) -> String {
    let mut out = String::with_capacity(input.len().min(MAX_PREVIEW));
    let mut chars = input.chars();
    for ch in chars.by_ref().take(MAX_PREVIEW) {
        push_escaped(&mut out, ch);
    }
    if chars.next().is_some() {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_breaks_stay_on_one_line() {
        assert_eq!(escape_log("sysop\r\nfake entry"), "sysop\\r\\nfake entry");
        assert_eq!(escape_log("a\tb\\c"), "a\\tb\\\\c");
    }

    #[test]
    fn arrow_key_bytes_are_neutralized() {
        // An up-arrow typed into a username prompt.
        assert_eq!(escape_log("\x1b[Aroot"), "\\e[Aroot");
        assert_eq!(escape_log("\x01\x02"), "\\x01\\x02");
    }

    #[test]
    fn long_input_is_clipped_with_a_marker() {
        let long = "x".repeat(MAX_PREVIEW + 40);
        let escaped = escape_log(&long);
        assert!(escaped.ends_with("..."));
        assert_eq!(escaped.chars().count(), MAX_PREVIEW + 3);
    }

    #[test]
    fn input_at_the_cap_is_untouched() {
        let exact = "y".repeat(MAX_PREVIEW);
        assert_eq!(escape_log(&exact), exact);
    }
}
