//! System bulletins: a dynamic option menu of the newest bulletins, each
//! rendered through the pager. Auto-invoked once right after login.

use anyhow::Result;
use async_trait::async_trait;

use super::{Flow, ModuleOption, OptionProvider};
use crate::bbs::writer::SessionWriter;
use crate::storage::{Bulletin, Store};
use crate::term::KeyReader;
use crate::ui::colors::ColorScheme;
use crate::ui::pager::Pager;

/// Newest bulletins shown per visit.
const BULLETIN_LIMIT: usize = 50;
/// Body text wraps to this many columns before centering.
const WRAP_WIDTH: usize = 75;

pub struct BulletinsModule {
    scheme: ColorScheme,
}

impl BulletinsModule {
    pub fn new(scheme: ColorScheme) -> Self {
        BulletinsModule { scheme }
    }
}

#[async_trait]
impl OptionProvider for BulletinsModule {
    async fn load_options(&self, store: &Store) -> Result<Vec<Box<dyn ModuleOption>>> {
        let bulletins = store.list_bulletins(BULLETIN_LIMIT)?;
        Ok(bulletins
            .into_iter()
            .enumerate()
            .map(|(index, bulletin)| {
                Box::new(BulletinOption {
                    bulletin,
                    index,
                    scheme: self.scheme.clone(),
                }) as Box<dyn ModuleOption>
            })
            .collect())
    }

    fn menu_title(&self) -> String {
        "System Bulletins".to_string()
    }

    fn instructions(&self) -> Vec<(String, String)> {
        super::nav_instructions("Read")
    }
}

struct BulletinOption {
    bulletin: Bulletin,
    index: usize,
    scheme: ColorScheme,
}

#[async_trait]
impl ModuleOption for BulletinOption {
    fn id(&self) -> String {
        format!("bulletin_{}", self.index)
    }

    fn title(&self) -> String {
        self.bulletin.title.clone()
    }

    fn description(&self) -> String {
        format!("{}) {}", self.index + 1, self.bulletin.title)
    }

    async fn execute(
        &self,
        writer: &SessionWriter,
        keys: &mut KeyReader,
        _store: &Store,
        _scheme: &ColorScheme,
    ) -> Result<Flow> {
        let scheme = &self.scheme;
        let mut lines = Vec::new();

        let info = format!(
            "By: {} | Date: {}",
            self.bulletin.author,
            self.bulletin.created_at.format("%B %-d, %Y")
        );
        lines.push(scheme.center(&scheme.colorize(&info, "secondary"), 79));
        lines.push(String::new());

        for line in wrap_text(&self.bulletin.body, WRAP_WIDTH) {
            if line.trim().is_empty() {
                lines.push(String::new());
            } else {
                lines.push(scheme.center(&scheme.colorize(&line, "text"), 79));
            }
        }

        let title = format!("--- {} ---", self.bulletin.title);
        Pager::new(writer, scheme)
            .display(keys, &lines, &title)
            .await?;
        Ok(Flow::Continue)
    }
}

/// Word-wrap `text` to `width` columns. Paragraph breaks (blank lines)
/// are preserved; words are never split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, paragraph) in text.split("\n\n").enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
            } else if current.chars().count() + 1 + word.chars().count() <= width {
                current.push(' ');
                current.push_str(word);
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_preserves_words() {
        let text = "the quick brown fox jumps over the lazy dog again and again";
        let wrapped = wrap_text(text, 20);
        for line in &wrapped {
            assert!(line.chars().count() <= 20, "line too wide: {:?}", line);
        }
        let rejoined = wrapped.join(" ");
        let original_words: Vec<&str> = text.split_whitespace().collect();
        let rejoined_words: Vec<&str> = rejoined.split_whitespace().collect();
        assert_eq!(original_words, rejoined_words);
    }

    #[test]
    fn wrap_never_splits_a_word() {
        let wrapped = wrap_text("superlongunbreakableword tiny", 5);
        assert_eq!(wrapped[0], "superlongunbreakableword");
        assert_eq!(wrapped[1], "tiny");
    }

    #[test]
    fn wrap_keeps_paragraph_breaks() {
        let wrapped = wrap_text("first paragraph\n\nsecond paragraph", 40);
        assert_eq!(
            wrapped,
            vec![
                "first paragraph".to_string(),
                String::new(),
                "second paragraph".to_string(),
            ]
        );
    }

    #[test]
    fn wrap_of_empty_text_is_empty() {
        assert!(wrap_text("", 75).is_empty());
        assert!(wrap_text("   ", 75).is_empty());
    }
}
