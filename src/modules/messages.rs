//! Message boards: topics from the store, each opening into a post listing,
//! each post showing its body and replies. Composing posts and replies is
//! reserved; those flows currently answer "coming soon".

use anyhow::Result;
use async_trait::async_trait;

use super::{Flow, ModuleOption, OptionProvider};
use crate::bbs::writer::SessionWriter;
use crate::storage::{Post, Store, Topic};
use crate::term::{Key, KeyReader};
use crate::ui::colors::{ansi, ColorScheme};

pub struct MessagesModule {
    scheme: ColorScheme,
}

impl MessagesModule {
    pub fn new(scheme: ColorScheme) -> Self {
        MessagesModule { scheme }
    }
}

#[async_trait]
impl OptionProvider for MessagesModule {
    async fn load_options(&self, store: &Store) -> Result<Vec<Box<dyn ModuleOption>>> {
        let topics = store.list_topics()?;
        Ok(topics
            .into_iter()
            .map(|topic| {
                Box::new(TopicOption {
                    topic,
                    scheme: self.scheme.clone(),
                }) as Box<dyn ModuleOption>
            })
            .collect())
    }

    fn menu_title(&self) -> String {
        "Message Boards".to_string()
    }

    fn instructions(&self) -> Vec<(String, String)> {
        super::nav_instructions("View")
    }
}

struct TopicOption {
    topic: Topic,
    scheme: ColorScheme,
}

#[async_trait]
impl ModuleOption for TopicOption {
    fn id(&self) -> String {
        self.topic.id.to_string()
    }

    fn title(&self) -> String {
        self.topic.name.clone()
    }

    fn description(&self) -> String {
        format!("{} - {}", self.topic.name, self.topic.description)
    }

    async fn execute(
        &self,
        writer: &SessionWriter,
        keys: &mut KeyReader,
        store: &Store,
        _scheme: &ColorScheme,
    ) -> Result<Flow> {
        self.browse_posts(writer, keys, store).await?;
        Ok(Flow::Continue)
    }
}

impl TopicOption {
    async fn browse_posts(
        &self,
        writer: &SessionWriter,
        keys: &mut KeyReader,
        store: &Store,
    ) -> Result<()> {
        let scheme = &self.scheme;
        loop {
            let mut out = String::from(ansi::CLEAR_SCREEN);
            let header = format!("=== {} ===", self.topic.name.to_uppercase());
            out.push_str(&scheme.colorize(&header, "primary"));
            out.push_str("\r\n\r\n");

            let posts = match store.posts_by_topic(self.topic.id) {
                Ok(posts) => posts,
                Err(e) => {
                    out.push_str(
                        &scheme.colorize(&format!("Error loading posts: {}", e), "error"),
                    );
                    out.push_str("\r\n");
                    out.push_str(&scheme.colorize("Press any key to return...", "text"));
                    writer.write(out.as_bytes()).await?;
                    keys.read_key().await?;
                    return Ok(());
                }
            };

            if posts.is_empty() {
                out.push_str(&scheme.colorize("No posts in this topic yet.", "text"));
                out.push_str("\r\n");
                out.push_str(&scheme.colorize("N) New Post  Q) Back to Topics", "accent"));
            } else {
                out.push_str(&scheme.colorize("Posts:", "text"));
                out.push_str("\r\n");
                for (i, post) in posts.iter().enumerate() {
                    let line = format!(
                        "{}) {} by {} ({})",
                        i + 1,
                        post.subject,
                        post.username,
                        post.created_at.format("%b %-d, %Y")
                    );
                    out.push_str(&scheme.colorize(&line, "text"));
                    out.push_str("\r\n");
                }
                out.push_str("\r\n");
                out.push_str(
                    &scheme.colorize("Enter post number to view, N) New Post, Q) Back: ", "accent"),
                );
            }
            writer.write(out.as_bytes()).await?;

            match keys.read_key().await? {
                k if k.is_quit() => return Ok(()),
                Key::Char('n') | Key::Char('N') => {
                    self.coming_soon(writer, keys, &format!("New Post in {}", self.topic.name))
                        .await?;
                }
                Key::Char(c @ '1'..='9') => {
                    let index = (c as usize) - ('1' as usize);
                    if let Some(post) = posts.get(index) {
                        self.show_post(writer, keys, store, post).await?;
                    }
                }
                _ => {}
            }
        }
    }

    async fn show_post(
        &self,
        writer: &SessionWriter,
        keys: &mut KeyReader,
        store: &Store,
        post: &Post,
    ) -> Result<()> {
        let scheme = &self.scheme;
        let mut out = String::from(ansi::CLEAR_SCREEN);
        let header = format!("=== {}: {} ===", self.topic.name, post.subject);
        out.push_str(&scheme.colorize(&header, "primary"));
        out.push_str("\r\n\r\n");

        let byline = format!(
            "From: {}\r\nDate: {}\r\n",
            post.username,
            post.created_at.format("%B %-d, %Y at %-I:%M %p")
        );
        out.push_str(&scheme.colorize(&byline, "text"));
        out.push_str("\r\n");

        for line in post.body.lines() {
            out.push_str(&scheme.colorize(line, "text"));
            out.push_str("\r\n");
        }
        out.push_str("\r\n");

        match store.replies_by_post(post.id) {
            Ok(replies) if !replies.is_empty() => {
                out.push_str(&scheme.colorize("--- Replies ---", "primary"));
                out.push_str("\r\n");
                for reply in &replies {
                    let reply_header = format!(
                        "From: {} ({})",
                        reply.username,
                        reply.created_at.format("%b %-d, %Y %-I:%M %p")
                    );
                    out.push_str("\r\n");
                    out.push_str(&scheme.colorize(&reply_header, "secondary"));
                    out.push_str("\r\n");
                    for line in reply.body.lines() {
                        out.push_str(&scheme.colorize(line, "text"));
                        out.push_str("\r\n");
                    }
                }
            }
            _ => {}
        }

        out.push_str("\r\n");
        out.push_str(&scheme.colorize("R) Reply  Q) Back to topic: ", "accent"));
        writer.write(out.as_bytes()).await?;

        if let Key::Char('r') | Key::Char('R') = keys.read_key().await? {
            self.coming_soon(writer, keys, &format!("Reply to: {}", post.subject))
                .await?;
        }
        Ok(())
    }

    async fn coming_soon(
        &self,
        writer: &SessionWriter,
        keys: &mut KeyReader,
        title: &str,
    ) -> Result<()> {
        let scheme = &self.scheme;
        let mut out = String::from(ansi::CLEAR_SCREEN);
        out.push_str(&scheme.colorize(&format!("=== {} ===", title), "primary"));
        out.push_str("\r\n\r\n");
        out.push_str(&scheme.colorize("This feature is coming soon...", "text"));
        out.push_str("\r\n");
        out.push_str(&scheme.colorize("Press any key to return...", "accent"));
        writer.write(out.as_bytes()).await?;
        keys.read_key().await?;
        Ok(())
    }
}
