//! The module framework: anything that can plug into the session as a
//! generic option menu.
//!
//! A module implements [`OptionProvider`] - it loads a list of
//! [`ModuleOption`]s (possibly from the store), names its menu, and supplies
//! footer instructions. The framework's [`run_module`] loop does the rest:
//! renders the option menu, drives selection with wrap-around arrows, digit
//! shortcuts, and Enter, and dispatches each option's `execute`.
//!
//! Control flow between handlers, modules, and the session is the explicit
//! [`Flow`] enum rather than booleans.

pub mod bulletins;
pub mod messages;
pub mod sysop;

use anyhow::Result;
use async_trait::async_trait;
use log::warn;

use crate::bbs::writer::SessionWriter;
use crate::storage::Store;
use crate::term::{Key, KeyReader};
use crate::ui::colors::{ansi, ColorScheme};
use crate::ui::menu::{MenuRenderer, MenuRow, MenuView};

/// What should happen after a handler or option finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Stay where we are (keep looping in the module / menu).
    Continue,
    /// Leave the current module, back to the containing menu.
    ExitModule,
    /// End the whole session.
    ExitSession,
}

/// A single selectable row inside a module.
#[async_trait]
pub trait ModuleOption: Send + Sync {
    /// Stable within a single invocation of the module.
    fn id(&self) -> String;
    fn title(&self) -> String;
    fn description(&self) -> String;
    async fn execute(
        &self,
        writer: &SessionWriter,
        keys: &mut KeyReader,
        store: &Store,
        scheme: &ColorScheme,
    ) -> Result<Flow>;
}

/// What a module implements to plug into the generic loop.
#[async_trait]
pub trait OptionProvider: Send + Sync {
    async fn load_options(&self, store: &Store) -> Result<Vec<Box<dyn ModuleOption>>>;
    fn menu_title(&self) -> String;
    /// Footer guidance as (label, key) pairs.
    fn instructions(&self) -> Vec<(String, String)>;
}

/// Show a centered, colored notice and wait for any key.
pub async fn notice_and_wait(
    writer: &SessionWriter,
    keys: &mut KeyReader,
    scheme: &ColorScheme,
    message: &str,
    color: &str,
) -> std::io::Result<()> {
    let mut out = String::from(ansi::CLEAR_CONTENT);
    out.push_str(&scheme.center(&scheme.colorize(message, color), 79));
    out.push_str("\r\n\r\n");
    out.push_str(&scheme.center(&scheme.colorize("Press any key to continue...", "text"), 79));
    writer.write(out.as_bytes()).await?;
    keys.read_key().await?;
    Ok(())
}

/// The generic module loop.
pub async fn run_module(
    provider: &dyn OptionProvider,
    writer: &SessionWriter,
    keys: &mut KeyReader,
    store: &Store,
    scheme: &ColorScheme,
) -> Result<Flow> {
    let options = match provider.load_options(store).await {
        Ok(options) => options,
        Err(e) => {
            warn!("Module '{}' failed to load options: {}", provider.menu_title(), e);
            let msg = scheme.center(&scheme.colorize("Error loading menu options.", "error"), 79);
            writer.write_str(&format!("{}\r\n", msg)).await?;
            return Ok(Flow::Continue);
        }
    };

    if options.is_empty() {
        show_empty(provider, writer, keys, scheme).await?;
        return Ok(Flow::Continue);
    }

    let renderer = MenuRenderer::new(scheme.clone());
    let mut selected = 0usize;

    let flow = loop {
        let view = MenuView {
            title: provider.menu_title(),
            rows: options
                .iter()
                .map(|option| MenuRow {
                    id: option.id(),
                    description: option.description(),
                })
                .collect(),
            instructions: provider.instructions(),
        };
        renderer.render(writer, &view, selected).await?;

        let key = match keys.read_key().await {
            Ok(key) => key,
            Err(_) => break Flow::ExitSession,
        };
        match key {
            Key::Up => {
                selected = if selected == 0 {
                    options.len() - 1
                } else {
                    selected - 1
                };
            }
            Key::Down => {
                selected = (selected + 1) % options.len();
            }
            Key::Enter => match options[selected]
                .execute(writer, keys, store, scheme)
                .await?
            {
                Flow::Continue => {}
                Flow::ExitModule => break Flow::Continue,
                Flow::ExitSession => break Flow::ExitSession,
            },
            Key::Char(c @ '1'..='9') => {
                let index = (c as usize) - ('1' as usize);
                if index < options.len() {
                    selected = index;
                    match options[index].execute(writer, keys, store, scheme).await? {
                        Flow::Continue => {}
                        Flow::ExitModule => break Flow::Continue,
                        Flow::ExitSession => break Flow::ExitSession,
                    }
                }
            }
            k if k.is_quit() => break Flow::Continue,
            _ => {}
        }
    };

    writer.write(ansi::SHOW_CURSOR.as_bytes()).await?;
    Ok(flow)
}

async fn show_empty(
    provider: &dyn OptionProvider,
    writer: &SessionWriter,
    keys: &mut KeyReader,
    scheme: &ColorScheme,
) -> std::io::Result<()> {
    let mut out = String::from(ansi::CLEAR_CONTENT);
    let header = scheme.colorize(&format!("--- {} ---", provider.menu_title()), "primary");
    out.push_str(&scheme.center(&header, 79));
    out.push_str("\r\n\r\n");
    out.push_str(&scheme.center(&scheme.colorize("No items available.", "secondary"), 79));
    out.push_str("\r\n\r\n");
    out.push_str(&scheme.center(&scheme.colorize("Press any key to continue...", "text"), 79));
    writer.write(out.as_bytes()).await?;
    keys.read_key().await?;
    Ok(())
}

/// Standard instruction pairs shared by store-backed modules.
pub(crate) fn nav_instructions(action: &str) -> Vec<(String, String)> {
    vec![
        ("Navigate".to_string(), "↑↓".to_string()),
        (action.to_string(), "Enter".to_string()),
        ("Quit".to_string(), "Q".to_string()),
    ]
}
