//! The per-connection state machine.
//!
//! A session moves through: welcome banner → authentication (interactive,
//! or skipped when the transport already bound a username) → status-bar
//! install → bulletins auto-run → the menu loop. The menu loop renders the
//! current menu descriptor, reads one key at a time, and dispatches:
//! submenu navigation (with a history stack for "back"), built-in commands,
//! module invocations, and goodbye.
//!
//! Every exit path - goodbye, transport closure, errors - runs the same
//! teardown: show the cursor, uninstall the status bar (restoring the
//! scroll region), restore the terminal mode, and close the stream.

use std::sync::Arc;

use anyhow::Result;
use log::{debug, info, warn};

use crate::bbs::writer::SessionWriter;
use crate::config::{Config, MenuItem};
use crate::credentials::{SecretVerifier, Verifier};
use crate::logutil::escape_log;
use crate::modules::{self, Flow};
use crate::storage::{Store, User};
use crate::term::{Key, KeyReader, TermControl, Terminal};
use crate::ui::colors::{ansi, ColorScheme};
use crate::ui::menu::{MenuRenderer, MenuView};
use crate::ui::statusbar::{StatusBar, StatusBarManager};

const LOGIN_ATTEMPTS: u32 = 3;
const SYSOP_LEVEL: u8 = 255;

/// One live connection.
pub struct Session {
    writer: SessionWriter,
    keys: KeyReader,
    control: TermControl,
    store: Arc<Store>,
    config: Arc<Config>,
    scheme: ColorScheme,
    renderer: MenuRenderer,
    user: Option<User>,
    authenticated: bool,
    current_menu: String,
    menu_history: Vec<String>,
    selected_index: usize,
    /// Set when the transport already authenticated a username (SSH).
    prefilled_username: Option<String>,
    status: Option<StatusBarManager>,
}

impl Session {
    pub fn new(
        terminal: Terminal,
        store: Arc<Store>,
        config: Arc<Config>,
        prefilled_username: Option<String>,
    ) -> Self {
        let (keys, sink, control) = terminal.split();
        let writer = SessionWriter::new(sink, control.clone());
        let scheme = ColorScheme::new(config.bbs.colors.clone());
        let renderer = MenuRenderer::new(scheme.clone());
        Session {
            writer,
            keys,
            control,
            store,
            config,
            scheme,
            renderer,
            user: None,
            authenticated: false,
            current_menu: "main".to_string(),
            menu_history: Vec::new(),
            selected_index: 0,
            prefilled_username,
            status: None,
        }
    }

    /// Run the session to completion. Errors are logged, never propagated:
    /// a failed session must still tear down its terminal.
    pub async fn run(mut self) {
        if let Err(e) = self.run_inner().await {
            debug!("Session ended with error: {}", e);
        }
        self.teardown().await;
    }

    async fn run_inner(&mut self) -> Result<()> {
        // Raw mode up front so login input is unechoed and maskable. SSH
        // transports are already raw; this is a no-op there.
        if let Err(e) = self.control.make_raw() {
            warn!("Could not set raw mode for navigation: {}", e);
            self.writer
                .write_str("Warning: Could not set raw mode for navigation\r\n")
                .await?;
        }

        self.display_welcome().await?;

        if !self.handle_login().await? {
            return Ok(());
        }

        let username = self
            .user
            .as_ref()
            .map(|u| u.username.clone())
            .unwrap_or_default();
        info!("Session started for '{}'", escape_log(&username));

        let mut status = StatusBarManager::new(
            StatusBar::new(&username, &self.config),
            self.writer.clone(),
        );
        status.install().await?;
        self.status = Some(status);

        // First stop after login: the bulletins.
        let bulletins = modules::bulletins::BulletinsModule::new(self.scheme.clone());
        let flow = modules::run_module(
            &bulletins,
            &self.writer,
            &mut self.keys,
            &self.store,
            &self.scheme,
        )
        .await?;
        if flow == Flow::ExitSession {
            return Ok(());
        }

        self.current_menu = "main".to_string();
        self.menu_loop().await
    }

    async fn display_welcome(&self) -> Result<()> {
        let banner = self
            .scheme
            .welcome_banner(&self.config.bbs.system_name, &self.config.bbs.welcome_message);
        self.writer.write_str(&banner).await?;
        Ok(())
    }

    /// Authenticate the caller. Returns false when the session should end.
    async fn handle_login(&mut self) -> Result<bool> {
        // Transport already authenticated this user (SSH password callback).
        if let Some(username) = self.prefilled_username.clone() {
            let user = match self.store.user_by_name(&username) {
                Ok(user) => user,
                Err(e) => {
                    debug!("Pre-authenticated user lookup failed: {}", e);
                    self.writer
                        .write_str(&format!(
                            "{}\r\n",
                            self.scheme
                                .colorize("Error retrieving user information.", "error")
                        ))
                        .await?;
                    return Ok(false);
                }
            };
            if let Err(e) = self.store.touch_user_last_call(&username) {
                warn!("Failed to record call for '{}': {}", escape_log(&username), e);
            }

            let mut out = String::new();
            out.push_str(&self.scheme.colorize(
                &format!("Welcome back, {}!", user.username),
                "accent",
            ));
            out.push_str("\r\n");
            let last_call = match user.last_call {
                Some(t) => format!("Last call: {}", t.format("%Y-%m-%d %H:%M:%S")),
                None => "Last call: First time login".to_string(),
            };
            out.push_str(&self.scheme.colorize(&last_call, "text"));
            out.push_str("\r\n");
            out.push_str(
                &self
                    .scheme
                    .colorize(&format!("Total calls: {}", user.total_calls), "text"),
            );
            out.push_str("\r\n\r\n");
            self.writer.write_str(&out).await?;

            self.user = Some(user);
            self.authenticated = true;
            return Ok(true);
        }

        // Interactive login, up to three attempts.
        let verifier = SecretVerifier::new();
        self.writer
            .write_str(&format!(
                "{}\r\n\r\n",
                self.scheme.colorize(
                    &format!("=== {} ===", self.config.bbs.system_name),
                    "primary"
                )
            ))
            .await?;

        for _attempt in 0..LOGIN_ATTEMPTS {
            self.writer.write_str("Username: ").await?;
            let username = match self.keys.read_line(&self.writer, false).await? {
                Some(line) => line.trim().to_string(),
                None => return Ok(false),
            };
            if username.is_empty() {
                continue;
            }

            self.writer.write_str("Password: ").await?;
            let password = match self.keys.read_line(&self.writer, true).await? {
                Some(line) => line,
                None => return Ok(false),
            };
            if password.is_empty() {
                continue;
            }

            let user = match self.store.user_by_name(&username) {
                Ok(user) if verifier.verify(&password, &user.credential_secret) => user,
                _ => {
                    info!("Failed login attempt for '{}'", escape_log(&username));
                    self.writer
                        .write_str(&format!(
                            "{}\r\n",
                            self.scheme
                                .colorize("Invalid username or password.", "error")
                        ))
                        .await?;
                    continue;
                }
            };

            if let Err(e) = self.store.touch_user_last_call(&username) {
                warn!("Failed to record call for '{}': {}", escape_log(&username), e);
            }
            self.writer
                .write_str(&format!(
                    "{}\r\n\r\n",
                    self.scheme
                        .colorize(&format!("Welcome, {}!", user.username), "accent")
                ))
                .await?;
            self.user = Some(user);
            self.authenticated = true;
            return Ok(true);
        }

        self.writer
            .write_str(&format!(
                "{}\r\n",
                self.scheme
                    .colorize("Too many failed attempts. Access denied.", "error")
            ))
            .await?;
        Ok(false)
    }

    fn access_level(&self) -> u8 {
        self.user.as_ref().map(|u| u.access_level).unwrap_or(0)
    }

    fn username(&self) -> String {
        self.user
            .as_ref()
            .map(|u| u.username.clone())
            .unwrap_or_default()
    }

    /// Footer instructions for the current menu context.
    fn menu_instructions(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("Navigate".to_string(), "↑↓".to_string()),
            ("Select".to_string(), "Enter".to_string()),
        ];
        if self.current_menu != "main" {
            pairs.push(("Back".to_string(), "Q".to_string()));
        }
        pairs.push(("Goodbye".to_string(), "G".to_string()));
        pairs
    }

    /// The main menu loop: render, read keys, dispatch.
    async fn menu_loop(&mut self) -> Result<()> {
        // No menu is ever shown without an authenticated user behind it.
        if !self.authenticated || self.user.is_none() {
            return Ok(());
        }
        'menus: loop {
            let menu = match self.config.find_menu(&self.current_menu) {
                Some(menu) => menu.clone(),
                None => {
                    self.writer.write_str("Error: Menu not found\r\n").await?;
                    return Ok(());
                }
            };

            let accessible: Vec<MenuItem> = menu
                .submenu
                .iter()
                .filter(|item| item.access_level <= self.access_level())
                .cloned()
                .collect();
            if accessible.is_empty() {
                self.writer
                    .write_str("No menu items available\r\n")
                    .await?;
                return Ok(());
            }
            if self.selected_index >= accessible.len() {
                self.selected_index = 0;
            }

            self.display_menu(&menu).await?;

            loop {
                let key = match self.keys.read_key().await {
                    Ok(key) => key,
                    // Transport closed; tear down quietly.
                    Err(_) => return Ok(()),
                };

                match key {
                    Key::Up => {
                        self.selected_index = if self.selected_index == 0 {
                            accessible.len() - 1
                        } else {
                            self.selected_index - 1
                        };
                        self.display_menu(&menu).await?;
                    }
                    Key::Down => {
                        self.selected_index = (self.selected_index + 1) % accessible.len();
                        self.display_menu(&menu).await?;
                    }
                    Key::Enter => {
                        let item = accessible[self.selected_index].clone();
                        match self.dispatch(&item).await? {
                            Flow::ExitSession => {
                                self.say_goodbye().await?;
                                return Ok(());
                            }
                            _ => continue 'menus,
                        }
                    }
                    k if k.is_quit() => {
                        if self.current_menu == "main" {
                            continue;
                        }
                        self.current_menu =
                            self.menu_history.pop().unwrap_or_else(|| "main".to_string());
                        self.selected_index = 0;
                        continue 'menus;
                    }
                    k if k.is_goodbye() => {
                        self.say_goodbye().await?;
                        return Ok(());
                    }
                    Key::Char(c) => {
                        let hit = accessible.iter().find(|item| {
                            item.hotkey
                                .as_deref()
                                .and_then(|h| h.chars().next())
                                .map(|h| h.eq_ignore_ascii_case(&c))
                                .unwrap_or(false)
                        });
                        if let Some(item) = hit.cloned() {
                            match self.dispatch(&item).await? {
                                Flow::ExitSession => {
                                    self.say_goodbye().await?;
                                    return Ok(());
                                }
                                _ => continue 'menus,
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    async fn display_menu(&self, menu: &MenuItem) -> Result<()> {
        let view = MenuView::from_config(
            menu,
            self.access_level(),
            &self.scheme,
            self.menu_instructions(),
        );
        self.renderer
            .render(&self.writer, &view, self.selected_index)
            .await?;
        Ok(())
    }

    async fn say_goodbye(&mut self) -> Result<()> {
        self.writer.write_str(ansi::SHOW_CURSOR).await?;
        let msg = self
            .scheme
            .colorize("\r\nThank you for calling! Goodbye!\r\n", "success");
        self.writer.write_str(&msg).await?;
        info!("Session ended for '{}'", escape_log(&self.username()));
        Ok(())
    }

    /// Navigate into a submenu: push the current menu onto the history
    /// stack, descend, and reset the selection.
    fn enter_menu(&mut self, id: &str) {
        self.menu_history.push(self.current_menu.clone());
        self.current_menu = id.to_string();
        self.selected_index = 0;
    }

    async fn require_sysop(&mut self) -> Result<bool> {
        if self.access_level() >= SYSOP_LEVEL {
            return Ok(true);
        }
        modules::notice_and_wait(
            &self.writer,
            &mut self.keys,
            &self.scheme,
            "Access denied. Sysop privileges required.",
            "error",
        )
        .await?;
        Ok(false)
    }

    /// Execute one menu item. Menu ids win over built-ins: an item whose
    /// command names an existing menu is navigation, everything else is
    /// looked up as a built-in command.
    async fn dispatch(&mut self, item: &MenuItem) -> Result<Flow> {
        debug!(
            "Dispatch command '{}' for '{}'",
            escape_log(&item.command),
            escape_log(&self.username())
        );

        if self.config.find_menu(&item.command).is_some() && item.command != self.current_menu {
            self.enter_menu(&item.command);
            return Ok(Flow::Continue);
        }

        match item.command.as_str() {
            "goodbye" | "logout" => Ok(Flow::ExitSession),
            "bulletins" => {
                let module = modules::bulletins::BulletinsModule::new(self.scheme.clone());
                self.run_module(&module).await
            }
            "messages" => {
                let module = modules::messages::MessagesModule::new(self.scheme.clone());
                self.run_module(&module).await
            }
            "sysop" => {
                if !self.require_sysop().await? {
                    return Ok(Flow::Continue);
                }
                let module = modules::sysop::SysopModule::new(
                    &self.config,
                    self.scheme.clone(),
                    &self.username(),
                );
                self.run_module(&module).await
            }
            command @ ("create_user" | "edit_user" | "delete_user" | "view_users"
            | "change_password" | "toggle_user" | "system_stats" | "bulletin_management") => {
                if !self.require_sysop().await? {
                    return Ok(Flow::Continue);
                }
                let actor = self.username();
                modules::sysop::run_handler(
                    command,
                    &self.writer,
                    &mut self.keys,
                    &self.store,
                    &self.scheme,
                    &actor,
                )
                .await
            }
            _ => {
                if !item.submenu.is_empty() {
                    self.enter_menu(&item.id);
                    return Ok(Flow::Continue);
                }
                modules::notice_and_wait(
                    &self.writer,
                    &mut self.keys,
                    &self.scheme,
                    &format!("Command '{}' not implemented yet.", item.command),
                    "accent",
                )
                .await?;
                Ok(Flow::Continue)
            }
        }
    }

    async fn run_module(&mut self, provider: &dyn modules::OptionProvider) -> Result<Flow> {
        modules::run_module(
            provider,
            &self.writer,
            &mut self.keys,
            &self.store,
            &self.scheme,
        )
        .await
    }

    /// Release everything in the required order: cursor, status bar (scroll
    /// region + last row), terminal mode, stream.
    async fn teardown(&mut self) {
        let _ = self.writer.write_str(ansi::SHOW_CURSOR).await;
        if let Some(mut status) = self.status.take() {
            status.uninstall().await;
        }
        if let Err(e) = self.control.restore() {
            warn!("Failed to restore terminal mode: {}", e);
        }
        self.writer.shutdown().await;
    }
}
