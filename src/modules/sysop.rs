//! Sysop administration: user management, system statistics, and bulletin
//! management. The option list comes from the `[sysop]` section of the
//! configuration; each option names one of the handlers below. The whole
//! module is gated behind access level 255 by the session dispatcher.

use anyhow::Result;
use async_trait::async_trait;
use log::info;

use super::{Flow, ModuleOption, OptionProvider};
use crate::bbs::writer::SessionWriter;
use crate::config::{Config, ModuleOptionConfig};
use crate::credentials::SecretVerifier;
use crate::logutil::escape_log;
use crate::storage::{NewUser, Store};
use crate::term::{Key, KeyReader};
use crate::ui::colors::{ansi, ColorScheme};
use crate::ui::pager::Pager;

pub struct SysopModule {
    scheme: ColorScheme,
    actor: String,
    title: String,
    instructions: Vec<(String, String)>,
    options: Vec<ModuleOptionConfig>,
}

impl SysopModule {
    /// Build from the `[sysop]` config section. `actor` is the logged-in
    /// sysop's username, recorded as the author of anything they create.
    pub fn new(config: &Config, scheme: ColorScheme, actor: &str) -> Self {
        match config.module_menu("sysop") {
            Some(section) => SysopModule {
                scheme,
                actor: actor.to_string(),
                title: section.title.clone(),
                instructions: parse_instructions(&section.instructions),
                options: section.options.clone(),
            },
            None => SysopModule {
                scheme,
                actor: actor.to_string(),
                title: "System Administration".to_string(),
                instructions: super::nav_instructions("Select"),
                options: Vec::new(),
            },
        }
    }
}

/// Turn a configured instruction string like "Navigate: ↑↓  Select: Enter"
/// into (label, key) pairs for the renderer.
fn parse_instructions(raw: &str) -> Vec<(String, String)> {
    let pairs: Vec<(String, String)> = raw
        .split("  ")
        .filter_map(|chunk| {
            let (label, key) = chunk.split_once(": ")?;
            Some((label.trim().to_string(), key.trim().to_string()))
        })
        .collect();
    if pairs.is_empty() {
        super::nav_instructions("Select")
    } else {
        pairs
    }
}

#[async_trait]
impl OptionProvider for SysopModule {
    async fn load_options(&self, _store: &Store) -> Result<Vec<Box<dyn ModuleOption>>> {
        Ok(self
            .options
            .iter()
            .enumerate()
            .map(|(index, option)| {
                Box::new(CommandOption {
                    index,
                    config: option.clone(),
                    actor: self.actor.clone(),
                }) as Box<dyn ModuleOption>
            })
            .collect())
    }

    fn menu_title(&self) -> String {
        self.title.clone()
    }

    fn instructions(&self) -> Vec<(String, String)> {
        self.instructions.clone()
    }
}

struct CommandOption {
    index: usize,
    config: ModuleOptionConfig,
    actor: String,
}

#[async_trait]
impl ModuleOption for CommandOption {
    fn id(&self) -> String {
        self.config.id.clone()
    }

    fn title(&self) -> String {
        self.config.title.clone()
    }

    fn description(&self) -> String {
        format!("{}) {}", self.index + 1, self.config.description)
    }

    async fn execute(
        &self,
        writer: &SessionWriter,
        keys: &mut KeyReader,
        store: &Store,
        scheme: &ColorScheme,
    ) -> Result<Flow> {
        run_handler(&self.config.command, writer, keys, store, scheme, &self.actor).await
    }
}

/// Dispatch one sysop command by handler id.
pub async fn run_handler(
    command: &str,
    writer: &SessionWriter,
    keys: &mut KeyReader,
    store: &Store,
    scheme: &ColorScheme,
    actor: &str,
) -> Result<Flow> {
    match command {
        "create_user" => create_user(writer, keys, store, scheme, actor).await?,
        "edit_user" => edit_user(writer, keys, store, scheme, actor).await?,
        "delete_user" => delete_user(writer, keys, store, scheme, actor).await?,
        "view_users" => view_users(writer, keys, store, scheme).await?,
        "change_password" => change_password(writer, keys, store, scheme, actor).await?,
        "toggle_user" => toggle_user(writer, keys, store, scheme, actor).await?,
        "system_stats" => system_stats(writer, keys, store, scheme).await?,
        "bulletin_management" => bulletin_management(writer, keys, store, scheme, actor).await?,
        unknown => {
            show_message(
                writer,
                keys,
                scheme,
                &format!("Unknown command: {}", unknown),
                "error",
            )
            .await?;
        }
    }
    Ok(Flow::Continue)
}

// ----- shared prompt helpers -----

async fn header(writer: &SessionWriter, scheme: &ColorScheme, title: &str) -> std::io::Result<()> {
    let mut out = String::from(ansi::CLEAR_SCREEN);
    out.push_str(ansi::SHOW_CURSOR);
    out.push_str(&scheme.center(&scheme.colorize(&format!("--- {} ---", title), "primary"), 79));
    out.push_str("\r\n\r\n");
    writer.write(out.as_bytes()).await
}

async fn prompt(
    writer: &SessionWriter,
    keys: &mut KeyReader,
    scheme: &ColorScheme,
    label: &str,
    mask: bool,
) -> std::io::Result<Option<String>> {
    writer.write_str(&scheme.colorize(label, "text")).await?;
    Ok(keys
        .read_line(writer, mask)
        .await?
        .map(|line| line.trim().to_string()))
}

async fn show_message(
    writer: &SessionWriter,
    keys: &mut KeyReader,
    scheme: &ColorScheme,
    message: &str,
    color: &str,
) -> std::io::Result<()> {
    super::notice_and_wait(writer, keys, scheme, message, color).await
}

async fn cancelled(
    writer: &SessionWriter,
    keys: &mut KeyReader,
    scheme: &ColorScheme,
) -> std::io::Result<()> {
    show_message(writer, keys, scheme, "Operation cancelled.", "error").await
}

fn parse_access_level(s: &str) -> Option<u8> {
    s.trim().parse::<u16>().ok().filter(|&v| v <= 255).map(|v| v as u8)
}

// ----- handlers -----

async fn create_user(
    writer: &SessionWriter,
    keys: &mut KeyReader,
    store: &Store,
    scheme: &ColorScheme,
    actor: &str,
) -> Result<()> {
    header(writer, scheme, "Create New User").await?;

    let username = match prompt(writer, keys, scheme, "Username: ", false).await? {
        Some(name) if !name.is_empty() => name,
        _ => return Ok(cancelled(writer, keys, scheme).await?),
    };
    if username.chars().count() < 3 {
        show_message(writer, keys, scheme, "Username must be at least 3 characters.", "error")
            .await?;
        return Ok(());
    }
    if store.user_by_name_any(&username).is_ok() {
        show_message(writer, keys, scheme, "User already exists!", "error").await?;
        return Ok(());
    }

    let password = match prompt(writer, keys, scheme, "Password: ", true).await? {
        Some(p) if !p.is_empty() => p,
        _ => return Ok(cancelled(writer, keys, scheme).await?),
    };
    if password.chars().count() < 6 {
        show_message(writer, keys, scheme, "Password must be at least 6 characters.", "error")
            .await?;
        return Ok(());
    }

    let real_name = prompt(writer, keys, scheme, "Real name (optional): ", false)
        .await?
        .unwrap_or_default();
    let email = prompt(writer, keys, scheme, "Email (optional): ", false)
        .await?
        .unwrap_or_default();

    let access_level = match prompt(writer, keys, scheme, "Access level (0-255, default 10): ", false)
        .await?
    {
        None => return Ok(cancelled(writer, keys, scheme).await?),
        Some(raw) if raw.is_empty() => 10,
        Some(raw) => match parse_access_level(&raw) {
            Some(level) => level,
            None => {
                show_message(writer, keys, scheme, "Access level must be 0-255.", "error").await?;
                return Ok(());
            }
        },
    };

    let verifier = SecretVerifier::new();
    let secret = match verifier.hash_secret(&password) {
        Ok(hash) => hash,
        Err(e) => {
            show_message(writer, keys, scheme, &format!("Password hash failure: {}", e), "error")
                .await?;
            return Ok(());
        }
    };

    match store.create_user(NewUser {
        username: username.clone(),
        credential_secret: secret,
        real_name,
        email,
        access_level,
    }) {
        Ok(_) => {
            info!(
                "Sysop {} created user '{}' (level {})",
                escape_log(actor),
                escape_log(&username),
                access_level
            );
            show_message(writer, keys, scheme, "User created successfully!", "success").await?;
        }
        Err(e) => {
            show_message(writer, keys, scheme, &format!("Error creating user: {}", e), "error")
                .await?;
        }
    }
    Ok(())
}

async fn edit_user(
    writer: &SessionWriter,
    keys: &mut KeyReader,
    store: &Store,
    scheme: &ColorScheme,
    actor: &str,
) -> Result<()> {
    header(writer, scheme, "Edit User Account").await?;

    let username = match prompt(writer, keys, scheme, "Enter username to edit: ", false).await? {
        Some(name) if !name.is_empty() => name,
        _ => return Ok(cancelled(writer, keys, scheme).await?),
    };
    let mut user = match store.user_by_name_any(&username) {
        Ok(user) => user,
        Err(_) => {
            show_message(writer, keys, scheme, "User not found!", "error").await?;
            return Ok(());
        }
    };

    let summary = format!(
        "Current user: {} (Access Level: {}, Active: {})",
        user.username, user.access_level, user.is_active
    );
    writer
        .write_str(&format!(
            "{}\r\n\r\n",
            scheme.colorize(&summary, "secondary")
        ))
        .await?;

    let new_password = match prompt(
        writer,
        keys,
        scheme,
        "New password (press Enter to keep current): ",
        true,
    )
    .await?
    {
        Some(p) => p,
        None => return Ok(cancelled(writer, keys, scheme).await?),
    };
    if !new_password.is_empty() {
        let verifier = SecretVerifier::new();
        match verifier.hash_secret(&new_password) {
            Ok(hash) => user.credential_secret = hash,
            Err(e) => {
                show_message(writer, keys, scheme, &format!("Password hash failure: {}", e), "error")
                    .await?;
                return Ok(());
            }
        }
    }

    let level_prompt = format!(
        "New access level (current: {}, press Enter to keep): ",
        user.access_level
    );
    match prompt(writer, keys, scheme, &level_prompt, false).await? {
        None => return Ok(cancelled(writer, keys, scheme).await?),
        Some(raw) if raw.is_empty() => {}
        Some(raw) => match parse_access_level(&raw) {
            Some(level) => user.access_level = level,
            None => {
                show_message(
                    writer,
                    keys,
                    scheme,
                    "Invalid access level, keeping current value.",
                    "secondary",
                )
                .await?;
            }
        },
    }

    match store.update_user(user) {
        Ok(()) => {
            info!("Sysop {} edited user '{}'", escape_log(actor), escape_log(&username));
            show_message(writer, keys, scheme, "User updated successfully!", "success").await?;
        }
        Err(e) => {
            show_message(writer, keys, scheme, &format!("Failed to update user: {}", e), "error")
                .await?;
        }
    }
    Ok(())
}

async fn delete_user(
    writer: &SessionWriter,
    keys: &mut KeyReader,
    store: &Store,
    scheme: &ColorScheme,
    actor: &str,
) -> Result<()> {
    header(writer, scheme, "Delete User Account").await?;

    let username = match prompt(writer, keys, scheme, "Enter username to delete: ", false).await? {
        Some(name) if !name.is_empty() => name,
        _ => return Ok(cancelled(writer, keys, scheme).await?),
    };
    let user = match store.user_by_name_any(&username) {
        Ok(user) => user,
        Err(_) => {
            show_message(writer, keys, scheme, "User not found!", "error").await?;
            return Ok(());
        }
    };

    let confirm_label = format!(
        "Are you sure you want to delete user '{}'? (y/N): ",
        user.username
    );
    let confirm = prompt(writer, keys, scheme, &confirm_label, false).await?;
    if confirm.as_deref().map(|c| c.eq_ignore_ascii_case("y")) != Some(true) {
        return Ok(cancelled(writer, keys, scheme).await?);
    }

    match store.delete_user(user.id) {
        Ok(()) => {
            info!("Sysop {} deleted user '{}'", escape_log(actor), escape_log(&username));
            show_message(writer, keys, scheme, "User deleted successfully!", "success").await?;
        }
        Err(e) => {
            show_message(writer, keys, scheme, &format!("Failed to delete user: {}", e), "error")
                .await?;
        }
    }
    Ok(())
}

async fn view_users(
    writer: &SessionWriter,
    keys: &mut KeyReader,
    store: &Store,
    scheme: &ColorScheme,
) -> Result<()> {
    let users = match store.list_users(1000) {
        Ok(users) => users,
        Err(e) => {
            show_message(writer, keys, scheme, &format!("Failed to retrieve users: {}", e), "error")
                .await?;
            return Ok(());
        }
    };
    if users.is_empty() {
        show_message(writer, keys, scheme, "No users found.", "secondary").await?;
        return Ok(());
    }

    let lines: Vec<String> = users
        .iter()
        .enumerate()
        .map(|(i, user)| {
            let status = if user.is_active { "Active" } else { "Inactive" };
            let last = user
                .last_call
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "Never".to_string());
            let line = format!(
                "{}) {} (Level: {}, {}) - Last: {}",
                i + 1,
                user.username,
                user.access_level,
                status,
                last
            );
            scheme.center(&scheme.colorize(&line, "text"), 79)
        })
        .collect();

    Pager::new(writer, scheme)
        .display(keys, &lines, "--- All Users ---")
        .await?;
    Ok(())
}

async fn change_password(
    writer: &SessionWriter,
    keys: &mut KeyReader,
    store: &Store,
    scheme: &ColorScheme,
    actor: &str,
) -> Result<()> {
    header(writer, scheme, "Change User Password").await?;

    let username = match prompt(writer, keys, scheme, "Enter username: ", false).await? {
        Some(name) if !name.is_empty() => name,
        _ => return Ok(cancelled(writer, keys, scheme).await?),
    };
    let mut user = match store.user_by_name_any(&username) {
        Ok(user) => user,
        Err(_) => {
            show_message(writer, keys, scheme, "User not found!", "error").await?;
            return Ok(());
        }
    };

    let password = match prompt(writer, keys, scheme, "Enter new password: ", true).await? {
        Some(p) if !p.is_empty() => p,
        _ => return Ok(cancelled(writer, keys, scheme).await?),
    };
    if password.chars().count() < 6 {
        show_message(writer, keys, scheme, "Password must be at least 6 characters.", "error")
            .await?;
        return Ok(());
    }

    let verifier = SecretVerifier::new();
    match verifier.hash_secret(&password) {
        Ok(hash) => user.credential_secret = hash,
        Err(e) => {
            show_message(writer, keys, scheme, &format!("Password hash failure: {}", e), "error")
                .await?;
            return Ok(());
        }
    }

    match store.update_user(user) {
        Ok(()) => {
            info!(
                "Sysop {} changed password for '{}'",
                escape_log(actor),
                escape_log(&username)
            );
            show_message(writer, keys, scheme, "Password updated successfully!", "success").await?;
        }
        Err(e) => {
            show_message(
                writer,
                keys,
                scheme,
                &format!("Failed to update password: {}", e),
                "error",
            )
            .await?;
        }
    }
    Ok(())
}

async fn toggle_user(
    writer: &SessionWriter,
    keys: &mut KeyReader,
    store: &Store,
    scheme: &ColorScheme,
    actor: &str,
) -> Result<()> {
    header(writer, scheme, "Toggle User Status").await?;

    let username = match prompt(writer, keys, scheme, "Enter username: ", false).await? {
        Some(name) if !name.is_empty() => name,
        _ => return Ok(cancelled(writer, keys, scheme).await?),
    };
    let mut user = match store.user_by_name_any(&username) {
        Ok(user) => user,
        Err(_) => {
            show_message(writer, keys, scheme, "User not found!", "error").await?;
            return Ok(());
        }
    };

    user.is_active = !user.is_active;
    let status = if user.is_active { "activated" } else { "deactivated" };
    let display_name = user.username.clone();

    match store.update_user(user) {
        Ok(()) => {
            info!(
                "Sysop {} {} user '{}'",
                escape_log(actor),
                status,
                escape_log(&username)
            );
            let message = format!("User {} {} successfully!", display_name, status);
            show_message(writer, keys, scheme, &message, "success").await?;
        }
        Err(e) => {
            show_message(
                writer,
                keys,
                scheme,
                &format!("Failed to update user status: {}", e),
                "error",
            )
            .await?;
        }
    }
    Ok(())
}

async fn system_stats(
    writer: &SessionWriter,
    keys: &mut KeyReader,
    store: &Store,
    scheme: &ColorScheme,
) -> Result<()> {
    let users = match store.list_users(1000) {
        Ok(users) => users,
        Err(e) => {
            show_message(
                writer,
                keys,
                scheme,
                &format!("Error retrieving user statistics: {}", e),
                "error",
            )
            .await?;
            return Ok(());
        }
    };
    let bulletins = match store.list_bulletins(1000) {
        Ok(bulletins) => bulletins,
        Err(e) => {
            show_message(
                writer,
                keys,
                scheme,
                &format!("Error retrieving bulletin statistics: {}", e),
                "error",
            )
            .await?;
            return Ok(());
        }
    };

    let active = users.iter().filter(|u| u.is_active).count();
    let total_calls: u64 = users.iter().map(|u| u.total_calls as u64).sum();

    let stats = vec![
        format!("Total Users: {}", users.len()),
        format!("Active Users: {}", active),
        format!("Inactive Users: {}", users.len() - active),
        format!("Total Bulletins: {}", bulletins.len()),
        format!("Total System Calls: {}", total_calls),
    ];
    let lines: Vec<String> = stats
        .iter()
        .map(|stat| scheme.center(&scheme.colorize(stat, "text"), 79))
        .collect();

    Pager::new(writer, scheme)
        .display(keys, &lines, "--- System Statistics ---")
        .await?;
    Ok(())
}

// ----- bulletin management -----

async fn bulletin_management(
    writer: &SessionWriter,
    keys: &mut KeyReader,
    store: &Store,
    scheme: &ColorScheme,
    actor: &str,
) -> Result<()> {
    loop {
        let mut out = String::from(ansi::CLEAR_SCREEN);
        out.push_str(ansi::SHOW_CURSOR);
        out.push_str(&scheme.center(&scheme.colorize("Bulletin Management", "primary"), 79));
        out.push_str("\r\n");
        out.push_str(&scheme.center(&scheme.draw_separator("Bulletin Management".len(), '═'), 79));
        out.push_str("\r\n\r\n");
        for option in [
            "1) List all bulletins",
            "2) Create new bulletin",
            "3) Edit existing bulletin",
            "4) Delete bulletin",
            "Q) Return",
        ] {
            out.push_str(&scheme.center(&scheme.colorize(option, "text"), 79));
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out.push_str(&scheme.center(&scheme.colorize("Enter your choice: ", "accent"), 79));
        writer.write(out.as_bytes()).await?;

        match keys.read_key().await? {
            k if k.is_quit() => return Ok(()),
            Key::Char('1') => list_bulletins(writer, keys, store, scheme).await?,
            Key::Char('2') => create_bulletin(writer, keys, store, scheme, actor).await?,
            Key::Char('3') => edit_bulletin(writer, keys, store, scheme, actor).await?,
            Key::Char('4') => delete_bulletin(writer, keys, store, scheme, actor).await?,
            _ => {}
        }
    }
}

async fn list_bulletins(
    writer: &SessionWriter,
    keys: &mut KeyReader,
    store: &Store,
    scheme: &ColorScheme,
) -> Result<()> {
    let bulletins = match store.list_bulletins(1000) {
        Ok(bulletins) => bulletins,
        Err(e) => {
            show_message(
                writer,
                keys,
                scheme,
                &format!("Error loading bulletins: {}", e),
                "error",
            )
            .await?;
            return Ok(());
        }
    };
    if bulletins.is_empty() {
        show_message(writer, keys, scheme, "No bulletins on file.", "secondary").await?;
        return Ok(());
    }
    let lines: Vec<String> = bulletins
        .iter()
        .map(|b| {
            let line = format!(
                "#{} {} - by {} ({})",
                b.id,
                b.title,
                b.author,
                b.created_at.format("%Y-%m-%d")
            );
            scheme.center(&scheme.colorize(&line, "text"), 79)
        })
        .collect();
    Pager::new(writer, scheme)
        .display(keys, &lines, "--- All Bulletins ---")
        .await?;
    Ok(())
}

/// Read a multi-line body terminated by a lone `.` on its own line.
async fn read_body(
    writer: &SessionWriter,
    keys: &mut KeyReader,
    scheme: &ColorScheme,
) -> std::io::Result<Option<String>> {
    writer
        .write_str(&scheme.colorize(
            "Enter body text; finish with a single '.' on its own line:\r\n",
            "text",
        ))
        .await?;
    let mut body_lines: Vec<String> = Vec::new();
    loop {
        match keys.read_line(writer, false).await? {
            None => return Ok(None),
            Some(line) if line.trim() == "." => break,
            Some(line) => body_lines.push(line),
        }
    }
    Ok(Some(body_lines.join("\n")))
}

async fn create_bulletin(
    writer: &SessionWriter,
    keys: &mut KeyReader,
    store: &Store,
    scheme: &ColorScheme,
    actor: &str,
) -> Result<()> {
    header(writer, scheme, "Create Bulletin").await?;

    let title = match prompt(writer, keys, scheme, "Title: ", false).await? {
        Some(title) if !title.is_empty() => title,
        _ => return Ok(cancelled(writer, keys, scheme).await?),
    };
    let body = match read_body(writer, keys, scheme).await? {
        Some(body) if !body.trim().is_empty() => body,
        _ => return Ok(cancelled(writer, keys, scheme).await?),
    };

    match store.create_bulletin(&title, &body, actor, None) {
        Ok(bulletin) => {
            info!(
                "Sysop {} created bulletin #{} '{}'",
                escape_log(actor),
                bulletin.id,
                escape_log(&title)
            );
            show_message(writer, keys, scheme, "Bulletin created successfully!", "success").await?;
        }
        Err(e) => {
            show_message(writer, keys, scheme, &format!("Error creating bulletin: {}", e), "error")
                .await?;
        }
    }
    Ok(())
}

async fn edit_bulletin(
    writer: &SessionWriter,
    keys: &mut KeyReader,
    store: &Store,
    scheme: &ColorScheme,
    actor: &str,
) -> Result<()> {
    header(writer, scheme, "Edit Bulletin").await?;

    let id = match prompt(writer, keys, scheme, "Bulletin id: ", false).await? {
        Some(raw) => match raw.parse::<u64>() {
            Ok(id) => id,
            Err(_) => {
                show_message(writer, keys, scheme, "Invalid bulletin id.", "error").await?;
                return Ok(());
            }
        },
        None => return Ok(cancelled(writer, keys, scheme).await?),
    };
    let bulletin = match store.bulletin_by_id(id) {
        Ok(bulletin) => bulletin,
        Err(_) => {
            show_message(writer, keys, scheme, "Bulletin not found!", "error").await?;
            return Ok(());
        }
    };

    let title_prompt = format!("New title (current: {}, Enter to keep): ", bulletin.title);
    let title = match prompt(writer, keys, scheme, &title_prompt, false).await? {
        None => return Ok(cancelled(writer, keys, scheme).await?),
        Some(raw) if raw.is_empty() => bulletin.title.clone(),
        Some(raw) => raw,
    };

    writer
        .write_str(&scheme.colorize(
            "Enter new body, or a single '.' immediately to keep the current body.\r\n",
            "text",
        ))
        .await?;
    let body = match read_body(writer, keys, scheme).await? {
        None => return Ok(cancelled(writer, keys, scheme).await?),
        Some(body) if body.trim().is_empty() => bulletin.body.clone(),
        Some(body) => body,
    };

    match store.update_bulletin(id, &title, &body) {
        Ok(()) => {
            info!("Sysop {} edited bulletin #{}", escape_log(actor), id);
            show_message(writer, keys, scheme, "Bulletin updated successfully!", "success").await?;
        }
        Err(e) => {
            show_message(writer, keys, scheme, &format!("Error updating bulletin: {}", e), "error")
                .await?;
        }
    }
    Ok(())
}

async fn delete_bulletin(
    writer: &SessionWriter,
    keys: &mut KeyReader,
    store: &Store,
    scheme: &ColorScheme,
    actor: &str,
) -> Result<()> {
    header(writer, scheme, "Delete Bulletin").await?;

    let id = match prompt(writer, keys, scheme, "Bulletin id: ", false).await? {
        Some(raw) => match raw.parse::<u64>() {
            Ok(id) => id,
            Err(_) => {
                show_message(writer, keys, scheme, "Invalid bulletin id.", "error").await?;
                return Ok(());
            }
        },
        None => return Ok(cancelled(writer, keys, scheme).await?),
    };

    let confirm = prompt(writer, keys, scheme, "Delete this bulletin? (y/N): ", false).await?;
    if confirm.as_deref().map(|c| c.eq_ignore_ascii_case("y")) != Some(true) {
        return Ok(cancelled(writer, keys, scheme).await?);
    }

    match store.delete_bulletin(id) {
        Ok(()) => {
            info!("Sysop {} deleted bulletin #{}", escape_log(actor), id);
            show_message(writer, keys, scheme, "Bulletin deleted successfully!", "success").await?;
        }
        Err(_) => {
            show_message(writer, keys, scheme, "Bulletin not found!", "error").await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Store;

    fn scheme(config: &Config) -> ColorScheme {
        ColorScheme::new(config.bbs.colors.clone())
    }

    #[tokio::test]
    async fn provider_builds_options_from_config_section() {
        let config = Config::default();
        let module = SysopModule::new(&config, scheme(&config), "sysop");
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::open(dir.path().join("db")).expect("store");

        let options = module.load_options(&store).await.expect("options");
        assert_eq!(options.len(), 8);
        assert_eq!(options[0].id(), "create_user");
        assert_eq!(options[0].title(), "Create User");
        assert_eq!(options[0].description(), "1) Create a new user account");
        assert_eq!(options[6].id(), "system_stats");

        assert_eq!(module.menu_title(), "System Administration");
        let instructions = module.instructions();
        assert_eq!(instructions.len(), 3);
        assert_eq!(instructions[1], ("Select".to_string(), "Enter".to_string()));
    }

    #[tokio::test]
    async fn missing_section_yields_an_empty_module() {
        let mut config = Config::default();
        config.modules.clear();
        let module = SysopModule::new(&config, scheme(&config), "sysop");
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::open(dir.path().join("db")).expect("store");

        assert!(module.load_options(&store).await.expect("options").is_empty());
        assert_eq!(module.menu_title(), "System Administration");
    }

    #[test]
    fn parses_configured_instruction_pairs() {
        let pairs = parse_instructions("Navigate: ↑↓  Select: Enter  Quit: Q");
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0], ("Navigate".to_string(), "↑↓".to_string()));
        assert_eq!(pairs[2], ("Quit".to_string(), "Q".to_string()));
    }

    #[test]
    fn unparseable_instructions_fall_back() {
        let pairs = parse_instructions("press buttons until something happens");
        assert!(!pairs.is_empty());
        assert!(pairs.iter().any(|(label, _)| label == "Navigate"));
    }

    #[test]
    fn access_level_parsing_bounds() {
        assert_eq!(parse_access_level("0"), Some(0));
        assert_eq!(parse_access_level(" 255 "), Some(255));
        assert_eq!(parse_access_level("256"), None);
        assert_eq!(parse_access_level("-1"), None);
        assert_eq!(parse_access_level("ten"), None);
    }
}
