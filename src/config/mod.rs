//! # Configuration Management Module
//!
//! Handles all configuration aspects of the Driftline system: a structured,
//! validated, serde-backed configuration with sensible defaults and
//! persistence.
//!
//! ## Configuration Structure
//!
//! The configuration is organized into logical sections:
//!
//! - [`ServerConfig`] - Listen port, host key path, session limits
//! - [`DatabaseConfig`] - Embedded database location
//! - [`BbsConfig`] - System identity, welcome text, colors, and the menu tree
//! - [`LoggingConfig`] - Log level and optional log file
//! - [`ModuleMenuConfig`] - Per-module option menus (e.g. the `[sysop]` section)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use driftline::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     println!("System: {}", config.bbs.system_name);
//!
//!     // Write a starter configuration
//!     Config::create_default("config.toml").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! Driftline uses TOML for human-readable configuration:
//!
//! ```toml
//! [server]
//! port = 2323
//! host_key_path = "host_key"
//! max_users = 100
//!
//! [bbs]
//! system_name = "Driftline BBS"
//! max_line_length = 79
//!
//! [[bbs.menus]]
//! id = "main"
//! title = "Main Menu"
//! command = "main"
//! ```
//!
//! Menu items nest recursively via `submenu`, and per-module sections such as
//! `[sysop]` carry the option lists consumed by the module framework.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host_key_path: String,
    /// Maximum number of concurrent sessions; further channels are refused.
    pub max_users: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BbsConfig {
    pub system_name: String,
    pub sysop_name: String,
    pub welcome_message: String,
    pub max_line_length: usize,
    pub colors: ColorConfig,
    pub menus: Vec<MenuItem>,
}

/// Semantic palette mapped to concrete ANSI color names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorConfig {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub text: String,
    pub background: String,
    pub border: String,
    pub success: String,
    pub error: String,
    pub highlight: String,
}

/// One node of the hierarchical menu tree. A node whose `command` equals its
/// `id` and that has children is a menu; otherwise it is a leaf action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub command: String,
    #[serde(default)]
    pub access_level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotkey: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub submenu: Vec<MenuItem>,
}

impl MenuItem {
    pub fn is_menu(&self) -> bool {
        self.command == self.id && !self.submenu.is_empty()
    }
}

/// A generic option inside a module menu section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleOptionConfig {
    pub id: String,
    pub title: String,
    pub description: String,
    pub command: String,
}

/// A per-module menu configuration (e.g. the `[sysop]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleMenuConfig {
    pub title: String,
    pub instructions: String,
    pub options: Vec<ModuleOptionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub bbs: BbsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Per-module menu sections, keyed by section name (e.g. "sysop").
    #[serde(flatten)]
    pub modules: HashMap<String, ModuleMenuConfig>,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Look up a per-module menu section by name.
    pub fn module_menu(&self, name: &str) -> Option<&ModuleMenuConfig> {
        self.modules.get(name)
    }

    /// Find a menu (a node with children whose command equals its id) anywhere
    /// in the configured menu tree.
    pub fn find_menu(&self, id: &str) -> Option<&MenuItem> {
        fn search<'a>(items: &'a [MenuItem], id: &str) -> Option<&'a MenuItem> {
            for item in items {
                if item.id == id && !item.submenu.is_empty() {
                    return Some(item);
                }
                if let Some(found) = search(&item.submenu, id) {
                    return Some(found);
                }
            }
            None
        }
        search(&self.bbs.menus, id)
    }
}

fn leaf(id: &str, description: &str, command: &str, level: u8, hotkey: &str) -> MenuItem {
    MenuItem {
        id: id.to_string(),
        title: description.to_string(),
        description: description.to_string(),
        command: command.to_string(),
        access_level: level,
        hotkey: if hotkey.is_empty() {
            None
        } else {
            Some(hotkey.to_string())
        },
        submenu: Vec::new(),
    }
}

impl Default for Config {
    fn default() -> Self {
        let sysop_children = vec![
            // Dispatches the config-driven sysop module (the [sysop] section
            // below); the remaining leaves invoke the handlers directly.
            leaf("sysop", "Admin Console", "sysop", 255, "A"),
            leaf("create_user", "Create User", "create_user", 255, "C"),
            leaf("edit_user", "Edit User", "edit_user", 255, "E"),
            leaf("delete_user", "Delete User", "delete_user", 255, "D"),
            leaf("view_users", "View All Users", "view_users", 255, "V"),
            leaf("change_password", "Change User Password", "change_password", 255, "P"),
            leaf("toggle_user", "Toggle User Status", "toggle_user", 255, "T"),
            leaf("system_stats", "System Statistics", "system_stats", 255, "S"),
            leaf(
                "bulletin_management",
                "Bulletin Management",
                "bulletin_management",
                255,
                "B",
            ),
        ];

        let main_menu = MenuItem {
            id: "main".to_string(),
            title: "Main Menu".to_string(),
            description: "Main Menu".to_string(),
            command: "main".to_string(),
            access_level: 0,
            hotkey: None,
            submenu: vec![
                leaf("bulletins", "Bulletins", "bulletins", 0, "B"),
                leaf("messages", "Message Boards", "messages", 0, "M"),
                MenuItem {
                    id: "sysop_menu".to_string(),
                    title: "Sysop Area".to_string(),
                    description: "Sysop Area".to_string(),
                    command: "sysop_menu".to_string(),
                    access_level: 255,
                    hotkey: Some("S".to_string()),
                    submenu: sysop_children,
                },
                leaf("goodbye", "Goodbye (Log Off)", "goodbye", 0, "G"),
            ],
        };

        let mut modules = HashMap::new();
        modules.insert(
            "sysop".to_string(),
            ModuleMenuConfig {
                title: "System Administration".to_string(),
                instructions: "Navigate: ↑↓  Select: Enter  Quit: Q".to_string(),
                options: vec![
                    ModuleOptionConfig {
                        id: "create_user".to_string(),
                        title: "Create User".to_string(),
                        description: "Create a new user account".to_string(),
                        command: "create_user".to_string(),
                    },
                    ModuleOptionConfig {
                        id: "edit_user".to_string(),
                        title: "Edit User".to_string(),
                        description: "Edit an existing user account".to_string(),
                        command: "edit_user".to_string(),
                    },
                    ModuleOptionConfig {
                        id: "delete_user".to_string(),
                        title: "Delete User".to_string(),
                        description: "Delete a user account".to_string(),
                        command: "delete_user".to_string(),
                    },
                    ModuleOptionConfig {
                        id: "view_users".to_string(),
                        title: "View Users".to_string(),
                        description: "List all user accounts".to_string(),
                        command: "view_users".to_string(),
                    },
                    ModuleOptionConfig {
                        id: "change_password".to_string(),
                        title: "Change Password".to_string(),
                        description: "Change a user's password".to_string(),
                        command: "change_password".to_string(),
                    },
                    ModuleOptionConfig {
                        id: "toggle_user".to_string(),
                        title: "Toggle User".to_string(),
                        description: "Activate or deactivate a user".to_string(),
                        command: "toggle_user".to_string(),
                    },
                    ModuleOptionConfig {
                        id: "system_stats".to_string(),
                        title: "System Statistics".to_string(),
                        description: "Show system statistics".to_string(),
                        command: "system_stats".to_string(),
                    },
                    ModuleOptionConfig {
                        id: "bulletin_management".to_string(),
                        title: "Bulletin Management".to_string(),
                        description: "Create, edit, and delete bulletins".to_string(),
                        command: "bulletin_management".to_string(),
                    },
                ],
            },
        );

        Config {
            server: ServerConfig {
                port: 2323,
                host_key_path: "host_key".to_string(),
                max_users: 100,
            },
            database: DatabaseConfig {
                path: "driftline.db".to_string(),
            },
            bbs: BbsConfig {
                system_name: "Driftline BBS".to_string(),
                sysop_name: "Sysop".to_string(),
                welcome_message: "Welcome to Driftline BBS!".to_string(),
                max_line_length: 79,
                colors: ColorConfig {
                    primary: "cyan".to_string(),
                    secondary: "red".to_string(),
                    accent: "yellow".to_string(),
                    text: "white".to_string(),
                    background: "black".to_string(),
                    border: "blue".to_string(),
                    success: "green".to_string(),
                    error: "red".to_string(),
                    highlight: "bright_white".to_string(),
                },
                menus: vec![main_menu],
            },
            logging: LoggingConfig::default(),
            modules,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_main_menu() {
        let config = Config::default();
        let main = config.find_menu("main").expect("main menu");
        assert_eq!(main.command, "main");
        assert!(main.is_menu());
        assert!(!main.submenu.is_empty());
    }

    #[test]
    fn find_menu_descends_into_submenus() {
        let config = Config::default();
        let sysop = config.find_menu("sysop_menu").expect("sysop menu");
        assert_eq!(sysop.access_level, 255);
        assert!(sysop.submenu.iter().any(|i| i.command == "create_user"));
    }

    #[test]
    fn find_menu_ignores_leaves() {
        let config = Config::default();
        // "bulletins" exists as a leaf action, not a menu.
        assert!(config.find_menu("bulletins").is_none());
    }

    #[test]
    fn admin_console_leaf_dispatches_the_sysop_module() {
        let config = Config::default();
        let sysop_menu = config.find_menu("sysop_menu").expect("sysop menu");
        let console = sysop_menu
            .submenu
            .iter()
            .find(|item| item.command == "sysop")
            .expect("admin console entry");
        assert!(console.submenu.is_empty());
        // No menu claims the "sysop" id, so dispatch cannot treat the
        // command as navigation; it must reach the module.
        assert!(config.find_menu("sysop").is_none());
        assert!(config.module_menu("sysop").is_some());
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).expect("serialize");
        let parsed: Config = toml::from_str(&serialized).expect("parse");
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.bbs.system_name, config.bbs.system_name);
        assert_eq!(parsed.bbs.menus.len(), config.bbs.menus.len());
        assert!(parsed.module_menu("sysop").is_some());
    }

    #[test]
    fn module_section_parses_from_toml() {
        let raw = r#"
            [server]
            port = 2222
            host_key_path = "hk"
            max_users = 5

            [database]
            path = "test.db"

            [bbs]
            system_name = "Test BBS"
            sysop_name = "Op"
            welcome_message = "hi"
            max_line_length = 79
            menus = []

            [bbs.colors]
            primary = "cyan"
            secondary = "red"
            accent = "yellow"
            text = "white"
            background = "black"
            border = "blue"
            success = "green"
            error = "red"
            highlight = "bright_white"

            [sysop]
            title = "Admin"
            instructions = "pick one"
            options = [
                { id = "view_users", title = "View", description = "View users", command = "view_users" },
            ]
        "#;
        let config: Config = toml::from_str(raw).expect("parse");
        let sysop = config.module_menu("sysop").expect("sysop section");
        assert_eq!(sysop.title, "Admin");
        assert_eq!(sysop.options.len(), 1);
        assert_eq!(sysop.options[0].command, "view_users");
    }
}
