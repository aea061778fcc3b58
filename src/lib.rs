//! # Driftline - A Classic BBS over SSH
//!
//! Driftline is a multi-user bulletin board system that recreates the classic
//! dial-up BBS experience over SSH. Callers connect with any SSH client (or a
//! local console session), log in, read bulletins, browse message boards, and
//! - with sysop privileges - administer users and bulletins through a
//! configuration-driven menu system.
//!
//! ## Features
//!
//! - **SSH Access**: Password-authenticated SSH sessions with per-connection
//!   isolation; a local console mode for single-user testing.
//! - **Menu Engine**: Hierarchical, config-driven menus with access-level
//!   filtering, hotkeys, and a navigation history stack.
//! - **Classic Rendering**: 79-column ANSI layouts, selection bars, a paged
//!   content viewer, and a fixed status bar protected by a terminal scroll
//!   region.
//! - **Module Framework**: Bulletins, message boards, and sysop tooling all
//!   plug into one generic option-menu loop.
//! - **Embedded Storage**: Sled-backed persistence for users, bulletins, and
//!   message board content.
//! - **Async Design**: Built with Tokio; one task per session plus a
//!   status-bar ticker.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use driftline::bbs::BbsServer;
//! use driftline::config::Config;
//! use driftline::storage::Store;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let store = Store::open(&config.database.path)?;
//!     let mut server = BbsServer::new(config, store);
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`bbs`] - Server, per-connection session state machine, output writer
//! - [`modules`] - The option-provider framework and the feature modules
//! - [`ui`] - Color scheme, menu renderer, pager, status bar
//! - [`term`] - Transport-agnostic terminal streams and key decoding
//! - [`storage`] - Sled-backed persistence layer
//! - [`config`] - Configuration management
//! - [`credentials`] - Pluggable credential verification

pub mod bbs;
pub mod config;
pub mod credentials;
pub mod logutil;
pub mod modules;
pub mod storage;
pub mod term;
pub mod ui;
