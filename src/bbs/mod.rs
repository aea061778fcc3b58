//! # BBS Core Module
//!
//! The heart of the system: the server that accepts connections and the
//! per-connection session state machine that drives login, menus, and
//! modules.
//!
//! ## Components
//!
//! - [`server`] - SSH accept loop, password authentication, local mode
//! - [`session`] - The per-connection state machine
//! - [`writer`] - The serialized per-session output path
//! - [`hostkey`] - Host key loading and generation
//!
//! ## Session Lifecycle
//!
//! ```text
//! accept → authenticate → Session::run
//!                          ├── welcome banner
//!                          ├── login (or transport pre-auth)
//!                          ├── status bar install + ticker
//!                          ├── bulletins auto-run
//!                          ├── menu loop ⇄ module dispatch
//!                          └── teardown (cursor, bar, raw mode, close)
//! ```

pub mod hostkey;
pub mod server;
pub mod session;
pub mod writer;

pub use server::BbsServer;
pub use session::Session;
