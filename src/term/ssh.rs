//! SSH channel transport. The channel stream already carries raw
//! character-at-a-time input; window dimensions arrive out of band via
//! pty-req and window-change requests and are shared with the connection
//! handler through a lock the control handle reads at render time.

use std::sync::{Arc, RwLock};

use russh::server::Msg;
use russh::ChannelStream;

use super::{TermControl, TermSize, Terminal};

/// Shared window-size cell, updated by the SSH connection handler.
pub type WindowSize = Arc<RwLock<TermSize>>;

pub fn new_window_size() -> WindowSize {
    Arc::new(RwLock::new(TermSize::default()))
}

/// Build a terminal over an accepted SSH session channel.
pub fn ssh_terminal(stream: ChannelStream<Msg>, window: WindowSize) -> Terminal {
    Terminal::from_stream(stream, TermControl::remote(window))
}
