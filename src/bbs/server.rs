//! The BBS server: an SSH front door plus a local-console mode.
//!
//! SSH handling follows the password-only model: the password callback
//! checks the presented credentials against the store through the pluggable
//! verifier and rejects everything else (public keys included) without
//! revealing which predicate failed. Each accepted session channel becomes a
//! [`Session`] on its own task; pty-req and window-change requests feed the
//! shared window size the renderer reads at draw time.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use russh::keys::key;
use russh::server::{Auth, Handler, Msg, Server};
use russh::{Channel, ChannelId, Pty};
use tokio::net::TcpListener;

use crate::bbs::hostkey;
use crate::bbs::session::Session;
use crate::config::Config;
use crate::credentials::{SecretVerifier, Verifier};
use crate::logutil::escape_log;
use crate::storage::Store;
use crate::term::ssh::{new_window_size, ssh_terminal, WindowSize};
use crate::term::TermSize;

/// The unified BBS server. Owns the store and configuration shared by all
/// sessions.
pub struct BbsServer {
    config: Arc<Config>,
    store: Arc<Store>,
    verifier: Arc<SecretVerifier>,
    active_sessions: Arc<AtomicUsize>,
}

impl BbsServer {
    pub fn new(config: Config, store: Store) -> Self {
        BbsServer {
            config: Arc::new(config),
            store: Arc::new(store),
            verifier: Arc::new(SecretVerifier::new()),
            active_sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Run the SSH server until a shutdown signal arrives.
    pub async fn run(&mut self) -> Result<()> {
        let host_key = hostkey::load_or_generate(&self.config.server.host_key_path)?;

        let ssh_config = Arc::new(russh::server::Config {
            auth_rejection_time: std::time::Duration::from_secs(1),
            auth_rejection_time_initial: Some(std::time::Duration::from_secs(0)),
            keys: vec![host_key],
            ..Default::default()
        });

        let port = self.config.server.port;
        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .with_context(|| format!("failed to listen on port {}", port))?;
        info!(
            "{} listening on port {}",
            self.config.bbs.system_name, port
        );

        let mut acceptor = Acceptor {
            config: self.config.clone(),
            store: self.store.clone(),
            verifier: self.verifier.clone(),
            active_sessions: self.active_sessions.clone(),
        };

        tokio::select! {
            result = acceptor.run_on_socket(ssh_config, &listener) => {
                result.context("ssh server terminated")?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
            }
        }
        Ok(())
    }

    /// Run one session on the local tty instead of serving SSH.
    pub async fn run_local(&self) -> Result<()> {
        let terminal = crate::term::local::local_terminal();
        let session = Session::new(terminal, self.store.clone(), self.config.clone(), None);
        session.run().await;
        Ok(())
    }
}

/// Creates one [`ClientHandler`] per inbound connection.
struct Acceptor {
    config: Arc<Config>,
    store: Arc<Store>,
    verifier: Arc<SecretVerifier>,
    active_sessions: Arc<AtomicUsize>,
}

impl Server for Acceptor {
    type Handler = ClientHandler;

    fn new_client(&mut self, peer_addr: Option<SocketAddr>) -> ClientHandler {
        debug!("New connection from {:?}", peer_addr);
        ClientHandler {
            config: self.config.clone(),
            store: self.store.clone(),
            verifier: self.verifier.clone(),
            active_sessions: self.active_sessions.clone(),
            username: None,
            window: new_window_size(),
        }
    }

    fn handle_session_error(&mut self, error: <Self::Handler as Handler>::Error) {
        // Accept-loop errors other than shutdown are logged; the loop goes on.
        error!("Session error: {:?}", error);
    }
}

/// Handler for a single SSH connection.
struct ClientHandler {
    config: Arc<Config>,
    store: Arc<Store>,
    verifier: Arc<SecretVerifier>,
    active_sessions: Arc<AtomicUsize>,
    username: Option<String>,
    window: WindowSize,
}

impl ClientHandler {
    fn update_window(&self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if let Ok(mut size) = self.window.write() {
            *size = TermSize {
                width: width.min(u16::MAX as u32) as u16,
                height: height.min(u16::MAX as u32) as u16,
            };
        }
    }
}

#[async_trait::async_trait]
impl Handler for ClientHandler {
    type Error = russh::Error;

    async fn auth_password(&mut self, user: &str, password: &str) -> Result<Auth, Self::Error> {
        // One opaque rejection for every failure mode: unknown user,
        // inactive account, or bad password.
        let rejected = Ok(Auth::Reject {
            proceed_with_methods: None,
        });

        let record = match self.store.user_by_name(user) {
            Ok(record) => record,
            Err(_) => {
                info!("Rejected SSH login for '{}'", escape_log(user));
                return rejected;
            }
        };
        if !record.is_active || !self.verifier.verify(password, &record.credential_secret) {
            info!("Rejected SSH login for '{}'", escape_log(user));
            return rejected;
        }

        self.username = Some(record.username);
        Ok(Auth::Accept)
    }

    async fn auth_publickey(
        &mut self,
        user: &str,
        _public_key: &key::PublicKey,
    ) -> Result<Auth, Self::Error> {
        debug!("Rejecting public-key auth for '{}'", escape_log(user));
        Ok(Auth::Reject {
            proceed_with_methods: None,
        })
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut russh::server::Session,
    ) -> Result<bool, Self::Error> {
        let username = match self.username.clone() {
            Some(username) => username,
            None => return Ok(false),
        };

        let max_users = self.config.server.max_users;
        if self.active_sessions.load(Ordering::SeqCst) >= max_users {
            warn!(
                "Refusing session for '{}': {} sessions already active",
                escape_log(&username),
                max_users
            );
            return Ok(false);
        }

        let terminal = ssh_terminal(channel.into_stream(), self.window.clone());
        let session = Session::new(
            terminal,
            self.store.clone(),
            self.config.clone(),
            Some(username),
        );

        let counter = self.active_sessions.clone();
        counter.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            session.run().await;
            counter.fetch_sub(1, Ordering::SeqCst);
        });

        Ok(true)
    }

    async fn pty_request(
        &mut self,
        channel: ChannelId,
        _term: &str,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(Pty, u32)],
        session: &mut russh::server::Session,
    ) -> Result<(), Self::Error> {
        self.update_window(col_width, row_height);
        session.channel_success(channel);
        Ok(())
    }

    async fn shell_request(
        &mut self,
        channel: ChannelId,
        session: &mut russh::server::Session,
    ) -> Result<(), Self::Error> {
        session.channel_success(channel);
        Ok(())
    }

    async fn exec_request(
        &mut self,
        channel: ChannelId,
        _data: &[u8],
        session: &mut russh::server::Session,
    ) -> Result<(), Self::Error> {
        session.channel_success(channel);
        Ok(())
    }

    async fn window_change_request(
        &mut self,
        channel: ChannelId,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        session: &mut russh::server::Session,
    ) -> Result<(), Self::Error> {
        self.update_window(col_width, row_height);
        session.channel_success(channel);
        Ok(())
    }
}
