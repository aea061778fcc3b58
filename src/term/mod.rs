//! Transport-agnostic terminal streams and key decoding.
//!
//! A [`Terminal`] pairs a byte stream (SSH channel or local tty) with a
//! [`TermControl`] handle for the out-of-band concerns: size queries and
//! raw-mode toggling. Splitting a terminal yields the session's exclusive
//! [`KeyReader`] and the write half that backs the shared session writer.
//!
//! Escape sequences are assembled here, byte by byte if necessary; the
//! transports deliver them verbatim.

pub mod local;
pub mod ssh;

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, ReadHalf, WriteHalf};

use crate::bbs::writer::SessionWriter;

/// How long to wait for the rest of an escape sequence before reporting a
/// bare Escape key.
const ESCAPE_LOOKAHEAD: Duration = Duration::from_millis(50);

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermSize {
    pub width: u16,
    pub height: u16,
}

impl Default for TermSize {
    fn default() -> Self {
        // The classic fallback when the transport reports nothing.
        TermSize {
            width: 80,
            height: 24,
        }
    }
}

/// Any bidirectional byte stream a session can run over.
pub trait TermStream: AsyncRead + AsyncWrite + Send + Sync + Unpin {}
impl<T: AsyncRead + AsyncWrite + Send + Sync + Unpin> TermStream for T {}

pub type TermSource = ReadHalf<Box<dyn TermStream>>;
pub type TermSink = WriteHalf<Box<dyn TermStream>>;

#[derive(Clone)]
enum ControlKind {
    /// Size pinned at construction; raw mode is a no-op. Used by tests.
    Fixed(TermSize),
    /// Local tty: size probed from the terminal, raw mode via termios.
    Local(Arc<AtomicBool>),
    /// SSH channel: size pushed by pty-req / window-change requests.
    Remote(Arc<RwLock<TermSize>>),
}

/// Cloneable handle for terminal size and mode control, usable from any task
/// that writes to the session.
#[derive(Clone)]
pub struct TermControl {
    kind: ControlKind,
}

impl TermControl {
    pub fn fixed(size: TermSize) -> Self {
        TermControl {
            kind: ControlKind::Fixed(size),
        }
    }

    pub(crate) fn local() -> Self {
        TermControl {
            kind: ControlKind::Local(Arc::new(AtomicBool::new(false))),
        }
    }

    pub(crate) fn remote(size: Arc<RwLock<TermSize>>) -> Self {
        TermControl {
            kind: ControlKind::Remote(size),
        }
    }

    /// Current terminal dimensions, falling back to 80x24 when unknown.
    pub fn size(&self) -> TermSize {
        match &self.kind {
            ControlKind::Fixed(size) => *size,
            ControlKind::Local(_) => match crossterm::terminal::size() {
                Ok((w, h)) if w > 0 && h > 0 => TermSize {
                    width: w,
                    height: h,
                },
                _ => TermSize::default(),
            },
            ControlKind::Remote(size) => size.read().map(|s| *s).unwrap_or_default(),
        }
    }

    /// Put a local tty into character-at-a-time, no-echo mode. Idempotent;
    /// a no-op for SSH transports, which already deliver raw input.
    pub fn make_raw(&self) -> io::Result<()> {
        if let ControlKind::Local(raw) = &self.kind {
            if !raw.swap(true, Ordering::SeqCst) {
                crossterm::terminal::enable_raw_mode()?;
            }
        }
        Ok(())
    }

    /// Restore the local tty to its prior mode. Idempotent.
    pub fn restore(&self) -> io::Result<()> {
        if let ControlKind::Local(raw) = &self.kind {
            if raw.swap(false, Ordering::SeqCst) {
                crossterm::terminal::disable_raw_mode()?;
            }
        }
        Ok(())
    }
}

/// A connected terminal: the byte stream plus its control handle.
pub struct Terminal {
    stream: Box<dyn TermStream>,
    control: TermControl,
}

impl Terminal {
    pub fn from_stream<S: TermStream + 'static>(stream: S, control: TermControl) -> Self {
        Terminal {
            stream: Box::new(stream),
            control,
        }
    }

    pub fn control(&self) -> TermControl {
        self.control.clone()
    }

    /// Split into the read half (key decoding) and write half (output).
    pub fn split(self) -> (KeyReader, TermSink, TermControl) {
        let (source, sink) = tokio::io::split(self.stream);
        (KeyReader::new(source), sink, self.control)
    }
}

/// A decoded key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Up,
    Down,
    Right,
    Left,
    Backspace,
    /// Ctrl-C.
    Interrupt,
    Char(char),
}

impl Key {
    /// Whether this key means "quit / back" in a navigation context.
    /// Line editors must not consult this; for them `q` is just a letter.
    pub fn is_quit(&self) -> bool {
        matches!(self, Key::Char('q') | Key::Char('Q'))
    }

    /// Whether this key means "goodbye" in a navigation context.
    pub fn is_goodbye(&self) -> bool {
        matches!(self, Key::Char('g') | Key::Char('G') | Key::Interrupt)
    }
}

/// Assembles key presses from the terminal byte stream.
///
/// Arrow keys arrive as `ESC [ A..D`, possibly one byte per read; a lone
/// Escape is reported after a short lookahead window expires. Bytes that do
/// not form a recognized key are discarded.
pub struct KeyReader {
    source: TermSource,
    pending: VecDeque<u8>,
}

impl KeyReader {
    pub fn new(source: TermSource) -> Self {
        KeyReader {
            source,
            pending: VecDeque::new(),
        }
    }

    async fn next_byte(&mut self) -> io::Result<u8> {
        if let Some(b) = self.pending.pop_front() {
            return Ok(b);
        }
        let mut buf = [0u8; 64];
        let n = self.source.read(&mut buf).await?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "terminal closed",
            ));
        }
        self.pending.extend(&buf[1..n]);
        Ok(buf[0])
    }

    /// Read the next byte, giving up after the escape lookahead window.
    async fn next_byte_within(&mut self, window: Duration) -> io::Result<Option<u8>> {
        if let Some(b) = self.pending.pop_front() {
            return Ok(Some(b));
        }
        match tokio::time::timeout(window, self.next_byte()).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Block until a complete key press has been decoded.
    pub async fn read_key(&mut self) -> io::Result<Key> {
        loop {
            let byte = self.next_byte().await?;
            match byte {
                0x0d | 0x0a => return Ok(Key::Enter),
                0x1b => match self.next_byte_within(ESCAPE_LOOKAHEAD).await? {
                    Some(b'[') => match self.next_byte_within(ESCAPE_LOOKAHEAD).await? {
                        Some(b'A') => return Ok(Key::Up),
                        Some(b'B') => return Ok(Key::Down),
                        Some(b'C') => return Ok(Key::Right),
                        Some(b'D') => return Ok(Key::Left),
                        _ => return Ok(Key::Escape),
                    },
                    Some(other) => {
                        self.pending.push_front(other);
                        return Ok(Key::Escape);
                    }
                    None => return Ok(Key::Escape),
                },
                0x03 => return Ok(Key::Interrupt),
                0x08 | 0x7f => return Ok(Key::Backspace),
                0x20..=0x7e => return Ok(Key::Char(byte as char)),
                // Anything else is malformed input; drop it silently.
                _ => continue,
            }
        }
    }

    /// Read a line of input, echoing through the session writer. With `mask`
    /// set, each keystroke echoes `*` instead of the character. Returns
    /// `None` when the caller interrupts with Ctrl-C.
    pub async fn read_line(
        &mut self,
        writer: &SessionWriter,
        mask: bool,
    ) -> io::Result<Option<String>> {
        let mut line = String::new();
        loop {
            match self.read_key().await? {
                Key::Enter => {
                    writer.write(b"\r\n").await?;
                    return Ok(Some(line));
                }
                Key::Backspace => {
                    if line.pop().is_some() {
                        writer.write(b"\x08 \x08").await?;
                    }
                }
                Key::Interrupt => return Ok(None),
                Key::Char(c) => {
                    line.push(c);
                    if mask {
                        writer.write(b"*").await?;
                    } else {
                        let mut buf = [0u8; 4];
                        writer.write(c.encode_utf8(&mut buf).as_bytes()).await?;
                    }
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    fn test_reader() -> (KeyReader, tokio::io::DuplexStream) {
        let (client, server) = tokio::io::duplex(1024);
        let terminal = Terminal::from_stream(server, TermControl::fixed(TermSize::default()));
        let (keys, _sink, _control) = terminal.split();
        (keys, client)
    }

    #[tokio::test]
    async fn decodes_basic_keys() {
        let (mut keys, mut client) = test_reader();
        client.write_all(b"\rx\x03").await.unwrap();
        assert_eq!(keys.read_key().await.unwrap(), Key::Enter);
        assert_eq!(keys.read_key().await.unwrap(), Key::Char('x'));
        assert_eq!(keys.read_key().await.unwrap(), Key::Interrupt);
    }

    #[tokio::test]
    async fn decodes_arrow_sequences() {
        let (mut keys, mut client) = test_reader();
        client.write_all(b"\x1b[A\x1b[B\x1b[C\x1b[D").await.unwrap();
        assert_eq!(keys.read_key().await.unwrap(), Key::Up);
        assert_eq!(keys.read_key().await.unwrap(), Key::Down);
        assert_eq!(keys.read_key().await.unwrap(), Key::Right);
        assert_eq!(keys.read_key().await.unwrap(), Key::Left);
    }

    #[tokio::test]
    async fn decodes_split_arrow_sequence() {
        let (mut keys, mut client) = test_reader();
        client.write_all(b"\x1b").await.unwrap();
        tokio::task::yield_now().await;
        client.write_all(b"[").await.unwrap();
        tokio::task::yield_now().await;
        client.write_all(b"A").await.unwrap();
        assert_eq!(keys.read_key().await.unwrap(), Key::Up);
    }

    #[tokio::test]
    async fn lone_escape_times_out_to_escape() {
        let (mut keys, mut client) = test_reader();
        client.write_all(b"\x1b").await.unwrap();
        assert_eq!(keys.read_key().await.unwrap(), Key::Escape);
    }

    #[tokio::test]
    async fn discards_malformed_bytes() {
        let (mut keys, mut client) = test_reader();
        client.write_all(&[0x01, 0x02, b'z']).await.unwrap();
        assert_eq!(keys.read_key().await.unwrap(), Key::Char('z'));
    }

    #[tokio::test]
    async fn eof_is_an_error() {
        let (mut keys, client) = test_reader();
        drop(client);
        assert!(keys.read_key().await.is_err());
    }

    #[test]
    fn quit_and_goodbye_classification() {
        assert!(Key::Char('q').is_quit());
        assert!(Key::Char('Q').is_quit());
        assert!(!Key::Char('x').is_quit());
        assert!(Key::Char('g').is_goodbye());
        assert!(Key::Interrupt.is_goodbye());
        assert!(!Key::Enter.is_goodbye());
    }
}
