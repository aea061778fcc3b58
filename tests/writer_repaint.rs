//! The session writer's status-bar repaint contract: every screen clear is
//! followed by a bar repaint, debounced to at most one per window with
//! extras coalesced.

use std::sync::Arc;
use std::time::Duration;

use driftline::bbs::writer::SessionWriter;
use driftline::config::Config;
use driftline::term::{TermControl, TermSize, Terminal};
use driftline::ui::statusbar::StatusBar;
use tokio::io::AsyncReadExt;

/// The repaint positions to the bar row and clears it; nothing else writes
/// this prefix while the bar is installed.
const REPAINT_MARK: &[u8] = b"\x1b[24;1H\x1b[2K";

fn count_occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

fn writer_over_duplex() -> (SessionWriter, tokio::io::DuplexStream) {
    let (client, server) = tokio::io::duplex(1 << 20);
    let terminal = Terminal::from_stream(server, TermControl::fixed(TermSize::default()));
    let (_keys, sink, control) = terminal.split();
    (SessionWriter::new(sink, control), client)
}

async fn drain(client: tokio::io::DuplexStream) -> Vec<u8> {
    let mut read = client;
    let mut buf = Vec::new();
    let _ = tokio::time::timeout(Duration::from_secs(5), read.read_to_end(&mut buf)).await;
    buf
}

#[tokio::test]
async fn clear_triggers_exactly_one_repaint() {
    let (writer, client) = writer_over_duplex();
    writer.set_status_bar(Some(Arc::new(StatusBar::new("sysop", &Config::default()))));

    writer.write(b"\x1b[2J\x1b[H").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    writer.shutdown().await;

    let out = drain(client).await;
    assert_eq!(count_occurrences(&out, REPAINT_MARK), 1);
}

#[tokio::test]
async fn rapid_clears_coalesce_into_one_extra_repaint() {
    let (writer, client) = writer_over_duplex();
    writer.set_status_bar(Some(Arc::new(StatusBar::new("sysop", &Config::default()))));

    // First clear repaints immediately; the next two fall inside the
    // debounce window and must coalesce into a single delayed repaint.
    writer.write(b"\x1b[2J").await.unwrap();
    writer.write(b"\x1b[H\x1b[0J").await.unwrap();
    writer.write(b"\x1b[2J").await.unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    writer.shutdown().await;

    let out = drain(client).await;
    assert_eq!(count_occurrences(&out, REPAINT_MARK), 2);
}

#[tokio::test]
async fn no_repaint_without_installed_bar() {
    let (writer, client) = writer_over_duplex();

    writer.write(b"\x1b[2J\x1b[H").await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    writer.shutdown().await;

    let out = drain(client).await;
    assert_eq!(count_occurrences(&out, REPAINT_MARK), 0);
}

#[tokio::test]
async fn plain_writes_never_repaint() {
    let (writer, client) = writer_over_duplex();
    writer.set_status_bar(Some(Arc::new(StatusBar::new("sysop", &Config::default()))));

    writer.write(b"hello \x1b[31mworld\x1b[0m\r\n").await.unwrap();
    writer.write(b"\x1b[2Kjust a line clear").await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    writer.shutdown().await;

    let out = drain(client).await;
    assert_eq!(count_occurrences(&out, REPAINT_MARK), 0);
}
