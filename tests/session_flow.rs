//! End-to-end session scenarios, driven over an in-memory duplex stream:
//! scripted key bytes go in, the full ANSI output comes back out.

use std::sync::Arc;
use std::time::Duration;

use driftline::bbs::Session;
use driftline::config::Config;
use driftline::storage::{seed, Store};
use driftline::term::{TermControl, TermSize, Terminal};
use driftline::ui::colors::ColorScheme;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn seeded_store() -> (tempfile::TempDir, Arc<Store>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::open(dir.path().join("db")).expect("store");
    seed::seed_if_needed(&store).expect("seed");
    (dir, Arc::new(store))
}

/// Run a full session against scripted input and return the plain-text
/// output (ANSI stripped) alongside the raw bytes.
async fn run_script(
    store: Arc<Store>,
    config: Arc<Config>,
    prefilled: Option<&str>,
    input: &[u8],
) -> (String, Vec<u8>) {
    let (client, server) = tokio::io::duplex(1 << 20);
    let terminal = Terminal::from_stream(server, TermControl::fixed(TermSize::default()));
    let session = Session::new(
        terminal,
        store,
        config,
        prefilled.map(|s| s.to_string()),
    );
    let session_task = tokio::spawn(session.run());

    let (mut read_half, mut write_half) = tokio::io::split(client);
    let collector = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = read_half.read_to_end(&mut buf).await;
        buf
    });

    write_half.write_all(input).await.expect("write input");
    // Half-close the client's write side so a session that runs out of
    // scripted input sees EOF instead of blocking forever.
    write_half.shutdown().await.expect("close input");

    tokio::time::timeout(Duration::from_secs(30), session_task)
        .await
        .expect("session timed out")
        .expect("session panicked");
    drop(write_half);

    let raw = tokio::time::timeout(Duration::from_secs(10), collector)
        .await
        .expect("collector timed out")
        .expect("collector panicked");
    (ColorScheme::strip_ansi(&String::from_utf8_lossy(&raw)), raw)
}

#[tokio::test]
async fn login_happy_path_reaches_main_menu() {
    let (_dir, store) = seeded_store();
    let config = Arc::new(Config::default());

    // Login, leave the auto-run bulletins with q, log off with g.
    let (plain, raw) = run_script(
        store.clone(),
        config,
        None,
        b"sysop\rpassword\rqg",
    )
    .await;

    assert!(plain.contains("Driftline BBS"), "welcome banner missing");
    assert!(plain.contains("Welcome, sysop!"), "login greeting missing");
    assert!(plain.contains("System Bulletins"), "bulletins auto-run missing");
    assert!(plain.contains("Main Menu"), "main menu missing");
    assert!(plain.contains("Goodbye"), "goodbye missing");

    // The status bar was installed: scroll region over rows 1..23.
    let raw_str = String::from_utf8_lossy(&raw);
    assert!(raw_str.contains("\x1b[1;23r"), "scroll region not installed");
    // ...and uninstalled again at teardown.
    assert!(raw_str.contains("\x1b[1;24r"), "scroll region not restored");

    // Exactly one recorded call.
    let sysop = store.user_by_name("sysop").expect("sysop");
    assert_eq!(sysop.total_calls, 1);
    assert!(sysop.last_call.is_some());
}

#[tokio::test]
async fn three_failed_logins_deny_access() {
    let (_dir, store) = seeded_store();
    let config = Arc::new(Config::default());

    let (plain, _) = run_script(
        store.clone(),
        config,
        None,
        b"sysop\rwrong\rsysop\rwrong\rsysop\rwrong\r",
    )
    .await;

    assert_eq!(
        plain.matches("Invalid username or password.").count(),
        3,
        "expected three failure notices"
    );
    assert!(plain.contains("Too many failed attempts. Access denied."));
    assert!(!plain.contains("Main Menu"), "menu must not render");

    // No call was recorded.
    let sysop = store.user_by_name("sysop").expect("sysop");
    assert_eq!(sysop.total_calls, 0);
    assert!(sysop.last_call.is_none());
}

#[tokio::test]
async fn low_access_user_never_sees_sysop_items() {
    let (_dir, store) = seeded_store();
    let config = Arc::new(Config::default());

    // Log in as the level-10 user, leave bulletins, try the sysop hotkey,
    // then log off. The hotkey must dispatch nothing.
    let (plain, _) = run_script(store, config, None, b"test\rtest\rqsg").await;

    assert!(plain.contains("Main Menu"));
    assert!(plain.contains("Bulletins"));
    assert!(
        !plain.contains("Sysop Area"),
        "sysop item leaked to a level-10 user"
    );
    assert!(!plain.contains("Create User"));
    assert!(plain.contains("Goodbye"));
}

#[tokio::test]
async fn sysop_hotkey_descends_and_q_returns() {
    let (_dir, store) = seeded_store();
    let config = Arc::new(Config::default());

    // s → sysop submenu, q → back to main, g → goodbye.
    let (plain, _) = run_script(store, config, None, b"sysop\rpassword\rqsqg").await;

    assert!(plain.contains("Sysop Area"), "submenu title missing");
    assert!(plain.contains("Create User"), "submenu items missing");
    // The submenu footer advertises Back, the root menu does not.
    assert!(plain.contains("Back: Q"));
    assert!(plain.contains("Thank you for calling"));
}

#[tokio::test]
async fn admin_console_runs_the_config_driven_sysop_module() {
    let (_dir, store) = seeded_store();
    let config = Arc::new(Config::default());

    // s → sysop submenu, a → Admin Console (the config-driven module),
    // 7 → System Statistics, any key to leave the stats page, q → exit the
    // module, q → back to main, g → goodbye.
    let (plain, _) = run_script(store, config, None, b"sysop\rpassword\rqsa7 qqg").await;

    // The module renders the [sysop] section: its title and its numbered
    // option descriptions, not the static submenu rows.
    assert!(plain.contains("System Administration"), "module title missing");
    assert!(
        plain.contains("1) Create a new user account"),
        "config-driven options missing"
    );
    // Option 7 executed the stats handler against the seeded store.
    assert!(plain.contains("--- System Statistics ---"));
    assert!(plain.contains("Total Users: 2"));
    assert!(plain.contains("Thank you for calling"));
}

#[tokio::test]
async fn admin_console_is_refused_below_sysop_level() {
    let (_dir, store) = seeded_store();

    // The level-10 user cannot normally see the sysop submenu at all, so
    // drive the module command through a config that exposes the menu
    // entries; the dispatcher's own level-255 guard must still hold.
    let mut config = Config::default();
    for item in &mut config.bbs.menus[0].submenu {
        if item.id == "sysop_menu" {
            item.access_level = 0;
            for child in &mut item.submenu {
                child.access_level = 0;
            }
        }
    }
    let (plain, _) = run_script(store, Arc::new(config), None, b"test\rtest\rqsag").await;

    assert!(plain.contains("Access denied. Sysop privileges required."));
    assert!(
        !plain.contains("1) Create a new user account"),
        "module must not render for a level-10 user"
    );
}

#[tokio::test]
async fn prefilled_username_skips_login() {
    let (_dir, store) = seeded_store();
    let config = Arc::new(Config::default());

    let (plain, _) = run_script(store.clone(), config, Some("sysop"), b"qg").await;

    assert!(plain.contains("Welcome back, sysop!"));
    assert!(plain.contains("Last call: First time login"));
    assert!(plain.contains("Total calls: 0"));
    assert!(plain.contains("Main Menu"));
    assert!(!plain.contains("Username: "), "no login prompt expected");

    let sysop = store.user_by_name("sysop").expect("sysop");
    assert_eq!(sysop.total_calls, 1);
}

#[tokio::test]
async fn unknown_prefilled_user_is_turned_away() {
    let (_dir, store) = seeded_store();
    let config = Arc::new(Config::default());

    let (plain, _) = run_script(store, config, Some("phantom"), b"").await;

    assert!(plain.contains("Error retrieving user information."));
    assert!(!plain.contains("Main Menu"));
}

#[tokio::test]
async fn transport_close_during_login_tears_down() {
    let (_dir, store) = seeded_store();
    let config = Arc::new(Config::default());

    // EOF right after the username: the session must end cleanly.
    let (plain, _) = run_script(store, config, None, b"sysop\r").await;
    assert!(plain.contains("Username: "));
    assert!(!plain.contains("Main Menu"));
}
