//! First-run seeding so a fresh install is navigable: a sysop account, a
//! regular test account, a few welcome bulletins, and starter topics.
//! Every seed is idempotent; existing records are never touched.

use super::{NewUser, Store, StoreError, StoreResult};
use log::info;

struct UserSeed {
    username: &'static str,
    secret: &'static str,
    real_name: &'static str,
    email: &'static str,
    access_level: u8,
}

struct BulletinSeed {
    title: &'static str,
    body: &'static str,
    author: &'static str,
}

fn seed_users() -> Vec<UserSeed> {
    vec![
        UserSeed {
            username: "sysop",
            secret: "password",
            real_name: "System Operator",
            email: "sysop@localhost",
            access_level: 255,
        },
        UserSeed {
            username: "test",
            secret: "test",
            real_name: "Test User",
            email: "test@localhost",
            access_level: 10,
        },
    ]
}

fn seed_bulletins() -> Vec<BulletinSeed> {
    vec![
        BulletinSeed {
            title: "Welcome to Driftline BBS!",
            body: "Welcome aboard! Driftline brings the classic bulletin board \
experience to the modern era: connect with any SSH client, read the daily \
bulletins, and join the conversation on the message boards.\n\n\
Use the arrow keys to move through menus, Enter to select, the highlighted \
hotkey letters to jump straight to an item, Q to back out of a submenu, and \
G to log off when you are done.\n\n\
New callers start at access level 10. If you need anything, leave a note for \
the sysop on the General board. Happy calling!",
            author: "Sysop",
        },
        BulletinSeed {
            title: "House Rules",
            body: "A few simple rules keep this board pleasant for everyone:\n\n\
Be civil. Disagreement is fine, name-calling is not. Keep posts on topic for \
the board you are posting to, and pick subject lines that say what the post \
is about.\n\n\
Accounts are personal; do not share your password. The sysop may deactivate \
accounts that ignore repeated warnings.\n\n\
Questions about these rules go to the sysop.",
            author: "Sysop",
        },
        BulletinSeed {
            title: "About This System",
            body: "Driftline is a small, self-contained system: an SSH front \
door, an embedded database, and the traditional 79-column ANSI interface you \
are looking at right now.\n\n\
The status bar at the bottom of your screen shows who you are, where you are \
calling, and how long you have been connected this call. It stays put while \
the rest of the screen scrolls.\n\n\
Scheduled maintenance happens early Sunday mornings; the system may be \
briefly unavailable while backups run.",
            author: "Sysop",
        },
    ]
}

fn seed_topics() -> Vec<(&'static str, &'static str)> {
    vec![
        ("General", "General discussions"),
        ("Community", "Events, meet-ups, and community talk"),
        ("Technical", "Tech, hardware, and system questions"),
    ]
}

/// Seed users, bulletins, and topics that do not already exist.
pub fn seed_if_needed(store: &Store) -> StoreResult<()> {
    for seed in seed_users() {
        match store.user_by_name_any(seed.username) {
            Ok(_) => {}
            Err(StoreError::NotFound(_)) => {
                store.create_user(NewUser {
                    username: seed.username.to_string(),
                    credential_secret: seed.secret.to_string(),
                    real_name: seed.real_name.to_string(),
                    email: seed.email.to_string(),
                    access_level: seed.access_level,
                })?;
                info!("Seeded user '{}'", seed.username);
            }
            Err(e) => return Err(e),
        }
    }

    if store.list_bulletins(1)?.is_empty() {
        for seed in seed_bulletins() {
            store.create_bulletin(seed.title, seed.body, seed.author, None)?;
        }
        info!("Seeded welcome bulletins");
    }

    if store.list_topics()?.is_empty() {
        for (name, description) in seed_topics() {
            store.create_topic(name, description)?;
        }
        info!("Seeded starter topics");
    }

    Ok(())
}
