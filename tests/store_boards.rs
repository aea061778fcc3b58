//! Bulletin and message-board store contract: expiry filtering, ordering,
//! and the topic → post → reply hierarchy.

use chrono::{Duration, Utc};
use driftline::storage::{NewUser, Store, StoreError};

fn open_store() -> (tempfile::TempDir, Store) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::open(dir.path().join("db")).expect("store");
    (dir, store)
}

#[test]
fn bulletins_list_newest_first_with_limit() {
    let (_dir, store) = open_store();
    for i in 1..=5 {
        store
            .create_bulletin(&format!("Bulletin {}", i), "body", "sysop", None)
            .expect("create");
    }
    let all = store.list_bulletins(50).expect("list");
    let titles: Vec<&str> = all.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Bulletin 5",
            "Bulletin 4",
            "Bulletin 3",
            "Bulletin 2",
            "Bulletin 1"
        ]
    );

    let limited = store.list_bulletins(2).expect("list limited");
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].title, "Bulletin 5");
}

#[test]
fn expired_bulletins_are_filtered() {
    let (_dir, store) = open_store();
    store
        .create_bulletin("Fresh", "body", "sysop", Some(Utc::now() + Duration::days(1)))
        .expect("create");
    store
        .create_bulletin("Stale", "body", "sysop", Some(Utc::now() - Duration::days(1)))
        .expect("create");
    store
        .create_bulletin("Forever", "body", "sysop", None)
        .expect("create");

    let listed = store.list_bulletins(50).expect("list");
    let titles: Vec<&str> = listed.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, vec!["Forever", "Fresh"]);
}

#[test]
fn bulletin_update_and_delete() {
    let (_dir, store) = open_store();
    let bulletin = store
        .create_bulletin("Original", "old body", "sysop", None)
        .expect("create");

    store
        .update_bulletin(bulletin.id, "Revised", "new body")
        .expect("update");
    let fetched = store.bulletin_by_id(bulletin.id).expect("fetch");
    assert_eq!(fetched.title, "Revised");
    assert_eq!(fetched.body, "new body");
    assert_eq!(fetched.author, "sysop");

    store.delete_bulletin(bulletin.id).expect("delete");
    assert!(matches!(
        store.bulletin_by_id(bulletin.id),
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        store.update_bulletin(bulletin.id, "x", "y"),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn topics_ordered_by_name_and_unique() {
    let (_dir, store) = open_store();
    store.create_topic("Zeta", "last").expect("create");
    store.create_topic("Alpha", "first").expect("create");

    let topics = store.list_topics().expect("list");
    let names: Vec<&str> = topics.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Zeta"]);

    assert!(matches!(
        store.create_topic("alpha", "case-insensitive dup"),
        Err(StoreError::Conflict(_))
    ));
}

#[test]
fn post_and_reply_hierarchy() {
    let (_dir, store) = open_store();
    let user = store
        .create_user(NewUser {
            username: "alice".to_string(),
            credential_secret: "secret".to_string(),
            real_name: String::new(),
            email: String::new(),
            access_level: 10,
        })
        .expect("user");
    let general = store.create_topic("General", "general").expect("topic");
    let other = store.create_topic("Other", "other").expect("topic");

    let first = store
        .create_post(general.id, user.id, &user.username, "First", "body one")
        .expect("post");
    let second = store
        .create_post(general.id, user.id, &user.username, "Second", "body two")
        .expect("post");
    store
        .create_post(other.id, user.id, &user.username, "Elsewhere", "body")
        .expect("post");

    // Newest first, and scoped to the topic.
    let posts = store.posts_by_topic(general.id).expect("posts");
    let subjects: Vec<&str> = posts.iter().map(|p| p.subject.as_str()).collect();
    assert_eq!(subjects, vec!["Second", "First"]);

    let fetched = store.post_by_id(first.id).expect("fetch post");
    assert_eq!(fetched.subject, "First");
    assert_eq!(fetched.topic_id, general.id);

    // Replies come back oldest first.
    store
        .create_reply(first.id, user.id, &user.username, "first reply")
        .expect("reply");
    store
        .create_reply(first.id, user.id, &user.username, "second reply")
        .expect("reply");
    let replies = store.replies_by_post(first.id).expect("replies");
    let bodies: Vec<&str> = replies.iter().map(|r| r.body.as_str()).collect();
    assert_eq!(bodies, vec!["first reply", "second reply"]);

    assert!(store.replies_by_post(second.id).expect("empty").is_empty());

    // Posting into a missing topic fails cleanly.
    assert!(matches!(
        store.create_post(999, user.id, "alice", "x", "y"),
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        store.create_reply(999, user.id, "alice", "y"),
        Err(StoreError::NotFound(_))
    ));
}
