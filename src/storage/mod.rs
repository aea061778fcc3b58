//! # Storage Module - Data Persistence Layer
//!
//! Sled-backed persistence for everything the BBS keeps between calls:
//! user accounts, bulletins, and the message board hierarchy
//! (topics → posts → replies).
//!
//! ## Architecture
//!
//! One embedded sled database holds a tree per entity:
//!
//! ```text
//! users      lowercase username → User
//! bulletins  bulletin id (BE)   → Bulletin
//! topics     topic id (BE)      → Topic
//! posts      topic id ∥ post id → Post
//! replies    post id ∥ reply id → Reply
//! meta       per-entity id counters
//! ```
//!
//! Values are bincode-serialized. Composite keys keep a topic's posts (and a
//! post's replies) contiguous so listings are a single prefix scan.
//!
//! ## Guarantees
//!
//! - List operations return a deterministic order, documented per method.
//! - Row writes are atomic; `touch_user_last_call` is a single
//!   read-modify-write on the user row.
//! - Duplicate usernames and topic names fail with [`StoreError::Conflict`];
//!   missing rows fail with [`StoreError::NotFound`]. Callers are expected to
//!   tolerate both.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use driftline::storage::{NewUser, Store};
//!
//! fn main() -> anyhow::Result<()> {
//!     let store = Store::open("./driftline.db")?;
//!     let users = store.list_users(50)?;
//!     println!("{} users on file", users.len());
//!     Ok(())
//! }
//! ```

pub mod seed;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::IVec;
use std::path::Path;
use thiserror::Error;

const TREE_USERS: &str = "users";
const TREE_BULLETINS: &str = "bulletins";
const TREE_TOPICS: &str = "topics";
const TREE_POSTS: &str = "posts";
const TREE_REPLIES: &str = "replies";
const TREE_META: &str = "meta";

/// Errors that can arise while interacting with the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Returned when a uniqueness constraint would be violated.
    #[error("conflict: {0}")]
    Conflict(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    /// Opaque verifier input; interpreted by [`crate::credentials`], never here.
    pub credential_secret: String,
    pub real_name: String,
    pub email: String,
    pub access_level: u8,
    pub last_call: Option<DateTime<Utc>>,
    pub total_calls: u32,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Fields supplied when creating a user; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub credential_secret: String,
    pub real_name: String,
    pub email: String,
    pub access_level: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bulletin {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub topic_id: u64,
    pub user_id: u64,
    pub username: String,
    pub subject: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub id: u64,
    pub post_id: u64,
    pub user_id: u64,
    pub username: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Sled-backed store shared by all sessions.
pub struct Store {
    _db: sled::Db,
    users: sled::Tree,
    bulletins: sled::Tree,
    topics: sled::Tree,
    posts: sled::Tree,
    replies: sled::Tree,
    meta: sled::Tree,
}

fn decode<T: serde::de::DeserializeOwned>(bytes: IVec) -> StoreResult<T> {
    Ok(bincode::deserialize::<T>(&bytes)?)
}

fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

fn user_key(username: &str) -> Vec<u8> {
    username.to_lowercase().into_bytes()
}

fn id_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

fn composite_key(parent: u64, child: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&parent.to_be_bytes());
    key[8..].copy_from_slice(&child.to_be_bytes());
    key
}

impl Store {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path_ref = path.as_ref();
        if let Some(parent) = path_ref.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = sled::open(path_ref)?;
        let users = db.open_tree(TREE_USERS)?;
        let bulletins = db.open_tree(TREE_BULLETINS)?;
        let topics = db.open_tree(TREE_TOPICS)?;
        let posts = db.open_tree(TREE_POSTS)?;
        let replies = db.open_tree(TREE_REPLIES)?;
        let meta = db.open_tree(TREE_META)?;
        Ok(Store {
            _db: db,
            users,
            bulletins,
            topics,
            posts,
            replies,
            meta,
        })
    }

    /// Allocate the next id for `counter`, starting at 1.
    fn next_id(&self, counter: &str) -> StoreResult<u64> {
        let updated = self.meta.update_and_fetch(counter, |old| {
            let current = old
                .and_then(|b| b.try_into().ok().map(u64::from_be_bytes))
                .unwrap_or(0);
            Some(current.saturating_add(1).to_be_bytes().to_vec())
        })?;
        let bytes = updated.ok_or_else(|| StoreError::NotFound(counter.to_string()))?;
        let arr: [u8; 8] = bytes
            .as_ref()
            .try_into()
            .map_err(|_| StoreError::NotFound(counter.to_string()))?;
        Ok(u64::from_be_bytes(arr))
    }

    // ----- users -----

    /// Fetch an active user by name. Inactive accounts are invisible here.
    pub fn user_by_name(&self, username: &str) -> StoreResult<User> {
        let user = self.user_by_name_any(username)?;
        if !user.is_active {
            return Err(StoreError::NotFound(username.to_string()));
        }
        Ok(user)
    }

    /// Fetch a user by name regardless of active status (admin flows only).
    pub fn user_by_name_any(&self, username: &str) -> StoreResult<User> {
        match self.users.get(user_key(username))? {
            Some(bytes) => decode(bytes),
            None => Err(StoreError::NotFound(username.to_string())),
        }
    }

    /// Fetch a user by id.
    pub fn user_by_id(&self, id: u64) -> StoreResult<User> {
        for entry in self.users.iter() {
            let (_, bytes) = entry?;
            let user: User = decode(bytes)?;
            if user.id == id {
                return Ok(user);
            }
        }
        Err(StoreError::NotFound(format!("user #{}", id)))
    }

    /// List users ordered by username, up to `limit`.
    pub fn list_users(&self, limit: usize) -> StoreResult<Vec<User>> {
        let mut users = Vec::new();
        for entry in self.users.iter() {
            if users.len() >= limit {
                break;
            }
            let (_, bytes) = entry?;
            users.push(decode(bytes)?);
        }
        Ok(users)
    }

    /// Create a user; fails with `Conflict` on a duplicate username.
    pub fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let key = user_key(&new.username);
        if self.users.contains_key(&key)? {
            return Err(StoreError::Conflict(format!(
                "username '{}' is already taken",
                new.username
            )));
        }
        let user = User {
            id: self.next_id("users_seq")?,
            username: new.username,
            credential_secret: new.credential_secret,
            real_name: new.real_name,
            email: new.email,
            access_level: new.access_level,
            last_call: None,
            total_calls: 0,
            created_at: Utc::now(),
            is_active: true,
        };
        self.users.insert(key, encode(&user)?)?;
        Ok(user)
    }

    /// Persist an updated user record, keyed by its id. Handles renames.
    pub fn update_user(&self, updated: User) -> StoreResult<()> {
        let existing = self.user_by_id(updated.id)?;
        let old_key = user_key(&existing.username);
        let new_key = user_key(&updated.username);
        if new_key != old_key {
            if self.users.contains_key(&new_key)? {
                return Err(StoreError::Conflict(format!(
                    "username '{}' is already taken",
                    updated.username
                )));
            }
            self.users.remove(&old_key)?;
        }
        self.users.insert(new_key, encode(&updated)?)?;
        Ok(())
    }

    /// Delete a user by id.
    pub fn delete_user(&self, id: u64) -> StoreResult<()> {
        let existing = self.user_by_id(id)?;
        self.users.remove(user_key(&existing.username))?;
        Ok(())
    }

    /// Record a call: set `last_call` to now and bump `total_calls`, as one
    /// atomic row update.
    pub fn touch_user_last_call(&self, username: &str) -> StoreResult<()> {
        let key = user_key(username);
        if !self.users.contains_key(&key)? {
            return Err(StoreError::NotFound(username.to_string()));
        }
        self.users.update_and_fetch(key, |old| {
            let old = old?;
            match bincode::deserialize::<User>(old) {
                Ok(mut user) => {
                    user.last_call = Some(Utc::now());
                    user.total_calls = user.total_calls.saturating_add(1);
                    bincode::serialize(&user).ok().or_else(|| Some(old.to_vec()))
                }
                // Leave an undecodable row untouched rather than destroy it.
                Err(_) => Some(old.to_vec()),
            }
        })?;
        Ok(())
    }

    // ----- bulletins -----

    /// List unexpired bulletins, newest first, up to `limit`.
    pub fn list_bulletins(&self, limit: usize) -> StoreResult<Vec<Bulletin>> {
        let now = Utc::now();
        let mut bulletins = Vec::new();
        for entry in self.bulletins.iter().rev() {
            if bulletins.len() >= limit {
                break;
            }
            let (_, bytes) = entry?;
            let bulletin: Bulletin = decode(bytes)?;
            if let Some(expires) = bulletin.expires_at {
                if expires <= now {
                    continue;
                }
            }
            bulletins.push(bulletin);
        }
        Ok(bulletins)
    }

    pub fn bulletin_by_id(&self, id: u64) -> StoreResult<Bulletin> {
        match self.bulletins.get(id_key(id))? {
            Some(bytes) => decode(bytes),
            None => Err(StoreError::NotFound(format!("bulletin #{}", id))),
        }
    }

    pub fn create_bulletin(
        &self,
        title: &str,
        body: &str,
        author: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> StoreResult<Bulletin> {
        let bulletin = Bulletin {
            id: self.next_id("bulletins_seq")?,
            title: title.to_string(),
            body: body.to_string(),
            author: author.to_string(),
            created_at: Utc::now(),
            expires_at,
        };
        self.bulletins
            .insert(id_key(bulletin.id), encode(&bulletin)?)?;
        Ok(bulletin)
    }

    pub fn update_bulletin(&self, id: u64, title: &str, body: &str) -> StoreResult<()> {
        let mut bulletin = self.bulletin_by_id(id)?;
        bulletin.title = title.to_string();
        bulletin.body = body.to_string();
        self.bulletins.insert(id_key(id), encode(&bulletin)?)?;
        Ok(())
    }

    pub fn delete_bulletin(&self, id: u64) -> StoreResult<()> {
        match self.bulletins.remove(id_key(id))? {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("bulletin #{}", id))),
        }
    }

    // ----- message board -----

    /// List active topics ordered by name.
    pub fn list_topics(&self) -> StoreResult<Vec<Topic>> {
        let mut topics = Vec::new();
        for entry in self.topics.iter() {
            let (_, bytes) = entry?;
            let topic: Topic = decode(bytes)?;
            if topic.is_active {
                topics.push(topic);
            }
        }
        topics.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(topics)
    }

    pub fn topic_by_id(&self, id: u64) -> StoreResult<Topic> {
        match self.topics.get(id_key(id))? {
            Some(bytes) => decode(bytes),
            None => Err(StoreError::NotFound(format!("topic #{}", id))),
        }
    }

    /// Create a topic; fails with `Conflict` on a duplicate name.
    pub fn create_topic(&self, name: &str, description: &str) -> StoreResult<Topic> {
        for entry in self.topics.iter() {
            let (_, bytes) = entry?;
            let existing: Topic = decode(bytes)?;
            if existing.name.eq_ignore_ascii_case(name) {
                return Err(StoreError::Conflict(format!(
                    "topic '{}' already exists",
                    name
                )));
            }
        }
        let topic = Topic {
            id: self.next_id("topics_seq")?,
            name: name.to_string(),
            description: description.to_string(),
            created_at: Utc::now(),
            is_active: true,
        };
        self.topics.insert(id_key(topic.id), encode(&topic)?)?;
        Ok(topic)
    }

    /// List a topic's posts, newest first.
    pub fn posts_by_topic(&self, topic_id: u64) -> StoreResult<Vec<Post>> {
        let mut posts = Vec::new();
        for entry in self.posts.scan_prefix(id_key(topic_id)) {
            let (_, bytes) = entry?;
            posts.push(decode::<Post>(bytes)?);
        }
        // Ids are allocated in creation order; newest first means descending.
        posts.reverse();
        Ok(posts)
    }

    pub fn post_by_id(&self, id: u64) -> StoreResult<Post> {
        for entry in self.posts.iter() {
            let (_, bytes) = entry?;
            let post: Post = decode(bytes)?;
            if post.id == id {
                return Ok(post);
            }
        }
        Err(StoreError::NotFound(format!("post #{}", id)))
    }

    pub fn create_post(
        &self,
        topic_id: u64,
        user_id: u64,
        username: &str,
        subject: &str,
        body: &str,
    ) -> StoreResult<Post> {
        self.topic_by_id(topic_id)?;
        let post = Post {
            id: self.next_id("posts_seq")?,
            topic_id,
            user_id,
            username: username.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
        };
        self.posts
            .insert(composite_key(topic_id, post.id), encode(&post)?)?;
        Ok(post)
    }

    /// List a post's replies, oldest first.
    pub fn replies_by_post(&self, post_id: u64) -> StoreResult<Vec<Reply>> {
        let mut replies = Vec::new();
        for entry in self.replies.scan_prefix(id_key(post_id)) {
            let (_, bytes) = entry?;
            replies.push(decode::<Reply>(bytes)?);
        }
        Ok(replies)
    }

    pub fn create_reply(
        &self,
        post_id: u64,
        user_id: u64,
        username: &str,
        body: &str,
    ) -> StoreResult<Reply> {
        self.post_by_id(post_id)?;
        let reply = Reply {
            id: self.next_id("replies_seq")?,
            post_id,
            user_id,
            username: username.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
        };
        self.replies
            .insert(composite_key(post_id, reply.id), encode(&reply)?)?;
        Ok(reply)
    }
}
