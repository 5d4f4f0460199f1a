//! Key/value persistence capability and the per-user chat-list store built on it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use proto::{Chat, ChatId, Message, Phase, SessionError, StoreError, ThreadId};
use tracing::{debug, warn};

/// Key holding the remembered display name.
pub const USERNAME_KEY: &str = "username";

/// Key holding one user's serialized chat list.
pub fn chats_key(user: &str) -> String {
    format!("chats_{user}")
}

/// Minimal string key/value persistence (browser `localStorage` semantics).
pub trait KeyValueStore {
    /// Returns the stored value, or `None` when the key was never written.
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
    /// Overwrites the value for `key`.
    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Deletes `key`; deleting a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).load(key)
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).save(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

// ─── MemoryStore ─────────────────────────────────────────────

/// In-process store; nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw value for `key`, for inspection in tests and tools.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

// ─── FileStore ───────────────────────────────────────────────

/// One file per key under a data directory.
///
/// Keys are escaped into file names; a display name containing `/` or
/// `..` still maps to a file directly inside the directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory of this store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", escape_key(key)))
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        // Readers never observe a half-written value.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        debug!(key, path = %path.display(), "Stored value");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

/// Maps a key to a file-name-safe string: `[A-Za-z0-9_-]` pass through,
/// every other UTF-8 byte becomes `%XX`.
fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for &b in key.as_bytes() {
        if b.is_ascii_alphanumeric() || b == b'_' || b == b'-' {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

// ─── SessionStore ────────────────────────────────────────────

/// The chat list a user gets when nothing usable is stored.
pub fn default_chats() -> Vec<Chat> {
    vec![Chat::new(ChatId(1))]
}

/// Read-only view of a chat opened by [`open_chat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatView<'a> {
    /// Index of the chat in the user's list.
    pub index: usize,
    /// Transcript to display.
    pub messages: &'a [Message],
    /// Stored backend thread handle.
    pub thread_id: Option<&'a ThreadId>,
    /// Phase reconstructed from the thread handle.
    pub phase: Phase,
}

/// Opens chat `index`, deriving its phase with [`Phase::reconcile`].
pub fn open_chat(chats: &[Chat], index: usize) -> Result<ChatView<'_>, SessionError> {
    let chat = chats.get(index).ok_or(SessionError::NoSuchChat(index))?;
    Ok(ChatView {
        index,
        messages: &chat.messages,
        thread_id: chat.thread_id.as_ref(),
        phase: Phase::reconcile(chat.thread_id.as_ref()),
    })
}

/// Per-user chat lists and the remembered user, on top of a [`KeyValueStore`].
pub struct SessionStore<S> {
    store: S,
}

impl<S: KeyValueStore> SessionStore<S> {
    /// Wraps a key/value capability.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Borrows the underlying key/value store.
    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Returns the remembered display name, if any.
    pub fn current_user(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .store
            .load(USERNAME_KEY)?
            .filter(|name| !name.trim().is_empty()))
    }

    /// Remembers `user` as the logged-in display name.
    pub fn remember_user(&mut self, user: &str) -> Result<(), StoreError> {
        self.store.save(USERNAME_KEY, user)
    }

    /// Forgets the logged-in display name. Chat lists stay stored.
    pub fn forget_user(&mut self) -> Result<(), StoreError> {
        self.store.remove(USERNAME_KEY)
    }

    /// Loads `user`'s chat list, falling back to a single default chat when
    /// nothing, an empty list, or an unreadable record is stored.
    pub fn load(&self, user: &str) -> Result<Vec<Chat>, StoreError> {
        let key = chats_key(user);
        let Some(raw) = self.store.load(&key)? else {
            debug!(user, "No stored chats, starting with a default chat");
            return Ok(default_chats());
        };
        match serde_json::from_str::<Vec<Chat>>(&raw) {
            Ok(chats) if !chats.is_empty() => {
                debug!(user, count = chats.len(), "Loaded chats");
                Ok(chats)
            }
            Ok(_) => Ok(default_chats()),
            Err(e) => {
                warn!(user, error = %e, "Stored chat list is unreadable, starting over");
                Ok(default_chats())
            }
        }
    }

    /// Overwrites `user`'s chat list. An empty list is never written.
    pub fn save(&mut self, user: &str, chats: &[Chat]) -> Result<(), StoreError> {
        if chats.is_empty() {
            return Ok(());
        }
        let json =
            serde_json::to_string(chats).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.save(&chats_key(user), &json)
    }
}
