use std::path::PathBuf;
use std::sync::Mutex;

use payloads::Session;

/// Fixed name of the persisted session record.
pub const SESSION_FILE_NAME: &str = "session.json";

/// Where the login credential pair lives between requests.
///
/// The store is the single source of truth for the session: the request
/// pipeline reads it before every request, rewrites it after a token
/// refresh, and deletes it on terminal auth failure. Mirroring browser
/// storage, reads and writes never fail from the caller's point of view;
/// I/O problems degrade to "no session" with a log line.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Option<Session>;
    fn save(&self, session: &Session);
    fn clear(&self);
}

/// Process-lifetime session store.
#[derive(Default)]
pub struct InMemorySessionStore {
    current: Mutex<Option<Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self) -> Option<Session> {
        self.current.lock().unwrap().clone()
    }

    fn save(&self, session: &Session) {
        *self.current.lock().unwrap() = Some(session.clone());
    }

    fn clear(&self) {
        *self.current.lock().unwrap() = None;
    }
}

/// Session store persisted as a single JSON record on disk, under the
/// fixed name [`SESSION_FILE_NAME`] inside the given directory.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(SESSION_FILE_NAME),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Option<Session> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return None;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to read session file");
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(session) => Some(session),
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable session");
                None
            }
        }
    }

    fn save(&self, session: &Session) {
        let encoded = match serde_json::to_string_pretty(session) {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::warn!(error = %err, "failed to encode session");
                return;
            }
        };
        if let Some(parent) = self.path.parent()
            && let Err(err) = std::fs::create_dir_all(parent)
        {
            tracing::warn!(error = %err, "failed to create session dir");
            return;
        }
        if let Err(err) = std::fs::write(&self.path, encoded) {
            tracing::warn!(error = %err, "failed to write session file");
        }
    }

    fn clear(&self) {
        if let Err(err) = std::fs::remove_file(&self.path)
            && err.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(error = %err, "failed to remove session file");
        }
    }
}
