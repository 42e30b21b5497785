//! Session identity: which cookie jar a client instance uses.
//!
//! The agent keeps per-session state keyed by a cookie. Each client instance
//! gets its own cookie-jar file, named after a [`Session`] id, so that two
//! instances talking to the same agent never share that state.
//!
//! ```text
//! cookie path prefix:  /tmp/eidagent-cookie-
//! session id:          4f0c…e1
//! cookie file:         /tmp/eidagent-cookie-4f0c…e1
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

static GENERATED: AtomicU64 = AtomicU64::new(0);

/// A fixed session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Session {
    id: String,
}

impl Session {
    /// Use `id` if given and non-empty, otherwise [`Session::generate`] one.
    pub fn new(id: Option<String>) -> Self {
        match id {
            Some(id) if !id.is_empty() => Self { id },
            _ => Self::generate(),
        }
    }

    /// A fresh id: the hex SHA-256 of the current clock reading in
    /// nanoseconds. Not stable across restarts; callers that need that must
    /// supply their own id.
    pub fn generate() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        // Two ids generated within the same clock tick still differ.
        let seq = GENERATED.fetch_add(1, Ordering::Relaxed);

        let mut hasher = Sha256::new();
        hasher.update(nanos.to_be_bytes());
        hasher.update(std::process::id().to_be_bytes());
        hasher.update(seq.to_be_bytes());
        Self {
            id: hex::encode(hasher.finalize()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Directory component of `cookie_prefix` (`.` when it has none).
    pub fn cookie_dir(cookie_prefix: &Path) -> PathBuf {
        match cookie_prefix.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// `<cookie dir>/<prefix file name><session id>`
    pub fn cookie_file_path(&self, cookie_prefix: &Path) -> PathBuf {
        let mut name = cookie_prefix
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(&self.id);
        Self::cookie_dir(cookie_prefix).join(name)
    }
}

impl std::fmt::Display for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supplied_id_is_kept() {
        let s = Session::new(Some("abc".into()));
        assert_eq!(s.id(), "abc");
    }

    #[test]
    fn empty_id_is_replaced() {
        let s = Session::new(Some(String::new()));
        assert_eq!(s.id().len(), 64);
    }

    #[test]
    fn generated_ids_are_hex_and_distinct() {
        let a = Session::new(None);
        let b = Session::new(None);
        assert_eq!(a.id().len(), 64);
        assert!(a.id().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn cookie_file_path_joins_prefix_and_id() {
        let s = Session::new(Some("s1".into()));
        assert_eq!(
            s.cookie_file_path(Path::new("/tmp/eidagent-cookie-")),
            PathBuf::from("/tmp/eidagent-cookie-s1")
        );
        assert_eq!(
            Session::cookie_dir(Path::new("/tmp/eidagent-cookie-")),
            PathBuf::from("/tmp")
        );
    }

    #[test]
    fn bare_prefix_uses_current_dir() {
        let s = Session::new(Some("s1".into()));
        assert_eq!(
            s.cookie_file_path(Path::new("jar-")),
            PathBuf::from("./jar-s1")
        );
    }

    #[test]
    fn distinct_sessions_get_distinct_files() {
        let prefix = Path::new("/tmp/eidagent-cookie-");
        let a = Session::new(None).cookie_file_path(prefix);
        let b = Session::new(None).cookie_file_path(prefix);
        assert_ne!(a, b);
    }
}
