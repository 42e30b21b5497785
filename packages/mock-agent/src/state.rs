//! In-memory agent state: one record per cookie session, plus canned replies.
//!
//! Everything is held behind a [`RwLock`] and lost when the process exits.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Where a session's authentication workflow stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Workflow {
    #[default]
    Idle,
    /// `RUN_AUTH` received; access rights and certificate can be inspected.
    Started { token_url: String },
    /// `ACCEPT` received; the card wants a PIN (or CAN/PUK).
    Accepted { token_url: String },
}

/// Agent-side state for one cookie session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub api_level: u32,
    pub workflow: Workflow,
    /// Optional access rights the user agreed to.
    pub chat: Vec<String>,
    /// PIN attempts left on the simulated card.
    pub retry_counter: i32,
    /// Set when one PIN attempt is left; cleared by a valid CAN.
    pub can_pending: bool,
    /// `cmd` of every command received, in order.
    pub history: Vec<String>,
    /// Transport headers of every request, parallel to `history`.
    pub requests: Vec<RequestHeaders>,
}

/// Headers the client sent with one command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestHeaders {
    pub content_type: Option<String>,
    pub content_length: Option<String>,
    pub user_agent: Option<String>,
    /// Length of the body actually received.
    pub body_len: usize,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            api_level: 1,
            workflow: Workflow::Idle,
            chat: Vec::new(),
            retry_counter: 3,
            can_pending: false,
            history: Vec::new(),
            requests: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Canned replies
// ---------------------------------------------------------------------------

/// A reply returned verbatim instead of the simulated one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canned {
    pub status: u16,
    pub body: String,
}

// ---------------------------------------------------------------------------
// AgentState
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, SessionState>,
    /// `cmd` → replies, consumed front to back.
    canned: HashMap<String, VecDeque<Canned>>,
}

/// Thread-safe store shared by all handlers.
#[derive(Default)]
pub struct AgentState {
    inner: RwLock<Inner>,
}

impl AgentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a canned reply for the next `cmd` command, in any session.
    pub fn script(&self, cmd: &str, status: u16, body: impl Into<String>) {
        let mut inner = self.inner.write().unwrap();
        inner
            .canned
            .entry(cmd.to_string())
            .or_default()
            .push_back(Canned {
                status,
                body: body.into(),
            });
    }

    /// Pop the next canned reply for `cmd`, if any.
    pub fn take_canned(&self, cmd: &str) -> Option<Canned> {
        let mut inner = self.inner.write().unwrap();
        inner.canned.get_mut(cmd).and_then(VecDeque::pop_front)
    }

    /// `true` if `id` names a session this agent created.
    pub fn has_session(&self, id: &str) -> bool {
        self.inner.read().unwrap().sessions.contains_key(id)
    }

    /// Create an empty session and return its id.
    pub fn open_session(&self) -> String {
        let id = uuid::Uuid::now_v7().to_string();
        let mut inner = self.inner.write().unwrap();
        inner.sessions.insert(id.clone(), SessionState::default());
        id
    }

    /// Run `f` against session `id`, creating it if needed.
    pub fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut inner = self.inner.write().unwrap();
        let session = inner.sessions.entry(id.to_string()).or_default();
        f(session)
    }

    /// Snapshot of session `id`.
    pub fn session(&self, id: &str) -> Option<SessionState> {
        self.inner.read().unwrap().sessions.get(id).cloned()
    }

    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.read().unwrap().sessions.keys().cloned().collect();
        ids.sort();
        ids
    }
}
