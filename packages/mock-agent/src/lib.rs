//! In-process mock of the local eID agent.
//!
//! [`build_router`] plus a shared [`AgentState`] is all a test needs to serve
//! the agent; the `eidagent-mock` binary wraps the same router.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use config::AgentConfig;
pub use error::AgentError;
pub use router::build_router;
pub use state::AgentState;
