//! Blocking client for a local eID agent.
//!
//! The agent is a local service speaking a stateful command/response
//! protocol: JSON command envelopes are POSTed to a single endpoint and the
//! agent answers with JSON response envelopes. Session affinity is carried
//! by an HTTP cookie, persisted to a per-session cookie-jar file.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`endpoint`] | URL components, defaults, validation ([`Endpoint`], [`Setting`]) |
//! | [`session`] | Session id and cookie-jar file naming ([`Session`]) |
//! | [`transport`] | HTTP POST with cookies, TLS policy, limits ([`Transport`], [`HttpTransport`]) |
//! | [`classify`] | Reply body → envelope or failure |
//! | [`client`] | One method per protocol command ([`AgentClient`]) |
//! | [`error`] | Severity × origin error taxonomy ([`Error`], [`ErrorKind`]) |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use eidagent_client::AgentClient;
//!
//! let mut client = AgentClient::new("https://service.example/tcToken", None);
//! client.endpoint_mut().set_port(24727u32)?;
//!
//! let readers = client.get_reader_list()?;
//! let auth = client.run_auth()?;
//! let reply = client.set_pin("123456")?;
//! ```
//!
//! Each instance is one session. To run several sessions against the same
//! agent, create several clients with distinct session ids.

pub mod classify;
pub mod client;
pub mod endpoint;
pub mod error;
pub mod session;
pub mod transport;

pub use classify::{classify, classify_envelope, Classified};
pub use client::{AgentClient, DEFAULT_API_LEVEL};
pub use endpoint::{Endpoint, Setting};
pub use error::{Error, ErrorKind, Origin, Result, Severity};
pub use session::Session;
pub use transport::{HttpTransport, Reply, Request, Transport};

pub use eidagent_protocol as protocol;
