//! Command surface: one method per protocol command.
//!
//! Every method does exactly one round trip: build the command envelope,
//! POST it, check the HTTP status, classify the reply, and (for most
//! commands) assert the expected `msg` tag before decoding the payload.
//!
//! `GET_ACCESS_RIGHTS`, `SET_ACCESS_RIGHTS` and the PIN/CAN/PUK setters do
//! not assert a tag: the agent may answer them with several different
//! messages depending on workflow state, so they hand back the envelope and
//! leave the interpretation to the caller.

use std::path::PathBuf;

use eidagent_protocol::{tags, ApiLevel, Auth, Certificate, Command, Envelope, Reader, ReaderList};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::classify::{classify, Classified};
use crate::endpoint::Endpoint;
use crate::error::{Error, Result, Severity};
use crate::session::Session;
use crate::transport::{check_status, ensure_cookie_dir, HttpTransport, Request, Transport};

/// API level requested by [`AgentClient::set_api_level`] callers that have
/// no preference.
pub const DEFAULT_API_LEVEL: u32 = 1;

/// A client bound to one agent endpoint and one session.
#[derive(Debug)]
pub struct AgentClient<T = HttpTransport> {
    endpoint: Endpoint,
    session: Session,
    transport: T,
}

impl AgentClient<HttpTransport> {
    /// Default endpoint, HTTP transport. A session id is generated when
    /// `session_id` is `None`.
    pub fn new(token_url: impl Into<String>, session_id: Option<String>) -> Self {
        Self::with_endpoint(Endpoint::new(token_url), Session::new(session_id))
    }

    pub fn with_endpoint(endpoint: Endpoint, session: Session) -> Self {
        Self::with_transport(endpoint, session, HttpTransport::new())
    }
}

impl<T: Transport> AgentClient<T> {
    pub fn with_transport(endpoint: Endpoint, session: Session, transport: T) -> Self {
        Self {
            endpoint,
            session,
            transport,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Endpoint setters validate; a rejected change leaves the endpoint as it was.
    pub fn endpoint_mut(&mut self) -> &mut Endpoint {
        &mut self.endpoint
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// This session's cookie-jar file.
    pub fn cookie_file(&self) -> PathBuf {
        self.session.cookie_file_path(self.endpoint.cookie_path())
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    /// Send `command` and return the classified reply envelope.
    pub fn send(&self, command: &Command) -> Result<Envelope> {
        match self.dispatch(command, false)? {
            Classified::Envelope(env) => Ok(env),
            Classified::Raw(value) => Err(Error::external(
                Severity::Error,
                format!("unclassified reply: {value}"),
            )),
        }
    }

    /// Send `command` and return the reply JSON without any of the standard
    /// checks beyond the HTTP status.
    pub fn send_raw(&self, command: &Command) -> Result<Value> {
        match self.dispatch(command, true)? {
            Classified::Raw(value) => Ok(value),
            Classified::Envelope(env) => serde_json::to_value(env).map_err(|e| {
                Error::internal(Severity::Error, format!("failed to encode envelope: {e}"))
            }),
        }
    }

    fn dispatch(&self, command: &Command, skip_error_handling: bool) -> Result<Classified> {
        let cookie_file = self.cookie_file();
        ensure_cookie_dir(&Session::cookie_dir(self.endpoint.cookie_path()))?;

        let body = serde_json::to_string(command).map_err(|e| {
            Error::internal(
                Severity::Error,
                format!("failed to encode {}: {e}", command.name()),
            )
        })?;
        let url = self.endpoint.build_url(None);

        debug!(
            cmd = command.name(),
            url = %self.endpoint.redacted_url(),
            session = self.session.id(),
            "sending command"
        );
        let reply = self.transport.post(&Request {
            url: &url,
            body: &body,
            cookie_file: &cookie_file,
            verify_tls: self.endpoint.verify_tls(),
        })?;
        debug!(cmd = command.name(), status = reply.status, "reply received");

        if let Err(e) = check_status(reply.status) {
            warn!(cmd = command.name(), error = %e, "command failed");
            return Err(e);
        }
        let classified = classify(&reply.body, skip_error_handling)?;
        if let Classified::Envelope(env) = &classified {
            debug!(cmd = command.name(), msg = %env.msg, "reply classified");
        }
        Ok(classified)
    }

    /// Send `command`, require the reply tag to be `tag`, and return the envelope.
    fn expect_tag(&self, command: Command, tag: &str) -> Result<Envelope> {
        let env = self.send(&command)?;
        if env.msg != tag {
            warn!(cmd = command.name(), expected = tag, got = %env.msg, "unexpected response");
            return Err(Error::external(
                Severity::Error,
                format!("unexpected response: expected {tag}, got {}", env.msg),
            ));
        }
        Ok(env)
    }

    /// [`Self::expect_tag`], then decode the payload as `P`.
    fn expect<P: DeserializeOwned>(&self, command: Command, tag: &str) -> Result<P> {
        self.expect_tag(command, tag)?.decode().map_err(|e| {
            Error::external(Severity::Error, format!("malformed {tag} response: {e}"))
        })
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    /// `GET_INFO` → the agent's `VersionInfo` blob.
    pub fn get_info(&self) -> Result<Value> {
        let info: eidagent_protocol::Info = self.expect(Command::GetInfo, tags::INFO)?;
        Ok(info.version_info)
    }

    /// `GET_API_LEVEL` → current and available levels.
    pub fn get_api_level(&self) -> Result<ApiLevel> {
        self.expect(Command::GetApiLevel, tags::API_LEVEL)
    }

    /// `SET_API_LEVEL` → whether the agent now runs at `level`.
    pub fn set_api_level(&self, level: u32) -> Result<bool> {
        let reply: ApiLevel = self.expect(Command::SetApiLevel { level }, tags::API_LEVEL)?;
        Ok(reply.current == level)
    }

    /// `GET_READER` → name, attachment state, and card of one reader.
    pub fn get_reader(&self, name: &str) -> Result<Reader> {
        self.expect(
            Command::GetReader {
                name: name.to_string(),
            },
            tags::READER,
        )
    }

    /// `GET_READER_LIST` → all readers the agent knows about.
    pub fn get_reader_list(&self) -> Result<Vec<Reader>> {
        let list: ReaderList = self.expect(Command::GetReaderList, tags::READER_LIST)?;
        Ok(list.reader)
    }

    /// `RUN_AUTH` with the configured token URL.
    pub fn run_auth(&self) -> Result<Auth> {
        let command = Command::RunAuth {
            tc_token_url: self.endpoint.token_url().to_string(),
        };
        self.expect(command, tags::AUTH)
    }

    /// `GET_ACCESS_RIGHTS`. Reply tag not checked.
    pub fn get_access_rights(&self) -> Result<Envelope> {
        self.send(&Command::GetAccessRights)
    }

    /// `SET_ACCESS_RIGHTS`. Reply tag not checked.
    pub fn set_access_rights(&self, chat: Vec<String>) -> Result<Envelope> {
        self.send(&Command::SetAccessRights { chat })
    }

    /// `GET_CERTIFICATE` → description and validity.
    pub fn get_certificate(&self) -> Result<Certificate> {
        self.expect(Command::GetCertificate, tags::CERTIFICATE)
    }

    pub fn cancel(&self) -> Result<bool> {
        self.expect_tag(Command::Cancel, tags::CANCEL).map(|_| true)
    }

    pub fn accept(&self) -> Result<bool> {
        self.expect_tag(Command::Accept, tags::ACCEPT).map(|_| true)
    }

    /// `SET_PIN`. Reply tag not checked.
    pub fn set_pin(&self, pin: &str) -> Result<Envelope> {
        self.send(&Command::SetPin {
            value: pin.to_string(),
        })
    }

    /// `SET_CAN`. Reply tag not checked.
    pub fn set_can(&self, can: &str) -> Result<Envelope> {
        self.send(&Command::SetCan {
            value: can.to_string(),
        })
    }

    /// `SET_PUK`. Reply tag not checked.
    pub fn set_puk(&self, puk: &str) -> Result<Envelope> {
        self.send(&Command::SetPuk {
            value: puk.to_string(),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
