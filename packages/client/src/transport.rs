//! HTTP transport: one blocking POST per command.
//!
//! [`Transport`] is the seam between the command surface and the network.
//! [`HttpTransport`] is the real implementation on top of
//! `reqwest::blocking`; tests substitute a scripted one.
//!
//! The agent correlates requests by cookie, so [`HttpTransport`] loads the
//! session's cookie-jar file before each request and writes it back after,
//! session cookies included. The jar is replaced by rename, never rewritten
//! in place.

use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cookie_store::CookieStore;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::redirect::Policy;
use reqwest_cookie_store::CookieStoreMutex;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result, Severity};

/// Sent with every request.
pub const USER_AGENT: &str = concat!("eidagent-client/", env!("CARGO_PKG_VERSION"));

/// Redirect hops followed before giving up.
pub const MAX_REDIRECTS: usize = 10;

/// Whole-request timeout.
pub const TIMEOUT: Duration = Duration::from_secs(15);

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// One outbound command.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    pub url: &'a str,
    /// JSON command envelope.
    pub body: &'a str,
    pub cookie_file: &'a Path,
    pub verify_tls: bool,
}

/// Final HTTP status and raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }
}

/// Sends a command envelope and returns whatever came back.
///
/// Implementations report only failures to get a reply at all; judging the
/// status is [`check_status`]'s job.
pub trait Transport {
    fn post(&self, request: &Request<'_>) -> Result<Reply>;
}

/// Make sure the cookie directory exists, creating it if needed.
pub fn ensure_cookie_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        if !dir.is_dir() {
            return Err(Error::external(
                Severity::Error,
                format!("cookie directory {} is a file", dir.display()),
            ));
        }
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| {
        Error::internal(
            Severity::Error,
            format!("unable to create cookie directory {}: {e}", dir.display()),
        )
    })?;
    debug!(dir = %dir.display(), "created cookie directory");
    Ok(())
}

/// Only `200` is success. Everything else fails by leading digit: `4xx` is a
/// warning, `5xx` an error, anything else forbidden.
pub fn check_status(status: u16) -> Result<()> {
    if status == 200 {
        return Ok(());
    }
    let err = match status / 100 {
        4 => Error::external(Severity::Warning, format!("HTTP warning {status}")),
        5 => Error::external(Severity::Error, format!("HTTP error {status}")),
        _ => Error::external(Severity::Forbidden, format!("HTTP response {status}")),
    };
    Err(err.with_code(status))
}

// ---------------------------------------------------------------------------
// HttpTransport
// ---------------------------------------------------------------------------

/// `reqwest`-backed [`Transport`] with a file-persisted cookie jar.
pub struct HttpTransport {
    jar: Arc<CookieStoreMutex>,
    /// Built on first use, rebuilt when the TLS policy changes.
    client: Mutex<Option<(bool, Client)>>,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            jar: Arc::new(CookieStoreMutex::new(CookieStore::default())),
            client: Mutex::new(None),
        }
    }

    fn client(&self, verify_tls: bool) -> Result<Client> {
        let mut slot = self
            .client
            .lock()
            .map_err(|_| Error::internal(Severity::Error, "HTTP client lock poisoned"))?;
        if let Some((verify, client)) = slot.as_ref() {
            if *verify == verify_tls {
                return Ok(client.clone());
            }
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(redirect_policy())
            .timeout(TIMEOUT)
            .danger_accept_invalid_certs(!verify_tls)
            .danger_accept_invalid_hostnames(!verify_tls)
            .cookie_provider(Arc::clone(&self.jar))
            .build()
            .map_err(|e| {
                Error::internal(
                    Severity::Error,
                    format!("failed to build HTTP client: {e}"),
                )
            })?;
        *slot = Some((verify_tls, client.clone()));
        Ok(client)
    }

    /// Replace the in-memory jar with the contents of `path`. A missing or
    /// zero-length file is an empty jar.
    fn load_cookies(&self, path: &Path) -> Result<()> {
        let is_empty = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
        let store = if is_empty {
            CookieStore::default()
        } else {
            let file = File::open(path).map_err(|e| cookie_error("read", path, e))?;
            cookie_store::serde::json::load_all(BufReader::new(file))
                .map_err(|e| cookie_error("parse", path, e))?
        };
        *self.lock_jar()? = store;
        trace!(path = %path.display(), "loaded cookies");
        Ok(())
    }

    /// Write the jar to a sibling temp file, then rename it over `path`.
    fn save_cookies(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp =
            tempfile::NamedTempFile::new_in(dir).map_err(|e| cookie_error("write", path, e))?;
        {
            let store = self.lock_jar()?;
            cookie_store::serde::json::save_incl_expired_and_nonpersistent(&store, &mut tmp)
                .map_err(|e| cookie_error("write", path, e))?;
        }
        tmp.flush().map_err(|e| cookie_error("write", path, e))?;
        tmp.persist(path)
            .map_err(|e| cookie_error("write", path, e.error))?;
        trace!(path = %path.display(), "saved cookies");
        Ok(())
    }

    fn lock_jar(&self) -> Result<std::sync::MutexGuard<'_, CookieStore>> {
        self.jar
            .lock()
            .map_err(|_| Error::internal(Severity::Error, "cookie jar lock poisoned"))
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport").finish_non_exhaustive()
    }
}

impl Transport for HttpTransport {
    fn post(&self, request: &Request<'_>) -> Result<Reply> {
        let client = self.client(request.verify_tls)?;
        self.load_cookies(request.cookie_file)?;

        let response = client
            .post(request.url)
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_LENGTH, request.body.len())
            .body(request.body.to_owned())
            .send()
            .map_err(request_error)?;

        let status = response.status().as_u16();
        let body = response.text().map_err(request_error)?;

        // Cookies set by a failing response still belong to the session. The
        // agent has already acted on the command, so the reply is kept even
        // when the jar cannot be written.
        if let Err(e) = self.save_cookies(request.cookie_file) {
            warn!(error = %e, "cookie jar not saved");
        }
        Ok(Reply { status, body })
    }
}

/// Follows up to [`MAX_REDIRECTS`] hops. `previous` holds every URL already
/// requested, the original one included.
fn redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else {
            attempt.follow()
        }
    })
}

fn request_error(e: reqwest::Error) -> Error {
    let reason = if e.is_timeout() {
        "request timed out"
    } else if e.is_redirect() {
        "too many redirects"
    } else if e.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    let err = Error::external(Severity::Error, format!("{reason}: {e}"));
    match e.status() {
        Some(status) => err.with_code(status.as_u16()),
        None => err,
    }
}

fn cookie_error(action: &str, path: &Path, e: impl std::fmt::Display) -> Error {
    Error::internal(
        Severity::Error,
        format!("failed to {action} cookie file {}: {e}", path.display()),
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
