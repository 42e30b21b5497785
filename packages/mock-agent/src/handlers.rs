//! Command handler: `POST <path>`.
//!
//! Sessions are tracked with an `eidagent-session` cookie: a request without
//! a known session cookie gets a fresh session and a `Set-Cookie` in the
//! reply. Canned replies queued with [`AgentState::script`] win over the
//! simulation.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use eidagent_protocol::{
    AccessRights, ApiLevel, Auth, Card, Certificate, Chat, Command, Envelope, Info, Message,
    Reader, ReaderList,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::state::{AgentState, RequestHeaders, SessionState, Workflow};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "eidagent-session";

/// API levels the mock agent supports.
pub const API_LEVELS: [u32; 2] = [1, 2];

/// Optional access rights offered in every simulated workflow.
const OPTIONAL_RIGHTS: [&str; 2] = ["Address", "DateOfBirth"];
const REQUIRED_RIGHTS: [&str; 2] = ["GivenNames", "FamilyName"];

/// Shared state threaded through handlers via [`axum::extract::State`].
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<AgentState>,
    pub config: AgentConfig,
}

/// `POST <path>`: run one command envelope.
pub async fn command(State(state): State<AppState>, headers: HeaderMap, body: String) -> Response {
    let (session_id, is_new) = match session_cookie(&headers) {
        Some(id) if state.agent.has_session(&id) => (id, false),
        _ => (state.agent.open_session(), true),
    };

    let mut response = respond(&state, &session_id, &headers, &body);
    if is_new {
        let cookie = format!("{SESSION_COOKIE}={session_id}; Path=/; HttpOnly");
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
    }
    response
}

fn respond(state: &AppState, session_id: &str, headers: &HeaderMap, body: &str) -> Response {
    let raw: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => return AgentError::Invalid(format!("body is not JSON: {e}")).into_response(),
    };
    let Some(cmd) = raw.get("cmd").and_then(Value::as_str).map(str::to_string) else {
        return AgentError::Invalid("missing cmd".into()).into_response();
    };
    let seen = RequestHeaders {
        content_type: header_str(headers, header::CONTENT_TYPE),
        content_length: header_str(headers, header::CONTENT_LENGTH),
        user_agent: header_str(headers, header::USER_AGENT),
        body_len: body.len(),
    };
    state.agent.with_session(session_id, |s| {
        s.history.push(cmd.clone());
        s.requests.push(seen);
    });
    debug!(cmd = %cmd, session = session_id, "command received");

    if let Some(canned) = state.agent.take_canned(&cmd) {
        let status = StatusCode::from_u16(canned.status).unwrap_or(StatusCode::OK);
        return (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            canned.body,
        )
            .into_response();
    }

    let command: Command = match serde_json::from_value(raw) {
        Ok(c) => c,
        Err(e) if is_known(&cmd) => {
            return AgentError::Invalid(format!("{cmd}: {e}")).into_response()
        }
        Err(_) => return AgentError::UnknownCommand(cmd).into_response(),
    };

    let outcome = state
        .agent
        .with_session(session_id, |s| simulate(&state.config, s, command));
    match outcome.and_then(|msg| {
        Envelope::try_from(msg).map_err(|e| AgentError::Internal(e.to_string()))
    }) {
        Ok(env) => Json(env).into_response(),
        Err(e) => e.into_response(),
    }
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn is_known(cmd: &str) -> bool {
    [
        "GET_INFO",
        "GET_API_LEVEL",
        "SET_API_LEVEL",
        "GET_READER",
        "GET_READER_LIST",
        "RUN_AUTH",
        "GET_ACCESS_RIGHTS",
        "SET_ACCESS_RIGHTS",
        "GET_CERTIFICATE",
        "CANCEL",
        "ACCEPT",
        "SET_PIN",
        "SET_CAN",
        "SET_PUK",
    ]
    .contains(&cmd)
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Apply `command` to `session` and produce the agent's reply.
pub fn simulate(
    config: &AgentConfig,
    session: &mut SessionState,
    command: Command,
) -> Result<Message, AgentError> {
    let name = command.name();
    match command {
        Command::GetInfo => Ok(Message::Info(Info {
            version_info: json!({
                "Name": "eidagent-mock",
                "Implementation-Title": "eidagent-mock",
                "Implementation-Version": env!("CARGO_PKG_VERSION"),
                "Specification-Title": "TR-03124-1",
            }),
        })),

        Command::GetApiLevel => Ok(Message::ApiLevel(ApiLevel {
            current: session.api_level,
            available: API_LEVELS.to_vec(),
        })),

        Command::SetApiLevel { level } => {
            if !API_LEVELS.contains(&level) {
                return Err(AgentError::Invalid(format!("unsupported API level {level}")));
            }
            session.api_level = level;
            Ok(Message::ApiLevel(ApiLevel {
                current: level,
                available: Vec::new(),
            }))
        }

        Command::GetReader { name } => {
            let reader = if name == config.reader_name {
                reader(config, session)
            } else {
                Reader {
                    name,
                    attached: false,
                    insertable: false,
                    keypad: false,
                    card: None,
                }
            };
            Ok(Message::Reader(reader))
        }

        Command::GetReaderList => Ok(Message::ReaderList(ReaderList {
            reader: vec![reader(config, session)],
        })),

        Command::RunAuth { tc_token_url } => {
            if session.workflow != Workflow::Idle {
                return Err(AgentError::BadState(name.into()));
            }
            if tc_token_url.is_empty() {
                return Err(AgentError::Invalid("tcTokenURL must not be empty".into()));
            }
            session.workflow = Workflow::Started {
                token_url: tc_token_url,
            };
            session.chat = OPTIONAL_RIGHTS.iter().map(|r| r.to_string()).collect();
            Ok(Message::Auth(Auth::default()))
        }

        Command::GetAccessRights => {
            require_started(session, name)?;
            Ok(Message::AccessRights(access_rights(session)))
        }

        Command::SetAccessRights { chat } => {
            require_started(session, name)?;
            if let Some(bad) = chat.iter().find(|r| !OPTIONAL_RIGHTS.contains(&r.as_str())) {
                return Err(AgentError::Invalid(format!("{bad} is not an optional right")));
            }
            session.chat = chat;
            Ok(Message::AccessRights(access_rights(session)))
        }

        Command::GetCertificate => {
            require_started(session, name)?;
            Ok(Message::Certificate(Certificate {
                description: json!({
                    "issuerName": "Mock Issuer",
                    "issuerUrl": "https://issuer.invalid",
                    "subjectName": "Mock Service Provider",
                    "subjectUrl": "https://service.invalid",
                    "purpose": "Testing",
                    "termsOfUsage": "",
                }),
                validity: json!({
                    "effectiveDate": "2026-01-01",
                    "expirationDate": "2026-12-31",
                }),
            }))
        }

        Command::Cancel => {
            if session.workflow == Workflow::Idle {
                return Err(AgentError::BadState(name.into()));
            }
            session.workflow = Workflow::Idle;
            Ok(Message::Cancel)
        }

        Command::Accept => {
            let Workflow::Started { token_url } = session.workflow.clone() else {
                return Err(AgentError::BadState(name.into()));
            };
            session.workflow = Workflow::Accepted { token_url };
            Ok(Message::Accept)
        }

        Command::SetPin { value } => {
            let token_url = require_accepted(session, name)?;
            if session.can_pending || session.retry_counter == 0 {
                return Err(AgentError::BadState(name.into()));
            }
            require_digits(&value, 6, "PIN")?;
            if value == config.pin {
                session.retry_counter = 3;
                session.workflow = Workflow::Idle;
                return Ok(Message::Auth(Auth {
                    result: Some(json!({
                        "major": "http://www.bsi.bund.de/ecard/api/1.1/resultmajor#ok"
                    })),
                    url: Some(format!("{token_url}?ResultMajor=ok")),
                }));
            }
            session.retry_counter -= 1;
            let reader = Some(reader(config, session));
            Ok(match session.retry_counter {
                0 => Message::EnterPuk { reader },
                1 => {
                    session.can_pending = true;
                    Message::EnterCan { reader }
                }
                _ => Message::EnterPin { reader },
            })
        }

        Command::SetCan { value } => {
            require_accepted(session, name)?;
            if !session.can_pending {
                return Err(AgentError::BadState(name.into()));
            }
            require_digits(&value, 6, "CAN")?;
            session.can_pending = false;
            Ok(Message::EnterPin {
                reader: Some(reader(config, session)),
            })
        }

        Command::SetPuk { value } => {
            require_accepted(session, name)?;
            if session.retry_counter != 0 {
                return Err(AgentError::BadState(name.into()));
            }
            require_digits(&value, 10, "PUK")?;
            session.retry_counter = 3;
            Ok(Message::EnterPin {
                reader: Some(reader(config, session)),
            })
        }
    }
}

fn reader(config: &AgentConfig, session: &SessionState) -> Reader {
    Reader {
        name: config.reader_name.clone(),
        attached: true,
        insertable: false,
        keypad: false,
        card: Some(Card {
            inoperative: false,
            deactivated: false,
            retry_counter: Some(session.retry_counter),
            ..Card::default()
        }),
    }
}

fn access_rights(session: &SessionState) -> AccessRights {
    let required: Vec<String> = REQUIRED_RIGHTS.iter().map(|r| r.to_string()).collect();
    let mut effective = required.clone();
    effective.extend(session.chat.iter().cloned());
    AccessRights {
        chat: Chat {
            effective,
            optional: OPTIONAL_RIGHTS.iter().map(|r| r.to_string()).collect(),
            required,
        },
        transaction_info: None,
    }
}

fn require_started(session: &SessionState, cmd: &str) -> Result<(), AgentError> {
    match session.workflow {
        Workflow::Started { .. } => Ok(()),
        _ => Err(AgentError::BadState(cmd.into())),
    }
}

/// Returns the workflow's token URL.
fn require_accepted(session: &SessionState, cmd: &str) -> Result<String, AgentError> {
    match &session.workflow {
        Workflow::Accepted { token_url } => Ok(token_url.clone()),
        _ => Err(AgentError::BadState(cmd.into())),
    }
}

fn require_digits(value: &str, len: usize, what: &str) -> Result<(), AgentError> {
    if value.len() == len && value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(AgentError::Invalid(format!("{what} must be {len} digits")))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
