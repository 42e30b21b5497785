//! Failure replies.
//!
//! The agent reports command failures inside a normal `200` reply, using one
//! of the reserved failure tags as `msg` and a detail in `error`.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use eidagent_protocol::{tags, Envelope};

/// A command the mock agent refuses.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AgentError {
    /// The command is valid but not allowed in the current workflow state.
    #[error("BAD_STATE: {0}")]
    BadState(String),

    /// The command is malformed or carries an unacceptable value.
    #[error("INVALID: {0}")]
    Invalid(String),

    #[error("UNKNOWN_COMMAND: {0}")]
    UnknownCommand(String),

    #[error("INTERNAL_ERROR: {0}")]
    Internal(String),
}

impl AgentError {
    pub fn envelope(&self) -> Envelope {
        let (tag, detail) = match self {
            AgentError::BadState(d) => (tags::BAD_STATE, d),
            AgentError::Invalid(d) => (tags::INVALID, d),
            AgentError::UnknownCommand(d) => (tags::UNKNOWN_COMMAND, d),
            AgentError::Internal(d) => (tags::INTERNAL_ERROR, d),
        };
        Envelope::new(tag).with_error(detail.as_str())
    }
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        Json(self.envelope()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_tag_and_detail() {
        let env = AgentError::BadState("RUN_AUTH".into()).envelope();
        assert_eq!(env.msg, "BAD_STATE");
        assert_eq!(env.error.as_deref(), Some("RUN_AUTH"));
    }
}
