//! Well-known `msg` tags.

pub const INFO: &str = "INFO";
pub const API_LEVEL: &str = "API_LEVEL";
pub const READER: &str = "READER";
pub const READER_LIST: &str = "READER_LIST";
pub const AUTH: &str = "AUTH";
pub const ACCESS_RIGHTS: &str = "ACCESS_RIGHTS";
pub const CERTIFICATE: &str = "CERTIFICATE";
pub const CANCEL: &str = "CANCEL";
pub const ACCEPT: &str = "ACCEPT";
pub const ENTER_PIN: &str = "ENTER_PIN";
pub const ENTER_CAN: &str = "ENTER_CAN";
pub const ENTER_PUK: &str = "ENTER_PUK";
pub const INSERT_CARD: &str = "INSERT_CARD";

pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
pub const BAD_STATE: &str = "BAD_STATE";
pub const INVALID: &str = "INVALID";
pub const UNKNOWN_COMMAND: &str = "UNKNOWN_COMMAND";

/// Tags the agent uses to report that a command failed.
pub const FAILURE: [&str; 4] = [INTERNAL_ERROR, BAD_STATE, INVALID, UNKNOWN_COMMAND];

/// `true` if `tag` is one of the reserved failure tags.
pub fn is_failure(tag: &str) -> bool {
    FAILURE.contains(&tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_tags() {
        assert!(is_failure("BAD_STATE"));
        assert!(is_failure("UNKNOWN_COMMAND"));
        assert!(!is_failure("READER"));
        assert!(!is_failure("bad_state"));
    }
}
