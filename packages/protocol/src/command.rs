//! Command envelope: the request body sent to the agent.

use serde::{Deserialize, Serialize};

/// A single protocol command.
///
/// Serialises to a JSON object whose `cmd` field names the command, plus any
/// command-specific fields:
///
/// ```json
/// { "cmd": "SET_API_LEVEL", "level": 2 }
/// { "cmd": "RUN_AUTH", "tcTokenURL": "https://service.example/tcToken" }
/// ```
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "cmd", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    GetInfo,
    GetApiLevel,
    SetApiLevel {
        level: u32,
    },
    GetReader {
        name: String,
    },
    GetReaderList,
    RunAuth {
        #[serde(rename = "tcTokenURL")]
        tc_token_url: String,
    },
    GetAccessRights,
    /// `chat` lists the optional access rights the user agreed to.
    SetAccessRights {
        chat: Vec<String>,
    },
    GetCertificate,
    Cancel,
    Accept,
    SetPin {
        value: String,
    },
    SetCan {
        value: String,
    },
    SetPuk {
        value: String,
    },
}

impl Command {
    /// The wire name of this command, as carried in `cmd`.
    pub fn name(&self) -> &'static str {
        match self {
            Command::GetInfo => "GET_INFO",
            Command::GetApiLevel => "GET_API_LEVEL",
            Command::SetApiLevel { .. } => "SET_API_LEVEL",
            Command::GetReader { .. } => "GET_READER",
            Command::GetReaderList => "GET_READER_LIST",
            Command::RunAuth { .. } => "RUN_AUTH",
            Command::GetAccessRights => "GET_ACCESS_RIGHTS",
            Command::SetAccessRights { .. } => "SET_ACCESS_RIGHTS",
            Command::GetCertificate => "GET_CERTIFICATE",
            Command::Cancel => "CANCEL",
            Command::Accept => "ACCEPT",
            Command::SetPin { .. } => "SET_PIN",
            Command::SetCan { .. } => "SET_CAN",
            Command::SetPuk { .. } => "SET_PUK",
        }
    }
}

// PIN, CAN and PUK values must never end up in logs.
impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::SetApiLevel { level } => write!(f, "SetApiLevel({level})"),
            Command::GetReader { name } => write!(f, "GetReader({name:?})"),
            Command::RunAuth { tc_token_url } => write!(f, "RunAuth({tc_token_url:?})"),
            Command::SetAccessRights { chat } => write!(f, "SetAccessRights({chat:?})"),
            Command::SetPin { .. } | Command::SetCan { .. } | Command::SetPuk { .. } => {
                write!(f, "{}(<redacted>)", self.name())
            }
            _ => f.write_str(self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unit_command_is_bare_cmd() {
        let v = serde_json::to_value(Command::GetReaderList).unwrap();
        assert_eq!(v, json!({ "cmd": "GET_READER_LIST" }));
    }

    #[test]
    fn run_auth_uses_camel_case_token_field() {
        let cmd = Command::RunAuth {
            tc_token_url: "https://service.example/tc".into(),
        };
        let v = serde_json::to_value(&cmd).unwrap();
        assert_eq!(
            v,
            json!({ "cmd": "RUN_AUTH", "tcTokenURL": "https://service.example/tc" })
        );
    }

    #[test]
    fn name_matches_serialised_cmd() {
        let all = [
            Command::GetInfo,
            Command::GetApiLevel,
            Command::SetApiLevel { level: 1 },
            Command::GetReader { name: "r".into() },
            Command::GetReaderList,
            Command::RunAuth { tc_token_url: "u".into() },
            Command::GetAccessRights,
            Command::SetAccessRights { chat: vec![] },
            Command::GetCertificate,
            Command::Cancel,
            Command::Accept,
            Command::SetPin { value: "1".into() },
            Command::SetCan { value: "1".into() },
            Command::SetPuk { value: "1".into() },
        ];
        for cmd in all {
            let v = serde_json::to_value(&cmd).unwrap();
            assert_eq!(v["cmd"], cmd.name());
        }
    }

    #[test]
    fn parses_command_with_fields() {
        let cmd: Command =
            serde_json::from_str(r#"{"cmd":"SET_ACCESS_RIGHTS","chat":["Address"]}"#).unwrap();
        assert_eq!(
            cmd,
            Command::SetAccessRights {
                chat: vec!["Address".into()]
            }
        );
    }

    #[test]
    fn debug_redacts_secrets() {
        let cmd = Command::SetPin {
            value: "123456".into(),
        };
        let shown = format!("{cmd:?}");
        assert!(!shown.contains("123456"));
        assert_eq!(shown, "SET_PIN(<redacted>)");
    }
}
