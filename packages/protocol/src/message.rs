//! Response envelope: the reply body returned by the agent.
//!
//! [`Envelope`] is the raw, loosely-typed form: the `msg` tag, an optional
//! `error` detail, and whatever other fields came along. [`Message`] is the
//! typed view, one variant per known tag, with [`Message::Unrecognized`]
//! holding anything else unchanged.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tags;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A reply from the agent.
///
/// ```json
/// { "msg": "READER", "name": "reader0", "attached": true, "card": null }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    /// The reply kind.
    pub msg: String,

    /// Failure detail. Present on failure tags, and occasionally on others.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// All remaining payload fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Envelope {
    /// An envelope with only a `msg` tag.
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            error: None,
            fields: Map::new(),
        }
    }

    /// Builder-style helper to add a payload field.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Builder-style helper to set the `error` detail.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Look up a payload field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Decode the payload fields into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.fields.clone()))
    }

    /// Encode `payload` (which must serialise to an object) as the fields of
    /// an envelope tagged `msg`.
    pub fn encode<T: Serialize>(msg: &str, payload: &T) -> Result<Self, serde_json::Error> {
        let fields = match serde_json::to_value(payload)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(serde::ser::Error::custom(format!(
                    "payload for {msg} must be an object, got {other}"
                )))
            }
        };
        Ok(Self {
            msg: msg.to_string(),
            error: None,
            fields,
        })
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// `INFO`: version information about the agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Info {
    /// Free-form version blob, e.g. `{ "Name": "AusweisApp2", "Implementation-Version": "1.16.0", … }`.
    #[serde(rename = "VersionInfo")]
    pub version_info: Value,
}

/// `API_LEVEL`: current and supported API levels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiLevel {
    pub current: u32,

    /// Only present in replies to `GET_API_LEVEL`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available: Vec<u32>,
}

/// Card state as reported for a reader.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    #[serde(default)]
    pub inoperative: bool,

    #[serde(default)]
    pub deactivated: bool,

    /// PIN retries left, when the agent knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_counter: Option<i32>,

    /// Card fields this crate does not model, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `READER`: a single card reader.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reader {
    pub name: String,

    #[serde(default)]
    pub attached: bool,

    #[serde(default)]
    pub insertable: bool,

    #[serde(default)]
    pub keypad: bool,

    /// `null` when no card is inserted.
    #[serde(default)]
    pub card: Option<Card>,
}

/// `READER_LIST`: all known readers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ReaderList {
    #[serde(default)]
    pub reader: Vec<Reader>,
}

/// `AUTH`: authentication workflow started or finished.
///
/// The first `AUTH` reply of a workflow carries neither field; the final one
/// carries the `result` blob and, on success, the redirect `url`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Auth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Access-right names grouped by status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Chat {
    #[serde(default)]
    pub effective: Vec<String>,

    #[serde(default)]
    pub optional: Vec<String>,

    #[serde(default)]
    pub required: Vec<String>,
}

/// `ACCESS_RIGHTS`: the rights the service provider asks for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AccessRights {
    #[serde(default)]
    pub chat: Chat,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_info: Option<String>,
}

/// `CERTIFICATE`: the service provider's certificate, as described by the agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Certificate {
    pub description: Value,

    #[serde(default)]
    pub validity: Value,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Typed view of an [`Envelope`], keyed by its `msg` tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Info(Info),
    ApiLevel(ApiLevel),
    Reader(Reader),
    ReaderList(ReaderList),
    Auth(Auth),
    AccessRights(AccessRights),
    Certificate(Certificate),
    Cancel,
    Accept,
    EnterPin { reader: Option<Reader> },
    EnterCan { reader: Option<Reader> },
    EnterPuk { reader: Option<Reader> },
    InsertCard,
    /// One of the reserved failure tags in [`tags::FAILURE`].
    Failure { tag: String, error: Option<String> },
    /// Any tag this crate does not model.
    Unrecognized(Envelope),
}

#[derive(Deserialize)]
struct ReaderField {
    #[serde(default)]
    reader: Option<Reader>,
}

impl TryFrom<Envelope> for Message {
    type Error = serde_json::Error;

    /// Fails only when a known tag carries a payload of the wrong shape.
    fn try_from(env: Envelope) -> Result<Self, Self::Error> {
        let tag = env.msg.clone();
        let msg = match tag.as_str() {
            tags::INFO => Message::Info(env.decode()?),
            tags::API_LEVEL => Message::ApiLevel(env.decode()?),
            tags::READER => Message::Reader(env.decode()?),
            tags::READER_LIST => Message::ReaderList(env.decode()?),
            tags::AUTH => Message::Auth(env.decode()?),
            tags::ACCESS_RIGHTS => Message::AccessRights(env.decode()?),
            tags::CERTIFICATE => Message::Certificate(env.decode()?),
            tags::CANCEL => Message::Cancel,
            tags::ACCEPT => Message::Accept,
            tags::ENTER_PIN => Message::EnterPin {
                reader: env.decode::<ReaderField>()?.reader,
            },
            tags::ENTER_CAN => Message::EnterCan {
                reader: env.decode::<ReaderField>()?.reader,
            },
            tags::ENTER_PUK => Message::EnterPuk {
                reader: env.decode::<ReaderField>()?.reader,
            },
            tags::INSERT_CARD => Message::InsertCard,
            t if tags::is_failure(t) => Message::Failure {
                tag: env.msg,
                error: env.error,
            },
            _ => Message::Unrecognized(env),
        };
        Ok(msg)
    }
}

impl TryFrom<Message> for Envelope {
    type Error = serde_json::Error;

    fn try_from(msg: Message) -> Result<Self, Self::Error> {
        let reader_env = |tag: &str, reader: Option<Reader>| -> Result<Envelope, serde_json::Error> {
            let mut env = Envelope::new(tag);
            if let Some(reader) = reader {
                env.fields
                    .insert("reader".into(), serde_json::to_value(reader)?);
            }
            Ok(env)
        };
        match msg {
            Message::Info(p) => Envelope::encode(tags::INFO, &p),
            Message::ApiLevel(p) => Envelope::encode(tags::API_LEVEL, &p),
            Message::Reader(p) => Envelope::encode(tags::READER, &p),
            Message::ReaderList(p) => Envelope::encode(tags::READER_LIST, &p),
            Message::Auth(p) => Envelope::encode(tags::AUTH, &p),
            Message::AccessRights(p) => Envelope::encode(tags::ACCESS_RIGHTS, &p),
            Message::Certificate(p) => Envelope::encode(tags::CERTIFICATE, &p),
            Message::Cancel => Ok(Envelope::new(tags::CANCEL)),
            Message::Accept => Ok(Envelope::new(tags::ACCEPT)),
            Message::EnterPin { reader } => reader_env(tags::ENTER_PIN, reader),
            Message::EnterCan { reader } => reader_env(tags::ENTER_CAN, reader),
            Message::EnterPuk { reader } => reader_env(tags::ENTER_PUK, reader),
            Message::InsertCard => Ok(Envelope::new(tags::INSERT_CARD)),
            Message::Failure { tag, error } => Ok(Envelope {
                msg: tag,
                error,
                fields: Map::new(),
            }),
            Message::Unrecognized(env) => Ok(env),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(v: Value) -> Envelope {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn envelope_keeps_extra_fields() {
        let env = envelope(json!({ "msg": "READER", "name": "reader0", "attached": true }));
        assert_eq!(env.msg, "READER");
        assert!(env.error.is_none());
        assert_eq!(env.get("name"), Some(&json!("reader0")));
        assert!(env.get("msg").is_none());
    }

    #[test]
    fn reader_with_null_card() {
        let env = envelope(json!({
            "msg": "READER", "name": "reader0", "attached": true, "card": null
        }));
        let Message::Reader(reader) = Message::try_from(env).unwrap() else {
            panic!("expected READER");
        };
        assert_eq!(reader.name, "reader0");
        assert!(reader.attached);
        assert!(reader.card.is_none());
    }

    #[test]
    fn reader_with_card() {
        let env = envelope(json!({
            "msg": "READER", "name": "r", "attached": true,
            "card": { "inoperative": false, "deactivated": false, "retryCounter": 3 }
        }));
        let Message::Reader(reader) = Message::try_from(env).unwrap() else {
            panic!("expected READER");
        };
        assert_eq!(reader.card.unwrap().retry_counter, Some(3));
    }

    #[test]
    fn unknown_card_fields_survive_a_round_trip() {
        let env = envelope(json!({
            "msg": "READER", "name": "r", "attached": true,
            "card": { "retryCounter": 3, "eidType": "CARD_CERTIFIED" }
        }));
        let msg = Message::try_from(env).unwrap();
        let Message::Reader(reader) = &msg else {
            panic!("expected READER");
        };
        let card = reader.card.as_ref().unwrap();
        assert_eq!(card.extra.get("eidType"), Some(&json!("CARD_CERTIFIED")));
        assert!(!card.extra.contains_key("retryCounter"));

        let back = serde_json::to_value(Envelope::try_from(msg).unwrap()).unwrap();
        assert_eq!(back["card"]["eidType"], "CARD_CERTIFIED");
        assert_eq!(back["card"]["retryCounter"], 3);
    }

    #[test]
    fn api_level_available_defaults_to_empty() {
        let env = envelope(json!({ "msg": "API_LEVEL", "current": 2 }));
        assert_eq!(
            Message::try_from(env).unwrap(),
            Message::ApiLevel(ApiLevel {
                current: 2,
                available: vec![]
            })
        );
    }

    #[test]
    fn failure_tag_keeps_error() {
        let env = envelope(json!({ "msg": "BAD_STATE", "error": "RUN_AUTH" }));
        assert_eq!(
            Message::try_from(env).unwrap(),
            Message::Failure {
                tag: "BAD_STATE".into(),
                error: Some("RUN_AUTH".into())
            }
        );
    }

    #[test]
    fn unknown_tag_is_unrecognized() {
        let env = envelope(json!({ "msg": "STATUS", "workflow": "AUTH", "progress": 10 }));
        let msg = Message::try_from(env.clone()).unwrap();
        assert_eq!(msg, Message::Unrecognized(env));
    }

    #[test]
    fn malformed_known_payload_fails() {
        let env = envelope(json!({ "msg": "API_LEVEL", "current": "two" }));
        assert!(Message::try_from(env).is_err());
    }

    #[test]
    fn message_to_envelope() {
        let msg = Message::ApiLevel(ApiLevel {
            current: 1,
            available: vec![1, 2],
        });
        let env = Envelope::try_from(msg).unwrap();
        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({ "msg": "API_LEVEL", "current": 1, "available": [1, 2] })
        );
    }

    #[test]
    fn enter_pin_with_reader() {
        let env = envelope(json!({
            "msg": "ENTER_PIN",
            "reader": { "name": "r", "attached": true, "card": { "retryCounter": 2 } }
        }));
        let Message::EnterPin { reader } = Message::try_from(env).unwrap() else {
            panic!("expected ENTER_PIN");
        };
        assert_eq!(reader.unwrap().card.unwrap().retry_counter, Some(2));
    }
}
