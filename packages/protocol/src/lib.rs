//! Wire types for the eID agent protocol.
//!
//! The agent speaks a stateful command/response protocol: every request is a
//! JSON object carrying a `cmd` discriminator, every reply a JSON object
//! carrying a `msg` discriminator. This crate encodes both sides as Rust
//! types and has no I/O of its own; the `eidagent-client` crate does the HTTP.
//!
//! # Commands and their replies
//!
//! | `cmd` | Request type | Expected `msg` |
//! |-------|--------------|----------------|
//! | `GET_INFO` | [`Command::GetInfo`] | `INFO` → [`Info`] |
//! | `GET_API_LEVEL` | [`Command::GetApiLevel`] | `API_LEVEL` → [`ApiLevel`] |
//! | `SET_API_LEVEL` | [`Command::SetApiLevel`] | `API_LEVEL` → [`ApiLevel`] |
//! | `GET_READER` | [`Command::GetReader`] | `READER` → [`Reader`] |
//! | `GET_READER_LIST` | [`Command::GetReaderList`] | `READER_LIST` → [`ReaderList`] |
//! | `RUN_AUTH` | [`Command::RunAuth`] | `AUTH` → [`Auth`] |
//! | `GET_ACCESS_RIGHTS` | [`Command::GetAccessRights`] | not fixed |
//! | `SET_ACCESS_RIGHTS` | [`Command::SetAccessRights`] | not fixed |
//! | `GET_CERTIFICATE` | [`Command::GetCertificate`] | `CERTIFICATE` → [`Certificate`] |
//! | `CANCEL` | [`Command::Cancel`] | `CANCEL` |
//! | `ACCEPT` | [`Command::Accept`] | `ACCEPT` |
//! | `SET_PIN` / `SET_CAN` / `SET_PUK` | [`Command::SetPin`] … | not fixed |
//!
//! Any reply may instead carry one of the failure tags in [`tags::FAILURE`].

pub mod command;
pub mod message;
pub mod tags;

pub use command::Command;
pub use message::{
    AccessRights, ApiLevel, Auth, Card, Certificate, Chat, Envelope, Info, Message, Reader,
    ReaderList,
};
