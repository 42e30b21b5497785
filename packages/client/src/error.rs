//! Error taxonomy shared by every layer of the client.
//!
//! A failure is categorised along two independent axes, how bad it is
//! ([`Severity`]) and whose fault it is ([`Origin`]). Both are always reported
//! together, e.g. `error+external`.

use std::fmt;

/// How serious a failure is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Warning,
    Error,
    Forbidden,
}

/// Where a failure originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Bad configuration or a local resource problem.
    Internal,
    /// The agent, the network, or the agent's reply.
    External,
}

/// Severity × origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorKind {
    pub severity: Severity,
    pub origin: Origin,
}

impl ErrorKind {
    pub const WARNING_INTERNAL: Self = Self::new(Severity::Warning, Origin::Internal);
    pub const WARNING_EXTERNAL: Self = Self::new(Severity::Warning, Origin::External);
    pub const ERROR_INTERNAL: Self = Self::new(Severity::Error, Origin::Internal);
    pub const ERROR_EXTERNAL: Self = Self::new(Severity::Error, Origin::External);
    pub const FORBIDDEN_INTERNAL: Self = Self::new(Severity::Forbidden, Origin::Internal);
    pub const FORBIDDEN_EXTERNAL: Self = Self::new(Severity::Forbidden, Origin::External);

    pub const fn new(severity: Severity, origin: Origin) -> Self {
        Self { severity, origin }
    }

    /// The kind as a bitset: warning `0x01`, error `0x02`, forbidden `0x04`,
    /// internal `0x10`, external `0x20`.
    pub const fn bits(self) -> u8 {
        let severity = match self.severity {
            Severity::Warning => 0x01,
            Severity::Error => 0x02,
            Severity::Forbidden => 0x04,
        };
        let origin = match self.origin {
            Origin::Internal => 0x10,
            Origin::External => 0x20,
        };
        severity | origin
    }

    /// Inverse of [`ErrorKind::bits`]. `None` unless exactly one severity
    /// bit and one origin bit are set.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        let severity = match bits & 0x0f {
            0x01 => Severity::Warning,
            0x02 => Severity::Error,
            0x04 => Severity::Forbidden,
            _ => return None,
        };
        let origin = match bits & 0xf0 {
            0x10 => Origin::Internal,
            0x20 => Origin::External,
            _ => return None,
        };
        Some(Self::new(severity, origin))
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Forbidden => "forbidden",
        };
        let origin = match self.origin {
            Origin::Internal => "internal",
            Origin::External => "external",
        };
        write!(f, "{severity}+{origin}")
    }
}

/// A failed configuration change, transport call, or agent reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    /// HTTP status, when the failure came from one.
    code: Option<u16>,
}

/// Alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
        }
    }

    pub fn internal(severity: Severity, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::new(severity, Origin::Internal), message)
    }

    pub fn external(severity: Severity, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::new(severity, Origin::External), message)
    }

    /// Attach a numeric code.
    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity
    }

    pub fn origin(&self) -> Origin {
        self.kind.origin
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> Option<u16> {
        self.code
    }
}
