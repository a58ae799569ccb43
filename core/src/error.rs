//! Error types for the tinyweb client.
//!
//! # Design
//! One enum covers every way a request can fail before a response exists:
//! caller-contract violations caught while the request is built, and
//! transport failures hit while talking to the peer. Each variant carries a
//! stable numeric `code()` so callers that only log or exit can still tell
//! the failing step apart. Malformed responses are not errors here; the
//! framer degrades to default fields instead, and JSON problems are values
//! of `JsonValue`.

use std::io;

use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Which blocking step a timeout interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Connect,
    Write,
    Read,
}

impl Step {
    fn code(self) -> u32 {
        match self {
            Step::Connect => 1003,
            Step::Write => 1004,
            Step::Read => 1005,
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Connect => f.write_str("connect"),
            Step::Write => f.write_str("write"),
            Step::Read => f.write_str("read"),
        }
    }
}

/// Errors returned while building or sending a request.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The connected socket could not be configured.
    #[error("ERROR opening socket: {0}")]
    SocketFailed(#[source] io::Error),

    /// DNS resolution failed or returned no address.
    #[error("ERROR no such host: {host}")]
    HostNotFound {
        host: String,
        #[source]
        source: Option<io::Error>,
    },

    /// Every resolved address refused or was unreachable.
    #[error("ERROR connecting: {0}")]
    ConnectFailed(#[source] io::Error),

    /// Writing the request failed or the peer stopped accepting bytes.
    #[error("ERROR writing message to socket: {0}")]
    WriteFailed(#[source] io::Error),

    /// Reading the response failed.
    #[error("ERROR reading response from socket: {0}")]
    ReadFailed(#[source] io::Error),

    /// A blocking step exceeded its configured timeout.
    #[error("ERROR {step} timed out")]
    Timeout { step: Step },

    /// TLS setup or the handshake failed; `detail` is the library's message.
    #[error("ERROR failed to open ssl connection: {detail}")]
    TlsHandshake { detail: String },

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unsupported scheme '{0}', expected http or https")]
    UnsupportedScheme(String),

    #[error("url '{0}' has no host")]
    MissingHost(String),

    /// A body-bearing verb was sent without any form field.
    #[error("request was {0}, but no form fields were given")]
    MissingFormFields(&'static str),

    /// Form fields were given to a verb that carries no body.
    #[error("request was {0}, which cannot carry form fields")]
    UnexpectedFormFields(&'static str),

    #[error("invalid configuration: {field} - {reason}")]
    InvalidConfig { field: String, reason: String },
}

impl ClientError {
    /// Numeric code of the failing step.
    ///
    /// Transport failures use 1001-1100, caller errors 12xx and
    /// configuration 13xx.
    #[must_use]
    pub fn code(&self) -> u32 {
        match self {
            ClientError::SocketFailed(_) => 1001,
            ClientError::HostNotFound { .. } => 1002,
            ClientError::ConnectFailed(_) => 1003,
            ClientError::WriteFailed(_) => 1004,
            ClientError::ReadFailed(_) => 1005,
            ClientError::Timeout { step } => step.code(),
            ClientError::TlsHandshake { .. } => 1100,
            ClientError::InvalidUrl(_) => 1200,
            ClientError::UnsupportedScheme(_) => 1201,
            ClientError::MissingHost(_) => 1202,
            ClientError::MissingFormFields(_) => 1203,
            ClientError::UnexpectedFormFields(_) => 1204,
            ClientError::InvalidConfig { .. } => 1300,
        }
    }

    /// Returns `true` for failures that happened on the wire rather than in
    /// the caller's input.
    #[must_use]
    pub const fn is_transport_error(&self) -> bool {
        matches!(
            self,
            ClientError::SocketFailed(_)
                | ClientError::HostNotFound { .. }
                | ClientError::ConnectFailed(_)
                | ClientError::WriteFailed(_)
                | ClientError::ReadFailed(_)
                | ClientError::Timeout { .. }
                | ClientError::TlsHandshake { .. }
        )
    }

    pub(crate) fn tls(detail: impl std::fmt::Display) -> Self {
        ClientError::TlsHandshake {
            detail: detail.to_string(),
        }
    }

    pub(crate) fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ClientError::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Map an I/O error from `step`, turning timeouts into `Timeout`.
    pub(crate) fn io(step: Step, err: io::Error) -> Self {
        if matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) {
            return ClientError::Timeout { step };
        }
        match step {
            Step::Connect => ClientError::ConnectFailed(err),
            Step::Write => ClientError::WriteFailed(err),
            Step::Read => ClientError::ReadFailed(err),
        }
    }
}
