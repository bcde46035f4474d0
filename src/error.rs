use std::{fmt, io};

use thiserror::Error;
use tokio::time::error::Elapsed;

/// Coarse classification of a failed query, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No reply arrived before the deadline.
    Timeout,
    /// Socket or transport failure, e.g. an unreachable host.
    NetworkError,
    /// Reply shorter than the fields being decoded demand.
    MalformedResponse,
    /// Reply header does not match any type expected in the current state.
    UnexpectedReply,
    /// Out-of-sequence message, e.g. a second challenge.
    ProtocolViolation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::NetworkError => "network error",
            ErrorKind::MalformedResponse => "malformed response",
            ErrorKind::UnexpectedReply => "unexpected reply",
            ErrorKind::ProtocolViolation => "protocol violation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("failed to bind a local port: {0}")]
    FailedPortBind(#[source] io::Error),

    #[error("could not resolve host: {0}")]
    UnresolvableHost(#[source] io::Error),

    #[error("host is unreachable: {0}")]
    UnreachableHost(#[source] io::Error),

    #[error("failed to send request: {0}")]
    SendError(#[source] io::Error),

    #[error("failed to receive reply: {0}")]
    ReceiveError(#[source] io::Error),

    #[error("server did not reply in time")]
    Timeout(#[from] Elapsed),

    #[error("reply truncated at offset {offset}: need {needed} bytes, only {available} remaining")]
    MalformedResponse {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("unknown packet header {0:#010x}")]
    UnknownPacketHeader(i32),

    #[error("split (multi-packet) replies are not supported")]
    SplitResponse,

    #[error("unexpected packet type {got:#04x}, expected {expected:#04x}")]
    UnexpectedPacketType { expected: u8, got: u8 },

    #[error("server sent a second challenge instead of a reply")]
    RepeatedChallenge,

    #[error("server sent a reply after the exchange was complete")]
    ReplyAfterDone,
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::FailedPortBind(_)
            | QueryError::UnresolvableHost(_)
            | QueryError::UnreachableHost(_)
            | QueryError::SendError(_)
            | QueryError::ReceiveError(_) => ErrorKind::NetworkError,
            QueryError::Timeout(_) => ErrorKind::Timeout,
            QueryError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            QueryError::UnknownPacketHeader(_)
            | QueryError::SplitResponse
            | QueryError::UnexpectedPacketType { .. } => ErrorKind::UnexpectedReply,
            QueryError::RepeatedChallenge | QueryError::ReplyAfterDone => {
                ErrorKind::ProtocolViolation
            }
        }
    }
}

/// Failure to parse a `host[:port]` endpoint.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("server host cannot be empty")]
    EmptyHost,

    #[error("invalid port {0:?}: must be between 1 and 65535")]
    InvalidPort(String),
}
