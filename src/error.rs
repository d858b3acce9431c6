//! The error taxonomy shared by every layer of the client: BER codec,
//! USM security, message processing, and the session/retry loop.

use thiserror::Error;

use crate::ber::BerError;
use crate::oid::Oid;

pub type SnmpResult<T> = Result<T, SnmpError>;

/// Top-level error type returned by this crate.
///
/// Each variant corresponds to one of the error kinds from the protocol
/// design: argument validation happens before any I/O, encode/decode
/// errors wrap the BER codec, network errors wrap I/O and carry a
/// distinguished timeout case, and the v3-specific variants surface USM
/// authentication/privacy/report conditions.
#[derive(Error, Debug)]
pub enum SnmpError {
    /// Invalid configuration or operation parameter. Surfaced before any
    /// network I/O; never retried.
    #[error("invalid argument: {0}")]
    Argument(String),

    /// BER encoding failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// BER decoding failed. Never retried.
    #[error("decode error: {0}")]
    Decode(#[from] BerError),

    /// Dial, write, or read failure that is not a deadline expiry.
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    /// A socket operation's deadline expired.
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// SNMPv3 HMAC verification failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// SNMPv3 encryption/decryption failed.
    #[error("privacy failed: {0}")]
    Priv(String),

    /// A well-formed Report PDU came back from the agent. Carries the
    /// usmStats* OID identifying the condition, when present.
    #[error("agent reported an error{}", .oid.as_ref().map(|o| format!(" ({o})")).unwrap_or_default())]
    Response { oid: Option<Oid> },

    /// Distinguished subtype of `Response`: the engine-time window check
    /// failed. The retry layer recognizes this and re-runs discovery.
    #[error("message outside the engine time window")]
    NotInTimeWindow,

    /// Request-id/msgID mismatch, or a PDU type the caller didn't expect.
    #[error("message error: {0}")]
    Message(String),
}

impl SnmpError {
    /// Whether the retry combinator should attempt this operation again.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SnmpError::Argument(_) | SnmpError::Decode(_))
    }
}
