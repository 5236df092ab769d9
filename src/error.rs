/// Invalid URL or option values, detected before any call is attempted.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// The connection URL could not be turned into connection parameters.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    /// An option value is out of range or could not be parsed.
    #[error("invalid option `{name}`: {reason}")]
    InvalidOption { name: &'static str, reason: String },
}

/// Cause of a single failed attempt.
#[derive(Debug, thiserror::Error)]
pub enum CallFailure {
    /// The attempt did not settle within the allotted time.
    #[error("timed out in {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// The daemon refused the credentials (401/403).
    #[error("connection rejected: {status}")]
    Rejected { status: u16 },
    /// Non-success HTTP status whose body is not a JSON-RPC envelope.
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },
    /// Error object reported by the daemon inside the envelope.
    #[error("{message}")]
    Remote { code: i64, message: String },
    /// Response decoding or envelope-shape error.
    #[error("decode error: {0}")]
    Decode(String),
    /// A callback-style call dropped its completion without settling.
    #[error("completion dropped before the call settled")]
    Abandoned,
}

impl CallFailure {
    /// Shorthand for a daemon-reported error with code `-1`.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            code: -1,
            message: message.into(),
        }
    }
}

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum RpcClientError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    /// The method is not part of the call specification.
    #[error("unknown rpc method `{0}`")]
    UnknownMethod(String),
    /// A positional argument could not be coerced to the declared kind.
    #[error("invalid parameter {index} for `{method}`: {reason}")]
    InvalidParam {
        method: String,
        index: usize,
        reason: String,
    },
    /// The final permitted attempt failed.
    #[error("rpc call `{method}` failed after {attempts} attempt(s): {cause}")]
    Call {
        method: String,
        attempts: usize,
        #[source]
        cause: CallFailure,
    },
    /// The retry loop ended without a result or an error. Unreachable with a
    /// well-formed attempt bound.
    #[error("no rpc call made for `{method}`")]
    ExhaustedRetries { method: String },
}

impl RpcClientError {
    /// Returns the cause of a failed call, if this is a call error.
    pub fn cause(&self) -> Option<&CallFailure> {
        match self {
            Self::Call { cause, .. } => Some(cause),
            _ => None,
        }
    }

    /// Returns `true` when the final attempt exceeded its timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self.cause(), Some(CallFailure::Timeout { .. }))
    }
}
