use thiserror::Error;

/// Classification attached to every failed remote call.
///
/// The class is a pure function of the observed status code (or the absence
/// of a response), never of retry count or elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Non-retryable business failure or unreachable service.
    Permanent,
    /// Transient fault; the retry loop governs.
    Retryable,
    /// Expired or invalid credential, recoverable by refreshing the token.
    RequiresAuthRefresh,
    /// Natural-key collision on create, recoverable by reconciliation.
    Conflict,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Permanent => write!(f, "permanent"),
            Self::Retryable => write!(f, "retryable"),
            Self::RequiresAuthRefresh => write!(f, "requires_auth_refresh"),
            Self::Conflict => write!(f, "conflict"),
        }
    }
}

/// Maps an observed status code to its classification.
///
/// Total over all inputs. A call that produced no response at all is always
/// permanent.
pub fn classify(status: Option<u16>) -> ErrorClass {
    match status {
        None => ErrorClass::Permanent,
        Some(code) if code > 500 => ErrorClass::Permanent,
        Some(403) => ErrorClass::RequiresAuthRefresh,
        Some(409) => ErrorClass::Conflict,
        Some(_) => ErrorClass::Retryable,
    }
}

/// Error raised by a remote platform call.
///
/// The server's error text is kept verbatim so a terminal failure still
/// carries the original status and body for diagnosis.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The platform answered with an error status.
    #[error("remote call failed (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The call failed before any response existed.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The response arrived but its body could not be decoded.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// Conflict reconciliation could not re-query the remote collection.
    #[error("lookup after conflict failed: {0}")]
    ConflictLookup(#[source] Box<RemoteError>),

    /// An existing resource shares the natural key but diverges on an
    /// immutable field. Adopting it would mask a naming collision between
    /// unrelated intents.
    #[error("existing resource found but {field} mismatch: '{expected}' != '{actual}'")]
    Mismatch {
        field: String,
        expected: String,
        actual: String,
    },
}

impl RemoteError {
    /// Create an error for a response with the given status and body text.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an error for a call that never produced a response.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// The status code observed on the wire, if any response existed.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(_) | Self::Decode(_) | Self::ConflictLookup(_) | Self::Mismatch { .. } => {
                None
            }
        }
    }

    /// Classification of this error, per [`classify`].
    pub fn class(&self) -> ErrorClass {
        classify(self.status())
    }

    /// Whether the remote reported the resource as gone.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
