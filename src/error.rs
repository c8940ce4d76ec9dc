//! Library error type
//!
//! Every runtime failure surfaces as [`Error`]. Callers match on the
//! five-digit number from [`ErrorCode::number`]: a two-digit module prefix
//! followed by a three-digit local suffix.

use std::fmt;

use serde::Serialize;
use tracing::error;

/// Boxed underlying cause
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type used across the library
pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Error Codes
// ============================================================================

/// Stable error catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Settings could not be loaded or are invalid
    ConfigInvalid,

    /// Registry constructor failed
    MultitonConstruct,

    /// Rate limits could not be fetched or parsed
    RateLimitRefresh,
    /// A throttled call waited longer than its timeout budget
    ThrottleTimeout,

    /// A page response did not have the expected shape
    MalformedPage,

    /// The transport layer rejected the call
    Transport,
    /// No operation is registered under the given name
    UnknownOperation,
    /// A required parameter was not supplied
    MissingParameter,
    /// The response body could not be decoded into the requested type
    ResponseDecode,
    /// A parameter the operation does not declare was supplied
    UnknownParameter,

    /// The application token could not be obtained
    ApplicationToken,
    /// The user token could not be obtained
    UserToken,
    /// The operation needs a user token but no user credential is configured
    NoUserCredential,

    /// The request signer failed
    Signer,

    /// Contract discovery hit a network failure
    CodegenNetwork,
    /// A contract could not be parsed
    ContractParse,
    /// An operation's scopes do not collapse to exactly one auth flow
    AmbiguousFlow,
    /// Filesystem failure in the build pipeline
    CodegenIo,
    /// The external OpenAPI generator failed
    GeneratorFailed,
    /// An anchored region was not found in the facade source
    AnchorMissing,
}

impl ErrorCode {
    /// Five-digit number (module prefix + local suffix)
    pub fn number(self) -> u32 {
        match self {
            ErrorCode::ConfigInvalid => 10001,
            ErrorCode::MultitonConstruct => 11001,
            ErrorCode::RateLimitRefresh => 12001,
            ErrorCode::ThrottleTimeout => 12002,
            ErrorCode::MalformedPage => 13001,
            ErrorCode::Transport => 14001,
            ErrorCode::UnknownOperation => 14002,
            ErrorCode::MissingParameter => 14003,
            ErrorCode::ResponseDecode => 14004,
            ErrorCode::UnknownParameter => 14005,
            ErrorCode::ApplicationToken => 15001,
            ErrorCode::UserToken => 15002,
            ErrorCode::NoUserCredential => 15003,
            ErrorCode::Signer => 16001,
            ErrorCode::CodegenNetwork => 17001,
            ErrorCode::ContractParse => 17002,
            ErrorCode::AmbiguousFlow => 17003,
            ErrorCode::CodegenIo => 17004,
            ErrorCode::GeneratorFailed => 17005,
            ErrorCode::AnchorMissing => 17006,
        }
    }

    /// Short human-readable reason
    pub fn reason(self) -> &'static str {
        match self {
            ErrorCode::ConfigInvalid => "Invalid configuration",
            ErrorCode::MultitonConstruct => "Instance construction failed",
            ErrorCode::RateLimitRefresh => "Rate limit refresh failed",
            ErrorCode::ThrottleTimeout => "Throttle wait timed out",
            ErrorCode::MalformedPage => "Malformed page response",
            ErrorCode::Transport => "eBay API call failed",
            ErrorCode::UnknownOperation => "Unknown operation",
            ErrorCode::MissingParameter => "Missing required parameter",
            ErrorCode::ResponseDecode => "Response decode failed",
            ErrorCode::UnknownParameter => "Unknown parameter",
            ErrorCode::ApplicationToken => "Application token unavailable",
            ErrorCode::UserToken => "User token unavailable",
            ErrorCode::NoUserCredential => "No user credential configured",
            ErrorCode::Signer => "Request signing failed",
            ErrorCode::CodegenNetwork => "Contract discovery network failure",
            ErrorCode::ContractParse => "Contract parse failure",
            ErrorCode::AmbiguousFlow => "Ambiguous auth flow",
            ErrorCode::CodegenIo => "Build cache I/O failure",
            ErrorCode::GeneratorFailed => "Client generator failed",
            ErrorCode::AnchorMissing => "Facade anchor missing",
        }
    }

    /// Two-digit module prefix
    pub fn module(self) -> u32 {
        self.number() / 1000
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

// ============================================================================
// Error
// ============================================================================

/// Library error: code, reason, optional detail and optional cause
pub struct Error {
    code: ErrorCode,
    detail: Option<String>,
    cause: Option<Cause>,
}

struct Cause {
    type_name: &'static str,
    inner: BoxError,
}

/// Structured form of an [`Error`] for logging
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    pub number: u32,
    pub reason: String,
    pub detail: Option<String>,
    pub cause: Option<String>,
}

impl Error {
    /// Create an error with no detail and no cause
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            detail: None,
            cause: None,
        }
    }

    /// Attach a detail string
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Attach the underlying cause, remembering its concrete type name
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Cause {
            type_name: short_type_name(std::any::type_name::<E>()),
            inner: Box::new(cause),
        });
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn number(&self) -> u32 {
        self.code.number()
    }

    pub fn reason(&self) -> &'static str {
        self.code.reason()
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Underlying cause, if any
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_ref().map(|c| c.inner.as_ref())
    }

    /// Downcast the cause to a concrete type
    pub fn cause_as<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.cause.as_ref().and_then(|c| c.inner.downcast_ref::<E>())
    }

    /// Whether this is the governor's throttle timeout
    pub fn is_throttle_timeout(&self) -> bool {
        self.code == ErrorCode::ThrottleTimeout
    }

    /// Structured record (number, reason, detail, cause)
    pub fn record(&self) -> ErrorRecord {
        ErrorRecord {
            number: self.number(),
            reason: self.reason().to_string(),
            detail: self.detail.clone(),
            cause: self
                .cause
                .as_ref()
                .map(|c| format!("{}: {}", c.type_name, c.inner)),
        }
    }

    /// Emit the structured record through tracing
    pub fn log(&self) {
        let record = self.record();
        error!(
            number = record.number,
            reason = %record.reason,
            detail = record.detail.as_deref().unwrap_or(""),
            cause = record.cause.as_deref().unwrap_or(""),
            "ebay-rest error"
        );
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    // Keep generic arguments intact, drop the module path of the outer type
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.number(), self.reason())?;
        if let Some(detail) = &self.detail {
            write!(f, ": {}", detail)?;
        }
        if let Some(cause) = &self.cause {
            write!(f, " (caused by {}: {})", cause.type_name, cause.inner)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("number", &self.number())
            .field("reason", &self.reason())
            .field("detail", &self.detail)
            .field("cause", &self.cause.as_ref().map(|c| c.inner.to_string()))
            .finish()
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|c| c.inner.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::new(ErrorCode::ConfigInvalid).with_cause(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("connection reset")]
    struct Reset;

    #[test]
    fn test_numbers_are_five_digits_and_unique() {
        let codes = [
            ErrorCode::ConfigInvalid,
            ErrorCode::MultitonConstruct,
            ErrorCode::RateLimitRefresh,
            ErrorCode::ThrottleTimeout,
            ErrorCode::MalformedPage,
            ErrorCode::Transport,
            ErrorCode::UnknownOperation,
            ErrorCode::MissingParameter,
            ErrorCode::ResponseDecode,
            ErrorCode::UnknownParameter,
            ErrorCode::ApplicationToken,
            ErrorCode::UserToken,
            ErrorCode::NoUserCredential,
            ErrorCode::Signer,
            ErrorCode::CodegenNetwork,
            ErrorCode::ContractParse,
            ErrorCode::AmbiguousFlow,
            ErrorCode::CodegenIo,
            ErrorCode::GeneratorFailed,
            ErrorCode::AnchorMissing,
        ];
        let mut seen = std::collections::HashSet::new();
        for code in codes {
            assert!((10000..100000).contains(&code.number()));
            assert!(seen.insert(code.number()), "duplicate {}", code.number());
        }
    }

    #[test]
    fn test_display_includes_all_parts() {
        let err = Error::new(ErrorCode::Transport)
            .with_detail("buy_browse_get_item")
            .with_cause(Reset);

        assert_eq!(
            err.to_string(),
            "14001 eBay API call failed: buy_browse_get_item (caused by Reset: connection reset)"
        );
    }

    #[test]
    fn test_display_minimal() {
        let err = Error::new(ErrorCode::ThrottleTimeout);
        assert_eq!(err.to_string(), "12002 Throttle wait timed out");
        assert!(err.is_throttle_timeout());
        assert_eq!(err.code().module(), 12);
    }

    #[test]
    fn test_record_and_source() {
        let err = Error::new(ErrorCode::UserToken).with_cause(Reset);
        let record = err.record();

        assert_eq!(record.number, 15002);
        assert_eq!(record.detail, None);
        assert_eq!(record.cause.as_deref(), Some("Reset: connection reset"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.cause_as::<Reset>().is_some());
    }
}
