use std::any::Any;
use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::io;
use std::panic::Location;

use serde_json::Value;

pub type BoxError = Box<dyn StdError + Send + Sync>;

/// A violated expectation on a received response.
///
/// Carries the values that were compared so callers can feed them to their
/// own diffing, and the source location that declared the expectation.
#[derive(Debug)]
pub struct AssertionError {
    message: String,
    expected: Value,
    actual: Value,
    cause: Option<BoxError>,
    origin: Option<&'static Location<'static>>,
}

impl AssertionError {
    pub fn new(
        message: impl Into<String>,
        expected: impl Into<Value>,
        actual: impl Into<Value>,
    ) -> Self {
        Self {
            message: message.into(),
            expected: expected.into(),
            actual: actual.into(),
            cause: None,
            origin: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub(crate) fn with_origin(mut self, origin: &'static Location<'static>) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Promotes anything a custom assertion returned as an error.
    pub(crate) fn from_error(err: BoxError) -> Self {
        match err.downcast::<AssertionError>() {
            Ok(assertion) => *assertion,
            Err(err) => Self::new(err.to_string(), Value::Null, Value::Null).with_cause(err),
        }
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "assertion panicked".to_string()
        };
        Self::new(message, Value::Null, Value::Null)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn expected(&self) -> &Value {
        &self.expected
    }

    pub fn actual(&self) -> &Value {
        &self.actual
    }

    /// Where the failing expectation was declared.
    pub fn origin(&self) -> Option<&'static Location<'static>> {
        self.origin
    }

    /// The failure rendered against its declaration site: the message, the
    /// declaring location, then the chain of underlying causes.
    pub fn trace(&self) -> String {
        let mut trace = format!("AssertionError: {}", self.message);
        if let Some(origin) = self.origin {
            trace.push_str(&format!("\n    at {origin}"));
        }
        trace.push_str("\n    ----");
        let mut cause = self.source();
        while let Some(err) = cause {
            trace.push_str(&format!("\n    caused by: {err}"));
            cause = err.source();
        }
        trace
    }
}

impl Display for AssertionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for AssertionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }
}

/// The single failure surfaced when a request is ended.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A response arrived but an expectation did not hold.
    #[error(transparent)]
    Assertion(#[from] AssertionError),

    /// A recognised system-level connection failure.
    #[error("{code}: {phrase}")]
    Connection {
        code: &'static str,
        phrase: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("Invalid JSON response body: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to start test server: {0}")]
    Bind(#[source] io::Error),

    #[error("Invalid request: {0}")]
    Usage(String),
}

const SYSTEM_ERRORS: [(io::ErrorKind, &str, &str); 4] = [
    (io::ErrorKind::ConnectionRefused, "ECONNREFUSED", "Connection refused"),
    (io::ErrorKind::ConnectionReset, "ECONNRESET", "Connection reset by peer"),
    (io::ErrorKind::BrokenPipe, "EPIPE", "Broken pipe"),
    (io::ErrorKind::TimedOut, "ETIMEDOUT", "Operation timed out"),
];

impl Error {
    /// HTTP status attached to a transport error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Transport(source) | Error::Connection { source, .. } => {
                source.status().map(|status| status.as_u16())
            }
            _ => None,
        }
    }

    pub fn as_assertion(&self) -> Option<&AssertionError> {
        match self {
            Error::Assertion(assertion) => Some(assertion),
            _ => None,
        }
    }

    pub fn is_assertion(&self) -> bool {
        self.as_assertion().is_some()
    }

    /// Rewrites recognised connection failures into their short form;
    /// every other error passes through unchanged.
    pub(crate) fn normalize(self) -> Self {
        match self {
            Error::Transport(source) => match system_error(&source) {
                Some((code, phrase)) => Error::Connection {
                    code,
                    phrase,
                    source,
                },
                None => Error::Transport(source),
            },
            other => other,
        }
    }
}

fn system_error(err: &reqwest::Error) -> Option<(&'static str, &'static str)> {
    if let Some(known) = io_cause(err) {
        return Some(known);
    }
    if err.is_timeout() {
        return Some(("ETIMEDOUT", "Operation timed out"));
    }
    None
}

/// First I/O error kind in the source chain that has a short form.
fn io_cause(err: &(dyn StdError + 'static)) -> Option<(&'static str, &'static str)> {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            let known = SYSTEM_ERRORS
                .iter()
                .find(|(kind, _, _)| *kind == io_err.kind());
            if let Some((_, code, phrase)) = known {
                return Some((*code, *phrase));
            }
        }
        current = err.source();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, thiserror::Error)]
    #[error("connection error")]
    struct Wrapped(#[source] io::Error);

    #[test]
    fn io_kinds_map_to_system_codes() {
        let pipe = io::Error::from(io::ErrorKind::BrokenPipe);
        assert_eq!(io_cause(&pipe), Some(("EPIPE", "Broken pipe")));

        let reset = Wrapped(io::Error::from(io::ErrorKind::ConnectionReset));
        assert_eq!(io_cause(&reset).map(|(code, _)| code), Some("ECONNRESET"));

        let other = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(io_cause(&other), None);
    }

    #[test]
    fn display_is_the_message() {
        let err = AssertionError::new("expected 200 \"OK\", got 404 \"Not Found\"", 200, 404);
        assert_eq!(
            err.to_string(),
            "expected 200 \"OK\", got 404 \"Not Found\""
        );
        assert_eq!(err.expected(), &json!(200));
        assert_eq!(err.actual(), &json!(404));
    }

    #[test]
    fn from_error_keeps_assertion_errors() {
        let boxed: BoxError = Box::new(AssertionError::new("boom", "a", "b"));
        let err = AssertionError::from_error(boxed);
        assert_eq!(err.message(), "boom");
        assert_eq!(err.expected(), &json!("a"));
    }

    #[test]
    fn from_error_wraps_foreign_errors() {
        let boxed: BoxError = "plain failure".into();
        let err = AssertionError::from_error(boxed);
        assert_eq!(err.message(), "plain failure");
        assert!(err.source().is_some());
    }

    #[test]
    fn from_panic_reads_string_payloads() {
        let err = AssertionError::from_panic(Box::new("static"));
        assert_eq!(err.message(), "static");
        let err = AssertionError::from_panic(Box::new(String::from("owned")));
        assert_eq!(err.message(), "owned");
        let err = AssertionError::from_panic(Box::new(7_u8));
        assert_eq!(err.message(), "assertion panicked");
    }

    #[test]
    fn trace_splices_origin_and_causes() {
        let err = AssertionError::new("bad body", Value::Null, Value::Null)
            .with_cause("values differ at $.foo")
            .with_origin(Location::caller());
        let trace = err.trace();
        let lines: Vec<&str> = trace.lines().collect();
        assert_eq!(lines[0], "AssertionError: bad body");
        assert!(lines[1].trim_start().starts_with("at "));
        assert!(lines[1].contains("error.rs"));
        assert_eq!(lines[2].trim(), "----");
        assert_eq!(lines[3].trim(), "caused by: values differ at $.foo");
    }

    #[test]
    fn usage_error_has_no_status() {
        let err = Error::Usage("nope".into());
        assert_eq!(err.status(), None);
        assert!(!err.is_assertion());
    }
}
