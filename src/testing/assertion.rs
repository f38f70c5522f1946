use std::panic::{self, AssertUnwindSafe, Location};

use reqwest::StatusCode;
use serde_json::Value;

use super::error::{AssertionError, BoxError};
use super::expect::{BodyMatch, Expect, HeaderMatch};
use super::inspect::{first_difference, inspect, quote};
use crate::http::response::Response;

pub(crate) type CustomCheck = Box<dyn FnMut(&mut Response) -> Result<(), BoxError> + Send>;

/// What a custom assertion closure may return.
///
/// Only errors count as failures; `()` and `bool` are discarded so that a
/// closure can merely inspect or rewrite the response.
pub trait AssertionOutcome {
    fn into_failure(self) -> Option<BoxError>;
}

impl AssertionOutcome for () {
    fn into_failure(self) -> Option<BoxError> {
        None
    }
}

impl AssertionOutcome for bool {
    fn into_failure(self) -> Option<BoxError> {
        None
    }
}

impl<T, E: Into<BoxError>> AssertionOutcome for Result<T, E> {
    fn into_failure(self) -> Option<BoxError> {
        self.err().map(Into::into)
    }
}

pub(crate) enum Check {
    Status(i64),
    StatusIn(Vec<i64>),
    Header(String, HeaderMatch),
    HeaderPresent(String),
    HeaderAbsent(String),
    Body(BodyMatch),
    Custom(CustomCheck),
}

impl Check {
    pub(crate) fn custom<F, R>(mut check: F) -> Self
    where
        F: FnMut(&mut Response) -> R + Send + 'static,
        R: AssertionOutcome,
    {
        Check::Custom(Box::new(move |res| match check(res).into_failure() {
            Some(err) => Err(err),
            None => Ok(()),
        }))
    }

    /// One declaration may queue more than one check; status goes first.
    pub(crate) fn from_expect(expect: Expect) -> Vec<Check> {
        match expect {
            Expect::Status(code) => vec![Check::Status(code)],
            Expect::StatusIn(codes) => vec![Check::StatusIn(codes)],
            Expect::Header(name, value) => vec![Check::Header(name, value)],
            Expect::Body(body) => vec![Check::Body(body)],
            Expect::StatusBody(code, body) => vec![Check::Status(code), Check::Body(body)],
        }
    }

    fn apply(&mut self, res: &mut Response) -> Result<(), AssertionError> {
        match self {
            Check::Status(code) => assert_status(*code, res),
            Check::StatusIn(codes) => assert_status_in(codes, res),
            Check::Header(name, value) => assert_header(name, value, res),
            Check::HeaderPresent(name) => assert_header_present(name, res),
            Check::HeaderAbsent(name) => assert_header_absent(name, res),
            Check::Body(body) => assert_body(body, res),
            Check::Custom(check) => check(res).map_err(AssertionError::from_error),
        }
    }
}

/// A queued check plus the place that declared it.
pub(crate) struct Assertion {
    check: Check,
    origin: &'static Location<'static>,
}

impl Assertion {
    pub(crate) fn new(check: Check, origin: &'static Location<'static>) -> Self {
        Self { check, origin }
    }

    /// Runs the check, turning a panic into an ordinary failure.
    pub(crate) fn run(&mut self, res: &mut Response) -> Result<(), AssertionError> {
        let check = &mut self.check;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| check.apply(res)))
            .unwrap_or_else(|payload| Err(AssertionError::from_panic(payload)));
        outcome.map_err(|err| err.with_origin(self.origin))
    }
}

fn reason(code: i64) -> &'static str {
    u16::try_from(code)
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .and_then(|status| status.canonical_reason())
        .unwrap_or("Unknown")
}

fn pattern(re: &regex::Regex) -> String {
    format!("/{}/", re.as_str())
}

fn assert_status(expected: i64, res: &Response) -> Result<(), AssertionError> {
    let actual = i64::from(res.status);
    if actual == expected {
        return Ok(());
    }
    Err(AssertionError::new(
        format!(
            "expected {expected} \"{}\", got {actual} \"{}\"",
            reason(expected),
            reason(actual)
        ),
        expected,
        actual,
    ))
}

fn assert_status_in(expected: &[i64], res: &Response) -> Result<(), AssertionError> {
    let actual = i64::from(res.status);
    if expected.contains(&actual) {
        return Ok(());
    }
    let list: Vec<String> = expected.iter().map(i64::to_string).collect();
    Err(AssertionError::new(
        format!(
            "expected one of \"{}\", got {actual} \"{}\"",
            list.join(", "),
            reason(actual)
        ),
        expected.to_vec(),
        actual,
    ))
}

fn assert_header(name: &str, expected: &HeaderMatch, res: &Response) -> Result<(), AssertionError> {
    let Some(actual) = res.header(name) else {
        return Err(AssertionError::new(
            format!("expected \"{name}\" header field"),
            name,
            Value::Null,
        ));
    };

    match expected {
        HeaderMatch::Exact(value) if *value == actual => Ok(()),
        HeaderMatch::Exact(value) => Err(AssertionError::new(
            format!("expected \"{name}\" of \"{value}\", got \"{actual}\""),
            value.as_str(),
            actual,
        )),
        HeaderMatch::Pattern(re) if re.is_match(&actual) => Ok(()),
        HeaderMatch::Pattern(re) => {
            let shown = pattern(re);
            Err(AssertionError::new(
                format!("expected \"{name}\" matching {shown}, got \"{actual}\""),
                shown,
                actual,
            ))
        }
    }
}

fn assert_header_present(name: &str, res: &Response) -> Result<(), AssertionError> {
    if res.has_header(name) {
        return Ok(());
    }
    Err(AssertionError::new(
        format!("expected \"{name}\" header field"),
        name,
        Value::Null,
    ))
}

fn assert_header_absent(name: &str, res: &Response) -> Result<(), AssertionError> {
    match res.header(name) {
        None => Ok(()),
        Some(actual) => Err(AssertionError::new(
            format!("unexpected \"{name}\" header field"),
            Value::Null,
            actual,
        )),
    }
}

fn assert_body(expected: &BodyMatch, res: &Response) -> Result<(), AssertionError> {
    match expected {
        BodyMatch::Json(value) => match first_difference(value, &res.body) {
            None => Ok(()),
            Some(difference) => Err(AssertionError::new(
                format!(
                    "expected {} response body, got {}",
                    inspect(value),
                    inspect(&res.body)
                ),
                value.clone(),
                res.body.clone(),
            )
            .with_cause(difference)),
        },
        BodyMatch::Text(text) if *text == res.text => Ok(()),
        BodyMatch::Text(text) => Err(AssertionError::new(
            format!(
                "expected {} response body, got {}",
                quote(text),
                quote(&res.text)
            ),
            text.as_str(),
            res.body.clone(),
        )),
        BodyMatch::Pattern(re) if re.is_match(&res.text) => Ok(()),
        BodyMatch::Pattern(re) => Err(AssertionError::new(
            format!("expected body \"{}\" to match {}", res.text, pattern(re)),
            pattern(re),
            res.text.as_str(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::stub;
    use regex::Regex;
    use serde_json::json;

    fn failure(check: Check, res: &mut Response) -> String {
        Assertion::new(check, Location::caller())
            .run(res)
            .unwrap_err()
            .message()
            .to_string()
    }

    #[test]
    fn status_mismatch_message() {
        let mut res = stub(500, &[], "");
        assert_eq!(
            failure(Check::Status(200), &mut res),
            "expected 200 \"OK\", got 500 \"Internal Server Error\""
        );
    }

    #[test]
    fn status_set_message() {
        let mut res = stub(200, &[], "");
        assert_eq!(
            failure(Check::StatusIn(vec![500, 404]), &mut res),
            "expected one of \"500, 404\", got 200 \"OK\""
        );
    }

    #[test]
    fn unknown_status_reason() {
        let mut res = stub(599, &[], "");
        assert_eq!(
            failure(Check::Status(200), &mut res),
            "expected 200 \"OK\", got 599 \"Unknown\""
        );
    }

    #[test]
    fn missing_header_message() {
        let mut res = stub(200, &[], "");
        let check = Check::Header("Content-Foo".into(), "bar".into());
        assert_eq!(
            failure(check, &mut res),
            "expected \"Content-Foo\" header field"
        );
    }

    #[test]
    fn header_mismatch_message() {
        let mut res = stub(
            200,
            &[("content-type", "application/json; charset=utf-8")],
            "{}",
        );
        let check = Check::Header("Content-Type".into(), "text/html".into());
        assert_eq!(
            failure(check, &mut res),
            "expected \"Content-Type\" of \"text/html\", got \"application/json; charset=utf-8\""
        );
    }

    #[test]
    fn header_pattern_message() {
        let mut res = stub(200, &[("content-type", "text/html")], "");
        let check = Check::Header(
            "Content-Type".into(),
            Regex::new("^application").unwrap().into(),
        );
        assert_eq!(
            failure(check, &mut res),
            "expected \"Content-Type\" matching /^application/, got \"text/html\""
        );
    }

    #[test]
    fn header_presence_and_absence() {
        let mut res = stub(200, &[("x-powered-by", "reqcheck")], "");
        let mut present = Assertion::new(
            Check::HeaderPresent("X-Powered-By".into()),
            Location::caller(),
        );
        assert!(present.run(&mut res).is_ok());
        assert_eq!(
            failure(Check::HeaderAbsent("X-Powered-By".into()), &mut res),
            "unexpected \"X-Powered-By\" header field"
        );
        assert_eq!(
            failure(Check::HeaderPresent("ETag".into()), &mut res),
            "expected \"ETag\" header field"
        );
    }

    #[test]
    fn empty_body_expectation_is_not_skipped() {
        let mut res = stub(200, &[("content-type", "text/html")], "foo");
        assert_eq!(
            failure(Check::Body("".into()), &mut res),
            "expected '' response body, got 'foo'"
        );
    }

    #[test]
    fn body_pattern_message() {
        let mut res = stub(200, &[], "foobar");
        let check = Check::Body(Regex::new("^bar").unwrap().into());
        assert_eq!(
            failure(check, &mut res),
            "expected body \"foobar\" to match /^bar/"
        );
    }

    #[test]
    fn json_body_mismatch_names_both_values() {
        let mut res = stub(
            200,
            &[("content-type", "application/json")],
            r#"{"foo":"bar"}"#,
        );
        let check = Check::Body(json!({ "foo": "baz" }).into());
        let err = Assertion::new(check, Location::caller())
            .run(&mut res)
            .unwrap_err();
        assert_eq!(
            err.message(),
            "expected { foo: 'baz' } response body, got { foo: 'bar' }"
        );
        assert_eq!(err.expected(), &json!({ "foo": "baz" }));
        assert_eq!(err.actual(), &json!({ "foo": "bar" }));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn custom_returned_error_fails() {
        let mut res = stub(200, &[], "");
        let check = Check::custom(|_res: &mut Response| Err::<(), _>("nope"));
        assert_eq!(failure(check, &mut res), "nope");
    }

    #[test]
    fn custom_non_error_values_are_ignored() {
        let mut res = stub(200, &[], "");
        let mut falsy = Assertion::new(
            Check::custom(|_res: &mut Response| false),
            Location::caller(),
        );
        assert!(falsy.run(&mut res).is_ok());
        let mut ok = Assertion::new(
            Check::custom(|_res: &mut Response| Ok::<_, String>(42)),
            Location::caller(),
        );
        assert!(ok.run(&mut res).is_ok());
    }

    #[test]
    fn panics_become_failures() {
        let mut res = stub(404, &[], "");
        let check = Check::custom(|res: &mut Response| {
            assert_eq!(res.status, 200, "status was off");
        });
        let message = failure(check, &mut res);
        assert!(message.contains("status was off"), "{message}");
    }

    #[test]
    fn failures_carry_the_declaring_location() {
        let mut res = stub(500, &[], "");
        let err = Assertion::new(Check::Status(200), Location::caller())
            .run(&mut res)
            .unwrap_err();
        assert!(err.origin().unwrap().file().ends_with("assertion.rs"));
    }
}
