use regex::Regex;
use serde_json::Value;

/// Expected header value: exact text or a pattern.
#[derive(Debug, Clone)]
pub enum HeaderMatch {
    Exact(String),
    Pattern(Regex),
}

/// Expected body: raw text, a pattern over the text, or a structural value
/// compared against the parsed body.
#[derive(Debug, Clone)]
pub enum BodyMatch {
    Text(String),
    Pattern(Regex),
    Json(Value),
}

/// One declaration passed to [`Test::expect`](crate::Test::expect).
///
/// Conversions pick the variant:
///
/// | value | expectation |
/// |---|---|
/// | `200` | status |
/// | `(200, body)` | status, then body |
/// | `[200, 204]` / `vec![..]` | status is one of |
/// | `("Content-Type", "text/html")`, `("Location", regex)` | header |
/// | `"text"`, `regex`, `json!({..})` | body |
///
/// An empty status list is a body expectation against `[]`.
#[derive(Debug, Clone)]
pub enum Expect {
    Status(i64),
    StatusIn(Vec<i64>),
    Header(String, HeaderMatch),
    Body(BodyMatch),
    StatusBody(i64, BodyMatch),
}

impl Expect {
    pub fn status(code: impl Into<i64>) -> Self {
        Expect::Status(code.into())
    }

    pub fn status_in<I, C>(codes: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<i64>,
    {
        let codes: Vec<i64> = codes.into_iter().map(Into::into).collect();
        if codes.is_empty() {
            return Expect::Body(BodyMatch::Json(Value::Array(Vec::new())));
        }
        Expect::StatusIn(codes)
    }

    pub fn header(name: impl Into<String>, value: impl Into<HeaderMatch>) -> Self {
        Expect::Header(name.into(), value.into())
    }

    pub fn body(body: impl Into<BodyMatch>) -> Self {
        Expect::Body(body.into())
    }
}

impl From<&str> for HeaderMatch {
    fn from(value: &str) -> Self {
        HeaderMatch::Exact(value.to_string())
    }
}

impl From<String> for HeaderMatch {
    fn from(value: String) -> Self {
        HeaderMatch::Exact(value)
    }
}

impl From<Regex> for HeaderMatch {
    fn from(pattern: Regex) -> Self {
        HeaderMatch::Pattern(pattern)
    }
}

macro_rules! header_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for HeaderMatch {
                fn from(value: $ty) -> Self {
                    HeaderMatch::Exact(value.to_string())
                }
            }
        )*
    };
}

header_number!(i32, i64, u16, u32, u64, usize);

impl From<&str> for BodyMatch {
    fn from(text: &str) -> Self {
        BodyMatch::Text(text.to_string())
    }
}

impl From<String> for BodyMatch {
    fn from(text: String) -> Self {
        BodyMatch::Text(text)
    }
}

impl From<Regex> for BodyMatch {
    fn from(pattern: Regex) -> Self {
        BodyMatch::Pattern(pattern)
    }
}

/// JSON strings and scalars compare against the raw text; `null`, arrays
/// and objects compare structurally.
impl From<Value> for BodyMatch {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => BodyMatch::Text(text),
            Value::Bool(_) | Value::Number(_) => BodyMatch::Text(value.to_string()),
            structured => BodyMatch::Json(structured),
        }
    }
}

impl From<i32> for Expect {
    fn from(code: i32) -> Self {
        Expect::Status(code.into())
    }
}

impl From<u16> for Expect {
    fn from(code: u16) -> Self {
        Expect::Status(code.into())
    }
}

impl From<http::StatusCode> for Expect {
    fn from(code: http::StatusCode) -> Self {
        Expect::Status(code.as_u16().into())
    }
}

impl<const N: usize> From<[i32; N]> for Expect {
    fn from(codes: [i32; N]) -> Self {
        Expect::status_in(codes)
    }
}

impl<const N: usize> From<[u16; N]> for Expect {
    fn from(codes: [u16; N]) -> Self {
        Expect::status_in(codes)
    }
}

impl From<Vec<i32>> for Expect {
    fn from(codes: Vec<i32>) -> Self {
        Expect::status_in(codes)
    }
}

impl From<Vec<u16>> for Expect {
    fn from(codes: Vec<u16>) -> Self {
        Expect::status_in(codes)
    }
}

impl<B: Into<BodyMatch>> From<(i32, B)> for Expect {
    fn from((code, body): (i32, B)) -> Self {
        Expect::StatusBody(code.into(), body.into())
    }
}

impl<B: Into<BodyMatch>> From<(u16, B)> for Expect {
    fn from((code, body): (u16, B)) -> Self {
        Expect::StatusBody(code.into(), body.into())
    }
}

impl<V: Into<HeaderMatch>> From<(&str, V)> for Expect {
    fn from((name, value): (&str, V)) -> Self {
        Expect::header(name, value)
    }
}

impl<V: Into<HeaderMatch>> From<(String, V)> for Expect {
    fn from((name, value): (String, V)) -> Self {
        Expect::header(name, value)
    }
}

impl<V: Into<HeaderMatch>> From<(http::HeaderName, V)> for Expect {
    fn from((name, value): (http::HeaderName, V)) -> Self {
        Expect::header(name.as_str(), value)
    }
}

impl From<&str> for Expect {
    fn from(text: &str) -> Self {
        Expect::body(text)
    }
}

impl From<String> for Expect {
    fn from(text: String) -> Self {
        Expect::body(text)
    }
}

impl From<Regex> for Expect {
    fn from(pattern: Regex) -> Self {
        Expect::body(pattern)
    }
}

impl From<Value> for Expect {
    fn from(value: Value) -> Self {
        Expect::body(value)
    }
}
