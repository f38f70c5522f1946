use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};

use crate::auth::AuthMethod;

/// Request state owned by a [`Test`](crate::Test) or, as defaults, by an
/// [`Agent`](crate::Agent). Nothing is sent until the test is ended.
#[derive(Debug, Clone, Default)]
pub struct RequestParts {
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<Bytes>,
    pub auth: AuthMethod,
    pub timeout: Option<Duration>,
    pub redirects: u32,
    /// First configuration mistake, reported when the request is ended.
    pub fault: Option<String>,
}

impl RequestParts {
    pub fn set_header(&mut self, key: &str, value: &str) {
        let header_name = match HeaderName::from_bytes(key.trim().as_bytes()) {
            Ok(name) => name,
            Err(e) => return self.record_fault(format!("Invalid header key `{key}`: {e}")),
        };
        let header_value = match HeaderValue::from_str(value) {
            Ok(value) => value,
            Err(e) => return self.record_fault(format!("Invalid header value `{value}`: {e}")),
        };
        self.headers.insert(header_name, header_value);
    }

    /// Sets the body, adding `content_type` unless one was already set.
    pub fn set_body(&mut self, body: impl Into<Bytes>, content_type: &'static str) {
        self.body = Some(body.into());
        if !self.headers.contains_key(CONTENT_TYPE) {
            self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
    }

    pub fn record_fault(&mut self, message: String) {
        if self.fault.is_none() {
            self.fault = Some(message);
        }
    }
}

/// Request configuration shared by single requests and agents.
///
/// Implementors only expose their [`RequestParts`]; every setter is provided.
pub trait RequestConfig: Sized {
    fn parts_mut(&mut self) -> &mut RequestParts;

    /// Sets a header, replacing any previous value under the same name.
    fn set(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.parts_mut().set_header(key.as_ref(), value.as_ref());
        self
    }

    fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.parts_mut().auth = AuthMethod::BearerToken {
            token: token.into(),
        };
        self
    }

    fn basic_auth(mut self, username: impl Into<String>, password: Option<&str>) -> Self {
        self.parts_mut().auth = AuthMethod::BasicAuth {
            username: username.into(),
            password: password.map(str::to_string),
        };
        self
    }
}
