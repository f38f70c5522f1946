use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{StatusCode, Url, Version};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// A fully buffered response as seen by assertions.
///
/// Assertions receive it mutably, so an inspection closure may rewrite
/// fields for the assertions queued after it.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub version: Version,
    pub headers: HeaderMap,
    pub text: String,
    pub body: Value,
    pub url: Url,
    /// Every URL a redirect pointed to, in hop order.
    pub redirects: Vec<Url>,
}

impl Response {
    pub fn status_code(&self) -> Option<StatusCode> {
        StatusCode::from_u16(self.status).ok()
    }

    /// Case-insensitive header lookup.
    ///
    /// Repeated fields are joined with `, `, except `Set-Cookie`, whose
    /// values are joined with a bare `,`.
    pub fn header(&self, name: &str) -> Option<String> {
        let mut values = self.headers.get_all(name).iter().peekable();
        values.peek()?;
        let joined: Vec<String> = values
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect();
        let separator = if name.eq_ignore_ascii_case("set-cookie") {
            ","
        } else {
            ", "
        };
        Some(joined.join(separator))
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    /// Mime type without parameters, lowercased.
    pub fn content_type(&self) -> Option<String> {
        mime_type(&self.headers)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.text)
    }

    pub fn is_redirect(&self) -> bool {
        is_redirect_status(self.status)
    }
}

pub(crate) fn is_redirect_status(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

fn mime_type(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let mime = raw.split(';').next().unwrap_or_default().trim();
    Some(mime.to_ascii_lowercase())
}

/// Structured view of a body: JSON is parsed, urlencoded forms become an
/// object of strings, everything else is an empty object.
pub(crate) fn parse_body(headers: &HeaderMap, text: &str) -> Result<Value, serde_json::Error> {
    let Some(mime) = mime_type(headers) else {
        return Ok(Value::Object(Map::new()));
    };

    if text.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    if mime == "application/json" || mime.ends_with("+json") {
        return serde_json::from_str(text);
    }

    if mime == "application/x-www-form-urlencoded" {
        let fields = url::form_urlencoded::parse(text.as_bytes())
            .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
            .collect();
        return Ok(Value::Object(fields));
    }

    Ok(Value::Object(Map::new()))
}

#[cfg(test)]
pub(crate) fn stub(status: u16, headers: &[(&str, &str)], text: &str) -> Response {
    use reqwest::header::{HeaderName, HeaderValue};

    let mut map = HeaderMap::new();
    for (key, value) in headers {
        map.append(
            HeaderName::from_bytes(key.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
    }
    let body = parse_body(&map, text).unwrap_or(Value::Null);
    Response {
        status,
        version: Version::HTTP_11,
        headers: map,
        text: text.to_string(),
        body,
        url: Url::parse("http://127.0.0.1/").unwrap(),
        redirects: Vec::new(),
    }
}
