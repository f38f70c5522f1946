use std::collections::BTreeMap;

use reqwest::Url;

/// A cookie as stored in a session jar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: String,
    /// The `Domain` attribute, or the host that set the cookie.
    pub domain: String,
    pub secure: bool,
    pub http_only: bool,
    host_only: bool,
    max_age: Option<i64>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: "/".to_string(),
            domain: String::new(),
            secure: false,
            http_only: false,
            host_only: false,
            max_age: None,
        }
    }

    /// Parses one `Set-Cookie` field received from `url`.
    ///
    /// `Expires` is not interpreted; `Max-Age` of zero or less marks the
    /// cookie for removal.
    pub fn parse(header: &str, url: &Url) -> Option<Cookie> {
        let mut attributes = header.split(';');
        let (name, value) = attributes.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let mut cookie = Cookie {
            name: name.to_string(),
            value: value.trim().trim_matches('"').to_string(),
            path: default_path(url.path()),
            domain: host,
            secure: false,
            http_only: false,
            host_only: true,
            max_age: None,
        };

        for attribute in attributes {
            let (key, val) = match attribute.split_once('=') {
                Some((key, val)) => (key.trim(), val.trim()),
                None => (attribute.trim(), ""),
            };
            match key.to_ascii_lowercase().as_str() {
                "path" if val.starts_with('/') => cookie.path = val.to_string(),
                "domain" if !val.is_empty() => {
                    cookie.domain = val.trim_start_matches('.').to_ascii_lowercase();
                    cookie.host_only = false;
                }
                "max-age" => cookie.max_age = val.parse().ok(),
                "secure" => cookie.secure = true,
                "httponly" => cookie.http_only = true,
                _ => {}
            }
        }
        Some(cookie)
    }

    pub fn is_expired(&self) -> bool {
        self.max_age.is_some_and(|age| age <= 0)
    }

    /// Whether this cookie goes out with a request to `url`.
    pub fn matches(&self, url: &Url) -> bool {
        if self.secure && url.scheme() != "https" {
            return false;
        }
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let domain_ok = self.domain.is_empty()
            || host == self.domain
            || (!self.host_only && host.ends_with(&format!(".{}", self.domain)));
        domain_ok && path_matches(&self.path, url.path())
    }
}

/// Directory of the request path, per RFC 6265 section 5.1.4.
fn default_path(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(index) => path[..index].to_string(),
    }
}

fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if cookie_path == request_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}

/// Cookies persisted across the requests of one session, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: BTreeMap<String, Cookie>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a cookie, replacing any with the same name. Expired cookies
    /// remove their namesake instead.
    pub fn store(&mut self, cookie: Cookie) {
        if cookie.is_expired() {
            self.cookies.remove(&cookie.name);
        } else {
            self.cookies.insert(cookie.name.clone(), cookie);
        }
    }

    /// Parses every `Set-Cookie` value and stores the result.
    pub fn store_all<'a>(&mut self, headers: impl IntoIterator<Item = &'a str>, url: &Url) {
        for header in headers {
            if let Some(cookie) = Cookie::parse(header, url) {
                self.store(cookie);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Cookie> {
        self.cookies.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Cookie> {
        self.cookies.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cookie> {
        self.cookies.values()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    /// Value for the `Cookie` field of a request to `url`, if any cookie
    /// applies.
    pub fn header_for(&self, url: &Url) -> Option<String> {
        let pairs: Vec<String> = self
            .cookies
            .values()
            .filter(|cookie| cookie.matches(url))
            .map(|cookie| format!("{}={}", cookie.name, cookie.value))
            .collect();
        (!pairs.is_empty()).then(|| pairs.join("; "))
    }
}
