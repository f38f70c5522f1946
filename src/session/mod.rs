//! # Sessions
//!
//! An [`Agent`](agent::Agent) issues many requests against one application while keeping a
//! cookie jar, default headers and an optional `Host` override between them.
//! The jar is applied through the request hooks: attached before the first
//! hop, refreshed from every response, and re-attached across redirects.

pub mod agent;
pub mod cookie;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use reqwest::Url;
use reqwest::header::{COOKIE, HOST, HeaderMap, HeaderValue, SET_COOKIE};
use tracing::trace;

use self::cookie::CookieJar;
use crate::http::client::Hooks;

pub(crate) fn lock(jar: &Mutex<CookieJar>) -> MutexGuard<'_, CookieJar> {
    jar.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-request view of an agent's session state.
pub(crate) struct SessionHooks {
    jar: Arc<Mutex<CookieJar>>,
    host: Option<HeaderValue>,
    /// `Cookie` field the caller set explicitly, kept ahead of jar cookies.
    explicit: Option<String>,
}

impl SessionHooks {
    pub(crate) fn new(jar: Arc<Mutex<CookieJar>>, host: Option<HeaderValue>) -> Self {
        Self {
            jar,
            host,
            explicit: None,
        }
    }

    fn store(&self, url: &Url, headers: &HeaderMap) {
        let values = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok());
        let mut jar = lock(&self.jar);
        jar.store_all(values, url);
        trace!(%url, cookies = jar.len(), "stored response cookies");
    }

    fn attach(&self, url: &Url, headers: &mut HeaderMap) {
        let from_jar = lock(&self.jar).header_for(url);
        let value = match (self.explicit.as_deref(), from_jar) {
            (Some(explicit), Some(jar)) => format!("{explicit}; {jar}"),
            (Some(explicit), None) => explicit.to_string(),
            (None, Some(jar)) => jar,
            (None, None) => {
                headers.remove(COOKIE);
                return;
            }
        };
        match HeaderValue::from_str(&value) {
            Ok(value) => {
                headers.insert(COOKIE, value);
            }
            Err(err) => trace!(error = %err, "skipping unrepresentable cookie header"),
        }
    }
}

impl Hooks for SessionHooks {
    fn before_send(&mut self, url: &Url, headers: &mut HeaderMap) {
        if let Some(host) = &self.host {
            headers.insert(HOST, host.clone());
        }
        self.explicit = headers
            .get(COOKIE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        self.attach(url, headers);
    }

    fn on_response(&mut self, url: &Url, headers: &HeaderMap) {
        self.store(url, headers);
    }

    fn on_redirect(
        &mut self,
        url: &Url,
        headers: &HeaderMap,
        next: &Url,
        next_headers: &mut HeaderMap,
    ) {
        self.store(url, headers);
        if next.origin() != url.origin() {
            self.explicit = None;
        }
        self.attach(next, next_headers);
    }
}
