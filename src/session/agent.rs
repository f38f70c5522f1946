use std::sync::{Arc, Mutex};

use reqwest::header::HeaderValue;
use tracing::debug;

use super::cookie::{Cookie, CookieJar};
use super::{SessionHooks, lock};
use crate::http::app::App;
use crate::http::method::HttpMethod;
use crate::http::request::{RequestConfig, RequestParts};
use crate::options::Options;
use crate::testing::Test;

/// A client that keeps cookies, default headers, credentials and a `Host`
/// override across requests to one application.
///
/// Each verb call returns a fresh [`Test`] seeded with the agent's defaults.
/// Cookies set by responses, including redirect responses, are presented on
/// later requests without the caller resending them.
#[derive(Debug, Clone)]
pub struct Agent {
    app: App,
    options: Options,
    client: Result<reqwest::Client, String>,
    defaults: RequestParts,
    host: Option<HeaderValue>,
    jar: Arc<Mutex<CookieJar>>,
}

impl Agent {
    pub fn new(app: impl Into<App>) -> Self {
        Self::with_options(app, Options::default())
    }

    pub fn with_options(app: impl Into<App>, options: Options) -> Self {
        let client = options.build_client();
        Self {
            app: app.into(),
            options,
            client,
            defaults: RequestParts::default(),
            host: None,
            jar: Arc::new(Mutex::new(CookieJar::new())),
        }
    }

    /// Sends `hostname` as the `Host` header of every request.
    pub fn host(mut self, hostname: &str) -> Self {
        match HeaderValue::from_str(hostname) {
            Ok(value) => self.host = Some(value),
            Err(e) => self.defaults.record_fault(format!("Invalid host `{hostname}`: {e}")),
        }
        self
    }

    /// Puts a cookie in the jar that every request path and host receives.
    pub fn cookie(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        lock(&self.jar).store(Cookie::new(name, value));
        self
    }

    /// Snapshot of the cookies currently held.
    pub fn cookies(&self) -> CookieJar {
        lock(&self.jar).clone()
    }

    pub fn clear_cookies(&self) {
        lock(&self.jar).clear();
        debug!("cleared agent cookies");
    }

    pub fn get(&self, path: &str) -> Test {
        self.request(HttpMethod::Get, path)
    }

    pub fn post(&self, path: &str) -> Test {
        self.request(HttpMethod::Post, path)
    }

    pub fn put(&self, path: &str) -> Test {
        self.request(HttpMethod::Put, path)
    }

    pub fn patch(&self, path: &str) -> Test {
        self.request(HttpMethod::Patch, path)
    }

    pub fn delete(&self, path: &str) -> Test {
        self.request(HttpMethod::Delete, path)
    }

    /// Alias of [`delete`](Agent::delete).
    pub fn del(&self, path: &str) -> Test {
        self.delete(path)
    }

    pub fn head(&self, path: &str) -> Test {
        self.request(HttpMethod::Head, path)
    }

    pub fn options(&self, path: &str) -> Test {
        self.request(HttpMethod::Options, path)
    }

    pub fn request(&self, method: HttpMethod, path: &str) -> Test {
        Test::new(
            &self.app,
            method,
            path,
            self.client.clone(),
            self.options.protocol(),
            self.defaults.clone(),
            Some(SessionHooks::new(Arc::clone(&self.jar), self.host.clone())),
        )
    }
}

impl RequestConfig for Agent {
    fn parts_mut(&mut self) -> &mut RequestParts {
        &mut self.defaults
    }
}
