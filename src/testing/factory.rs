use crate::http::app::App;
use crate::http::method::HttpMethod;
use crate::http::request::RequestParts;
use crate::options::Options;

use super::test::Test;

/// Builds one [`Test`] per verb call against a fixed application.
///
/// Holds no state between requests; use an [`Agent`](crate::Agent) to keep
/// cookies and headers.
#[derive(Debug, Clone)]
pub struct Client {
    app: App,
    options: Options,
    client: Result<reqwest::Client, String>,
}

impl Client {
    pub fn new(app: impl Into<App>, options: Options) -> Self {
        let client = options.build_client();
        Self {
            app: app.into(),
            options,
            client,
        }
    }

    pub fn config(&self) -> &Options {
        &self.options
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

    /// Alias of [`delete`](Client::delete).
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
            RequestParts::default(),
            None,
        )
    }
}
