//! # reqcheck
//!
//! Declarative assertions for HTTP/1.1 and HTTP/2 responses in integration
//! tests. Hand it a base URL, a [`Server`] or a bare [`Handler`], describe the
//! response you expect, then await the test:
//!
//! ```ignore
//! use reqcheck::{Handler, request};
//! use serde_json::json;
//!
//! let app = Handler::new(|_req| async {
//!     http::Response::builder()
//!         .header("content-type", "application/json")
//!         .body(r#"{"name":"john"}"#)
//!         .unwrap()
//! });
//!
//! request(app)
//!     .get("/user")
//!     .expect(("Content-Type", "application/json"))
//!     .expect((200, json!({ "name": "john" })))
//!     .await?;
//! ```
//!
//! A handler gets an ephemeral server on `127.0.0.1`, closed before the
//! result is delivered. An [`Agent`] keeps cookies and default headers across
//! requests.

pub mod auth;
pub mod http;
pub mod options;
pub mod session;
pub mod testing;

pub use crate::http::app::{App, Protocol};
pub use crate::http::method::HttpMethod;
pub use crate::http::request::RequestConfig;
pub use crate::http::response::Response;
pub use crate::http::server::{Handler, Server};
pub use options::Options;
pub use session::agent::Agent;
pub use session::cookie::{Cookie, CookieJar};
pub use testing::{
    AssertionError, AssertionOutcome, BodyMatch, BoxError, Client, Error, Expect, HeaderMatch,
    State, Test,
};

/// Requests against `app` over HTTP/1.1.
pub fn request(app: impl Into<App>) -> Client {
    Client::new(app, Options::default())
}

pub fn request_with(app: impl Into<App>, options: Options) -> Client {
    Client::new(app, options)
}

/// A cookie-keeping session against `app`.
pub fn agent(app: impl Into<App>) -> Agent {
    Agent::new(app)
}

pub fn agent_with(app: impl Into<App>, options: Options) -> Agent {
    Agent::with_options(app, options)
}
