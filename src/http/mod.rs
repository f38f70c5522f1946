//! # HTTP plumbing
//!
//! Resolving the application under test to an origin, the local test server,
//! and the request/response types the assertion layer works on. Wire work is
//! delegated to `reqwest` on the client side and `hyper` on the server side.

pub mod app;
pub mod client;
pub mod method;
pub mod request;
pub mod response;
pub mod server;
