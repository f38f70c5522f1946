use std::io;

use serde::Deserialize;
use tracing::debug;

use super::server::{Handler, Server};

/// The application under test.
#[derive(Debug, Clone)]
pub enum App {
    /// Base URL of something already running, used verbatim as the origin.
    Url(String),
    /// A bare handler; every request gets its own ephemeral server.
    Handler(Handler),
    /// A server handle, bound on first use unless it is already listening.
    Server(Server),
}

impl From<&str> for App {
    fn from(url: &str) -> Self {
        App::Url(url.to_string())
    }
}

impl From<String> for App {
    fn from(url: String) -> Self {
        App::Url(url)
    }
}

impl From<Handler> for App {
    fn from(handler: Handler) -> Self {
        App::Handler(handler)
    }
}

impl From<Server> for App {
    fn from(server: Server) -> Self {
        App::Server(server)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http1,
    Http2,
}

/// Where requests go, and the server to close afterwards if we started it.
#[derive(Debug)]
pub(crate) struct Target {
    pub origin: String,
    pub server: Option<Server>,
}

pub(crate) fn resolve(app: &App, protocol: Protocol) -> io::Result<Target> {
    match app {
        App::Url(origin) => Ok(Target {
            origin: origin.clone(),
            server: None,
        }),
        App::Handler(handler) => resolve_server(Server::new(handler.clone()), protocol),
        App::Server(server) => resolve_server(server.clone(), protocol),
    }
}

fn resolve_server(server: Server, protocol: Protocol) -> io::Result<Target> {
    let (addr, owned) = match server.local_addr() {
        Some(addr) => (addr, false),
        None => (server.listen()?, true),
    };
    debug!(%addr, owned, ?protocol, "resolved test server");

    Ok(Target {
        origin: format!("{}://127.0.0.1:{}", server.scheme(), addr.port()),
        server: owned.then_some(server),
    })
}
