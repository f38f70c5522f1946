use std::fmt;
use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, TcpListener as StdTcpListener};
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, trace, warn};

type HandlerFuture = Pin<Box<dyn Future<Output = http::Response<Full<Bytes>>> + Send>>;

/// A request handler: the application under test when no server is running
/// yet. Request bodies are fully buffered before the handler sees them.
#[derive(Clone)]
pub struct Handler {
    inner: Arc<dyn Fn(http::Request<Bytes>) -> HandlerFuture + Send + Sync>,
}

impl Handler {
    pub fn new<F, Fut, B>(handler: F) -> Self
    where
        F: Fn(http::Request<Bytes>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = http::Response<B>> + Send + 'static,
        B: Into<Bytes>,
    {
        Self {
            inner: Arc::new(move |req: http::Request<Bytes>| -> HandlerFuture {
                let response = handler(req);
                Box::pin(async move { response.await.map(|body| Full::new(body.into())) })
            }),
        }
    }

    async fn call(
        &self,
        req: http::Request<Incoming>,
    ) -> Result<http::Response<Full<Bytes>>, hyper::Error> {
        let (parts, body) = req.into_parts();
        let body = body.collect().await?.to_bytes();
        Ok((self.inner)(http::Request::from_parts(parts, body)).await)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").finish_non_exhaustive()
    }
}

enum State {
    Idle,
    Listening {
        addr: SocketAddr,
        shutdown: oneshot::Sender<()>,
        task: JoinHandle<()>,
    },
    Closed,
}

struct Inner {
    handler: Handler,
    tls: Option<TlsAcceptor>,
    state: Mutex<State>,
}

/// A handle to a local HTTP server wrapping a [`Handler`].
///
/// Clones share the same listener. Each accepted connection is served as
/// HTTP/1.1 or HTTP/2 depending on what the client speaks.
#[derive(Clone)]
pub struct Server {
    inner: Arc<Inner>,
}

impl Server {
    pub fn new(handler: Handler) -> Self {
        Self::build(handler, None)
    }

    /// A server terminating TLS with `config`. ALPN defaults to `h2` and
    /// `http/1.1` when the config names no protocols.
    pub fn tls(handler: Handler, config: Arc<rustls::ServerConfig>) -> Self {
        let config = if config.alpn_protocols.is_empty() {
            let mut config = (*config).clone();
            config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
            Arc::new(config)
        } else {
            config
        };
        Self::build(handler, Some(TlsAcceptor::from(config)))
    }

    fn build(handler: Handler, tls: Option<TlsAcceptor>) -> Self {
        Self {
            inner: Arc::new(Inner {
                handler,
                tls,
                state: Mutex::new(State::Idle),
            }),
        }
    }

    pub fn is_secure(&self) -> bool {
        self.inner.tls.is_some()
    }

    pub fn scheme(&self) -> &'static str {
        if self.is_secure() { "https" } else { "http" }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &*self.lock() {
            State::Listening { addr, .. } => Some(*addr),
            _ => None,
        }
    }

    pub fn is_listening(&self) -> bool {
        self.local_addr().is_some()
    }

    pub fn is_closed(&self) -> bool {
        matches!(&*self.lock(), State::Closed)
    }

    /// Binds an ephemeral port on 127.0.0.1 and starts accepting.
    ///
    /// Binding is synchronous; must be called from within a tokio runtime.
    /// Listening twice returns the existing address. A closed server binds a
    /// fresh port.
    pub fn listen(&self) -> io::Result<SocketAddr> {
        let mut state = self.lock();
        if let State::Listening { addr, .. } = &*state {
            return Ok(*addr);
        }

        let runtime = Handle::try_current().map_err(io::Error::other)?;

        let std_listener = StdTcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
        std_listener.set_nonblocking(true)?;
        let addr = std_listener.local_addr()?;

        let (shutdown, shutdown_rx) = oneshot::channel();
        let handler = self.inner.handler.clone();
        let tls = self.inner.tls.clone();
        let task = runtime.spawn(async move {
            match TcpListener::from_std(std_listener) {
                Ok(listener) => accept_loop(listener, handler, tls, shutdown_rx).await,
                Err(err) => warn!(error = %err, "failed to register listener"),
            }
        });

        debug!(%addr, scheme = self.scheme(), "test server listening");
        *state = State::Listening {
            addr,
            shutdown,
            task,
        };
        Ok(addr)
    }

    /// Stops accepting, drops open connections and waits for the accept loop
    /// to finish. Closing a server that never listened only marks it closed.
    pub async fn close(&self) {
        let previous = std::mem::replace(&mut *self.lock(), State::Closed);
        if let State::Listening {
            addr,
            shutdown,
            task,
        } = previous
        {
            let _ = shutdown.send(());
            if let Err(err) = task.await {
                warn!(error = %err, "test server task ended abnormally");
            }
            debug!(%addr, "test server closed");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        let state = &self.inner.state;
        state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("secure", &self.is_secure())
            .field("addr", &self.local_addr())
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn accept_loop(
    listener: TcpListener,
    handler: Handler,
    tls: Option<TlsAcceptor>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    trace!(%peer, "accepted connection");
                    connections.spawn(serve_connection(stream, handler.clone(), tls.clone()));
                }
                Err(err) => warn!(error = %err, "failed to accept connection"),
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }
    connections.shutdown().await;
}

async fn serve_connection(stream: TcpStream, handler: Handler, tls: Option<TlsAcceptor>) {
    let service = service_fn(move |req| {
        let handler = handler.clone();
        async move { handler.call(req).await }
    });
    let builder = auto::Builder::new(TokioExecutor::new());

    let result = match tls {
        Some(acceptor) => match acceptor.accept(stream).await {
            Ok(stream) => builder.serve_connection(TokioIo::new(stream), service).await,
            Err(err) => {
                debug!(error = %err, "tls handshake failed");
                return;
            }
        },
        None => builder.serve_connection(TokioIo::new(stream), service).await,
    };

    if let Err(err) = result {
        debug!(error = %err, "connection ended with error");
    }
}
