#![allow(dead_code)]

use std::sync::Arc;

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use reqcheck::{Handler, Server};
use serde_json::{Map, Value};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn reply(status: StatusCode, content_type: &str, body: impl Into<String>) -> Response<String> {
    Response::builder()
        .status(status)
        .header("content-type", content_type)
        .body(body.into())
        .unwrap()
}

fn redirect(status: StatusCode, location: &str) -> Response<String> {
    Response::builder()
        .status(status)
        .header("location", location)
        .body(String::new())
        .unwrap()
}

fn header(req: &Request<Bytes>, name: &str) -> String {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn route(req: Request<Bytes>) -> Response<String> {
    let path = req.uri().path().to_string();
    match (req.method().as_str(), path.as_str()) {
        ("GET", "/") => reply(StatusCode::OK, "text/html", "hey"),
        ("GET", "/json") => reply(StatusCode::OK, "application/json", r#"{"foo":"bar"}"#),
        ("GET", "/broken-json") => reply(StatusCode::OK, "application/json", "{\"foo\":"),
        ("GET", "/error") => reply(StatusCode::INTERNAL_SERVER_ERROR, "text/plain", "boom"),
        ("GET", "/query") => reply(
            StatusCode::OK,
            "text/plain",
            req.uri().query().unwrap_or_default(),
        ),
        ("GET", "/headers") => {
            let headers: Map<String, Value> = req
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.to_string(),
                        Value::from(value.to_str().unwrap_or_default()),
                    )
                })
                .collect();
            let body = Value::Object(headers).to_string();
            reply(StatusCode::OK, "application/json", body)
        }
        ("POST", "/echo") => {
            let content_type = header(&req, "content-type");
            let body = String::from_utf8_lossy(req.body()).into_owned();
            reply(StatusCode::CREATED, &content_type, body)
        }
        ("GET", "/login") => Response::builder()
            .header("set-cookie", "sid=42; Path=/; HttpOnly")
            .header("set-cookie", "theme=dark")
            .body("welcome".to_string())
            .unwrap(),
        ("GET", "/logout") => Response::builder()
            .header("set-cookie", "sid=; Max-Age=0")
            .body("bye".to_string())
            .unwrap(),
        ("GET", "/whoami") => reply(StatusCode::OK, "text/plain", header(&req, "cookie")),
        ("GET", "/redirect-login") => Response::builder()
            .status(StatusCode::FOUND)
            .header("location", "/whoami")
            .header("set-cookie", "sid=redirected")
            .body(String::new())
            .unwrap(),
        ("GET", "/host") => reply(StatusCode::OK, "text/plain", header(&req, "host")),
        ("GET", "/version") => reply(StatusCode::OK, "text/plain", format!("{:?}", req.version())),
        ("GET", "/powered") => Response::builder()
            .header("x-powered-by", "reqcheck")
            .header("vary", "accept")
            .header("vary", "cookie")
            .body(String::new())
            .unwrap(),
        ("POST", "/temporary") => redirect(StatusCode::TEMPORARY_REDIRECT, "/method"),
        ("POST", "/see-other") => redirect(StatusCode::SEE_OTHER, "/method"),
        (method, "/method") => {
            let mut content_type = header(&req, "content-type");
            if content_type.is_empty() {
                content_type.push('-');
            }
            let body = String::from_utf8_lossy(req.body());
            let echoed = format!("{method} {content_type} {body}");
            reply(StatusCode::OK, "text/plain", echoed)
        }
        _ => reply(StatusCode::NOT_FOUND, "text/plain", "not found"),
    }
}

pub fn app() -> Handler {
    Handler::new(|req: Request<Bytes>| async move { route(req) })
}

pub fn tls_app() -> Server {
    let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let key = rustls::pki_types::PrivateKeyDer::Pkcs8(
        rustls::pki_types::PrivatePkcs8KeyDer::from(cert.key_pair.serialize_der()),
    );
    let config = rustls::ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .unwrap()
    .with_no_client_auth()
    .with_single_cert(vec![cert.cert.der().clone()], key)
    .unwrap();
    Server::tls(app(), Arc::new(config))
}

/// An address nothing listens on.
pub fn unused_origin() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}
