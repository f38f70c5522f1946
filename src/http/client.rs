use bytes::Bytes;
use reqwest::header::{
    AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, HOST, HeaderMap, LOCATION,
};
use reqwest::Url;
use tracing::{debug, trace};

use super::method::HttpMethod;
use super::request::RequestParts;
use super::response::{Response, is_redirect_status, parse_body};
use crate::auth::AuthMethod;
use crate::testing::Error;

/// Points where a caller may observe or rewrite a request in flight.
///
/// The execution routine calls them directly: `before_send` once before the
/// first hop, `on_redirect` for every redirect it follows, `on_response` for
/// the final response.
pub trait Hooks {
    fn before_send(&mut self, _url: &Url, _headers: &mut HeaderMap) {}

    fn on_response(&mut self, _url: &Url, _headers: &HeaderMap) {}

    fn on_redirect(
        &mut self,
        _url: &Url,
        _headers: &HeaderMap,
        _next: &Url,
        _next_headers: &mut HeaderMap,
    ) {
    }
}

pub struct NoHooks;

impl Hooks for NoHooks {}

/// Outcome of one round trip. A response and an error may both be present
/// when the head arrived but the body could not be read or parsed.
pub(crate) struct Exchange {
    pub response: Option<Response>,
    pub error: Option<Error>,
}

impl Exchange {
    pub(crate) fn failed(error: impl Into<Error>) -> Self {
        Self {
            response: None,
            error: Some(error.into()),
        }
    }
}

/// Appends query pairs the same way the request editor does.
pub(crate) fn with_query(mut url: Url, query: &[(String, String)]) -> Url {
    if !query.is_empty() {
        let mut query_pairs = url.query_pairs_mut();
        for (key, value) in query {
            query_pairs.append_pair(key, value);
        }
    }
    url
}

/// Sends the request, following up to `parts.redirects` redirects by hand so
/// the hooks see every hop.
pub(crate) async fn execute(
    client: &reqwest::Client,
    method: HttpMethod,
    url: Url,
    parts: &RequestParts,
    hooks: &mut (dyn Hooks + Send),
) -> Exchange {
    let mut method = method;
    let mut url = with_query(url, &parts.query);
    let mut headers = parts.headers.clone();
    let mut body = parts.body.clone();
    let mut auth = parts.auth.clone();
    let mut redirects = Vec::new();

    hooks.before_send(&url, &mut headers);

    loop {
        trace!(%method, %url, "sending request");
        let sent = send(client, method, &url, &headers, body.as_ref(), &auth, parts).await;
        let response = match sent {
            Ok(response) => response,
            Err(err) => return Exchange::failed(err),
        };

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| url.join(value).ok());

        if let Some(next) = location.filter(|_| is_redirect_status(status)) {
            if redirects.len() < parts.redirects as usize {
                debug!(status, from = %url, to = %next, "following redirect");
                let mut next_headers = headers.clone();
                if !matches!(status, 307 | 308) {
                    body = None;
                    next_headers.remove(CONTENT_TYPE);
                    next_headers.remove(CONTENT_LENGTH);
                }
                if next.origin() != url.origin() {
                    next_headers.remove(AUTHORIZATION);
                    next_headers.remove(COOKIE);
                    next_headers.remove(HOST);
                    auth = AuthMethod::None;
                }

                hooks.on_redirect(&url, response.headers(), &next, &mut next_headers);

                method = method.after_redirect(status);
                headers = next_headers;
                redirects.push(next.clone());
                url = next;
                continue;
            }
        }

        return finish(response, redirects, hooks).await;
    }
}

async fn send(
    client: &reqwest::Client,
    method: HttpMethod,
    url: &Url,
    headers: &HeaderMap,
    body: Option<&Bytes>,
    auth: &AuthMethod,
    parts: &RequestParts,
) -> Result<reqwest::Response, reqwest::Error> {
    let mut req_builder = client
        .request(method.into(), url.clone())
        .headers(headers.clone());
    req_builder = auth.apply(req_builder);

    if let Some(body) = body {
        req_builder = req_builder.body(body.clone());
    }
    if let Some(timeout) = parts.timeout {
        req_builder = req_builder.timeout(timeout);
    }

    req_builder.send().await
}

async fn finish(
    response: reqwest::Response,
    redirects: Vec<Url>,
    hooks: &mut (dyn Hooks + Send),
) -> Exchange {
    let status = response.status().as_u16();
    let version = response.version();
    let url = response.url().clone();
    let headers = response.headers().clone();
    hooks.on_response(&url, &headers);

    let mut error = None;
    let text = match response.bytes().await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(err) => {
            debug!(error = %err, "failed to read response body");
            error = Some(Error::Transport(err));
            String::new()
        }
    };

    let body = match parse_body(&headers, &text) {
        Ok(body) => body,
        Err(err) => {
            error.get_or_insert(Error::Parse(err));
            serde_json::Value::Null
        }
    };

    Exchange {
        response: Some(Response {
            status,
            version,
            headers,
            text,
            body,
            url,
            redirects,
        }),
        error,
    }
}
