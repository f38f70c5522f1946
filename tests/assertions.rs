mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use regex::Regex;
use reqcheck::{AssertionError, Error, RequestConfig, Response, request};
use serde_json::json;

fn message(err: Error) -> String {
    err.to_string()
}

#[tokio::test]
async fn status_and_body_pass() {
    common::init_tracing();
    let res = request(common::app())
        .get("/")
        .expect(200)
        .expect("hey")
        .await
        .unwrap();
    assert_eq!(res.text, "hey");
}

#[tokio::test]
async fn status_mismatch() {
    let err = request(common::app())
        .get("/error")
        .expect(200)
        .await
        .unwrap_err();
    assert_eq!(
        message(err),
        r#"expected 200 "OK", got 500 "Internal Server Error""#
    );
}

#[tokio::test]
async fn status_set_mismatch() {
    let err = request(common::app())
        .get("/")
        .expect([500, 404])
        .await
        .unwrap_err();
    assert_eq!(message(err), r#"expected one of "500, 404", got 200 "OK""#);
}

#[tokio::test]
async fn status_then_body() {
    let err = request(common::app())
        .get("/")
        .expect((200, "hello"))
        .await
        .unwrap_err();
    assert_eq!(message(err), "expected 'hello' response body, got 'hey'");

    let err = request(common::app())
        .get("/")
        .expect((404, "hey"))
        .await
        .unwrap_err();
    assert!(message(err).starts_with("expected 404"));
}

#[tokio::test]
async fn empty_body_expectation_fails() {
    let err = request(common::app())
        .get("/")
        .expect("")
        .await
        .unwrap_err();
    assert_eq!(message(err), "expected '' response body, got 'hey'");
}

#[tokio::test]
async fn missing_header() {
    let err = request(common::app())
        .get("/")
        .expect(("Content-Foo", "bar"))
        .await
        .unwrap_err();
    assert_eq!(message(err), r#"expected "Content-Foo" header field"#);
}

#[tokio::test]
async fn header_mismatch() {
    let err = request(common::app())
        .get("/json")
        .expect(("Content-Type", "text/html"))
        .await
        .unwrap_err();
    assert_eq!(
        message(err),
        r#"expected "Content-Type" of "text/html", got "application/json""#
    );
}

#[tokio::test]
async fn header_pattern_and_joined_values() {
    request(common::app())
        .get("/powered")
        .expect(("X-Powered-By", Regex::new("^req").unwrap()))
        .expect(("Vary", "accept, cookie"))
        .expect_header("x-powered-by")
        .unexpect_header("etag")
        .await
        .unwrap();

    let err = request(common::app())
        .get("/powered")
        .unexpect_header("X-Powered-By")
        .await
        .unwrap_err();
    assert_eq!(message(err), r#"unexpected "X-Powered-By" header field"#);
}

#[tokio::test]
async fn json_round_trip() {
    let res = request(common::app())
        .get("/json")
        .expect(json!({ "foo": "bar" }))
        .await
        .unwrap();
    assert_eq!(res.body, json!({ "foo": "bar" }));

    let err = request(common::app())
        .get("/json")
        .expect(json!({ "foo": "baz" }))
        .await
        .unwrap_err();
    let assertion = err.as_assertion().unwrap();
    assert_eq!(
        assertion.message(),
        "expected { foo: 'baz' } response body, got { foo: 'bar' }"
    );
    assert_eq!(assertion.expected(), &json!({ "foo": "baz" }));
    assert_eq!(assertion.actual(), &json!({ "foo": "bar" }));
}

#[tokio::test]
async fn body_pattern() {
    let err = request(common::app())
        .get("/")
        .expect(Regex::new("^bye").unwrap())
        .await
        .unwrap_err();
    assert_eq!(message(err), r#"expected body "hey" to match /^bye/"#);
}

#[tokio::test]
async fn assertions_stop_at_first_failure() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = |calls: &Arc<AtomicUsize>| {
        let calls = Arc::clone(calls);
        move |_res: &mut Response| {
            calls.fetch_add(1, Ordering::SeqCst);
        }
    };

    let err = request(common::app())
        .get("/")
        .expect_fn(counter(&calls))
        .expect_fn(counter(&calls))
        .expect(404)
        .expect_fn(counter(&calls))
        .await
        .unwrap_err();

    assert!(err.is_assertion());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn custom_assertions_can_rewrite_the_response() {
    request(common::app())
        .get("/")
        .expect_fn(|res: &mut Response| res.text = res.text.to_uppercase())
        .expect("HEY")
        .await
        .unwrap();
}

#[tokio::test]
async fn custom_assertion_errors_and_panics_fail() {
    let err = request(common::app())
        .get("/")
        .expect_fn(|res: &mut Response| {
            if res.text != "bye" {
                return Err(AssertionError::new("wanted bye", "bye", res.text.clone()));
            }
            Ok(())
        })
        .await
        .unwrap_err();
    let assertion = err.as_assertion().unwrap();
    assert_eq!(assertion.message(), "wanted bye");
    assert_eq!(assertion.actual(), &json!("hey"));

    let err = request(common::app())
        .get("/")
        .expect_fn(|_res: &mut Response| -> () { panic!("kaboom") })
        .await
        .unwrap_err();
    assert_eq!(message(err), "kaboom");
}

#[tokio::test]
async fn failures_point_at_the_declaring_line() {
    let err = request(common::app())
        .get("/")
        .expect(201)
        .await
        .unwrap_err();
    let assertion = err.as_assertion().unwrap();
    let origin = assertion.origin().unwrap();
    assert!(origin.file().ends_with("assertions.rs"));
    assert!(assertion.trace().contains("assertions.rs"));
}

#[tokio::test]
async fn expect_end_runs_the_request() {
    let (failure, status) = request(common::app())
        .get("/")
        .expect_end(200, |_test, failure, res| (failure, res.map(|res| res.status)))
        .await;
    assert!(failure.is_none());
    assert_eq!(status, Some(200));
}

#[tokio::test]
async fn end_with_passes_the_response_on_failure() {
    let (failure, res) = request(common::app())
        .get("/error")
        .expect(200)
        .end_with(|_test, failure, res| (failure, res))
        .await;
    assert!(failure.unwrap().is_assertion());
    assert_eq!(res.unwrap().text, "boom");
}

#[tokio::test]
async fn query_and_bodies_are_sent() {
    request(common::app())
        .get("/query")
        .query([("q", "a b"), ("page", "2")])
        .expect("q=a+b&page=2")
        .await
        .unwrap();

    request(common::app())
        .post("/echo")
        .send_json(&json!({ "name": "john" }))
        .expect((201, json!({ "name": "john" })))
        .await
        .unwrap();

    request(common::app())
        .post("/echo")
        .form([("name", "john"), ("age", "30")])
        .expect(json!({ "name": "john", "age": "30" }))
        .await
        .unwrap();

    request(common::app())
        .post("/echo")
        .send("plain")
        .expect(("Content-Type", Regex::new("^text/plain").unwrap()))
        .expect("plain")
        .await
        .unwrap();
}

#[tokio::test]
async fn auth_and_headers_are_sent() {
    let res = request(common::app())
        .get("/headers")
        .set("X-Trace", "abc")
        .bearer_auth("token")
        .expect(200)
        .await
        .unwrap();
    assert_eq!(res.body["x-trace"], "abc");
    assert_eq!(res.body["authorization"], "Bearer token");
}

#[tokio::test]
async fn invalid_json_surfaces_after_assertions_pass() {
    let err = request(common::app())
        .get("/broken-json")
        .expect(200)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Parse(_)), "{err}");

    let err = request(common::app())
        .get("/broken-json")
        .expect(404)
        .await
        .unwrap_err();
    assert!(err.is_assertion());
}

#[tokio::test]
async fn redirects_are_not_followed_by_default() {
    let res = request(common::app())
        .get("/redirect-login")
        .expect(302)
        .expect(("Location", "/whoami"))
        .await
        .unwrap();
    assert!(res.redirects.is_empty());

    let res = request(common::app())
        .get("/redirect-login")
        .redirects(1)
        .expect(200)
        .await
        .unwrap();
    assert_eq!(res.redirects.len(), 1);
    assert_eq!(res.url.path(), "/whoami");
}

#[tokio::test]
async fn usage_faults_are_reported_without_sending() {
    let hits = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&hits);
    let err = request(common::app())
        .get("/")
        .set("bad header", "x")
        .expect_fn(move |_res: &mut Response| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Usage(_)), "{err}");
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}
