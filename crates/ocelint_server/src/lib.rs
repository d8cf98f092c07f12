//! HTTP inspection service.
//!
//! A small JSON-over-HTTP front for the inspection engine: POST a
//! body with a `source` field to `/` and get the findings grouped by
//! line. Responses always carry a `status` field, `success` with a
//! `result` or `fail` with a `message`.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::CONTENT_TYPE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tracing::{error, info};

use ocelint_core::{Group, Session, grouped_to_json, merge_inspections};

/// Accepts connections forever, one task per connection.
pub async fn serve(addr: SocketAddr, session: Arc<Session>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("inspection service listening on http://{addr}");
    loop {
        let (stream, peer) = listener.accept().await?;
        let session = session.clone();
        tokio::spawn(async move {
            let service = service_fn(move |request| {
                let session = session.clone();
                async move { Ok::<_, Infallible>(handle(&session, request).await) }
            });
            if let Err(err) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                error!(%peer, %err, "connection error");
            }
        });
    }
}

async fn handle(session: &Session, request: Request<Incoming>) -> Response<Full<Bytes>> {
    let (status, payload) = match (request.method(), request.uri().path()) {
        (&Method::POST, "/") => match request.into_body().collect().await {
            Ok(collected) => respond_to(session, &collected.to_bytes()),
            Err(_) => fail(StatusCode::BAD_REQUEST, "couldn't read the request body"),
        },
        (&Method::GET, "/") => (
            StatusCode::OK,
            json!({
                "status": "success",
                "message": "POST a JSON body with a `source` field to inspect it",
            }),
        ),
        _ => fail(StatusCode::NOT_FOUND, "unknown endpoint"),
    };
    json_response(status, payload)
}

/// Inspects the `source` field of a JSON request body and shapes the
/// response envelope.
pub fn respond_to(session: &Session, body: &[u8]) -> (StatusCode, Value) {
    let Ok(request) = serde_json::from_slice::<Value>(body) else {
        return fail(StatusCode::BAD_REQUEST, "the request body must be JSON");
    };
    let Some(source) = request.get("source").and_then(Value::as_str) else {
        return fail(StatusCode::BAD_REQUEST, "missing `source` field");
    };
    match session.inspect_source("<request>", source) {
        Ok(inspection) => {
            let grouped = merge_inspections([inspection], Group::Line, &session.ignored_codes());
            (
                StatusCode::OK,
                json!({"status": "success", "result": grouped_to_json(&grouped)}),
            )
        }
        Err(err) => fail(StatusCode::BAD_REQUEST, &err.to_string()),
    }
}

fn fail(status: StatusCode, message: &str) -> (StatusCode, Value) {
    (status, json!({"status": "fail", "message": message}))
}

fn json_response(status: StatusCode, payload: Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(payload.to_string())))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocelint_core::Config;
    use pretty_assertions::assert_eq;

    fn started_session() -> Session {
        let mut session = Session::new(Config::default());
        session.start().unwrap();
        session
    }

    #[test]
    fn sources_with_findings_group_by_line() {
        let session = started_session();
        let body = serde_json::to_vec(&json!({"source": "def f(x=[]):\n    pass\n"})).unwrap();
        let (status, payload) = respond_to(&session, &body);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["status"], "success");
        let line_one = payload["result"]["1"].as_array().unwrap();
        assert_eq!(line_one[0]["code"], "DEFAULT_MUTABLE_ARG");
        assert_eq!(line_one[0]["plugin"], "general");
    }

    #[test]
    fn clean_sources_return_an_empty_result() {
        let session = started_session();
        let body = serde_json::to_vec(&json!({"source": "x = 1\n"})).unwrap();
        let (status, payload) = respond_to(&session, &body);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["result"], json!({}));
    }

    #[test]
    fn missing_source_field_fails() {
        let session = started_session();
        let (status, payload) = respond_to(&session, br#"{"src": "x = 1"}"#);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload["status"], "fail");
    }

    #[test]
    fn non_json_bodies_fail() {
        let session = started_session();
        let (status, _) = respond_to(&session, b"def f(): pass");
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn syntax_errors_fail_with_a_message() {
        let session = started_session();
        let body = serde_json::to_vec(&json!({"source": "def broken(:\n"})).unwrap();
        let (status, payload) = respond_to(&session, &body);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            payload["message"]
                .as_str()
                .unwrap()
                .contains("invalid syntax")
        );
    }
}
