//! References resolved over HTTP through `RoutingFetcher`, served by a
//! minimal local server.

#![cfg(feature = "http")]

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;

use concordia_schema::{
    Compiler, ConcordiaError, FetchConfig, HookRegistry, ReferenceError, RoutingFetcher,
};

const POINT: &str = r#"{"type":"object","schema":[{"name":"x","type":"number"},{"name":"y","type":"number"}]}"#;

/// Serve a fixed set of documents on an ephemeral port; returns the base URL.
fn serve() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut reader = BufReader::new(&stream);
            let mut request_line = String::new();
            if reader.read_line(&mut request_line).is_err() {
                continue;
            }
            loop {
                let mut header = String::new();
                match reader.read_line(&mut header) {
                    Ok(0) | Err(_) => break,
                    Ok(_) if header == "\r\n" || header == "\n" => break,
                    Ok(_) => {}
                }
            }
            let path = request_line.split_whitespace().nth(1).unwrap_or("/");
            let (status, body) = match path {
                "/point.json" => ("200 OK", POINT),
                "/empty.json" => ("200 OK", ""),
                _ => ("404 Not Found", "not here"),
            };
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    base
}

fn http_compiler() -> Compiler {
    let config = FetchConfig {
        allow_http: true,
        timeout_secs: 5,
        ..FetchConfig::default()
    };
    Compiler::new()
        .with_hooks(Arc::new(HookRegistry::new()))
        .with_fetcher(RoutingFetcher::from_config(&config).unwrap())
}

fn referencing(url: &str) -> String {
    format!(r#"{{"type":"object","schema":[{{"name":"origin","$ref":"{url}"}}]}}"#)
}

#[test]
fn schema_served_over_http_compiles_and_validates() {
    let base = serve();
    let schema = http_compiler()
        .compile(referencing(&format!("{base}/point.json")))
        .unwrap();
    assert_eq!(schema.root().field_names(), ["origin"]);
    schema
        .validate_data(r#"{"origin": {"x": 1, "y": 2}}"#)
        .unwrap();
    assert!(schema.validate_data(r#"{"origin": {"x": 1}}"#).is_err());
}

#[test]
fn http_not_found_is_a_status_error() {
    let base = serve();
    let err = http_compiler()
        .compile(referencing(&format!("{base}/missing.json")))
        .unwrap_err();
    let ConcordiaError::Reference(reference) = err else {
        panic!("expected a reference error, got {err:?}");
    };
    assert!(matches!(
        reference.root_cause(),
        ReferenceError::Status { status: 404, .. }
    ));
}

#[test]
fn http_empty_body_is_rejected() {
    let base = serve();
    let err = http_compiler()
        .compile(referencing(&format!("{base}/empty.json")))
        .unwrap_err();
    let ConcordiaError::Reference(reference) = err else {
        panic!("expected a reference error, got {err:?}");
    };
    assert!(matches!(
        reference.root_cause(),
        ReferenceError::EmptyBody { .. }
    ));
}
