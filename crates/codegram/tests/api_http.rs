use codegram::api::{ApiClient, GenerationRequest};
use codegram::config::ApiConfig;
use codegram::{AnalysisMethod, DiagramFormat, DiagramType, Error, NetworkError};
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

struct Reply {
    status_line: &'static str,
    body: String,
    delay: Duration,
}

impl Reply {
    fn json(status_line: &'static str, body: &str) -> Self {
        Self {
            status_line,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }
}

/// Serves exactly one request and hands back `(request line, body)`.
fn serve_once(reply: Reply) -> (String, mpsc::Receiver<(String, String)>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap();
                }
            }
        }
        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body).unwrap();
        let _ = tx.send((
            request_line.trim_end().to_string(),
            String::from_utf8(body).unwrap(),
        ));

        thread::sleep(reply.delay);
        let mut stream = stream;
        let response = format!(
            "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            reply.status_line,
            reply.body.len(),
            reply.body
        );
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.flush();
    });

    (base_url, rx)
}

fn client(base_url: &str, timeout_ms: u64) -> ApiClient {
    let mut config = ApiConfig {
        timeout_ms,
        ..ApiConfig::default()
    };
    config.set_base_url(&format!("{base_url}/"));
    ApiClient::new(config)
}

fn sample_request() -> GenerationRequest {
    let mut files = BTreeMap::new();
    files.insert("main.py".to_string(), "class Main: pass".to_string());
    GenerationRequest::from_files(
        files,
        DiagramType::Class,
        DiagramFormat::Mermaid,
        AnalysisMethod::LlmDirect,
    )
}

#[test]
fn successful_generation_returns_source_and_metadata() {
    let (base_url, rx) = serve_once(Reply::json(
        "HTTP/1.1 200 OK",
        r#"{"success": true, "diagram_code": "classDiagram\n  class Main", "format": "mermaid",
            "metadata": {"files_analyzed": 1, "llm_provider": "GeminiProvider"}}"#,
    ));

    let diagram = client(&base_url, 5_000).generate(&sample_request()).unwrap();
    assert_eq!(diagram.source.format(), DiagramFormat::Mermaid);
    assert_eq!(diagram.source.text(), "classDiagram\n  class Main");
    assert_eq!(diagram.metadata.files_analyzed, Some(1));

    let (request_line, body) = rx.recv().unwrap();
    assert_eq!(request_line, "POST /generate-diagram HTTP/1.1");
    let sent: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(sent["code_files"]["main.py"], "class Main: pass");
    assert_eq!(sent["filters"], serde_json::json!({}));
}

#[test]
fn http_error_uses_body_error_field() {
    let (base_url, _rx) = serve_once(Reply::json(
        "HTTP/1.1 400 Bad Request",
        r#"{"error": "Missing required fields: diagram_type"}"#,
    ));
    let err = client(&base_url, 5_000).generate(&sample_request()).unwrap_err();
    assert!(matches!(err, Error::Network(NetworkError::Status { status: 400, .. })));
    assert_eq!(err.to_string(), "Missing required fields: diagram_type");
}

#[test]
fn http_error_without_body_reports_status() {
    let (base_url, _rx) = serve_once(Reply::json("HTTP/1.1 502 Bad Gateway", "oops"));
    let err = client(&base_url, 5_000).generate(&sample_request()).unwrap_err();
    assert_eq!(err.to_string(), "HTTP 502: Bad Gateway");
}

#[test]
fn unsuccessful_generation_is_reported() {
    let (base_url, _rx) = serve_once(Reply::json("HTTP/1.1 200 OK", r#"{"success": false}"#));
    let err = client(&base_url, 5_000).generate(&sample_request()).unwrap_err();
    assert!(matches!(err, Error::Generation { .. }));
    assert_eq!(err.to_string(), "Unknown error during generation");
}

#[test]
fn slow_server_times_out() {
    let (base_url, _rx) = serve_once(Reply {
        status_line: "HTTP/1.1 200 OK",
        body: r#"{"success": true}"#.to_string(),
        delay: Duration::from_secs(3),
    });
    let err = client(&base_url, 300).generate(&sample_request()).unwrap_err();
    assert!(matches!(err, Error::Network(NetworkError::Timeout)), "{err:?}");
    assert_eq!(
        err.to_string(),
        "The request took too long. Try with fewer files."
    );
}

#[test]
fn closed_port_is_a_connection_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let api = client(&format!("http://127.0.0.1:{port}"), 2_000);
    let err = api.generate(&sample_request()).unwrap_err();
    assert!(matches!(err, Error::Network(NetworkError::Connect)), "{err:?}");
    assert!(!api.test_connection());
}

#[test]
fn connection_test_accepts_any_decodable_reply() {
    let (base_url, rx) = serve_once(Reply::json("HTTP/1.1 200 OK", r#"{"success": false}"#));
    assert!(client(&base_url, 5_000).test_connection());
    let (_, body) = rx.recv().unwrap();
    let sent: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(sent["diagram_type"], "class");
    assert!(sent["code_files"]["test.py"].as_str().unwrap().contains("class TestClass"));
}
