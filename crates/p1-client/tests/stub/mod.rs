//! Scripted in-process HTTP stub for exercising the blocking client.
//!
//! The stub serves a fixed list of responses, one connection per response,
//! and records every request it saw. Tests bind first so the stub's base URL
//! can be embedded in pagination links, then run the script.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};

/// One scripted response.
pub struct StubResponse {
    pub status: u16,
    pub body: String,
}

impl StubResponse {
    pub fn ok(body: serde_json::Value) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }
}

/// One request observed by the stub.
pub struct RequestRecord {
    pub method: String,
    pub target: String,
    pub body: String,
}

/// A bound listener that has not started serving yet.
pub struct StubListener {
    listener: TcpListener,
    base_url: String,
}

/// A running stub; `finish` joins it and returns the observed requests.
pub struct StubServer {
    base_url: String,
    handle: JoinHandle<Vec<RequestRecord>>,
}

pub fn bind() -> StubListener {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    StubListener { listener, base_url }
}

impl StubListener {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn run(self, responses: Vec<StubResponse>) -> StubServer {
        let Self { listener, base_url } = self;
        let handle = thread::spawn(move || {
            let mut records = Vec::new();
            for response in &responses {
                let (stream, _) = listener.accept().unwrap();
                records.push(handle_connection(stream, response));
            }
            records
        });
        StubServer { base_url, handle }
    }
}

/// Bind and serve in one step, for tests that don't need links.
pub fn serve(responses: Vec<StubResponse>) -> StubServer {
    bind().run(responses)
}

impl StubServer {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn finish(self) -> Vec<RequestRecord> {
        self.handle.join().unwrap()
    }
}

fn handle_connection(mut stream: TcpStream, response: &StubResponse) -> RequestRecord {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut request_line = String::new();
    reader.read_line(&mut request_line).unwrap();

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        let line = line.trim_end().to_ascii_lowercase();
        if line.is_empty() {
            break;
        }
        if let Some(value) = line.strip_prefix("content-length:") {
            content_length = value.trim().parse().unwrap();
        }
    }
    let mut body = vec![0; content_length];
    reader.read_exact(&mut body).unwrap();

    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let payload = format!(
        "HTTP/1.1 {} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        response.status,
        reason(response.status),
        response.body.len(),
        response.body
    );
    stream.write_all(payload.as_bytes()).unwrap();
    stream.flush().unwrap();

    RequestRecord {
        method,
        target,
        body: String::from_utf8_lossy(&body).to_string(),
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        504 => "Gateway Timeout",
        _ => "Error",
    }
}
