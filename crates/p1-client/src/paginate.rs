//! Pagination cursor walking.
//!
//! [`Pages`] is a lazy iterator over raw response pages. It is finite, not
//! restartable once consumed, and never re-issues a cursor it has already
//! consumed. Three cursor styles exist; each endpoint picks one:
//!
//! - [`Style::Offset`]: integer row offset advanced by each page's record
//!   count, bounded by the server-reported total.
//! - [`Style::Scroll`]: opaque token returned by every response and echoed
//!   back on the next request; a zero-row page ends the walk.
//! - [`Style::Link`]: the response's `links` section either carries a `next`
//!   URL (which replaces the outgoing URL wholesale, previous query
//!   parameters dropped) or the walk is over.

use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{ClientError, Result};
use crate::transport::{HttpSession, Request};

/// Pagination style of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Style {
    /// Integer `offset` query parameter, bounded by the reported `count`.
    Offset,
    /// Opaque `scroll_id` token echoed between requests.
    Scroll,
    /// `links.next` URL replacement.
    Link,
}

/// One raw page of records plus the pagination metadata that came with it.
#[derive(Debug, Clone)]
pub(crate) struct Page {
    /// The `data`/`rows` part of the body: a record array, or a mapping of
    /// table name to record arrays for multi-table endpoints.
    pub data: Value,
    /// Server-reported total record count, where the style carries one.
    pub count: Option<u64>,
}

/// Parsed `links` section of a link-style response.
#[derive(Debug, Clone)]
pub(crate) struct Links {
    /// Offset encoded in the `self` link, for progress reporting.
    pub current_offset: u64,
    /// Fully-qualified URL of the next page, if any.
    pub next: Option<String>,
}

impl Links {
    /// Parse the `links` object of a response body.
    pub(crate) fn parse(links: &Value) -> Result<Self> {
        let self_link = links
            .get("self")
            .and_then(Value::as_str)
            .ok_or_else(|| missing_key("links.self"))?;
        let current_offset = Url::parse(self_link)
            .ok()
            .and_then(|url| {
                url.query_pairs()
                    .find(|(name, _)| name == "offset")
                    .and_then(|(_, value)| value.parse().ok())
            })
            .unwrap_or(0);
        let next = links
            .get("next")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(Self {
            current_offset,
            next,
        })
    }
}

/// Lazy iterator over the pages of one paginated request.
#[derive(Debug)]
pub(crate) struct Pages<'a> {
    session: &'a HttpSession,
    request: Request,
    style: Style,
    offset: u64,
    done: bool,
}

impl<'a> Pages<'a> {
    pub(crate) fn new(session: &'a HttpSession, request: Request, style: Style) -> Self {
        Self {
            session,
            request,
            style,
            offset: 0,
            done: false,
        }
    }

    fn walk_offset(&mut self, body: Value) -> Result<Option<Page>> {
        let records = expect_array(&body, "data")?;
        let total = expect_u64(&body, "count")?;
        let page_len = records.len();
        match next_offset(self.offset, page_len, total) {
            Some(next) => {
                self.offset = next;
                self.request.set_param("offset", next.to_string());
            }
            None => self.done = true,
        }
        if page_len == 0 {
            return Ok(None);
        }
        debug!(offset = self.offset, total, "fetched offset page");
        Ok(Some(Page {
            data: Value::Array(records),
            count: Some(total),
        }))
    }

    fn walk_scroll(&mut self, body: Value) -> Result<Option<Page>> {
        let rows = expect_array(&body, "rows")?;
        if rows.is_empty() {
            self.done = true;
            return Ok(None);
        }
        let scroll_id = body
            .get("scroll_id")
            .and_then(Value::as_str)
            .ok_or_else(|| missing_key("scroll_id"))?;
        self.request.set_param("scroll_id", scroll_id.to_string());
        debug!(rows = rows.len(), "fetched scroll page");
        Ok(Some(Page {
            data: Value::Array(rows),
            count: None,
        }))
    }

    fn walk_link(&mut self, body: Value) -> Result<Option<Page>> {
        let links = Links::parse(body.get("links").ok_or_else(|| missing_key("links"))?)?;
        let count = body.get("count").and_then(Value::as_u64);
        let data = body.get("data").ok_or_else(|| missing_key("data"))?.clone();
        debug!(offset = links.current_offset, count, "fetched linked page");
        match links.next {
            Some(next_url) => {
                // The next link already encodes every parameter.
                self.request.url = next_url;
                self.request.query.clear();
            }
            None => self.done = true,
        }
        Ok(Some(Page { data, count }))
    }
}

impl Iterator for Pages<'_> {
    type Item = Result<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let body = match self.session.execute(&self.request) {
            Ok(body) => body,
            Err(err) => {
                self.done = true;
                return Some(Err(err));
            }
        };
        let page = match self.style {
            Style::Offset => self.walk_offset(body),
            Style::Scroll => self.walk_scroll(body),
            Style::Link => self.walk_link(body),
        };
        match page {
            Ok(Some(page)) => Some(Ok(page)),
            Ok(None) => None,
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Offset to request next, or `None` when the walk is over.
pub(crate) const fn next_offset(offset: u64, page_len: usize, total: u64) -> Option<u64> {
    let next = offset + page_len as u64;
    if page_len == 0 || next >= total {
        None
    } else {
        Some(next)
    }
}

fn missing_key(key: &str) -> ClientError {
    ClientError::Response(format!("response is missing the `{key}` key"))
}

pub(crate) fn expect_array(body: &Value, key: &str) -> Result<Vec<Value>> {
    body.get(key)
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| missing_key(key))
}

pub(crate) fn expect_u64(body: &Value, key: &str) -> Result<u64> {
    body.get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| missing_key(key))
}

pub(crate) fn expect_str(body: &Value, key: &str) -> Result<String> {
    body.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| missing_key(key))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_links_with_next() {
        let links = Links::parse(&json!({
            "self": "https://data.particle.one/edgar/v7/data/headers?offset=1000&cik=1",
            "next": "https://data.particle.one/edgar/v7/data/headers?offset=2000&cik=1",
        }))
        .unwrap();
        assert_eq!(links.current_offset, 1000);
        assert_eq!(
            links.next.as_deref(),
            Some("https://data.particle.one/edgar/v7/data/headers?offset=2000&cik=1")
        );
    }

    #[test]
    fn test_links_without_next() {
        let links = Links::parse(&json!({
            "self": "https://data.particle.one/edgar/v7/data/form8",
        }))
        .unwrap();
        assert_eq!(links.current_offset, 0);
        assert!(links.next.is_none());
    }

    #[test]
    fn test_links_missing_self_is_a_response_error() {
        let result = Links::parse(&json!({"next": "https://example.com/?offset=1"}));
        assert!(matches!(result, Err(ClientError::Response(_))));
    }

    #[rstest]
    #[case(0, 1000, 3000, Some(1000))]
    #[case(1000, 1000, 3000, Some(2000))]
    #[case(2000, 1000, 3000, None)]
    #[case(0, 0, 3000, None)]
    #[case(0, 500, 200, None)]
    fn test_next_offset(
        #[case] offset: u64,
        #[case] page_len: usize,
        #[case] total: u64,
        #[case] expected: Option<u64>,
    ) {
        assert_eq!(next_offset(offset, page_len, total), expected);
    }

    #[test]
    fn test_offset_walker_advances_to_the_reported_total() {
        use std::io::{BufRead, BufReader, Write};
        use std::net::TcpListener;

        use crate::transport::RetryPolicy;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let bodies = [
            r#"{"data": [{"a": 1}, {"a": 2}], "count": 3}"#,
            r#"{"data": [{"a": 3}], "count": 3}"#,
        ];
        let handle = std::thread::spawn(move || {
            let mut targets = Vec::new();
            for body in bodies {
                let (mut stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    if line.trim_end().is_empty() {
                        break;
                    }
                }
                let target = request_line
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or_default()
                    .to_string();
                targets.push(target);
                let payload = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(payload.as_bytes()).unwrap();
            }
            targets
        });

        let session = HttpSession::new("test-token", RetryPolicy::none()).unwrap();
        let request = Request::get(format!("{base_url}/data"), Vec::new());
        let pages = Pages::new(&session, request, Style::Offset)
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(pages.len(), 2);
        let rows: usize = pages
            .iter()
            .map(|p| p.data.as_array().map_or(0, Vec::len))
            .sum();
        assert_eq!(rows, 3);

        let targets = handle.join().unwrap();
        assert!(!targets[0].contains("offset="));
        assert!(targets[1].contains("offset=2"));
    }

    #[test]
    fn test_expect_helpers() {
        let body = json!({"rows": [1, 2], "count": 2, "scroll_id": "abc"});
        assert_eq!(expect_array(&body, "rows").unwrap().len(), 2);
        assert_eq!(expect_u64(&body, "count").unwrap(), 2);
        assert_eq!(expect_str(&body, "scroll_id").unwrap(), "abc");
        assert!(matches!(
            expect_array(&body, "data"),
            Err(ClientError::Response(_))
        ));
    }
}
