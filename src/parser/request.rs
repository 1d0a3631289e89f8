//! HTTP request parsing and representation.

use std::collections::HashMap;
use std::str::FromStr;
use serde::de::DeserializeOwned;

use crate::parser::error::Error;
use crate::parser::method::Method;
use crate::parser::version::HttpVersion;

/// Represents an HTTP request with its components.
///
/// The request target is split on `?`: `path` holds the part routing works
/// with, `query` the raw query string and `query_params` its decoded pairs.
/// `path_params` stays empty until the server matches a route pattern.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method of the request (GET, POST, etc.)
    pub method: Method,

    /// The request path without the query string
    pub path: String,

    /// The raw query string (without the leading `?`)
    pub query: String,

    /// The HTTP version (1.0, 1.1, 2.0)
    pub version: HttpVersion,

    /// Header names as sent by the client, mapped to their values
    pub headers: HashMap<String, String>,

    /// The raw request body
    pub body: Vec<u8>,

    /// Percent-decoded query parameters
    pub query_params: HashMap<String, String>,

    /// Parameters captured from the matched route pattern
    pub path_params: HashMap<String, String>,
}

impl HttpRequest {
    /// Creates a new HTTP request from a request target such as `/users?page=2`.
    pub fn new(method: Method, target: String, version: HttpVersion, headers: HashMap<String, String>) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path.to_string(), query.to_string()),
            None => (target, String::new()),
        };
        let query_params = parse_query(&query);

        Self {
            method,
            path,
            query,
            version,
            headers,
            body: Vec::new(),
            query_params,
            path_params: HashMap::new(),
        }
    }

    /// Creates a new HTTP request carrying a body.
    pub fn with_body(method: Method, target: String, version: HttpVersion, headers: HashMap<String, String>, body: Vec<u8>) -> Self {
        let mut request = Self::new(method, target, version, headers);
        request.body = body;
        request
    }

    /// Gets a header value by name (case-insensitive).
    pub fn get_header(&self, name: &str) -> Option<&String> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Checks if the request has a specific header (case-insensitive).
    pub fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    /// The declared `Content-Length`, if present and numeric.
    pub fn content_length(&self) -> Option<usize> {
        self.get_header("Content-Length")
            .and_then(|value| value.parse().ok())
    }

    /// Parses the body as JSON.
    ///
    /// Fails with [`Error::MissingHeader`] when the content type is not JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        if !self.is_json() {
            return Err(Error::MissingHeader("Content-Type: application/json".to_string()));
        }

        let json = serde_json::from_slice(&self.body)?;
        Ok(json)
    }

    /// Checks whether the body is declared as JSON.
    pub fn is_json(&self) -> bool {
        self.content_type_starts_with("application/json")
    }

    /// Checks whether the body is declared as a URL-encoded form.
    pub fn is_form(&self) -> bool {
        self.content_type_starts_with("application/x-www-form-urlencoded")
    }

    fn content_type_starts_with(&self, mime: &str) -> bool {
        self.get_header("Content-Type")
            .map(|content_type| content_type.trim().to_ascii_lowercase().starts_with(mime))
            .unwrap_or(false)
    }

    /// Gets a decoded query parameter.
    pub fn get_query_param(&self, name: &str) -> Option<&String> {
        self.query_params.get(name)
    }

    /// Checks if a query parameter is present.
    pub fn has_query_param(&self, name: &str) -> bool {
        self.query_params.contains_key(name)
    }

    /// Gets a parameter captured from the route pattern.
    pub fn get_path_param(&self, name: &str) -> Option<&String> {
        self.path_params.get(name)
    }
}

/// Decodes an `application/x-www-form-urlencoded` string.
///
/// `+` is a space, pairs without `=` map to an empty value and the last
/// occurrence of a repeated key wins. Undecodable values are kept verbatim.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(k), decode_component(v))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

/// Finds the end of the header block, returning the offset of the first body byte.
///
/// Accepts both `\r\n\r\n` and bare `\n\n` terminators.
pub fn find_header_end(input: &[u8]) -> Option<usize> {
    let crlf = input.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4);
    let lf = input.windows(2).position(|w| w == b"\n\n").map(|i| i + 2);
    match (crlf, lf) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Parses an HTTP request from a byte slice.
///
/// Bytes after the header block form the body. When a `Content-Length` header
/// is present the body is truncated to it.
pub fn parse_request(input: &[u8]) -> Result<HttpRequest, Error> {
    let (head, body) = match find_header_end(input) {
        Some(end) => (&input[..end], &input[end..]),
        None => (input, &input[input.len()..]),
    };

    let head = std::str::from_utf8(head).map_err(|_| Error::InvalidUtf8)?;
    let mut lines = head.lines();

    let request_line = match lines.next() {
        Some(line) if !line.trim().is_empty() => line,
        _ => return Err(Error::EmptyRequest),
    };

    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(Error::MalformedRequestLine(request_line.to_string()));
    }

    let method = Method::from_str(parts[0])?;

    let target = parts[1].to_string();
    if !target.starts_with('/') && target != "*" {
        return Err(Error::InvalidPath);
    }

    let version = HttpVersion::from_str(parts[2])?;

    let mut headers = HashMap::new();
    for line in lines {
        // Empty line indicates the end of headers
        if line.is_empty() {
            break;
        }

        let (name, value) = line.split_once(':').ok_or(Error::InvalidHeaderFormat)?;
        headers.insert(name.trim().to_string(), value.trim().to_string());
    }

    if version.requires_host() && !headers.keys().any(|k| k.eq_ignore_ascii_case("Host")) {
        return Err(Error::MissingHeader("Host".to_string()));
    }

    let mut request = HttpRequest::new(method, target, version, headers);
    let declared = match request.get_header("Content-Length") {
        Some(value) => Some(
            value
                .parse::<usize>()
                .map_err(|_| Error::InvalidContentLength(value.clone()))?,
        ),
        None => None,
    };
    let body_len = declared.map_or(body.len(), |len| len.min(body.len()));
    request.body = body[..body_len].to_vec();
    Ok(request)
}
