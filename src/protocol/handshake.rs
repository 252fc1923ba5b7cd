//! WebSocket opening handshake (RFC 6455 Section 4).
//!
//! This module holds the pure parts of the HTTP upgrade: header handling,
//! Sec-WebSocket-Accept derivation, request parsing and the serialization
//! of requests and responses. The async exchange lives in [`crate::upgrade`].

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

use crate::digest::Sha1Engine;
use crate::error::{Error, Result};

/// The WebSocket GUID used in the Sec-WebSocket-Accept calculation (RFC 6455).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// The only protocol version this crate speaks.
pub const WS_VERSION: &str = "13";

/// HTTP header list with case-insensitive lookup.
///
/// Insertion order is kept so requests are written the way they were built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Create an empty header list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header. Existing headers with the same name are kept.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// First value for `name`, compared case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if a header named `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse one `Name: value` line and append it.
    ///
    /// # Errors
    ///
    /// Returns `Error::Handshake` if the line has no colon or an empty name.
    pub fn push_line(&mut self, line: &str) -> Result<()> {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::Handshake(format!("malformed header line: {line:?}")))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Handshake(format!("malformed header line: {line:?}")));
        }
        self.insert(name, value.trim());
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

/// Computes the Sec-WebSocket-Accept value from the client's Sec-WebSocket-Key.
///
/// The accept key is calculated as: Base64(SHA-1(key + GUID))
///
/// # Example
///
/// ```
/// use wsqueue::protocol::handshake::create_sec_accept;
///
/// let accept = create_sec_accept("dGhlIHNhbXBsZSBub25jZQ==");
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
#[must_use]
pub fn create_sec_accept(nonce: &str) -> String {
    let mut engine = Sha1Engine::new();
    engine.update(nonce).update(WS_GUID);
    BASE64.encode(engine.finalize())
}

/// Generate a fresh Sec-WebSocket-Key: 16 random bytes, base64 encoded.
///
/// # Errors
///
/// Returns `Error::Handshake` if the system random source fails.
pub fn generate_key() -> Result<String> {
    let mut nonce = [0u8; 16];
    getrandom::getrandom(&mut nonce)
        .map_err(|e| Error::Handshake(format!("failed to generate key: {e}")))?;
    Ok(BASE64.encode(nonce))
}

/// Returns `true` if the request asks for a WebSocket upgrade.
///
/// Requires `Upgrade: websocket` (value compared case-insensitively) and a
/// non-empty `Sec-WebSocket-Key`.
#[must_use]
pub fn acceptable(headers: &Headers) -> bool {
    let upgrade = headers
        .get("upgrade")
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"));
    let key = headers
        .get("sec-websocket-key")
        .is_some_and(|v| !v.is_empty());
    upgrade && key
}

/// Validate that a header value does not contain CR or LF characters.
///
/// # Errors
/// Returns `Error::Handshake` if the value contains `\r` or `\n`.
pub fn validate_header_value(header_name: &str, value: &str) -> Result<()> {
    if value.contains('\r') || value.contains('\n') {
        return Err(Error::Handshake(format!(
            "header {header_name} contains CR or LF characters"
        )));
    }
    Ok(())
}

/// HTTP upgrade request as seen by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    /// The HTTP method (expected to be `GET`).
    pub method: String,
    /// The request target including any query (e.g. `/chat?room=1`).
    pub path: String,
    /// Request headers.
    pub headers: Headers,
}

impl HandshakeRequest {
    /// Parse the request line and headers from the lines of a request head.
    ///
    /// Parsing stops at the first empty line. Whether the request is a
    /// valid upgrade is decided separately by [`acceptable`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Handshake`] if:
    /// - The request line is missing or does not have three parts.
    /// - The HTTP version is not `HTTP/1.1`.
    /// - A header line is malformed.
    pub fn from_lines<'a, I>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut lines = lines.into_iter();

        let request_line = lines
            .next()
            .ok_or_else(|| Error::Handshake("empty request".into()))?;

        let parts: Vec<&str> = request_line.split_whitespace().collect();
        let [method, path, version] = parts[..] else {
            return Err(Error::Handshake(format!(
                "invalid request line: {request_line:?}"
            )));
        };

        if version != "HTTP/1.1" {
            return Err(Error::Handshake(format!("expected HTTP/1.1, got {version}")));
        }

        let mut headers = Headers::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            headers.push_line(line)?;
        }

        Ok(Self {
            method: method.to_string(),
            path: path.to_string(),
            headers,
        })
    }

    /// Parse a request head from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Handshake`] if the data is not valid UTF-8 or
    /// [`HandshakeRequest::from_lines`] fails.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let text =
            std::str::from_utf8(data).map_err(|_| Error::Handshake("invalid UTF-8".into()))?;
        Self::from_lines(text.lines())
    }

    /// The Sec-WebSocket-Key header, if present and non-empty.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.headers
            .get("sec-websocket-key")
            .filter(|k| !k.is_empty())
    }
}

/// Server response headers for an accepted upgrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// The Sec-WebSocket-Accept value.
    pub accept: String,
    /// The selected Sec-WebSocket-Protocol, echoed from the request.
    pub protocol: Option<String>,
    /// The Sec-WebSocket-Version, echoed from the request.
    pub version: Option<String>,
}

impl HandshakeResponse {
    /// Build the response for a request.
    ///
    /// The first offered subprotocol is selected.
    ///
    /// # Errors
    ///
    /// Returns `Error::Handshake("request is not acceptable")` unless
    /// [`acceptable`] holds for the request headers.
    pub fn from_request(req: &HandshakeRequest) -> Result<Self> {
        let key = match req.key() {
            Some(key) if acceptable(&req.headers) => key,
            _ => return Err(Error::Handshake("request is not acceptable".into())),
        };

        let protocol = req
            .headers
            .get("sec-websocket-protocol")
            .and_then(|p| p.split(',').map(str::trim).find(|p| !p.is_empty()))
            .map(str::to_string);

        Ok(Self {
            accept: create_sec_accept(key),
            protocol,
            version: req.headers.get("sec-websocket-version").map(str::to_string),
        })
    }

    /// Write the `101 Switching Protocols` response head to a buffer.
    ///
    /// # Errors
    /// Returns `Error::Handshake` if an echoed value contains CR/LF.
    pub fn write(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.extend_from_slice(b"HTTP/1.1 101 Switching Protocols\r\n");
        buf.extend_from_slice(b"Upgrade: websocket\r\n");
        buf.extend_from_slice(b"Connection: Upgrade\r\n");
        buf.extend_from_slice(format!("Sec-WebSocket-Accept: {}\r\n", self.accept).as_bytes());

        if let Some(ref proto) = self.protocol {
            validate_header_value("Sec-WebSocket-Protocol", proto)?;
            buf.extend_from_slice(format!("Sec-WebSocket-Protocol: {proto}\r\n").as_bytes());
        }

        if let Some(ref version) = self.version {
            validate_header_value("Sec-WebSocket-Version", version)?;
            buf.extend_from_slice(format!("Sec-WebSocket-Version: {version}\r\n").as_bytes());
        }

        buf.extend_from_slice(b"\r\n");
        Ok(())
    }
}

/// Client side upgrade request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRequest {
    /// Value of the Host header (`host` or `host:port`).
    pub host: String,
    /// Request path, starting with `/`.
    pub path: String,
    /// Query string without the leading `?`.
    pub query: Option<String>,
    /// Extra headers sent after the mandatory ones.
    pub headers: Headers,
}

impl ClientRequest {
    /// Request for `path` on `host`.
    #[must_use]
    pub fn new(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
            query: None,
            headers: Headers::new(),
        }
    }

    /// Set the query string.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Add an extra header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Write the request head using `key` as Sec-WebSocket-Key.
    ///
    /// # Errors
    /// Returns `Error::Handshake` if the target or any header contains CR/LF.
    pub fn write(&self, key: &str, buf: &mut Vec<u8>) -> Result<()> {
        let target = match self.query.as_deref() {
            Some(query) if !query.is_empty() => format!("{}?{query}", self.path),
            _ => self.path.clone(),
        };
        validate_header_value("request target", &target)?;
        validate_header_value("Host", &self.host)?;

        buf.extend_from_slice(format!("GET {target} HTTP/1.1\r\n").as_bytes());
        buf.extend_from_slice(format!("Host: {}\r\n", self.host).as_bytes());
        buf.extend_from_slice(b"Upgrade: websocket\r\n");
        buf.extend_from_slice(b"Connection: upgrade\r\n");
        buf.extend_from_slice(format!("Sec-WebSocket-Key: {key}\r\n").as_bytes());
        buf.extend_from_slice(format!("Sec-WebSocket-Version: {WS_VERSION}\r\n").as_bytes());

        for (name, value) in self.headers.iter() {
            validate_header_value(name, name)?;
            validate_header_value(name, value)?;
            buf.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
        }

        buf.extend_from_slice(b"\r\n");
        Ok(())
    }
}

/// Check a response status line, e.g. `HTTP/1.1 101 Switching Protocols`.
///
/// # Errors
///
/// Returns `Error::Handshake` naming the actual version or status unless
/// the version is exactly `HTTP/1.1` and the status is `101`.
pub fn check_status_line(line: &str) -> Result<()> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    let status = parts.next().unwrap_or_default();

    if version != "HTTP/1.1" {
        return Err(Error::Handshake(format!(
            "unexpected HTTP version: {version:?} (expected HTTP/1.1)"
        )));
    }
    if status != "101" {
        return Err(Error::Handshake(format!(
            "unexpected status code: {status:?} (expected 101)"
        )));
    }
    Ok(())
}

/// Compare the server's Sec-WebSocket-Accept against the value expected for
/// `key`.
///
/// # Errors
///
/// Returns `Error::Handshake` naming both values on mismatch, or if the
/// header is missing.
pub fn verify_accept(headers: &Headers, key: &str) -> Result<()> {
    let expected = create_sec_accept(key);
    match headers.get("sec-websocket-accept") {
        Some(actual) if actual == expected => Ok(()),
        Some(actual) => Err(Error::Handshake(format!(
            "Sec-WebSocket-Accept mismatch: expected {expected}, got {actual}"
        ))),
        None => Err(Error::Handshake(format!(
            "missing Sec-WebSocket-Accept (expected {expected})"
        ))),
    }
}
