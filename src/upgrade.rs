//! The opening handshake over an async stream, for both sides.
//!
//! On success each function returns a [`Connection`] over the upgraded
//! stream. Bytes that arrive right behind the handshake head stay in the
//! read buffer and are seen by the connection's read loop.

use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use url::Url;

use crate::config::{Config, Limits};
use crate::connection::{Connection, Role};
use crate::error::{Error, Result};
use crate::protocol::handshake::{
    ClientRequest, HandshakeRequest, HandshakeResponse, Headers, check_status_line, generate_key,
    verify_accept,
};

/// Read header lines up to and excluding the empty line ending the head.
async fn read_head<R>(reader: &mut BufReader<R>, limits: &Limits) -> Result<Vec<String>>
where
    R: AsyncRead + Unpin,
{
    let mut lines = Vec::new();
    let mut total = 0usize;

    loop {
        let mut line = String::new();
        // one byte past the limit so an oversized head is detected
        let budget = (limits.max_handshake_size - total) as u64 + 1;
        let n = (&mut *reader).take(budget).read_line(&mut line).await?;
        if n == 0 {
            return Err(Error::Handshake("connection closed during handshake".into()));
        }
        total += n;
        limits.check_handshake_size(total)?;
        if !line.ends_with('\n') {
            return Err(Error::Handshake("connection closed during handshake".into()));
        }

        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Ok(lines);
        }
        lines.push(line.to_string());
    }
}

/// Complete a server-side upgrade for a request already parsed by an HTTP
/// layer.
///
/// # Errors
///
/// - `Error::Handshake("request is not acceptable")` unless the request
///   carries `Upgrade: websocket` and a non-empty Sec-WebSocket-Key
/// - I/O errors while writing the response
pub async fn accept<T>(
    mut io: T,
    request: &HandshakeRequest,
    config: Config,
) -> Result<Connection<T>>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let response = HandshakeResponse::from_request(request)?;
    let mut buf = Vec::with_capacity(256);
    response.write(&mut buf)?;
    io.write_all(&buf).await?;
    io.flush().await?;

    debug!("accepted websocket upgrade for {}", request.path);
    Ok(Connection::new(io, Role::Server, config))
}

/// Read the upgrade request from `io` and complete a server-side upgrade.
///
/// # Errors
///
/// - `Error::HandshakeTooLarge` if the request head exceeds the limit
/// - `Error::Handshake` for malformed or unacceptable requests
/// - I/O errors from the stream
pub async fn accept_stream<T>(io: T, config: Config) -> Result<Connection<T>>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read, mut write) = tokio::io::split(io);
    let mut reader = BufReader::with_capacity(config.read_buffer_size, read);

    let lines = read_head(&mut reader, &config.limits).await?;
    let request = HandshakeRequest::from_lines(lines.iter().map(String::as_str))?;
    let response = HandshakeResponse::from_request(&request)?;

    let mut buf = Vec::with_capacity(256);
    response.write(&mut buf)?;
    write.write_all(&buf).await?;
    write.flush().await?;

    debug!("accepted websocket upgrade for {}", request.path);
    Ok(Connection::from_parts(reader, write, Role::Server, config))
}

/// Perform the client side of the handshake over `io`.
///
/// # Errors
///
/// - `Error::Handshake` naming the actual version or status unless the
///   response is `HTTP/1.1 101`
/// - `Error::Handshake` naming both values if Sec-WebSocket-Accept does not
///   match the key that was sent
/// - `Error::HandshakeTooLarge` if the response head exceeds the limit
/// - I/O errors from the stream
pub async fn connect<T>(io: T, request: &ClientRequest, config: Config) -> Result<Connection<T>>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    let key = generate_key()?;
    let (read, mut write) = tokio::io::split(io);

    let mut buf = Vec::with_capacity(256);
    request.write(&key, &mut buf)?;
    write.write_all(&buf).await?;
    write.flush().await?;

    let mut reader = BufReader::with_capacity(config.read_buffer_size, read);
    let lines = read_head(&mut reader, &config.limits).await?;
    let (status, header_lines) = lines
        .split_first()
        .ok_or_else(|| Error::Handshake("empty response".into()))?;
    check_status_line(status)?;

    let mut headers = Headers::new();
    for line in header_lines {
        headers.push_line(line)?;
    }
    verify_accept(&headers, &key)?;

    debug!("websocket handshake with {} complete", request.host);
    Ok(Connection::from_parts(reader, write, Role::Client, config))
}

/// Dial a `ws://` URL over TCP and perform the client handshake.
///
/// # Errors
///
/// - `Error::Handshake` for unparsable URLs, schemes other than `ws`, or a
///   missing host
/// - everything [`connect`] returns
pub async fn connect_url(url: &str, config: Config) -> Result<Connection<TcpStream>> {
    let (addr, request) = client_request(url)?;
    let stream = TcpStream::connect(addr.as_str()).await?;
    stream.set_nodelay(true)?;
    connect(stream, &request, config).await
}

/// Split a `ws://` URL into a dial address and a request.
fn client_request(url: &str) -> Result<(String, ClientRequest)> {
    let url = Url::parse(url).map_err(|e| Error::Handshake(format!("invalid URL {url:?}: {e}")))?;

    if url.scheme() != "ws" {
        return Err(Error::Handshake(format!(
            "unsupported scheme {:?} (only ws is supported)",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .ok_or_else(|| Error::Handshake("URL has no host".into()))?;
    let port = url.port_or_known_default().unwrap_or(80);

    let host_header = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    let mut request = ClientRequest::new(host_header, url.path());
    if let Some(query) = url.query() {
        request = request.with_query(query);
    }

    Ok((format!("{host}:{port}"), request))
}
