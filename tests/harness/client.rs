//! WebSocket test client for integration testing.
//!
//! Wraps a client connection and its event stream.

use std::net::SocketAddr;

use tokio::net::TcpStream;
use wsqueue::{CloseCode, Config, Connection, Error, Event, Events, Message, Result, connect_url};

pub struct TestClient {
    pub id: usize,
    conn: Connection<TcpStream>,
    events: Events,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        Self::connect_with_id(addr, 0).await
    }

    pub async fn connect_with_id(addr: SocketAddr, id: usize) -> Result<Self> {
        let url = format!("ws://{addr}/client/{id}");
        let mut conn = connect_url(&url, Config::client()).await?;
        let events = conn.events().ok_or(Error::ConnectionReset)?;
        Ok(Self { id, conn, events })
    }

    pub fn connection(&self) -> &Connection<TcpStream> {
        &self.conn
    }

    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.conn.send(text).await
    }

    pub async fn send_binary(&mut self, data: &[u8]) -> Result<()> {
        self.conn.send(data).await
    }

    /// Next event, skipping nothing.
    pub async fn recv_event(&mut self) -> Option<Event> {
        self.events.recv().await
    }

    /// Next data message. `Ok(None)` once the peer has closed.
    pub async fn recv_message(&mut self) -> Result<Option<Message>> {
        loop {
            match self.events.recv().await {
                Some(Event::Message(msg)) => return Ok(Some(msg)),
                Some(Event::Ping(_) | Event::Pong(_)) => continue,
                Some(Event::Close(_)) => return Ok(None),
                None => {
                    return match self.events.error() {
                        Some(err) => Err(err),
                        None => Ok(None),
                    };
                }
            }
        }
    }

    pub async fn recv_text(&mut self) -> Result<Option<String>> {
        match self.recv_message().await? {
            Some(Message::Text(text)) => Ok(Some(text)),
            Some(Message::Binary(_)) => Err(Error::Protocol("expected text message".into())),
            None => Ok(None),
        }
    }

    /// Close with 1000 and wait for the server's echo.
    pub async fn close(&mut self) -> Result<()> {
        self.conn.close(CloseCode::Normal, "").await?;
        while let Some(event) = self.events.recv().await {
            if event.is_close() {
                return Ok(());
            }
        }
        Err(self.events.error().unwrap_or(Error::ConnectionReset))
    }
}
