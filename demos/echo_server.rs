//! Simple WebSocket echo server example.
//!
//! Run with: cargo run --example echo_server
//! Then connect with: cargo run --example client

use std::error::Error;

use log::{info, warn};
use tokio::net::{TcpListener, TcpStream};
use wsqueue::{Config, Event, accept_stream};

const ADDR: &str = "127.0.0.1:9001";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::init_with_level(log::Level::Debug)?;

    let listener = TcpListener::bind(ADDR).await?;
    info!("echo server listening on {ADDR}");

    loop {
        let (stream, addr) = listener.accept().await?;
        info!("new connection from {addr}");

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream).await {
                warn!("connection error from {addr}: {e}");
            }
        });
    }
}

async fn handle_connection(stream: TcpStream) -> wsqueue::Result<()> {
    stream.set_nodelay(true)?;
    let mut conn = accept_stream(stream, Config::server()).await?;
    let Some(mut events) = conn.events() else {
        return Ok(());
    };

    while let Some(event) = events.recv().await {
        match event {
            Event::Message(msg) => {
                info!("echoing {} bytes (text: {})", msg.len(), msg.is_text());
                conn.send(msg).await?;
            }
            // the Pong is already queued by the read loop
            Event::Ping(data) => info!("ping with {} bytes", data.len()),
            Event::Pong(data) => info!("pong with {} bytes", data.len()),
            Event::Close(close) => {
                info!("peer closed: {} {:?}", close.code, close.reason);
            }
        }
    }

    match events.error() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
