//! Simple WebSocket client example.
//!
//! Run the echo server first: cargo run --example echo_server
//! Then run: cargo run --example client

use std::error::Error;

use futures::StreamExt;
use log::info;
use wsqueue::{CloseCode, Config, Event, connect_url};

const SERVER_URL: &str = "ws://127.0.0.1:9001/echo";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::init_with_level(log::Level::Debug)?;

    let mut conn = connect_url(SERVER_URL, Config::client()).await?;
    info!("connected to {SERVER_URL}");
    let mut events = conn.events().ok_or("event stream already taken")?;

    // queued in call order, awaited together
    let first = conn.send("Hello, WebSocket!");
    let second = conn.send(vec![0x01, 0x02, 0x03, 0x04]);
    let ping = conn.ping(b"are you there?".to_vec());
    first.await?;
    second.await?;
    ping.await?;

    let mut echoed = 0;
    while let Some(event) = events.next().await {
        match event {
            Event::Message(msg) => {
                info!("received {msg:?}");
                echoed += 1;
                if echoed == 2 {
                    conn.close(CloseCode::Normal, "goodbye").await?;
                }
            }
            Event::Pong(data) => info!("pong: {}", String::from_utf8_lossy(&data)),
            Event::Ping(_) => {}
            Event::Close(close) => info!("close confirmed: {}", close.code),
        }
    }

    info!("connection state: {}", conn.state());
    Ok(())
}
