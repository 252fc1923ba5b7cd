//! # wsqueue - RFC 6455 WebSocket engine with an ordered send queue
//!
//! `wsqueue` implements the WebSocket protocol over any Tokio byte stream:
//!
//! - **Frame codec** with minimal length encoding and per-frame masking
//! - **Opening handshake** for both sides, including `ws://` dialing
//! - **Message reassembly** with size and fragment limits
//! - **Strict FIFO send queue**: one frame in flight at a time, automatic
//!   Pong replies and Close echoes share the queue with application sends
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wsqueue::{Config, Event, connect_url};
//!
//! let mut conn = connect_url("ws://127.0.0.1:9001/chat", Config::client()).await?;
//! let mut events = conn.events().unwrap();
//!
//! conn.send("hello").await?;
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! ```

pub mod codec;
pub mod config;
pub mod connection;
pub mod digest;
pub mod error;
pub mod message;
pub mod protocol;
pub mod upgrade;

pub use config::{Config, Limits};
pub use connection::{Connection, ConnectionState, Delivery, Events, Role, Sender};
pub use error::{Error, Result};
pub use message::{CloseCode, CloseEvent, Event, Message};
pub use protocol::{
    ClientRequest, Frame, HandshakeRequest, Headers, OpCode, WS_GUID, acceptable,
    create_sec_accept,
};
pub use upgrade::{accept, accept_stream, connect, connect_url};

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn test_public_types_are_send() {
        assert_send::<Error>();
        assert_send::<Config>();
        assert_send::<Limits>();
        assert_send::<Message>();
        assert_send::<Event>();
        assert_send::<CloseCode>();
        assert_send::<CloseEvent>();
        assert_send::<ConnectionState>();
        assert_send::<Role>();
        assert_send::<Sender>();
        assert_send::<Delivery>();
        assert_send::<Events>();
        assert_send::<Connection<tokio::net::TcpStream>>();
    }

    #[test]
    fn test_public_types_are_sync() {
        assert_sync::<Error>();
        assert_sync::<Config>();
        assert_sync::<Limits>();
        assert_sync::<Message>();
        assert_sync::<CloseCode>();
        assert_sync::<CloseEvent>();
        assert_sync::<ConnectionState>();
        assert_sync::<Role>();
        assert_sync::<Sender>();
    }
}
