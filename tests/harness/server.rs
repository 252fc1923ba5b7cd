//! WebSocket echo server for integration testing.
//!
//! Spawns on a random loopback port and echoes every data message back.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use wsqueue::{Config, Event, accept_stream};

pub struct TestServer {
    handle: JoinHandle<()>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Bind to `127.0.0.1:0` with the default server config.
    pub async fn spawn() -> (Self, SocketAddr) {
        Self::spawn_with_config(Config::server()).await
    }

    pub async fn spawn_with_config(config: Config) -> (Self, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, mut rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut rx => break,
                    accepted = listener.accept() => {
                        let Ok((stream, _)) = accepted else { continue };
                        tokio::spawn(echo(stream, config.clone()));
                    }
                }
            }
        });

        (
            Self {
                handle,
                shutdown: Some(tx),
            },
            addr,
        )
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.handle.await;
    }
}

async fn echo(stream: TcpStream, config: Config) {
    let Ok(mut conn) = accept_stream(stream, config).await else {
        return;
    };
    let Some(mut events) = conn.events() else {
        return;
    };

    while let Some(event) = events.recv().await {
        if let Event::Message(msg) = event {
            if conn.send(msg).await.is_err() {
                break;
            }
        }
    }
}
