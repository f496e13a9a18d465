//! Newline-delimited JSON TCP listener
//!
//! One connection per client. Inbound lines are parsed and dispatched by
//! the [`Gateway`]; outbound events flow through a per-connection mpsc
//! channel drained by a writer task, so engine notifications never block
//! on a slow client socket.

use crate::gateway::handlers::Gateway;
use crate::gateway::messages::ServerEvent;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Listener configuration
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub port: u16,
    pub host: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            port: 4000,
            host: "0.0.0.0".to_string(),
        }
    }
}

/// Accept loop for client connections
pub struct GatewayListener {
    config: ListenerConfig,
    gateway: Gateway,
    shutdown_tx: broadcast::Sender<()>,
}

impl GatewayListener {
    pub fn new(config: ListenerConfig, gateway: Gateway) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            gateway,
            shutdown_tx,
        }
    }

    /// Accept connections until a shutdown signal arrives
    pub async fn start(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .context("Invalid listener address")?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind gateway listener on {}", addr))?;

        info!("Gateway listening on {}", addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!("Accepted connection from {}", peer);
                            let gateway = self.gateway.clone();
                            let shutdown_rx = self.shutdown_tx.subscribe();
                            tokio::spawn(async move {
                                handle_connection(stream, peer, gateway, shutdown_rx).await;
                            });
                        }
                        Err(e) => {
                            warn!("Failed to accept connection: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Gateway listener shutdown signal received");
                    break;
                }
            }
        }

        info!("Gateway listener stopped");
        Ok(())
    }

    /// Stop the accept loop and close active connections
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping gateway listener...");
        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal to gateway listener: {}", e);
        }
        Ok(())
    }
}

/// Serve one client connection until it closes or shutdown is requested
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    gateway: Gateway,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let (read_half, mut write_half) = stream.into_split();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ServerEvent>();

    let writer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let mut payload = match serde_json::to_vec(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("Failed to serialize event: {}", e);
                    continue;
                }
            };
            payload.push(b'\n');
            if write_half.write_all(&payload).await.is_err() {
                break;
            }
        }
    });

    let mut lines = BufReader::new(read_half).lines();
    let mut identity = None;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        gateway.handle_line(&mut identity, &event_tx, line).await;
                    }
                    Ok(None) => {
                        debug!("Connection from {} closed by peer", peer);
                        break;
                    }
                    Err(e) => {
                        debug!("Read error on connection from {}: {}", peer, e);
                        break;
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                debug!("Closing connection from {} for shutdown", peer);
                break;
            }
        }
    }

    gateway.handle_disconnect(identity, &event_tx).await;
    drop(event_tx);
    let _ = writer.await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimingSettings;
    use crate::gateway::ChannelRegistry;
    use crate::metrics::MetricsCollector;
    use crate::session::SessionEngine;
    use crate::storage::analytics::NullAnalyticsSink;
    use crate::storage::persistence::InMemoryGameStore;
    use std::sync::Arc;
    use tokio::io::AsyncReadExt;

    fn test_listener(port: u16) -> GatewayListener {
        let channels = Arc::new(ChannelRegistry::new());
        let engine = SessionEngine::new(
            channels.clone(),
            Arc::new(InMemoryGameStore::new()),
            Arc::new(NullAnalyticsSink::new()),
            MetricsCollector::new().unwrap(),
            TimingSettings::default(),
        );
        GatewayListener::new(
            ListenerConfig {
                port,
                host: "127.0.0.1".to_string(),
            },
            Gateway::new(engine, channels),
        )
    }

    #[tokio::test]
    async fn test_join_over_tcp_gets_waiting_reply() {
        let listener = Arc::new(test_listener(41411));
        let server = {
            let listener = listener.clone();
            tokio::spawn(async move { listener.start().await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let mut stream = TcpStream::connect("127.0.0.1:41411").await.unwrap();
        stream
            .write_all(b"{\"type\":\"join_game\",\"username\":\"alice\"}\n")
            .await
            .unwrap();

        let mut buf = vec![0u8; 1024];
        let n = stream.read(&mut buf).await.unwrap();
        let reply: ServerEvent = serde_json::from_slice(&buf[..n]).unwrap();
        assert!(matches!(reply, ServerEvent::WaitingForOpponent { .. }));

        listener.stop().await.unwrap();
        let _ = server.await;
    }

    #[tokio::test]
    async fn test_malformed_line_gets_error_reply() {
        let listener = Arc::new(test_listener(41412));
        let server = {
            let listener = listener.clone();
            tokio::spawn(async move { listener.start().await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let mut stream = TcpStream::connect("127.0.0.1:41412").await.unwrap();
        stream.write_all(b"garbage\n").await.unwrap();

        let mut buf = vec![0u8; 1024];
        let n = stream.read(&mut buf).await.unwrap();
        let reply: ServerEvent = serde_json::from_slice(&buf[..n]).unwrap();
        assert!(matches!(reply, ServerEvent::Error { .. }));

        listener.stop().await.unwrap();
        let _ = server.await;
    }
}
