//! Inbound command dispatch
//!
//! Translates parsed client commands into engine calls, binds connection
//! channels to player identities, and maps failures back into error
//! events for the offending client.

use crate::error::GameServerError;
use crate::gateway::messages::{ClientCommand, ServerEvent};
use crate::gateway::notifier::ChannelRegistry;
use crate::session::SessionEngine;
use crate::types::PlayerId;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Per-connection command dispatcher. One Gateway serves all
/// connections; each connection tracks its own identity.
#[derive(Clone)]
pub struct Gateway {
    engine: SessionEngine,
    channels: Arc<ChannelRegistry>,
}

impl Gateway {
    pub fn new(engine: SessionEngine, channels: Arc<ChannelRegistry>) -> Self {
        Self { engine, channels }
    }

    /// Parse and dispatch one raw message line from a connection.
    /// `identity` is the player this connection has authenticated as, set
    /// by the first join or reconnect.
    pub async fn handle_line(
        &self,
        identity: &mut Option<PlayerId>,
        sender: &mpsc::UnboundedSender<ServerEvent>,
        line: &str,
    ) {
        let command: ClientCommand = match serde_json::from_str(line) {
            Ok(command) => command,
            Err(e) => {
                debug!("Unparseable client message: {}", e);
                Self::reply(
                    sender,
                    ServerEvent::Error {
                        message: "Malformed message".to_string(),
                    },
                );
                return;
            }
        };

        self.handle_command(identity, sender, command).await;
    }

    /// Dispatch one parsed command
    pub async fn handle_command(
        &self,
        identity: &mut Option<PlayerId>,
        sender: &mpsc::UnboundedSender<ServerEvent>,
        command: ClientCommand,
    ) {
        let result = match command {
            ClientCommand::JoinGame { username } => {
                self.channels.bind(username.clone(), sender.clone());
                *identity = Some(username.clone());
                self.engine.join(username).await
            }
            ClientCommand::MakeMove { game_id, column } => match identity {
                Some(player) => self.engine.make_move(player.clone(), game_id, column).await,
                None => Err(GameServerError::InvalidRequest {
                    reason: "Join a game before moving".to_string(),
                }
                .into()),
            },
            ClientCommand::ReconnectGame { username, game_id } => {
                // Bind first so the reconnect snapshot can be delivered
                self.channels.bind(username.clone(), sender.clone());
                *identity = Some(username.clone());
                self.engine.reconnect(username, game_id).await
            }
        };

        if let Err(e) = result {
            match e.downcast_ref::<GameServerError>() {
                Some(game_err) if game_err.is_client_error() => {
                    debug!("Rejected client request: {}", game_err);
                    Self::reply(
                        sender,
                        ServerEvent::Error {
                            message: game_err.to_string(),
                        },
                    );
                }
                _ => {
                    error!("Command handling failed: {}", e);
                    Self::reply(
                        sender,
                        ServerEvent::Error {
                            message: "Internal server error".to_string(),
                        },
                    );
                }
            }
        }
    }

    /// Connection teardown: release the channel binding and start the
    /// player's grace window.
    pub async fn handle_disconnect(
        &self,
        identity: Option<PlayerId>,
        sender: &mpsc::UnboundedSender<ServerEvent>,
    ) {
        if let Some(player) = identity {
            info!("Connection for '{}' closed", player);
            self.channels.unbind(&player, sender);
            self.engine.handle_disconnect(player).await;
        }
    }

    fn reply(sender: &mpsc::UnboundedSender<ServerEvent>, event: ServerEvent) {
        // The connection may already be gone; nothing to do then.
        let _ = sender.send(event);
    }
}
