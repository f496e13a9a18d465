//! Outbound client notification
//!
//! The engine reports session progress through [`ClientNotifier`] without
//! knowing how clients are connected. The production implementation is a
//! registry of per-connection senders; tests substitute recording mocks.

use crate::error::Result;
use crate::gateway::messages::ServerEvent;
use crate::types::PlayerId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::mpsc;
use tracing::debug;

/// Trait for delivering events to connected clients
#[async_trait]
pub trait ClientNotifier: Send + Sync {
    /// Deliver an event to one player. Delivery to a currently
    /// disconnected player is not an error; the event is dropped.
    async fn send(&self, player: &PlayerId, event: ServerEvent) -> Result<()>;
}

/// Registry of live client channels, one sender per connected player.
/// Rebinding a player (reconnect) replaces the previous sender.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: RwLock<HashMap<PlayerId, mpsc::UnboundedSender<ServerEvent>>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate a player with a connection's outbound sender
    pub fn bind(&self, player: PlayerId, sender: mpsc::UnboundedSender<ServerEvent>) {
        self.channels
            .write()
            .expect("channel registry lock poisoned")
            .insert(player, sender);
    }

    /// Drop a player's channel; only if it is still the given connection's
    /// sender (a reconnect may have rebound the player meanwhile).
    pub fn unbind(&self, player: &PlayerId, sender: &mpsc::UnboundedSender<ServerEvent>) {
        let mut channels = self
            .channels
            .write()
            .expect("channel registry lock poisoned");
        if let Some(current) = channels.get(player) {
            if current.same_channel(sender) {
                channels.remove(player);
            }
        }
    }

    /// Number of currently bound clients
    pub fn connected_count(&self) -> usize {
        self.channels
            .read()
            .expect("channel registry lock poisoned")
            .len()
    }
}

#[async_trait]
impl ClientNotifier for ChannelRegistry {
    async fn send(&self, player: &PlayerId, event: ServerEvent) -> Result<()> {
        let sender = {
            let channels = self
                .channels
                .read()
                .expect("channel registry lock poisoned");
            channels.get(player).cloned()
        };

        match sender {
            Some(sender) => {
                if sender.send(event).is_err() {
                    debug!("Dropping event for '{}': connection closed", player);
                }
            }
            None => {
                debug!("Dropping event for '{}': not connected", player);
            }
        }
        Ok(())
    }
}
