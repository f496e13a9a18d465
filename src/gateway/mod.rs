//! Channel gateway for the game session service
//!
//! Translates inbound channel messages into engine calls and outbound
//! results into channel messages. The transport is a thin
//! newline-delimited JSON TCP listener with one connection per client;
//! everything below the message contract is replaceable.

pub mod handlers;
pub mod listener;
pub mod messages;
pub mod notifier;

pub use handlers::Gateway;
pub use listener::{GatewayListener, ListenerConfig};
pub use messages::{ClientCommand, GameSnapshot, ServerEvent};
pub use notifier::{ChannelRegistry, ClientNotifier};
