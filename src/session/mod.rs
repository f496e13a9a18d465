//! Session lifecycle engine
//!
//! A session is one match between two seats. The instance holds the
//! per-session turn state machine, the registry owns every in-flight
//! session plus its pending timers, and the engine orchestrates moves,
//! matchmaking, timers, and collaborator notifications.

pub mod engine;
pub mod instance;
pub mod registry;

pub use engine::{EngineStats, SessionEngine};
pub use instance::{MoveOutcome, MoveProgress, Session};
pub use registry::SessionRegistry;
