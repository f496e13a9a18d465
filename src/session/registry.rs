//! Registry owning all in-flight sessions and their pending timers
//!
//! The registry is the single source of truth for session state. It also
//! books the cancellable timer handles guarding each session: the
//! bot-think clock per session and the disconnect grace timer per player.
//! Every handle carries a generation token; a fired timer task must
//! re-validate its token against the registry before acting, since the
//! world may have moved on by the time it runs.

use crate::session::instance::Session;
use crate::types::{PlayerId, SessionId};
use std::collections::HashMap;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Pending forfeiture deadline for a disconnected player
#[derive(Debug)]
pub struct GraceTimer {
    pub session_id: SessionId,
    pub token: Uuid,
    handle: JoinHandle<()>,
}

impl GraceTimer {
    /// Cancel the pending forfeiture
    pub fn cancel(self) {
        self.handle.abort();
    }
}

/// Pending scheduled bot move for a session
#[derive(Debug)]
struct BotClock {
    token: Uuid,
    handle: JoinHandle<()>,
}

/// Owner of all in-flight sessions, the player-to-session index, and the
/// pending timers. Mutated only under the engine's single lock.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
    by_player: HashMap<PlayerId, SessionId>,
    grace_timers: HashMap<PlayerId, GraceTimer>,
    bot_clocks: HashMap<SessionId, BotClock>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly created session and index its human seats
    pub fn insert(&mut self, session: Session) {
        for player in session.human_players() {
            self.by_player.insert(player, session.id());
        }
        self.sessions.insert(session.id(), session);
    }

    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    /// Session a player currently participates in
    pub fn session_id_for(&self, player: &PlayerId) -> Option<SessionId> {
        self.by_player.get(player).copied()
    }

    /// Remove a finalized session, its player index entries, and any
    /// timers still guarding it.
    pub fn remove(&mut self, id: &SessionId) -> Option<Session> {
        let session = self.sessions.remove(id)?;
        for player in session.human_players() {
            if self.by_player.get(&player) == Some(id) {
                self.by_player.remove(&player);
            }
            if let Some(timer) = self.grace_timers.remove(&player) {
                if &timer.session_id == id {
                    timer.cancel();
                } else {
                    // Timer guards a different session; put it back
                    self.grace_timers.insert(player, timer);
                }
            }
        }
        self.cancel_bot_clock(id);
        Some(session)
    }

    pub fn active_session_count(&self) -> usize {
        self.sessions.values().filter(|s| s.is_active()).count()
    }

    /// Arm a grace timer for a disconnected player. A previous timer for
    /// the same player is cancelled first.
    pub fn arm_grace_timer(
        &mut self,
        player: PlayerId,
        session_id: SessionId,
        token: Uuid,
        handle: JoinHandle<()>,
    ) {
        if let Some(old) = self.grace_timers.insert(
            player,
            GraceTimer {
                session_id,
                token,
                handle,
            },
        ) {
            old.cancel();
        }
    }

    /// Take the live grace timer for an exact (player, session) pair.
    /// Used by reconnect; the caller cancels the returned timer.
    pub fn take_grace_timer(
        &mut self,
        player: &PlayerId,
        session_id: &SessionId,
    ) -> Option<GraceTimer> {
        match self.grace_timers.get(player) {
            Some(timer) if &timer.session_id == session_id => self.grace_timers.remove(player),
            _ => None,
        }
    }

    /// Consume the grace timer iff its generation token still matches.
    /// Called by the fired timer task to re-validate before forfeiting.
    pub fn claim_grace_timer(
        &mut self,
        player: &PlayerId,
        session_id: &SessionId,
        token: Uuid,
    ) -> bool {
        match self.grace_timers.get(player) {
            Some(timer) if &timer.session_id == session_id && timer.token == token => {
                self.grace_timers.remove(player);
                true
            }
            _ => false,
        }
    }

    /// Whether the player currently has a pending grace timer
    pub fn has_grace_timer(&self, player: &PlayerId) -> bool {
        self.grace_timers.contains_key(player)
    }

    /// Arm the bot-think clock for a session, replacing any previous one
    pub fn arm_bot_clock(&mut self, session_id: SessionId, token: Uuid, handle: JoinHandle<()>) {
        if let Some(old) = self.bot_clocks.insert(session_id, BotClock { token, handle }) {
            old.handle.abort();
        }
    }

    /// Consume the bot clock iff its token still matches
    pub fn claim_bot_clock(&mut self, session_id: &SessionId, token: Uuid) -> bool {
        match self.bot_clocks.get(session_id) {
            Some(clock) if clock.token == token => {
                self.bot_clocks.remove(session_id);
                true
            }
            _ => false,
        }
    }

    /// Cancel any scheduled bot move for a session
    pub fn cancel_bot_clock(&mut self, session_id: &SessionId) {
        if let Some(clock) = self.bot_clocks.remove(session_id) {
            clock.handle.abort();
        }
    }
}
