//! Session engine orchestrating matchmaking, moves, timers, and
//! collaborator notifications
//!
//! All queue/registry mutation happens under one lock, so every compound
//! action (validate, place, check, switch turn) is atomic. The lock is
//! never held across an await: effects are computed under the lock into
//! plain data and delivered afterwards. Collaborator I/O (persistence,
//! analytics) is spawned fire-and-forget and can never stall or corrupt
//! a session transition.

use crate::bot::BotStrategist;
use crate::config::TimingSettings;
use crate::error::{GameServerError, Result};
use crate::gateway::messages::{GameSnapshot, ServerEvent};
use crate::gateway::notifier::ClientNotifier;
use crate::matchmaking::{JoinOutcome, MatchQueue};
use crate::metrics::MetricsCollector;
use crate::session::instance::{MoveOutcome, MoveProgress, Session};
use crate::session::registry::SessionRegistry;
use crate::storage::analytics::{AnalyticsEvent, AnalyticsSink};
use crate::storage::persistence::{GameRecord, GameStore, PlayerResult};
use crate::types::{
    Disc, PlayerId, Seat, SeatOccupant, SessionId, SessionOutcome, SessionStatus,
};
use crate::utils::generate_session_id;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Counters reported by the health endpoint
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    pub players_queued: u64,
    pub games_started: u64,
    pub games_completed: u64,
    pub games_forfeited: u64,
    pub active_sessions: usize,
    pub players_waiting: usize,
}

/// A lone player's pending bot-match deadline
#[derive(Debug)]
struct PendingBotMatch {
    token: Uuid,
    handle: JoinHandle<()>,
}

/// All mutable engine state, guarded by a single lock
#[derive(Default)]
struct CoreState {
    queue: MatchQueue,
    registry: SessionRegistry,
    pending_bot_matches: HashMap<PlayerId, PendingBotMatch>,
    stats: EngineStats,
}

/// What a locked section decided to tell the world
struct GameStartEffect {
    snapshot: GameSnapshot,
    session_id: SessionId,
    seat_one: PlayerId,
    seat_two: SeatOccupant,
    created_at: chrono::DateTime<chrono::Utc>,
}

struct MoveEffect {
    recipients: Vec<PlayerId>,
    row: usize,
    column: usize,
    disc: Disc,
    board: Vec<Vec<Option<Disc>>>,
    /// Continuation: occupant holding the turn next
    next: Option<SeatOccupant>,
    /// Termination: the finalized session and its outcome
    ended: Option<(Session, SessionOutcome)>,
}

/// The session lifecycle engine. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionEngine {
    inner: Arc<Mutex<CoreState>>,
    notifier: Arc<dyn ClientNotifier>,
    store: Arc<dyn GameStore>,
    analytics: Arc<dyn AnalyticsSink>,
    metrics: MetricsCollector,
    timing: TimingSettings,
    strategist: BotStrategist,
}

impl SessionEngine {
    pub fn new(
        notifier: Arc<dyn ClientNotifier>,
        store: Arc<dyn GameStore>,
        analytics: Arc<dyn AnalyticsSink>,
        metrics: MetricsCollector,
        timing: TimingSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CoreState::default())),
            notifier,
            store,
            analytics,
            metrics,
            timing,
            strategist: BotStrategist::new(),
        }
    }

    /// Snapshot of the engine counters
    pub fn stats(&self) -> EngineStats {
        let state = self.lock();
        let mut stats = state.stats.clone();
        stats.active_sessions = state.registry.active_session_count();
        stats.players_waiting = state.queue.len();
        stats
    }

    /// Current session snapshot for a player, if they are in one
    pub fn session_for(&self, player: &PlayerId) -> Option<GameSnapshot> {
        let state = self.lock();
        let id = state.registry.session_id_for(player)?;
        state.registry.get(&id).map(GameSnapshot::from)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CoreState> {
        // A poisoned lock means a panic mid-transition; propagating the
        // panic is the only safe option.
        self.inner.lock().expect("engine state lock poisoned")
    }

    /// Handle a join request: pair with the earliest waiting player or
    /// enqueue with a bot-match deadline.
    pub async fn join(&self, player: PlayerId) -> Result<()> {
        if player.is_empty() {
            return Err(GameServerError::InvalidRequest {
                reason: "Username is required".to_string(),
            }
            .into());
        }

        enum JoinEffect {
            Noop,
            Enqueued,
            Started(GameStartEffect),
        }

        let effect = {
            let mut state = self.lock();

            if let Some(id) = state.registry.session_id_for(&player) {
                if state.registry.get(&id).is_some_and(Session::is_active) {
                    return Err(GameServerError::InvalidRequest {
                        reason: "Player is already in an active game".to_string(),
                    }
                    .into());
                }
            }

            match state.queue.join(&player) {
                JoinOutcome::AlreadyQueued => {
                    debug!("Duplicate join from '{}' ignored", player);
                    JoinEffect::Noop
                }
                JoinOutcome::Enqueued => {
                    let token = Uuid::new_v4();
                    let handle = self.spawn_bot_match_deadline(player.clone(), token);
                    state
                        .pending_bot_matches
                        .insert(player.clone(), PendingBotMatch { token, handle });
                    state.stats.players_queued += 1;
                    self.metrics.set_players_waiting(state.queue.len());
                    JoinEffect::Enqueued
                }
                JoinOutcome::Matched { opponent } => {
                    // The longer-waiting player takes seat one
                    if let Some(pending) = state.pending_bot_matches.remove(&opponent) {
                        pending.handle.abort();
                    }
                    let session = Session::new_human_pair(
                        generate_session_id(),
                        opponent.clone(),
                        player.clone(),
                    );
                    let effect = GameStartEffect {
                        snapshot: GameSnapshot::from(&session),
                        session_id: session.id(),
                        seat_one: opponent,
                        seat_two: SeatOccupant::Human(player.clone()),
                        created_at: session.created_at(),
                    };
                    state.registry.insert(session);
                    state.stats.players_queued += 1;
                    state.stats.games_started += 1;
                    self.metrics.record_game_started(false);
                    self.metrics.set_players_waiting(state.queue.len());
                    JoinEffect::Started(effect)
                }
            }
        };

        match effect {
            JoinEffect::Noop => Ok(()),
            JoinEffect::Enqueued => {
                info!("Player '{}' waiting for an opponent", player);
                self.spawn_player_upsert(player.clone());
                self.notify(
                    &player,
                    ServerEvent::WaitingForOpponent {
                        message: "Waiting for opponent...".to_string(),
                    },
                )
                .await;
                Ok(())
            }
            JoinEffect::Started(effect) => {
                info!(
                    "Matched '{}' with '{}' in game {}",
                    effect.seat_one, player, effect.session_id
                );
                self.spawn_player_upsert(player.clone());
                self.announce_game_started(&effect).await;
                Ok(())
            }
        }
    }

    /// Fired by the bot-match deadline: if the entry is still queued,
    /// convert it into a session against the bot.
    async fn bot_match_deadline(&self, player: PlayerId, token: Uuid) {
        let effect = {
            let mut state = self.lock();

            match state.pending_bot_matches.get(&player) {
                Some(pending) if pending.token == token => {
                    state.pending_bot_matches.remove(&player);
                }
                // Matched or re-armed in the meantime
                _ => return,
            }
            if !state.queue.remove(&player) {
                return;
            }

            let session = Session::new_vs_bot(generate_session_id(), player.clone());
            let effect = GameStartEffect {
                snapshot: GameSnapshot::from(&session),
                session_id: session.id(),
                seat_one: player.clone(),
                seat_two: SeatOccupant::Bot,
                created_at: session.created_at(),
            };
            state.registry.insert(session);
            state.stats.games_started += 1;
            self.metrics.record_game_started(true);
            self.metrics.set_players_waiting(state.queue.len());
            effect
        };

        info!(
            "No opponent for '{}' within the match window; starting bot game {}",
            player, effect.session_id
        );
        self.announce_game_started(&effect).await;
    }

    /// Validate and apply a human move
    pub async fn make_move(
        &self,
        player: PlayerId,
        session_id: SessionId,
        column: usize,
    ) -> Result<()> {
        let started = Instant::now();

        let effect = {
            let mut state = self.lock();
            let result = Self::apply_seat_move(&mut state, &session_id, |session| {
                let seat = session
                    .seat_of(&player)
                    .ok_or(GameServerError::NotYourTurn)?;
                session.apply_move(seat, column)
            });
            match result {
                Ok(effect) => effect,
                Err(err) => {
                    self.metrics.record_move_rejected();
                    return Err(err);
                }
            }
        };

        self.metrics.record_move(false, started.elapsed());
        self.deliver_move_effect(&session_id, player.clone(), effect)
            .await;
        Ok(())
    }

    /// Fired by the bot-think clock. Re-validates session state before
    /// acting; the game may have ended or been forfeited meanwhile.
    async fn apply_bot_move(&self, session_id: SessionId, token: Uuid) {
        let started = Instant::now();

        let effect = {
            let mut state = self.lock();
            if !state.registry.claim_bot_clock(&session_id, token) {
                return;
            }
            let strategist = self.strategist;
            let result = Self::apply_seat_move(&mut state, &session_id, |session| {
                if !session.vs_bot() || session.turn() != Seat::Two {
                    return Err(GameServerError::NotYourTurn.into());
                }
                let column = strategist
                    .choose_column(session.board_mut(), Seat::Two.disc())
                    .ok_or(GameServerError::InternalError {
                        message: "Bot has no legal move on a non-full board".to_string(),
                    })?;
                session.apply_move(Seat::Two, column)
            });
            match result {
                Ok(effect) => effect,
                Err(err) => {
                    // The session ended or changed hands before the clock
                    // fired; nothing to do.
                    debug!("Scheduled bot move for {} skipped: {}", session_id, err);
                    return;
                }
            }
        };

        self.metrics.record_move(true, started.elapsed());
        self.deliver_move_effect(&session_id, SeatOccupant::Bot.to_string(), effect)
            .await;
    }

    /// Shared placement path for human and bot moves. Must be called with
    /// the state lock held; computes the effect without performing I/O.
    fn apply_seat_move(
        state: &mut CoreState,
        session_id: &SessionId,
        mover: impl FnOnce(&mut Session) -> Result<MoveOutcome>,
    ) -> Result<MoveEffect> {
        let session = state
            .registry
            .get_mut(session_id)
            .ok_or_else(|| GameServerError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;

        let outcome = mover(session)?;
        let recipients = session.human_players();
        let board = session.board().rows();

        let effect = match &outcome.progress {
            MoveProgress::NextTurn(next_seat) => {
                let next = session.occupant(*next_seat);
                MoveEffect {
                    recipients,
                    row: outcome.row,
                    column: outcome.column,
                    disc: outcome.disc,
                    board,
                    next: Some(next),
                    ended: None,
                }
            }
            MoveProgress::Won(end) | MoveProgress::Draw(end) => {
                let end = end.clone();
                let finalized = state
                    .registry
                    .remove(session_id)
                    .expect("session present for removal");
                state.stats.games_completed += 1;
                MoveEffect {
                    recipients,
                    row: outcome.row,
                    column: outcome.column,
                    disc: outcome.disc,
                    board,
                    next: None,
                    ended: Some((finalized, end)),
                }
            }
        };
        Ok(effect)
    }

    /// Deliver a computed move effect: notifications, timers, and
    /// fire-and-forget collaborator calls.
    async fn deliver_move_effect(
        &self,
        session_id: &SessionId,
        mover_display: String,
        effect: MoveEffect,
    ) {
        match effect.ended {
            None => {
                let next = effect.next.clone().expect("continuation carries next turn");
                for player in &effect.recipients {
                    self.notify(
                        player,
                        ServerEvent::MoveMade {
                            row: effect.row,
                            column: effect.column,
                            color: effect.disc,
                            next_turn: next.to_string(),
                            board: effect.board.clone(),
                        },
                    )
                    .await;
                }
                self.spawn_analytics(AnalyticsEvent::MoveMade {
                    game_id: *session_id,
                    player: mover_display,
                    column: effect.column,
                    row: effect.row,
                    color: effect.disc,
                });

                // Hand the turn to the bot after the think delay
                if next.is_bot() {
                    self.arm_bot_clock(*session_id);
                }
            }
            Some((finalized, end)) => {
                self.metrics.record_game_ended(end.win_kind);
                info!(
                    "Game {} ended: winner {:?} by {:?} after {}s",
                    session_id, end.winner, end.win_kind, end.duration_secs
                );
                for player in &effect.recipients {
                    self.notify(
                        player,
                        ServerEvent::GameEnded {
                            winner: end.winner.as_ref().map(ToString::to_string),
                            win_type: end.win_kind,
                            board: effect.board.clone(),
                            duration: end.duration_secs,
                            winning_cells: end.winning_cells.clone(),
                        },
                    )
                    .await;
                }
                self.spawn_finalization(finalized, end);
            }
        }
    }

    /// Channel loss for a player: drop any queue entry and, if they are
    /// in an Active session, arm the forfeiture grace timer.
    pub async fn handle_disconnect(&self, player: PlayerId) {
        let mut state = self.lock();

        if state.queue.remove(&player) {
            self.metrics.set_players_waiting(state.queue.len());
        }
        if let Some(pending) = state.pending_bot_matches.remove(&player) {
            pending.handle.abort();
        }

        let session_id = match state.registry.session_id_for(&player) {
            Some(id) if state.registry.get(&id).is_some_and(Session::is_active) => id,
            _ => return,
        };

        let token = Uuid::new_v4();
        let handle = self.spawn_grace_deadline(player.clone(), session_id, token);
        state
            .registry
            .arm_grace_timer(player.clone(), session_id, token, handle);
        info!(
            "Player '{}' disconnected from game {}; grace timer armed",
            player, session_id
        );
    }

    /// Fired by the grace timer: forfeit the session in favor of the
    /// other seat. A stale token or already-ended session is a no-op.
    async fn grace_expired(&self, player: PlayerId, session_id: SessionId, token: Uuid) {
        let (recipients, board, finalized, end) = {
            let mut state = self.lock();
            if !state.registry.claim_grace_timer(&player, &session_id, token) {
                return;
            }
            let session = match state.registry.get_mut(&session_id) {
                Some(session) if session.is_active() => session,
                _ => return,
            };
            let seat = match session.seat_of(&player) {
                Some(seat) => seat,
                None => return,
            };

            let end = session.forfeit(seat);
            let board = session.board().rows();
            let recipients = session.human_players();
            let finalized = state
                .registry
                .remove(&session_id)
                .expect("session present for removal");
            state.stats.games_forfeited += 1;
            self.metrics.record_game_ended(end.win_kind);
            (recipients, board, finalized, end)
        };

        warn!(
            "Grace window expired for '{}'; game {} forfeited",
            player, session_id
        );
        for recipient in &recipients {
            self.notify(
                recipient,
                ServerEvent::GameEnded {
                    winner: end.winner.as_ref().map(ToString::to_string),
                    win_type: end.win_kind,
                    board: board.clone(),
                    duration: end.duration_secs,
                    winning_cells: Vec::new(),
                },
            )
            .await;
        }
        self.spawn_finalization(finalized, end);
    }

    /// Reconnect within the grace window: cancel the pending forfeiture
    /// and hand back the current session snapshot. Anything else is
    /// rejected without side effects.
    pub async fn reconnect(&self, player: PlayerId, session_id: SessionId) -> Result<()> {
        let (snapshot, player_number) = {
            let mut state = self.lock();

            let timer = state.registry.take_grace_timer(&player, &session_id);
            let timer = match timer {
                Some(timer) => timer,
                None => {
                    self.metrics.record_reconnect(false);
                    return Err(GameServerError::ReconnectRejected {
                        reason: "No pending reconnect for this game".to_string(),
                    }
                    .into());
                }
            };
            timer.cancel();

            let session = state.registry.get(&session_id).ok_or_else(|| {
                GameServerError::ReconnectRejected {
                    reason: "Game no longer exists".to_string(),
                }
            })?;
            let seat = session
                .seat_of(&player)
                .ok_or_else(|| GameServerError::ReconnectRejected {
                    reason: "Player is not part of this game".to_string(),
                })?;

            self.metrics.record_reconnect(true);
            (GameSnapshot::from(session), seat.number())
        };

        info!("Player '{}' reconnected to game {}", player, session_id);
        self.notify(
            &player,
            ServerEvent::GameReconnected {
                game: snapshot,
                player_number,
            },
        )
        .await;
        Ok(())
    }

    /// Arm the bot-think clock for a session. The handle is registered
    /// while the state lock is held: a fired task must take that lock to
    /// claim its token, so the token is always armed before the claim
    /// even with a zero think delay.
    fn arm_bot_clock(&self, session_id: SessionId) {
        let token = Uuid::new_v4();
        let engine = self.clone();
        let delay = self.timing.bot_think_delay();
        let mut state = self.lock();
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            engine.apply_bot_move(session_id, token).await;
        });
        state.registry.arm_bot_clock(session_id, token, handle);
    }

    fn spawn_bot_match_deadline(&self, player: PlayerId, token: Uuid) -> JoinHandle<()> {
        let engine = self.clone();
        let delay = self.timing.bot_match_delay();
        tokio::spawn(async move {
            sleep(delay).await;
            engine.bot_match_deadline(player, token).await;
        })
    }

    fn spawn_grace_deadline(
        &self,
        player: PlayerId,
        session_id: SessionId,
        token: Uuid,
    ) -> JoinHandle<()> {
        let engine = self.clone();
        let delay = self.timing.grace_period();
        tokio::spawn(async move {
            sleep(delay).await;
            engine.grace_expired(player, session_id, token).await;
        })
    }

    async fn announce_game_started(&self, effect: &GameStartEffect) {
        self.notify(
            &effect.seat_one,
            ServerEvent::GameStarted {
                game: effect.snapshot.clone(),
                player_number: Seat::One.number(),
                color: Seat::One.disc(),
                opponent: effect.seat_two.to_string(),
            },
        )
        .await;
        if let SeatOccupant::Human(second) = &effect.seat_two {
            self.notify(
                second,
                ServerEvent::GameStarted {
                    game: effect.snapshot.clone(),
                    player_number: Seat::Two.number(),
                    color: Seat::Two.disc(),
                    opponent: effect.seat_one.clone(),
                },
            )
            .await;
        }

        let record = GameRecord {
            id: effect.session_id,
            player_one: effect.seat_one.clone(),
            player_two: effect.seat_two.to_string(),
            vs_bot: effect.seat_two.is_bot(),
            status: SessionStatus::Active,
            winner: None,
            win_kind: None,
            duration_secs: None,
            created_at: effect.created_at,
            completed_at: None,
        };
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.record_game_started(record).await {
                warn!("Failed to persist game start: {}", e);
            }
        });
        self.spawn_analytics(AnalyticsEvent::GameStarted {
            game_id: effect.session_id,
            player_one: effect.seat_one.clone(),
            player_two: effect.seat_two.to_string(),
            vs_bot: effect.seat_two.is_bot(),
        });
    }

    /// Persist the terminal state of a session and bump tallies; all
    /// best-effort off the mutation path.
    fn spawn_finalization(&self, session: Session, end: SessionOutcome) {
        let store = self.store.clone();
        let analytics = self.analytics.clone();
        tokio::spawn(async move {
            let winner_display = end.winner.as_ref().map(ToString::to_string);
            if let Err(e) = store
                .finalize_game(
                    session.id(),
                    session.status(),
                    winner_display.clone(),
                    end.win_kind,
                    end.duration_secs,
                )
                .await
            {
                warn!("Failed to finalize game record {}: {}", session.id(), e);
            }

            let results = tally_results(&session, &end);
            for (username, result) in &results {
                if let Err(e) = store.record_result(username, *result).await {
                    warn!("Failed to record result for '{}': {}", username, e);
                }
            }

            let loser_display = match &end.winner {
                Some(winner) => {
                    let loser_seat = if session.occupant(Seat::One) == *winner {
                        Seat::Two
                    } else {
                        Seat::One
                    };
                    Some(session.occupant(loser_seat).to_string())
                }
                None => None,
            };
            let event = AnalyticsEvent::GameEnded {
                game_id: session.id(),
                winner: winner_display,
                loser: loser_display,
                win_type: end.win_kind,
                duration: end.duration_secs,
                vs_bot: session.vs_bot(),
            };
            if let Err(e) = analytics.publish(event).await {
                debug!("Analytics publish failed: {}", e);
            }
        });
    }

    /// Create the player record on first sighting, best-effort
    fn spawn_player_upsert(&self, username: PlayerId) {
        let store = self.store.clone();
        let analytics = self.analytics.clone();
        tokio::spawn(async move {
            match store.find_or_create_player(&username).await {
                Ok((_, true)) => {
                    let event = AnalyticsEvent::PlayerCreated {
                        username: username.clone(),
                    };
                    if let Err(e) = analytics.publish(event).await {
                        debug!("Analytics publish failed: {}", e);
                    }
                }
                Ok((_, false)) => {}
                Err(e) => warn!("Failed to upsert player '{}': {}", username, e),
            }
        });
    }

    fn spawn_analytics(&self, event: AnalyticsEvent) {
        let analytics = self.analytics.clone();
        tokio::spawn(async move {
            if let Err(e) = analytics.publish(event).await {
                debug!("Analytics publish failed: {}", e);
            }
        });
    }

    async fn notify(&self, player: &PlayerId, event: ServerEvent) {
        if let Err(e) = self.notifier.send(player, event).await {
            warn!("Failed to notify '{}': {}", player, e);
        }
    }
}

/// Win/loss/draw tallies owed to human players for a terminal session
fn tally_results(session: &Session, end: &SessionOutcome) -> Vec<(String, PlayerResult)> {
    let mut results = Vec::new();
    match &end.winner {
        None => {
            for player in session.human_players() {
                results.push((player, PlayerResult::Draw));
            }
        }
        Some(winner) => {
            for seat in [Seat::One, Seat::Two] {
                let occupant = session.occupant(seat);
                if let SeatOccupant::Human(username) = occupant {
                    let result = if &SeatOccupant::Human(username.clone()) == winner {
                        PlayerResult::Win
                    } else {
                        PlayerResult::Loss
                    };
                    results.push((username, result));
                }
            }
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::analytics::NullAnalyticsSink;
    use crate::storage::persistence::InMemoryGameStore;
    use crate::types::WinKind;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Notifier that records every delivered event for assertions
    #[derive(Debug, Default)]
    struct RecordingNotifier {
        events: Mutex<Vec<(PlayerId, ServerEvent)>>,
    }

    impl RecordingNotifier {
        fn events_for(&self, player: &str) -> Vec<ServerEvent> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|(p, _)| p == player)
                .map(|(_, e)| e.clone())
                .collect()
        }

        fn last_for(&self, player: &str) -> Option<ServerEvent> {
            self.events_for(player).into_iter().last()
        }
    }

    #[async_trait]
    impl ClientNotifier for RecordingNotifier {
        async fn send(&self, player: &PlayerId, event: ServerEvent) -> Result<()> {
            self.events.lock().unwrap().push((player.clone(), event));
            Ok(())
        }
    }

    struct TestRig {
        engine: SessionEngine,
        notifier: Arc<RecordingNotifier>,
        store: Arc<InMemoryGameStore>,
    }

    fn test_rig() -> TestRig {
        test_rig_with_timing(TimingSettings::default())
    }

    fn test_rig_with_timing(timing: TimingSettings) -> TestRig {
        let notifier = Arc::new(RecordingNotifier::default());
        let store = Arc::new(InMemoryGameStore::new());
        let engine = SessionEngine::new(
            notifier.clone(),
            store.clone(),
            Arc::new(NullAnalyticsSink::new()),
            MetricsCollector::new().unwrap(),
            timing,
        );
        TestRig {
            engine,
            notifier,
            store,
        }
    }

    /// Let spawned fire-and-forget tasks run to completion
    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    fn started_game_id(event: &ServerEvent) -> SessionId {
        match event {
            ServerEvent::GameStarted { game, .. } => game.id,
            other => panic!("expected game_started, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_joins_pair_immediately() {
        let rig = test_rig();
        rig.engine.join("alice".to_string()).await.unwrap();
        rig.engine.join("bob".to_string()).await.unwrap();

        // First arrival took seat one
        let alice_events = rig.notifier.events_for("alice");
        assert!(matches!(
            alice_events[0],
            ServerEvent::WaitingForOpponent { .. }
        ));
        match &alice_events[1] {
            ServerEvent::GameStarted {
                player_number,
                color,
                opponent,
                ..
            } => {
                assert_eq!(*player_number, 1);
                assert_eq!(*color, Disc::Red);
                assert_eq!(opponent, "bob");
            }
            other => panic!("expected game_started, got {:?}", other),
        }
        match rig.notifier.last_for("bob").unwrap() {
            ServerEvent::GameStarted {
                player_number,
                color,
                opponent,
                ..
            } => {
                assert_eq!(player_number, 2);
                assert_eq!(color, Disc::Yellow);
                assert_eq!(opponent, "alice");
            }
            other => panic!("expected game_started, got {:?}", other),
        }

        let stats = rig.engine.stats();
        assert_eq!(stats.games_started, 1);
        assert_eq!(stats.active_sessions, 1);
        assert_eq!(stats.players_waiting, 0);

        // No bot timer fires later
        sleep(Duration::from_secs(60)).await;
        assert_eq!(rig.engine.stats().games_started, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lone_join_gets_bot_after_deadline() {
        let rig = test_rig();
        rig.engine.join("alice".to_string()).await.unwrap();
        assert_eq!(rig.engine.stats().players_waiting, 1);

        sleep(Duration::from_secs(31)).await;

        match rig.notifier.last_for("alice").unwrap() {
            ServerEvent::GameStarted {
                player_number,
                opponent,
                ..
            } => {
                assert_eq!(player_number, 1);
                assert_eq!(opponent, "bot");
            }
            other => panic!("expected game_started, got {:?}", other),
        }
        let stats = rig.engine.stats();
        assert_eq!(stats.players_waiting, 0);
        assert_eq!(stats.active_sessions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_join_is_noop() {
        let rig = test_rig();
        rig.engine.join("alice".to_string()).await.unwrap();
        rig.engine.join("alice".to_string()).await.unwrap();
        assert_eq!(rig.engine.stats().players_waiting, 1);
        // Only one waiting message was sent
        assert_eq!(rig.notifier.events_for("alice").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_username_rejected() {
        let rig = test_rig();
        assert!(rig.engine.join(String::new()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_move_alternates_and_broadcasts() {
        let rig = test_rig();
        rig.engine.join("alice".to_string()).await.unwrap();
        rig.engine.join("bob".to_string()).await.unwrap();
        let game_id = started_game_id(&rig.notifier.last_for("bob").unwrap());

        rig.engine
            .make_move("alice".to_string(), game_id, 3)
            .await
            .unwrap();

        for player in ["alice", "bob"] {
            match rig.notifier.last_for(player).unwrap() {
                ServerEvent::MoveMade {
                    row,
                    column,
                    color,
                    next_turn,
                    ..
                } => {
                    assert_eq!(row, 5);
                    assert_eq!(column, 3);
                    assert_eq!(color, Disc::Red);
                    assert_eq!(next_turn, "bob");
                }
                other => panic!("expected move_made, got {:?}", other),
            }
        }

        // Alice cannot move twice in a row
        let err = rig
            .engine
            .make_move("alice".to_string(), game_id, 3)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GameServerError>(),
            Some(GameServerError::NotYourTurn)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_win_ends_game_and_persists() {
        let rig = test_rig();
        rig.engine.join("alice".to_string()).await.unwrap();
        rig.engine.join("bob".to_string()).await.unwrap();
        let game_id = started_game_id(&rig.notifier.last_for("bob").unwrap());

        // Alice stacks column 0; Bob plays far away
        for bob_col in [4, 5, 6] {
            rig.engine
                .make_move("alice".to_string(), game_id, 0)
                .await
                .unwrap();
            rig.engine
                .make_move("bob".to_string(), game_id, bob_col)
                .await
                .unwrap();
        }
        rig.engine
            .make_move("alice".to_string(), game_id, 0)
            .await
            .unwrap();

        match rig.notifier.last_for("bob").unwrap() {
            ServerEvent::GameEnded {
                winner,
                win_type,
                winning_cells,
                ..
            } => {
                assert_eq!(winner.as_deref(), Some("alice"));
                assert_eq!(win_type, WinKind::Vertical);
                assert_eq!(winning_cells.len(), 4);
            }
            other => panic!("expected game_ended, got {:?}", other),
        }

        // Session removed; further moves rejected as unknown
        let err = rig
            .engine
            .make_move("bob".to_string(), game_id, 0)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GameServerError>(),
            Some(GameServerError::SessionNotFound { .. })
        ));

        settle().await;
        let record = rig.store.get_game(&game_id).await.unwrap().unwrap();
        assert_eq!(record.status, SessionStatus::Completed);
        assert_eq!(record.winner.as_deref(), Some("alice"));
        assert_eq!(
            rig.store
                .get_player("alice")
                .await
                .unwrap()
                .unwrap()
                .games_won,
            1
        );
        assert_eq!(
            rig.store.get_player("bob").await.unwrap().unwrap().games_lost,
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_bot_replies_after_think_delay() {
        let rig = test_rig();
        rig.engine.join("alice".to_string()).await.unwrap();
        sleep(Duration::from_secs(31)).await;
        let game_id = started_game_id(&rig.notifier.last_for("alice").unwrap());

        rig.engine
            .make_move("alice".to_string(), game_id, 3)
            .await
            .unwrap();
        // Bot has not moved yet
        match rig.notifier.last_for("alice").unwrap() {
            ServerEvent::MoveMade { color, next_turn, .. } => {
                assert_eq!(color, Disc::Red);
                assert_eq!(next_turn, "bot");
            }
            other => panic!("expected move_made, got {:?}", other),
        }

        sleep(Duration::from_millis(600)).await;

        match rig.notifier.last_for("alice").unwrap() {
            ServerEvent::MoveMade { color, next_turn, .. } => {
                assert_eq!(color, Disc::Yellow);
                assert_eq!(next_turn, "alice");
            }
            other => panic!("expected bot move_made, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_bot_moves_even_with_zero_think_delay() {
        // A think clock that is due the instant it is spawned must still
        // find its token armed; a dropped claim would stall the game on
        // the bot's turn with no retry.
        let rig = test_rig_with_timing(TimingSettings {
            bot_think_delay_ms: 0,
            ..TimingSettings::default()
        });
        rig.engine.join("alice".to_string()).await.unwrap();
        sleep(Duration::from_secs(31)).await;
        let game_id = started_game_id(&rig.notifier.last_for("alice").unwrap());

        rig.engine
            .make_move("alice".to_string(), game_id, 3)
            .await
            .unwrap();
        settle().await;

        match rig.notifier.last_for("alice").unwrap() {
            ServerEvent::MoveMade { color, next_turn, .. } => {
                assert_eq!(color, Disc::Yellow);
                assert_eq!(next_turn, "alice");
            }
            other => panic!("expected bot move_made, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_moving_in_unknown_game_rejected() {
        let rig = test_rig();
        let err = rig
            .engine
            .make_move("alice".to_string(), generate_session_id(), 0)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GameServerError>(),
            Some(GameServerError::SessionNotFound { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_within_grace_restores_session() {
        let rig = test_rig();
        rig.engine.join("alice".to_string()).await.unwrap();
        rig.engine.join("bob".to_string()).await.unwrap();
        let game_id = started_game_id(&rig.notifier.last_for("bob").unwrap());
        rig.engine
            .make_move("alice".to_string(), game_id, 2)
            .await
            .unwrap();

        rig.engine.handle_disconnect("bob".to_string()).await;
        sleep(Duration::from_secs(10)).await;

        rig.engine
            .reconnect("bob".to_string(), game_id)
            .await
            .unwrap();

        match rig.notifier.last_for("bob").unwrap() {
            ServerEvent::GameReconnected {
                game,
                player_number,
            } => {
                assert_eq!(player_number, 2);
                assert_eq!(game.id, game_id);
                assert_eq!(game.current_turn, "bob");
                assert_eq!(game.board[5][2], Some(Disc::Red));
                assert_eq!(game.status, SessionStatus::Active);
            }
            other => panic!("expected game_reconnected, got {:?}", other),
        }

        // Grace timer was cancelled; the game survives past the window
        sleep(Duration::from_secs(60)).await;
        assert_eq!(rig.engine.stats().active_sessions, 1);
        assert_eq!(rig.engine.stats().games_forfeited, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_expiry_forfeits_and_rejects_late_reconnect() {
        let rig = test_rig();
        rig.engine.join("alice".to_string()).await.unwrap();
        rig.engine.join("bob".to_string()).await.unwrap();
        let game_id = started_game_id(&rig.notifier.last_for("bob").unwrap());

        rig.engine.handle_disconnect("bob".to_string()).await;
        sleep(Duration::from_secs(31)).await;

        // Alice already holds the win by forfeiture
        match rig.notifier.last_for("alice").unwrap() {
            ServerEvent::GameEnded {
                winner, win_type, ..
            } => {
                assert_eq!(winner.as_deref(), Some("alice"));
                assert_eq!(win_type, WinKind::Forfeit);
            }
            other => panic!("expected game_ended, got {:?}", other),
        }
        assert_eq!(rig.engine.stats().games_forfeited, 1);
        assert_eq!(rig.engine.stats().active_sessions, 0);

        // Late reconnect fails without side effects
        let err = rig
            .engine
            .reconnect("bob".to_string(), game_id)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GameServerError>(),
            Some(GameServerError::ReconnectRejected { .. })
        ));

        settle().await;
        let record = rig.store.get_game(&game_id).await.unwrap().unwrap();
        assert_eq!(record.status, SessionStatus::Forfeited);
        assert_eq!(record.winner.as_deref(), Some("alice"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_while_queued_cancels_bot_match() {
        let rig = test_rig();
        rig.engine.join("alice".to_string()).await.unwrap();
        rig.engine.handle_disconnect("alice".to_string()).await;

        sleep(Duration::from_secs(60)).await;
        let stats = rig.engine.stats();
        assert_eq!(stats.players_waiting, 0);
        assert_eq!(stats.games_started, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_with_wrong_session_rejected() {
        let rig = test_rig();
        rig.engine.join("alice".to_string()).await.unwrap();
        rig.engine.join("bob".to_string()).await.unwrap();

        rig.engine.handle_disconnect("bob".to_string()).await;
        let err = rig
            .engine
            .reconnect("bob".to_string(), generate_session_id())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GameServerError>(),
            Some(GameServerError::ReconnectRejected { .. })
        ));
    }
}
