//! Metrics collection using Prometheus

use crate::types::WinKind;
use anyhow::Result;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;
use std::time::Duration;

/// Prometheus metrics for the session engine
#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,

    /// Total games started, labeled by opponent kind (human/bot)
    pub games_started_total: IntCounterVec,
    /// Total games ended, labeled by result (win/draw/forfeit)
    pub games_ended_total: IntCounterVec,
    /// Total accepted moves, labeled by mover kind (human/bot)
    pub moves_total: IntCounterVec,
    /// Rejected move attempts
    pub moves_rejected_total: IntCounter,
    /// Reconnect attempts, labeled by outcome (restored/rejected)
    pub reconnects_total: IntCounterVec,
    /// Sessions currently in flight
    pub active_sessions: IntGauge,
    /// Players currently waiting in the matchmaking queue
    pub players_waiting: IntGauge,
    /// Move processing latency
    pub move_processing_seconds: Histogram,
}

impl MetricsCollector {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let games_started_total = IntCounterVec::new(
            Opts::new("games_started_total", "Total games started"),
            &["opponent"],
        )?;
        let games_ended_total = IntCounterVec::new(
            Opts::new("games_ended_total", "Total games ended"),
            &["result"],
        )?;
        let moves_total = IntCounterVec::new(
            Opts::new("moves_total", "Total accepted moves"),
            &["mover"],
        )?;
        let moves_rejected_total =
            IntCounter::new("moves_rejected_total", "Rejected move attempts")?;
        let reconnects_total = IntCounterVec::new(
            Opts::new("reconnects_total", "Reconnect attempts"),
            &["outcome"],
        )?;
        let active_sessions = IntGauge::new("active_sessions", "Sessions currently in flight")?;
        let players_waiting =
            IntGauge::new("players_waiting", "Players waiting in the matchmaking queue")?;
        let move_processing_seconds = Histogram::with_opts(HistogramOpts::new(
            "move_processing_seconds",
            "Move processing latency in seconds",
        ))?;

        registry.register(Box::new(games_started_total.clone()))?;
        registry.register(Box::new(games_ended_total.clone()))?;
        registry.register(Box::new(moves_total.clone()))?;
        registry.register(Box::new(moves_rejected_total.clone()))?;
        registry.register(Box::new(reconnects_total.clone()))?;
        registry.register(Box::new(active_sessions.clone()))?;
        registry.register(Box::new(players_waiting.clone()))?;
        registry.register(Box::new(move_processing_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            games_started_total,
            games_ended_total,
            moves_total,
            moves_rejected_total,
            reconnects_total,
            active_sessions,
            players_waiting,
            move_processing_seconds,
        })
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn record_game_started(&self, vs_bot: bool) {
        let opponent = if vs_bot { "bot" } else { "human" };
        self.games_started_total.with_label_values(&[opponent]).inc();
        self.active_sessions.inc();
    }

    pub fn record_game_ended(&self, kind: WinKind) {
        let result = match kind {
            WinKind::Draw => "draw",
            WinKind::Forfeit => "forfeit",
            _ => "win",
        };
        self.games_ended_total.with_label_values(&[result]).inc();
        self.active_sessions.dec();
    }

    pub fn record_move(&self, by_bot: bool, elapsed: Duration) {
        let mover = if by_bot { "bot" } else { "human" };
        self.moves_total.with_label_values(&[mover]).inc();
        self.move_processing_seconds.observe(elapsed.as_secs_f64());
    }

    pub fn record_move_rejected(&self) {
        self.moves_rejected_total.inc();
    }

    pub fn record_reconnect(&self, restored: bool) {
        let outcome = if restored { "restored" } else { "rejected" };
        self.reconnects_total.with_label_values(&[outcome]).inc();
    }

    pub fn set_players_waiting(&self, count: usize) {
        self.players_waiting.set(count as i64);
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        // Registration against a fresh registry cannot fail with these
        // metric definitions.
        Self::new().expect("metrics registration failed")
    }
}
