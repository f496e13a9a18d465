//! Shared fixtures for integration tests
//!
//! Recording implementations of the engine's collaborator traits so
//! tests can assert on everything the service tells the outside world.

use async_trait::async_trait;
use fourline::config::TimingSettings;
use fourline::gateway::messages::ServerEvent;
use fourline::metrics::MetricsCollector;
use fourline::session::SessionEngine;
use fourline::storage::{AnalyticsEvent, AnalyticsSink, InMemoryGameStore};
use fourline::types::PlayerId;
use fourline::{ClientNotifier, Result};
use std::sync::{Arc, Mutex};

/// Notifier that records every event delivered to every player
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<(PlayerId, ServerEvent)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events delivered to one player, in delivery order
    pub fn events_for(&self, player: &str) -> Vec<ServerEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == player)
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn last_for(&self, player: &str) -> Option<ServerEvent> {
        self.events_for(player).into_iter().last()
    }

    pub fn total_delivered(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

#[async_trait]
impl ClientNotifier for RecordingNotifier {
    async fn send(&self, player: &PlayerId, event: ServerEvent) -> Result<()> {
        self.events.lock().unwrap().push((player.clone(), event));
        Ok(())
    }
}

/// Analytics sink that records every published event
#[derive(Debug, Default)]
pub struct RecordingAnalyticsSink {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl RecordingAnalyticsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count_events_of_type(&self, name: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.name() == name)
            .count()
    }
}

#[async_trait]
impl AnalyticsSink for RecordingAnalyticsSink {
    async fn publish(&self, event: AnalyticsEvent) -> Result<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// A complete system wired with recording collaborators
pub struct TestSystem {
    pub engine: SessionEngine,
    pub notifier: Arc<RecordingNotifier>,
    pub store: Arc<InMemoryGameStore>,
    pub analytics: Arc<RecordingAnalyticsSink>,
}

pub fn create_test_system() -> TestSystem {
    create_test_system_with_timing(TimingSettings::default())
}

pub fn create_test_system_with_timing(timing: TimingSettings) -> TestSystem {
    let notifier = Arc::new(RecordingNotifier::new());
    let store = Arc::new(InMemoryGameStore::new());
    let analytics = Arc::new(RecordingAnalyticsSink::new());
    let engine = SessionEngine::new(
        notifier.clone(),
        store.clone(),
        analytics.clone(),
        MetricsCollector::new().expect("Failed to create metrics collector"),
        timing,
    );
    TestSystem {
        engine,
        notifier,
        store,
        analytics,
    }
}

/// Let spawned fire-and-forget collaborator tasks run to completion
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}
