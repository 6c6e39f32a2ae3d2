// Peer host loop: every connection runs it, only the elected host simulates.

use super::types::{TickMetrics, TickReport};
use crate::domain::systems::host::{apply_election, decide};
use crate::domain::systems::{HostDecision, TickClock, TickContext, TickOutcome, advance};
use crate::domain::tuning::ControlTuning;
use crate::domain::{LobbyDocument, Phase, Precondition, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Health at or below which the host warns about the hull.
const CRITICAL_HEALTH: f64 = 5.0;
/// Minimum gap between repeated warnings of one kind, server milliseconds.
const LOG_THROTTLE_MS: i64 = 2_000;

pub struct HostController<D> {
    conn_id: String,
    document: Arc<D>,
    clock: TickClock,
    tuning: ControlTuning,
    metrics: Arc<TickMetrics>,
    last_failure_log: Option<i64>,
    last_critical_log: Option<i64>,
}

impl<D: LobbyDocument> HostController<D> {
    pub fn new(conn_id: String, document: Arc<D>, metrics: Arc<TickMetrics>) -> Self {
        Self {
            conn_id,
            document,
            clock: TickClock::new(),
            tuning: ControlTuning::default(),
            metrics,
            last_failure_log: None,
            last_critical_log: None,
        }
    }

    pub fn conn_id(&self) -> &str {
        &self.conn_id
    }

    /// One fire-and-forget peer tick. Failures are logged and counted; nothing
    /// here is fatal and the next tick starts from whatever the document holds.
    pub async fn tick(&mut self) -> TickReport {
        let snapshot = self.document.snapshot().await;
        match decide(
            &self.conn_id,
            &snapshot.state.host_connection_id,
            &snapshot.presence,
        ) {
            HostDecision::Idle => {
                self.clock.reset();
                TickReport::Idle
            }
            HostDecision::Propose(candidate) => self.propose(candidate).await,
            HostDecision::Run => self.simulate().await,
        }
    }

    async fn propose(&mut self, candidate: String) -> TickReport {
        match self
            .document
            .transact(Precondition::Any, |state, presence| {
                apply_election(state, presence)
            })
            .await
        {
            Ok(changed) => {
                if changed {
                    TickMetrics::bump(&self.metrics.elections);
                    info!(conn_id = %self.conn_id, host = %candidate, "host elected");
                }
                TickReport::Proposed { candidate, changed }
            }
            Err(e) => self.fail(e),
        }
    }

    async fn simulate(&mut self) -> TickReport {
        let now = self.document.server_timestamp();
        let dt = self.clock.sample(now);
        let tuning = self.tuning;

        let result = self
            .document
            .transact(
                Precondition::HostIs(self.conn_id.clone()),
                move |state, presence| {
                    let legend = state.ship.legend_id.config();
                    let ctx = TickContext {
                        now_ms: now,
                        dt,
                        legend,
                        tuning: &tuning,
                    };
                    let outcome = advance(state, presence, &ctx);
                    (outcome, state.ship.phase, state.ship.health)
                },
            )
            .await;

        match result {
            Ok((outcome, phase, health)) => {
                TickMetrics::bump(&self.metrics.simulated);
                if let TickOutcome::Terminate(reason) = outcome {
                    TickMetrics::bump(&self.metrics.finalized);
                    info!(conn_id = %self.conn_id, reason = reason.as_str(), "attempt finalized");
                }
                if phase == Phase::Playing
                    && health <= CRITICAL_HEALTH
                    && throttled(&mut self.last_critical_log, now)
                {
                    warn!(conn_id = %self.conn_id, health, "critical hull health");
                }
                TickReport::Simulated(outcome)
            }
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, error: StoreError) -> TickReport {
        match &error {
            StoreError::HostMismatch { actual, .. } => {
                // Lost the seat between snapshot and commit; the new host owns the ship now.
                TickMetrics::bump(&self.metrics.host_mismatch);
                self.clock.reset();
                debug!(conn_id = %self.conn_id, host = %actual, "stale host tick rejected");
            }
            StoreError::Closed => {
                debug!(conn_id = %self.conn_id, "lobby document closed");
            }
            StoreError::NotJoined(_) => {
                TickMetrics::bump(&self.metrics.failures);
                let now = self.document.server_timestamp();
                if throttled(&mut self.last_failure_log, now) {
                    warn!(conn_id = %self.conn_id, error = %error, "host tick failed");
                }
            }
        }
        TickReport::Failed(error)
    }
}

fn throttled(last: &mut Option<i64>, now: i64) -> bool {
    if last.is_none_or(|at| now - at >= LOG_THROTTLE_MS) {
        *last = Some(now);
        true
    } else {
        false
    }
}

/// Drives a peer's host loop at a fixed rate until shutdown or the document closes.
pub async fn run_peer_loop<D: LobbyDocument>(
    mut controller: HostController<D>,
    tick_interval: Duration,
    shutdown: Arc<Notify>,
) {
    let mut interval = tokio::time::interval(tick_interval);
    // Missed ticks need no catch-up; dt is measured from server time.
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                break;
            }
            _ = interval.tick() => {
                if let TickReport::Failed(StoreError::Closed) = controller.tick().await {
                    break;
                }
            }
        }
    }
    debug!(conn_id = %controller.conn_id(), "peer loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::{LobbyState, Presence};
    use crate::domain::tuning::LegendId;
    use crate::domain::{AttemptReason, PresenceMap};
    use crate::use_cases::test_support::{ManualClock, TestDocument, document_at};

    async fn lobby_with(peers: &[&str]) -> (Arc<TestDocument>, ManualClock) {
        let (document, clock) =
            document_at(LobbyState::new(LegendId::OpenSea, None, 1), 1_000_000);
        for peer in peers {
            document
                .join(peer, Presence::default())
                .await
                .expect("join");
        }
        (document, clock)
    }

    fn controller(
        conn_id: &str,
        document: &Arc<TestDocument>,
        metrics: &Arc<TickMetrics>,
    ) -> HostController<TestDocument> {
        HostController::new(conn_id.to_string(), document.clone(), metrics.clone())
    }

    #[tokio::test]
    async fn smallest_peer_is_elected_then_only_it_simulates() {
        let (document, _) = lobby_with(&["conn-2", "conn-1", "conn-3"]).await;
        let metrics = Arc::new(TickMetrics::default());
        let mut peers: Vec<_> = ["conn-3", "conn-2", "conn-1"]
            .into_iter()
            .map(|id| controller(id, &document, &metrics))
            .collect();

        // The first peer to tick finds the seat empty and proposes the smallest id.
        let report = peers[0].tick().await;
        assert_eq!(
            report,
            TickReport::Proposed {
                candidate: "conn-1".to_string(),
                changed: true,
            }
        );
        assert_eq!(metrics.snapshot().elections, 1);
        assert_eq!(document.snapshot().await.state.host_connection_id, "conn-1");

        // From then on only conn-1 runs the body.
        let mut simulated = Vec::new();
        for _ in 0..2 {
            for peer in &mut peers {
                if let TickReport::Simulated(_) = peer.tick().await {
                    simulated.push(peer.conn_id().to_string());
                }
            }
        }
        assert_eq!(metrics.snapshot().elections, 1);
        assert_eq!(simulated, vec!["conn-1", "conn-1"]);
    }

    #[tokio::test]
    async fn host_failover_happens_on_next_tick() {
        let (document, _) = lobby_with(&["conn-1", "conn-2"]).await;
        let metrics = Arc::new(TickMetrics::default());
        let mut first = controller("conn-1", &document, &metrics);
        let mut second = controller("conn-2", &document, &metrics);

        first.tick().await;
        assert!(matches!(first.tick().await, TickReport::Simulated(_)));

        document.leave("conn-1").await.expect("leave");
        assert!(matches!(
            second.tick().await,
            TickReport::Proposed { changed: true, .. }
        ));
        assert!(matches!(second.tick().await, TickReport::Simulated(_)));
        assert_eq!(first.tick().await, TickReport::Idle);
    }

    #[tokio::test]
    async fn stale_host_write_is_rejected_and_counted() {
        let (document, _) = lobby_with(&["conn-1", "conn-2"]).await;
        let metrics = Arc::new(TickMetrics::default());
        let mut first = controller("conn-1", &document, &metrics);
        first.tick().await;

        // The seat moves underneath conn-1 after it decided to run.
        let result = document
            .transact(Precondition::HostIs("conn-2".to_string()), |_, _| ())
            .await;
        assert!(matches!(result, Err(StoreError::HostMismatch { .. })));

        document
            .transact(Precondition::Any, |state, _| {
                state.host_connection_id = "conn-2".to_string();
            })
            .await
            .expect("handover");
        let report = first.simulate().await;

        assert!(matches!(
            report,
            TickReport::Failed(StoreError::HostMismatch { .. })
        ));
        assert_eq!(metrics.snapshot().host_mismatch, 1);
    }

    #[tokio::test]
    async fn host_ticks_drive_a_countdown_into_play_and_finalize() {
        let (document, clock) = lobby_with(&["conn-1"]).await;
        let metrics = Arc::new(TickMetrics::default());
        let mut host = controller("conn-1", &document, &metrics);
        document
            .transact(Precondition::Any, |state, _| {
                state.ship.phase = Phase::Countdown;
                state.ship.countdown = 0.1;
            })
            .await
            .expect("start countdown");

        host.tick().await;
        for _ in 0..5 {
            clock.advance(50);
            host.tick().await;
        }
        assert_eq!(document.snapshot().await.state.ship.phase, Phase::Playing);

        document
            .transact(Precondition::Any, |state, _| state.ship.health = 0.5)
            .await
            .expect("damage hull");
        clock.advance(50);
        assert_eq!(
            host.tick().await,
            TickReport::Simulated(TickOutcome::Terminate(AttemptReason::Dead))
        );

        let snapshot = document.snapshot().await;
        assert_eq!(snapshot.state.ship.phase, Phase::Finished);
        assert_eq!(snapshot.state.ship.attempt_log.len(), 1);
        assert_eq!(metrics.snapshot().finalized, 1);
    }

    #[tokio::test]
    async fn peer_loop_stops_when_document_closes() {
        let (document, _) = lobby_with(&["conn-1"]).await;
        let metrics = Arc::new(TickMetrics::default());
        let host = controller("conn-1", &document, &metrics);
        let handle = tokio::spawn(run_peer_loop(
            host,
            Duration::from_millis(5),
            Arc::new(Notify::new()),
        ));

        tokio::time::sleep(Duration::from_millis(30)).await;
        document.close().await;
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop should exit")
            .expect("loop task");
        assert!(metrics.snapshot().simulated > 0);
    }

    #[tokio::test]
    async fn empty_presence_never_simulates() {
        let (document, _) = lobby_with(&[]).await;
        let metrics = Arc::new(TickMetrics::default());
        let mut ghost = controller("conn-9", &document, &metrics);
        assert_eq!(ghost.tick().await, TickReport::Idle);
        assert_eq!(document.snapshot().await.presence, PresenceMap::new());
    }
}
