//! Terminal detection and the one-shot attempt record.

use crate::domain::state::{
    AttemptLogEntry, AttemptReason, AttemptStats, Phase, PlayerActivity, RunStats, ShipState,
    TeamPerformance,
};

/// Health at or below this counts as a lost hull.
pub const DEAD_HEALTH: f64 = 1.0;
pub const OVERFLOW_WATER: f64 = 99.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Terminate(AttemptReason),
}

/// Terminal checks in priority order: hull, flooding, arrival, clock.
pub fn evaluate(ship: &ShipState, elapsed_ms: i64, duration_ms: i64) -> TickOutcome {
    if ship.health <= DEAD_HEALTH {
        TickOutcome::Terminate(AttemptReason::Dead)
    } else if ship.water >= OVERFLOW_WATER {
        TickOutcome::Terminate(AttemptReason::Overflow)
    } else if ship.distance_remaining <= 0.0 {
        TickOutcome::Terminate(AttemptReason::Success)
    } else if elapsed_ms >= duration_ms {
        TickOutcome::Terminate(AttemptReason::Timeout)
    } else {
        TickOutcome::Continue
    }
}

/// Ends the run and appends exactly one log entry. A finished ship is left
/// untouched; returns whether an entry was written.
pub fn finalize(ship: &mut ShipState, reason: AttemptReason, now_ms: i64) -> bool {
    if ship.phase == Phase::Finished {
        return false;
    }

    let started_at = if ship.start_timestamp != 0 {
        ship.start_timestamp
    } else {
        now_ms
    };
    let stats = ship.current_attempt_stats.take().unwrap_or_else(|| RunStats {
        max_water: ship.water,
        min_health: ship.health,
        coop_score_sum: ship.coop_score,
        coop_samples: 1,
        ..RunStats::new(started_at)
    });

    let most_active = stats
        .player_actions
        .values()
        .fold(None, |best: Option<&PlayerActivity>, current| {
            if current.actions > best.map_or(0, |b| b.actions) {
                Some(current)
            } else {
                best
            }
        })
        .map_or_else(|| "N/A".to_string(), |p| p.display_name.clone());

    let avg_coop_score = if stats.coop_samples > 0 {
        stats.coop_score_sum / f64::from(stats.coop_samples)
    } else {
        ship.coop_score
    };

    ship.attempt_log.push(AttemptLogEntry {
        at: started_at,
        finished_at: now_ms,
        dist_left: if reason == AttemptReason::Success {
            0.0
        } else {
            ship.distance_remaining
        },
        reason,
        stats: AttemptStats {
            max_water: stats.max_water,
            min_health: stats.min_health,
            avg_coop_score,
            active_players: stats.player_actions.len() as u32,
            end_health: ship.health,
            end_water: ship.water,
            duration_ms: (now_ms - stats.start_time).max(0),
        },
        team_perf: TeamPerformance {
            best_responder: most_active.clone(),
            most_active,
            total_switches: 0,
        },
    });

    ship.phase = Phase::Finished;
    ship.end_timestamp = now_ms;
    ship.attempts = ship.attempt_log.len() as u32;
    true
}
