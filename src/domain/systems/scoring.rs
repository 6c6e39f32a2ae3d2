// Cooperation score and per-run statistics.

use super::intents::{ControlSignals, CrewMakeup};
use crate::domain::state::{IntentsByConn, PlayerActivity, PresenceMap, RunStats, ShipState};

/// An intent counts as participation if refreshed within this window.
pub const PARTICIPATION_WINDOW_MS: i64 = 2_000;
pub const COOP_CURVE_INTERVAL_MS: i64 = 1_000;
pub const COOP_CURVE_CAP: usize = 300;

/// Target the cooperation score converges to: participation (up to 50), role
/// diversity (up to 25) and control effectiveness (up to 25).
pub fn coop_target(
    intents: &IntentsByConn,
    presence: &PresenceMap,
    signals: &ControlSignals,
    now_ms: i64,
) -> f64 {
    let crew = CrewMakeup::from_presence(presence);

    let active = presence
        .iter()
        .filter(|(conn_id, p)| {
            p.role.is_some()
                && intents
                    .get(conn_id.as_str())
                    .is_some_and(|i| now_ms - i.updated_at < PARTICIPATION_WINDOW_MS)
        })
        .count();
    let participation = if crew.present > 0 {
        active as f64 / crew.present as f64
    } else {
        0.0
    };

    let diversity = (crew.distinct_roles as f64 * 5.0).min(25.0);
    let trimming = if signals.sail_samples > 0 { 0.5 } else { 0.0 };
    let effectiveness =
        ((signals.bailing + (signals.row_left + signals.row_right) * 0.5 + trimming) * 25.0)
            .min(25.0);

    participation * 50.0 + diversity + effectiveness
}

pub fn converge_coop(ship: &mut ShipState, target: f64, dt: f64) {
    ship.coop_score = (ship.coop_score + (target - ship.coop_score) * dt * 2.0).clamp(0.0, 100.0);
}

/// Appends a `[time, score]` sample at most once per second, keeping the latest ones.
pub fn record_coop_sample(ship: &mut ShipState, now_ms: i64) {
    let due = ship
        .coop_curve
        .last()
        .is_none_or(|(at, _)| now_ms - at >= COOP_CURVE_INTERVAL_MS);
    if !due {
        return;
    }

    ship.coop_curve.push((now_ms, ship.coop_score));
    if ship.coop_curve.len() > COOP_CURVE_CAP {
        let excess = ship.coop_curve.len() - COOP_CURVE_CAP;
        ship.coop_curve.drain(..excess);
    }
}

/// Name used when a connection never set one.
pub fn fallback_name(conn_id: &str) -> String {
    let start = conn_id.len().saturating_sub(4);
    let tail = conn_id.get(start..).unwrap_or(conn_id);
    format!("Player-{tail}")
}

/// Folds this tick into the running stats, creating them on first use.
pub fn accumulate_stats(
    ship: &mut ShipState,
    intents: &IntentsByConn,
    presence: &PresenceMap,
    now_ms: i64,
) {
    let start_time = if ship.start_timestamp != 0 {
        ship.start_timestamp
    } else {
        now_ms
    };
    let (water, health, coop) = (ship.water, ship.health, ship.coop_score);
    let stats = ship
        .current_attempt_stats
        .get_or_insert_with(|| RunStats::new(start_time));

    stats.max_water = stats.max_water.max(water);
    stats.min_health = stats.min_health.min(health);
    stats.coop_score_sum += coop;
    stats.coop_samples += 1;

    for (conn_id, intent) in intents {
        let activity = stats
            .player_actions
            .entry(conn_id.clone())
            .or_insert_with(|| PlayerActivity {
                display_name: presence
                    .get(conn_id)
                    .map(|p| p.display_name.clone())
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| fallback_name(conn_id)),
                actions: 0,
                last_active: now_ms,
            });
        if intent.updated_at > activity.last_active {
            activity.actions += 1;
            activity.last_active = now_ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::{Intent, Presence, Role};
    use crate::domain::tuning::LegendId;

    fn member(name: &str, role: Option<Role>) -> Presence {
        Presence {
            display_name: name.to_string(),
            role,
        }
    }

    #[test]
    fn full_active_crew_scores_high() {
        let mut presence = PresenceMap::new();
        let mut intents = IntentsByConn::new();
        for (i, role) in Role::ALL.into_iter().enumerate() {
            let id = format!("conn-{i}");
            presence.insert(id.clone(), member("p", Some(role)));
            intents.insert(
                id,
                Intent {
                    updated_at: 9_500,
                    ..Intent::for_role(role)
                },
            );
        }
        let signals = ControlSignals {
            bailing: 1.0,
            sail_samples: 1,
            ..ControlSignals::default()
        };

        assert_eq!(coop_target(&intents, &presence, &signals, 10_000), 100.0);
    }

    #[test]
    fn idle_spectators_dilute_participation() {
        let mut presence = PresenceMap::new();
        presence.insert("a".to_string(), member("a", Some(Role::Bailer)));
        presence.insert("b".to_string(), member("b", None));
        let mut intents = IntentsByConn::new();
        intents.insert(
            "a".to_string(),
            Intent {
                updated_at: 1_000,
                ..Intent::for_role(Role::Bailer)
            },
        );

        let signals = ControlSignals::default();
        // 1 of 2 present active -> 25, one role -> 5.
        assert_eq!(coop_target(&intents, &presence, &signals, 2_000), 30.0);
        // Stale intent no longer counts.
        assert_eq!(coop_target(&intents, &presence, &signals, 3_000), 5.0);
    }

    #[test]
    fn coop_converges_and_stays_clamped() {
        let mut ship = ShipState::new(LegendId::OpenSea, None, 0);
        ship.coop_score = 100.0;
        for _ in 0..400 {
            converge_coop(&mut ship, 20.0, 0.05);
        }
        assert!((ship.coop_score - 20.0).abs() < 0.01);
        converge_coop(&mut ship, 500.0, 0.1);
        assert!(ship.coop_score <= 100.0);
    }

    #[test]
    fn coop_curve_is_throttled_and_capped() {
        let mut ship = ShipState::new(LegendId::OpenSea, None, 0);
        record_coop_sample(&mut ship, 0);
        record_coop_sample(&mut ship, 500);
        record_coop_sample(&mut ship, 1_000);
        assert_eq!(ship.coop_curve.len(), 2);

        for second in 2..400 {
            record_coop_sample(&mut ship, second * 1_000);
        }
        assert_eq!(ship.coop_curve.len(), COOP_CURVE_CAP);
        assert_eq!(ship.coop_curve.last().map(|s| s.0), Some(399_000));
    }

    #[test]
    fn activity_counts_fresh_intents_and_names_strangers() {
        let mut ship = ShipState::new(LegendId::OpenSea, None, 0);
        ship.start_timestamp = 1_000;
        let mut presence = PresenceMap::new();
        presence.insert("conn-0001".to_string(), member("Ada", Some(Role::Sail)));
        let mut intents = IntentsByConn::new();
        intents.insert("conn-0001".to_string(), Intent::default());
        intents.insert("conn-9876".to_string(), Intent::default());

        accumulate_stats(&mut ship, &intents, &presence, 1_000);
        if let Some(intent) = intents.get_mut("conn-0001") {
            intent.updated_at = 1_200;
        }
        accumulate_stats(&mut ship, &intents, &presence, 1_250);

        let stats = ship.current_attempt_stats.as_ref().expect("stats created");
        assert_eq!(stats.start_time, 1_000);
        assert_eq!(stats.coop_samples, 2);
        assert_eq!(stats.player_actions["conn-0001"].display_name, "Ada");
        assert_eq!(stats.player_actions["conn-0001"].actions, 1);
        assert_eq!(stats.player_actions["conn-9876"].display_name, "Player-9876");
        assert_eq!(stats.player_actions["conn-9876"].actions, 0);
    }
}
