//! Timed hazard events.
//!
//! Scheduling is a pure function of the ship document and server time, so a
//! peer taking over the host seat schedules exactly what the old host would have.

use super::environment::Environment;
use crate::domain::rng::{PcgStream, ReplayRng, SineHash};
use crate::domain::state::{HazardEvent, ShipState};

pub const EVENT_DURATION_MS: i64 = 6_000;
/// Elapsed time is bucketed so a pick is stable within the bucket.
pub const EVENT_BUCKET_MS: i64 = 8_000;

/// Gap between events; shrinks as the run goes on.
pub fn interval_ms(elapsed_ms: i64) -> i64 {
    let minutes = elapsed_ms as f64 / 60_000.0;
    if minutes < 0.5 {
        30_000
    } else if minutes < 1.5 {
        25_000
    } else if minutes < 2.5 {
        20_000
    } else if minutes < 3.5 {
        15_000
    } else {
        10_000
    }
}

pub fn is_active(ship: &ShipState, now_ms: i64) -> bool {
    ship.event_until > now_ms
}

pub fn pick(seed: u32, elapsed_ms: i64, rng: &impl ReplayRng) -> HazardEvent {
    let bucket = elapsed_ms.div_euclid(EVENT_BUCKET_MS);
    HazardEvent::from_roll(rng.next_float(seed, bucket))
}

/// Starts an event when none is running and the interval has passed.
pub fn maybe_start(ship: &mut ShipState, now_ms: i64, elapsed_ms: i64) -> Option<HazardEvent> {
    if is_active(ship, now_ms) || now_ms - ship.last_event_at <= interval_ms(elapsed_ms) {
        return None;
    }

    let event = pick(ship.seed, elapsed_ms, &SineHash);
    ship.event_name = Some(event);
    ship.last_event_at = now_ms;
    ship.event_until = now_ms + EVENT_DURATION_MS;
    Some(event)
}

/// Stacks an active event on top of the phase environment. `jitter_key` keys
/// the steering-failure drift so replays draw the same value.
pub fn apply_modifiers(env: &mut Environment, event: HazardEvent, seed: u32, jitter_key: i64) {
    match event {
        HazardEvent::FloodSpike => {
            env.ingress += 0.04;
            env.reef_severity = (env.reef_severity + 0.1).min(1.0);
        }
        HazardEvent::GustSquall => {
            env.wind_force *= 1.3;
            env.wind_variance *= 1.4;
            env.heel_risk *= 1.25;
        }
        HazardEvent::CrossSet => env.current_bias += 0.08,
        HazardEvent::BroachRisk => {
            env.heel_risk *= 1.5;
            env.wind_variance *= 1.3;
        }
        HazardEvent::HullBreach => env.ingress += 0.06,
        HazardEvent::SuddenWindShift => {
            env.wind_force *= 0.6;
            env.wind_variance *= 1.8;
        }
        HazardEvent::SteeringFailure => {
            env.current_bias += PcgStream.next_float(seed, jitter_key) * 0.12 - 0.06;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tuning::LegendId;

    fn playing_ship(seed: u32) -> ShipState {
        let mut ship = ShipState::new(LegendId::OpenSea, None, seed);
        ship.start_timestamp = 1_000_000;
        ship.last_event_at = 1_000_000;
        ship
    }

    fn calm() -> Environment {
        Environment {
            wind_force: 1.0,
            wind_variance: 1.0,
            current_bias: 0.0,
            reef_severity: 0.95,
            ingress: 0.0,
            heel_risk: 1.0,
        }
    }

    #[test]
    fn interval_shrinks_over_the_run() {
        assert_eq!(interval_ms(0), 30_000);
        assert_eq!(interval_ms(60_000), 25_000);
        assert_eq!(interval_ms(120_000), 20_000);
        assert_eq!(interval_ms(180_000), 15_000);
        assert_eq!(interval_ms(240_000), 10_000);
    }

    #[test]
    fn first_event_waits_a_full_interval() {
        let mut ship = playing_ship(3);
        assert_eq!(maybe_start(&mut ship, 1_029_999, 29_999), None);

        let started = maybe_start(&mut ship, 1_030_050, 30_050);
        assert!(started.is_some());
        assert_eq!(ship.event_name, started);
        assert_eq!(ship.last_event_at, 1_030_050);
        assert_eq!(ship.event_until, 1_036_050);
        assert!(is_active(&ship, 1_036_000));
        assert!(!is_active(&ship, 1_036_050));

        // No overlap while active, even once the interval has passed.
        ship.last_event_at = 0;
        assert_eq!(maybe_start(&mut ship, 1_035_000, 35_000), None);
        assert_eq!(ship.event_until, 1_036_050);

        // Once it ends and a full interval passes, the next one may start.
        ship.last_event_at = 1_030_050;
        assert_eq!(maybe_start(&mut ship, 1_040_000, 40_000), None);
        assert!(maybe_start(&mut ship, 1_200_000, 200_000).is_some());
    }

    #[test]
    fn event_schedule_is_deterministic() {
        let run = |seed| {
            let mut ship = playing_ship(seed);
            let mut picks = Vec::new();
            for step in 0..6_000 {
                let elapsed = step * 50;
                if let Some(event) = maybe_start(&mut ship, 1_000_000 + elapsed, elapsed) {
                    picks.push((elapsed, event));
                }
            }
            picks
        };
        let first = run(77);
        assert!(!first.is_empty());
        assert_eq!(first, run(77));
    }

    #[test]
    fn pick_uses_the_elapsed_bucket() {
        assert_eq!(pick(5, 8_000, &SineHash), pick(5, 15_999, &SineHash));
        assert_eq!(pick(5, 8_000, &SineHash), pick(6, 0, &SineHash));
    }

    #[test]
    fn modifiers_stack_on_environment() {
        let mut env = calm();
        apply_modifiers(&mut env, HazardEvent::FloodSpike, 0, 0);
        assert!((env.ingress - 0.04).abs() < 1e-12);
        assert_eq!(env.reef_severity, 1.0);

        let mut env = calm();
        apply_modifiers(&mut env, HazardEvent::SuddenWindShift, 0, 0);
        assert!((env.wind_force - 0.6).abs() < 1e-12);
        assert!((env.wind_variance - 1.8).abs() < 1e-12);
    }

    #[test]
    fn steering_failure_jitter_is_bounded_and_replayable() {
        for key in 0..200 {
            let mut a = calm();
            let mut b = calm();
            apply_modifiers(&mut a, HazardEvent::SteeringFailure, 11, key);
            apply_modifiers(&mut b, HazardEvent::SteeringFailure, 11, key);
            assert_eq!(a, b);
            assert!(a.current_bias >= -0.06 && a.current_bias < 0.06);
        }
    }
}
