// Reduces per-connection intents to the scalar control signals the physics consumes.

use crate::domain::state::{IntentsByConn, PresenceMap, Role};
use crate::domain::tuning::{CadenceBand, ControlTuning};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSignals {
    /// Summed helm input, [-1, 1].
    pub helm: f64,
    /// Mean sail trim, [0, 1]. 0.5 when nobody trims.
    pub sail_trim: f64,
    /// Number of sail-role intents that contributed to `sail_trim`.
    pub sail_samples: usize,
    pub bailing: f64,
    pub row_left: f64,
    pub row_right: f64,
    /// New lookout buff deadline if a recent spot re-armed it.
    pub lookout_buff_until: Option<i64>,
}

impl Default for ControlSignals {
    fn default() -> Self {
        Self {
            helm: 0.0,
            sail_trim: 0.5,
            sail_samples: 0,
            bailing: 0.0,
            row_left: 0.0,
            row_right: 0.0,
            lookout_buff_until: None,
        }
    }
}

/// Role coverage of the present crew.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrewMakeup {
    pub present: usize,
    pub role_holders: usize,
    pub distinct_roles: usize,
}

impl CrewMakeup {
    pub fn from_presence(presence: &PresenceMap) -> Self {
        let roles: Vec<Role> = presence.values().filter_map(|p| p.role).collect();
        let distinct: BTreeSet<Role> = roles.iter().copied().collect();
        Self {
            present: presence.len(),
            role_holders: roles.len(),
            distinct_roles: distinct.len(),
        }
    }
}

/// Power of a two-tap rhythm: freshness of the latest tap times how close the
/// gap between the two latest taps is to the target cadence. Zero outside the band.
pub fn cadence_power(
    latest: Option<i64>,
    previous: Option<i64>,
    now_ms: i64,
    band: &CadenceBand,
    freshness_ms: f64,
) -> f64 {
    // A zero timestamp means "never tapped".
    let (Some(t1), Some(t2)) = (latest.filter(|t| *t != 0), previous.filter(|t| *t != 0)) else {
        return 0.0;
    };

    let cadence = (t1 - t2).abs() as f64 / 1000.0;
    if cadence <= band.min_secs || cadence >= band.max_secs {
        return 0.0;
    }

    let freshness = (1.0 - (now_ms - t1) as f64 / freshness_ms).clamp(0.0, 1.0);
    let efficiency = (1.0 - (cadence - band.target_secs).abs() / band.target_secs).max(0.0);
    freshness * efficiency
}

/// Only intents whose owner is present and claims the intent's role count.
/// Stale or role-mismatched intents are skipped for the tick, never removed.
pub fn aggregate(
    intents: &IntentsByConn,
    presence: &PresenceMap,
    now_ms: i64,
    tuning: &ControlTuning,
) -> ControlSignals {
    let mut signals = ControlSignals::default();
    let mut sail_total = 0.0;

    for (conn_id, intent) in intents {
        let Some(role) = presence.get(conn_id).and_then(|p| p.role) else {
            continue;
        };
        if intent.role != role {
            continue;
        }

        match role {
            Role::Helmsman => {
                signals.helm = (signals.helm + intent.helm_delta).clamp(-1.0, 1.0);
            }
            Role::Sail => {
                sail_total += intent.sail_trim;
                signals.sail_samples += 1;
            }
            Role::Bailer => {
                let power = cadence_power(
                    intent.bail_tap_at1,
                    intent.bail_tap_at2,
                    now_ms,
                    &tuning.bailing,
                    tuning.freshness_ms,
                );
                signals.bailing = signals.bailing.max(power);
            }
            Role::Rower => {
                let left = cadence_power(
                    intent.row_left_tap_at1,
                    intent.row_left_tap_at2,
                    now_ms,
                    &tuning.rowing,
                    tuning.freshness_ms,
                );
                let right = cadence_power(
                    intent.row_right_tap_at1,
                    intent.row_right_tap_at2,
                    now_ms,
                    &tuning.rowing,
                    tuning.freshness_ms,
                );
                signals.row_left = signals.row_left.max(left);
                signals.row_right = signals.row_right.max(right);
            }
            Role::Lookout => {
                let spotted_at = intent.lookout_ack_at.unwrap_or(0);
                if spotted_at + tuning.lookout_recent_ms > now_ms {
                    let focus = intent
                        .lookout_focus
                        .unwrap_or(tuning.default_lookout_focus);
                    let buff_ms =
                        (focus * tuning.lookout_focus_scale_ms).min(tuning.lookout_max_buff_ms);
                    let until = now_ms + buff_ms as i64;
                    signals.lookout_buff_until =
                        Some(signals.lookout_buff_until.map_or(until, |u| u.max(until)));
                }
            }
        }
    }

    if signals.sail_samples > 0 {
        signals.sail_trim = sail_total / signals.sail_samples as f64;
    }
    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::{Intent, Presence};

    fn crew(members: &[(&str, Option<Role>)]) -> PresenceMap {
        members
            .iter()
            .map(|(id, role)| {
                (
                    id.to_string(),
                    Presence {
                        display_name: id.to_string(),
                        role: *role,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn cadence_power_peaks_at_target_and_decays_with_age() {
        let band = ControlTuning::default().bailing;
        assert_eq!(cadence_power(Some(1500), Some(1000), 1500, &band, 2000.0), 1.0);
        assert_eq!(cadence_power(Some(1500), Some(1000), 2500, &band, 2000.0), 0.5);
        assert_eq!(cadence_power(Some(1500), Some(1000), 4000, &band, 2000.0), 0.0);
    }

    #[test]
    fn cadence_outside_band_or_missing_taps_is_powerless() {
        let band = ControlTuning::default().bailing;
        assert_eq!(cadence_power(Some(1100), Some(1000), 1100, &band, 2000.0), 0.0);
        assert_eq!(cadence_power(Some(3000), Some(1000), 3000, &band, 2000.0), 0.0);
        assert_eq!(cadence_power(Some(1500), None, 1500, &band, 2000.0), 0.0);
        assert_eq!(cadence_power(Some(1500), Some(0), 1500, &band, 2000.0), 0.0);
    }

    #[test]
    fn only_intents_matching_the_presence_role_count() {
        let presence = crew(&[
            ("a", Some(Role::Sail)),
            ("b", None),
            ("c", Some(Role::Sail)),
        ]);
        let mut intents = IntentsByConn::new();
        // Claims helmsman in the intent but presence says sail.
        intents.insert(
            "a".to_string(),
            Intent {
                helm_delta: 1.0,
                sail_trim: 0.9,
                ..Intent::for_role(Role::Helmsman)
            },
        );
        // No role claimed at all.
        intents.insert(
            "b".to_string(),
            Intent {
                helm_delta: -1.0,
                ..Intent::for_role(Role::Helmsman)
            },
        );
        intents.insert(
            "c".to_string(),
            Intent {
                sail_trim: 0.2,
                ..Intent::for_role(Role::Sail)
            },
        );
        // Owner left.
        intents.insert("gone".to_string(), Intent::for_role(Role::Sail));

        let signals = aggregate(&intents, &presence, 0, &ControlTuning::default());
        assert_eq!(signals.helm, 0.0);
        assert_eq!(signals.sail_trim, 0.2);
        assert_eq!(signals.sail_samples, 1);
        // Skipped, not removed.
        assert_eq!(intents.len(), 4);
    }

    #[test]
    fn mismatched_bailer_taps_are_powerless() {
        let presence = crew(&[("a", Some(Role::Bailer))]);
        let taps = Intent {
            bail_tap_at1: Some(1_500),
            bail_tap_at2: Some(1_000),
            ..Intent::for_role(Role::Rower)
        };
        let mut intents = IntentsByConn::new();
        intents.insert("a".to_string(), taps.clone());
        let tuning = ControlTuning::default();
        assert_eq!(aggregate(&intents, &presence, 1_500, &tuning).bailing, 0.0);

        intents.insert(
            "a".to_string(),
            Intent {
                role: Role::Bailer,
                ..taps
            },
        );
        assert_eq!(aggregate(&intents, &presence, 1_500, &tuning).bailing, 1.0);
    }

    #[test]
    fn helm_sums_with_clamp_and_sail_averages() {
        let presence = crew(&[
            ("h1", Some(Role::Helmsman)),
            ("h2", Some(Role::Helmsman)),
            ("s1", Some(Role::Sail)),
            ("s2", Some(Role::Sail)),
        ]);
        let mut intents = IntentsByConn::new();
        for id in ["h1", "h2"] {
            intents.insert(
                id.to_string(),
                Intent {
                    helm_delta: 0.75,
                    ..Intent::for_role(Role::Helmsman)
                },
            );
        }
        intents.insert(
            "s1".to_string(),
            Intent {
                sail_trim: 0.2,
                ..Intent::for_role(Role::Sail)
            },
        );
        intents.insert(
            "s2".to_string(),
            Intent {
                sail_trim: 0.6,
                ..Intent::for_role(Role::Sail)
            },
        );

        let signals = aggregate(&intents, &presence, 0, &ControlTuning::default());
        assert_eq!(signals.helm, 1.0);
        assert!((signals.sail_trim - 0.4).abs() < 1e-12);
    }

    #[test]
    fn recent_lookout_spot_arms_buff() {
        let presence = crew(&[("l", Some(Role::Lookout))]);
        let mut intents = IntentsByConn::new();
        intents.insert(
            "l".to_string(),
            Intent {
                lookout_ack_at: Some(10_000),
                ..Intent::for_role(Role::Lookout)
            },
        );
        let tuning = ControlTuning::default();

        let fresh = aggregate(&intents, &presence, 12_000, &tuning);
        assert_eq!(fresh.lookout_buff_until, Some(12_000 + 7_500));

        let stale = aggregate(&intents, &presence, 15_000, &tuning);
        assert_eq!(stale.lookout_buff_until, None);
    }

    #[test]
    fn crew_makeup_counts_roles() {
        let presence = crew(&[
            ("a", Some(Role::Bailer)),
            ("b", Some(Role::Bailer)),
            ("c", Some(Role::Rower)),
            ("d", None),
        ]);
        assert_eq!(
            CrewMakeup::from_presence(&presence),
            CrewMakeup {
                present: 4,
                role_holders: 3,
                distinct_roles: 2,
            }
        );
    }
}
