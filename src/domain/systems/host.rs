//! Host election over the live presence set.
//!
//! There is no coordinator. Every peer looks at the same presence map and the
//! same `hostConnectionId`; if the recorded host is gone, every peer proposes
//! the lexicographically smallest present connection id, so concurrent
//! proposals write the same value.

use crate::domain::state::{LobbyState, PresenceMap};

/// What a peer should do on this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostDecision {
    /// This peer is the host: run the simulation body.
    Run,
    /// Someone else is host (or nobody can be elected).
    Idle,
    /// The recorded host is absent; write this id as the new host.
    Propose(String),
}

/// Smallest present connection id. `BTreeMap` keys are already sorted.
pub fn elect(presence: &PresenceMap) -> Option<&str> {
    presence.keys().next().map(String::as_str)
}

pub fn host_present(host_connection_id: &str, presence: &PresenceMap) -> bool {
    !host_connection_id.is_empty() && presence.contains_key(host_connection_id)
}

pub fn decide(me: &str, host_connection_id: &str, presence: &PresenceMap) -> HostDecision {
    if host_present(host_connection_id, presence) {
        return if host_connection_id == me {
            HostDecision::Run
        } else {
            HostDecision::Idle
        };
    }

    // Peers that already left must not propose.
    if !presence.contains_key(me) {
        return HostDecision::Idle;
    }

    match elect(presence) {
        Some(candidate) => HostDecision::Propose(candidate.to_string()),
        None => HostDecision::Idle,
    }
}

/// Applies an election inside a transaction. Re-checks against the state the
/// transaction sees, so a proposal racing a completed election is a no-op.
/// Returns true when `host_connection_id` changed.
pub fn apply_election(state: &mut LobbyState, presence: &PresenceMap) -> bool {
    if host_present(&state.host_connection_id, presence) {
        return false;
    }

    let elected = elect(presence).unwrap_or_default();
    if state.host_connection_id == elected {
        return false;
    }
    state.host_connection_id = elected.to_string();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::Presence;
    use crate::domain::tuning::LegendId;

    fn presence(ids: &[&str]) -> PresenceMap {
        ids.iter()
            .map(|id| (id.to_string(), Presence::default()))
            .collect()
    }

    #[test]
    fn exactly_one_peer_runs_under_stable_presence() {
        let peers = presence(&["conn-b", "conn-a", "conn-c"]);
        let runners: Vec<_> = peers
            .keys()
            .filter(|me| decide(me, "conn-b", &peers) == HostDecision::Run)
            .collect();
        assert_eq!(runners, vec!["conn-b"]);
    }

    #[test]
    fn every_peer_proposes_the_same_candidate_when_host_is_gone() {
        let peers = presence(&["conn-c", "conn-b"]);
        for me in peers.keys() {
            assert_eq!(
                decide(me, "conn-a", &peers),
                HostDecision::Propose("conn-b".to_string())
            );
        }
    }

    #[test]
    fn absent_peer_stays_idle() {
        let peers = presence(&["conn-b"]);
        assert_eq!(decide("conn-z", "", &peers), HostDecision::Idle);
    }

    #[test]
    fn election_is_idempotent_and_respects_present_host() {
        let peers = presence(&["conn-b", "conn-c"]);
        let mut state = LobbyState::new(LegendId::OpenSea, None, 0);
        state.host_connection_id = "conn-a".to_string();

        assert!(apply_election(&mut state, &peers));
        assert_eq!(state.host_connection_id, "conn-b");
        assert!(!apply_election(&mut state, &peers));

        state.host_connection_id = "conn-c".to_string();
        assert!(!apply_election(&mut state, &peers));
        assert_eq!(state.host_connection_id, "conn-c");
    }

    #[test]
    fn empty_presence_clears_the_seat() {
        let mut state = LobbyState::new(LegendId::OpenSea, None, 0);
        state.host_connection_id = "conn-a".to_string();
        assert!(apply_election(&mut state, &PresenceMap::new()));
        assert!(state.host_connection_id.is_empty());
    }
}
