//! Per-tick snapshot assembly and delivery

use crate::collision::detect_collisions;
use crate::game::GameState;
use crate::sessions::SessionRegistry;
use shared::{Outbound, Snapshot};
use std::collections::HashMap;
use std::time::Duration;

/// Time between the end of one tick's work and the start of the next.
pub fn tick_period(tick_rate: u32) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(tick_rate.max(1)))
}

/// Builds one snapshot per occupied zone: its players, which of them are
/// colliding, and the zone's ground items.
pub fn zone_snapshots(state: &GameState) -> HashMap<String, Snapshot> {
    let colliding = detect_collisions(&state.players);

    let mut snapshots: HashMap<String, Snapshot> = HashMap::new();
    for player in state.players.iter() {
        let snapshot = snapshots
            .entry(player.zone.clone())
            .or_insert_with(|| Snapshot {
                ground_items: state.items.items(&player.zone).to_vec(),
                ..Snapshot::default()
            });
        snapshot.players.insert(player.name.clone(), player.view());
        if colliding.contains(&player.name) {
            snapshot.colliding.insert(player.name.clone(), true);
        }
    }
    snapshots
}

/// Pushes every bound connection the snapshot of its player's zone.
///
/// Delivery is best-effort: a failed send is skipped and does not unbind the
/// connection. Returns how many snapshots were queued.
pub fn broadcast_tick(state: &GameState, sessions: &SessionRegistry) -> usize {
    let snapshots = zone_snapshots(state);

    let mut delivered = 0;
    for (id, player) in sessions.connections_snapshot() {
        let Some(zone) = state.players.get(&player).map(|p| p.zone.as_str()) else {
            continue;
        };
        let Some(snapshot) = snapshots.get(zone) else {
            continue;
        };
        if sessions.send(id, Outbound::Snapshot(snapshot.clone())) {
            delivered += 1;
        }
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ZoneCatalog;
    use crate::sessions::{Session, OUTBOUND_QUEUE_CAPACITY};
    use shared::ItemKind;
    use tokio::sync::mpsc;

    fn world() -> GameState {
        GameState::new(ZoneCatalog::default_world().unwrap(), "town").unwrap()
    }

    fn place(state: &mut GameState, name: &str, zone: &str, x: f32, y: f32) {
        state.join(name);
        let player = state.players.get_mut(name).unwrap();
        player.zone = zone.to_string();
        player.x = x;
        player.y = y;
    }

    fn snapshot_of(rx: &mut mpsc::Receiver<Outbound>) -> Snapshot {
        match rx.try_recv().unwrap() {
            Outbound::Snapshot(snapshot) => snapshot,
            other => panic!("Unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_tick_period() {
        assert_eq!(tick_period(20), Duration::from_millis(50));
        assert_eq!(tick_period(0), Duration::from_secs(1));
    }

    #[test]
    fn test_zone_snapshots_scenario() {
        let mut state = world();
        place(&mut state, "alice", "graveyard", 100.0, 100.0);
        place(&mut state, "bob", "graveyard", 105.0, 103.0);
        place(&mut state, "carol", "town", 100.0, 100.0);

        let snapshots = zone_snapshots(&state);
        let graveyard = &snapshots["graveyard"];
        assert_eq!(graveyard.players.len(), 2);
        assert!(!graveyard.players.contains_key("carol"));
        assert_eq!(graveyard.colliding.get("alice"), Some(&true));
        assert_eq!(graveyard.colliding.get("bob"), Some(&true));

        let town = &snapshots["town"];
        assert_eq!(town.players.len(), 1);
        assert!(town.colliding.is_empty());
    }

    #[test]
    fn test_snapshots_carry_zone_items_only() {
        let mut state = world();
        place(&mut state, "alice", "graveyard", 100.0, 100.0);
        place(&mut state, "carol", "town", 100.0, 100.0);
        state.items.add_item("graveyard", ItemKind::from("lantern"), 1.0, 1.0);

        let snapshots = zone_snapshots(&state);
        assert!(snapshots["graveyard"]
            .ground_items
            .iter()
            .all(|item| item.zone == "graveyard"));
        assert!(snapshots["graveyard"]
            .ground_items
            .iter()
            .any(|item| item.kind.as_str() == "lantern"));
        assert!(snapshots["town"].ground_items.iter().all(|item| item.zone == "town"));
    }

    #[test]
    fn test_empty_zones_get_no_snapshot() {
        let mut state = world();
        place(&mut state, "carol", "town", 100.0, 100.0);
        assert!(!zone_snapshots(&state).contains_key("graveyard"));
    }

    #[test]
    fn test_broadcast_tick_is_zone_scoped() {
        let mut state = world();
        place(&mut state, "alice", "graveyard", 100.0, 100.0);
        place(&mut state, "bob", "graveyard", 105.0, 103.0);
        place(&mut state, "carol", "town", 100.0, 100.0);

        let mut sessions = SessionRegistry::new(8);
        let addr = "127.0.0.1:9000".parse().unwrap();
        let mut receivers = Vec::new();
        for (id, name) in [(1, "alice"), (2, "bob"), (3, "carol")] {
            let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
            sessions.bind(Session::new(id, name, addr, tx));
            receivers.push(rx);
        }

        assert_eq!(broadcast_tick(&state, &sessions), 3);

        for rx in receivers.iter_mut().take(2) {
            let snapshot = snapshot_of(rx);
            assert!(!snapshot.players.contains_key("carol"));
            assert!(!snapshot.colliding.contains_key("carol"));
            assert!(snapshot.players.contains_key("alice"));
            assert!(snapshot.players.contains_key("bob"));
        }
        let carol = snapshot_of(&mut receivers[2]);
        assert_eq!(carol.players.keys().collect::<Vec<_>>(), vec!["carol"]);
    }

    #[test]
    fn test_broadcast_skips_dead_connections() {
        let mut state = world();
        place(&mut state, "alice", "town", 100.0, 100.0);
        place(&mut state, "bob", "town", 300.0, 300.0);

        let mut sessions = SessionRegistry::new(8);
        let addr = "127.0.0.1:9000".parse().unwrap();
        let (dead_tx, dead_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let (live_tx, mut live_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        sessions.bind(Session::new(1, "alice", addr, dead_tx));
        sessions.bind(Session::new(2, "bob", addr, live_tx));
        drop(dead_rx);

        assert_eq!(broadcast_tick(&state, &sessions), 1);
        assert_eq!(snapshot_of(&mut live_rx).players.len(), 2);
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn test_stalled_reader_queue_stays_bounded() {
        let mut state = world();
        place(&mut state, "alice", "town", 100.0, 100.0);
        place(&mut state, "bob", "town", 300.0, 300.0);

        let mut sessions = SessionRegistry::new(8);
        let addr = "127.0.0.1:9000".parse().unwrap();
        let (stalled_tx, mut stalled_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let (live_tx, mut live_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        sessions.bind(Session::new(1, "alice", addr, stalled_tx));
        sessions.bind(Session::new(2, "bob", addr, live_tx));

        // An hour of ticks at 20Hz with alice never reading.
        for _ in 0..72_000 {
            broadcast_tick(&state, &sessions);
            snapshot_of(&mut live_rx);
        }
        assert_eq!(broadcast_tick(&state, &sessions), 1);

        let mut queued = 0;
        while stalled_rx.try_recv().is_ok() {
            queued += 1;
        }
        assert_eq!(queued, OUTBOUND_QUEUE_CAPACITY);
        assert_eq!(sessions.len(), 2);
    }
}
