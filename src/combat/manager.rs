//! Combat manager: registry of running instances and the tick scheduler
//!
//! Every active instance is ticked by one scheduler loop. Results fan out to
//! observers over a broadcast channel of [`RoomMessage`]s and, once a combat
//! ends, to the strategy layer.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::strategy::{CombatResolution, StrategyLayer};
use crate::util::time::{tick_delta, tick_interval, Timer};
use crate::ws::protocol::{RoomMessage, ServerMsg};

use super::action::{CombatAction, InputQueue};
use super::error::CombatError;
use super::ids::IdGenerator;
use super::instance::{ArenaRules, CombatInstance, GameSnapshot};
use super::snapshot::{CombatOutcome, CombatSnapshot, TickReport};

/// Room channel capacity, in messages
const ROOM_CHANNEL_CAPACITY: usize = 1024;

/// Request from the strategy layer to start a combat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatRequest {
    pub match_id: String,
    pub attacker_unit_id: String,
    pub defender_unit_id: String,
    pub game: GameSnapshot,
}

/// One registered combat. Inputs are reachable without the instance lock.
struct CombatEntry {
    inputs: Arc<InputQueue>,
    instance: Mutex<CombatInstance>,
}

/// Owns every running combat, at most one per match
pub struct CombatManager {
    combats: DashMap<String, Arc<CombatEntry>>,
    rules: ArenaRules,
    ids: Arc<dyn IdGenerator>,
    strategy: Arc<dyn StrategyLayer>,
    room_tx: broadcast::Sender<RoomMessage>,
}

impl CombatManager {
    pub fn new(
        rules: ArenaRules,
        ids: Arc<dyn IdGenerator>,
        strategy: Arc<dyn StrategyLayer>,
    ) -> Self {
        let (room_tx, _) = broadcast::channel(ROOM_CHANNEL_CAPACITY);
        Self {
            combats: DashMap::new(),
            rules,
            ids,
            strategy,
            room_tx,
        }
    }

    /// Receive every room message; sessions filter by match id
    pub fn subscribe(&self) -> broadcast::Receiver<RoomMessage> {
        self.room_tx.subscribe()
    }

    pub fn active_combats(&self) -> usize {
        self.combats.len()
    }

    pub fn is_active(&self, match_id: &str) -> bool {
        self.combats.contains_key(match_id)
    }

    pub fn snapshot(&self, match_id: &str) -> Option<CombatSnapshot> {
        let entry = self.combats.get(match_id)?.value().clone();
        let snapshot = entry.instance.lock().snapshot();
        Some(snapshot)
    }

    /// Create and register an instance for the match
    pub fn initiate_combat(&self, request: CombatRequest) -> Result<CombatSnapshot, CombatError> {
        let match_id = request.match_id.clone();

        let result = match self.combats.entry(match_id.clone()) {
            Entry::Occupied(_) => Err(CombatError::AlreadyActive(match_id.clone())),
            Entry::Vacant(slot) => CombatInstance::new(
                match_id.clone(),
                &request.attacker_unit_id,
                &request.defender_unit_id,
                &request.game,
                self.rules,
                self.ids.clone(),
            )
            .map(|instance| {
                let snapshot = instance.snapshot();
                let players = instance.player_ids().to_vec();
                slot.insert(Arc::new(CombatEntry {
                    inputs: instance.input_queue(),
                    instance: Mutex::new(instance),
                }));
                (snapshot, players)
            }),
        };

        match result {
            Ok((snapshot, player_ids)) => {
                info!(
                    match_id = %match_id,
                    attacker = %request.attacker_unit_id,
                    defender = %request.defender_unit_id,
                    "Combat started"
                );
                self.broadcast(
                    &match_id,
                    ServerMsg::CombatStarted {
                        match_id: match_id.clone(),
                        initial_snapshot: snapshot.clone(),
                        attacker_unit_id: request.attacker_unit_id,
                        defender_unit_id: request.defender_unit_id,
                        player_ids,
                    },
                );
                Ok(snapshot)
            }
            Err(e) => {
                warn!(match_id = %match_id, error = %e, "Combat could not start");
                self.broadcast(&match_id, ServerMsg::error(e.code(), e.to_string()));
                Err(e)
            }
        }
    }

    /// Queue a player action for the match's next tick
    pub fn handle_combat_action(&self, player_id: &str, match_id: &str, action: CombatAction) -> bool {
        let Some(entry) = self.combats.get(match_id).map(|e| e.value().clone()) else {
            warn!(match_id = %match_id, player_id = %player_id, "Action for unknown combat");
            return false;
        };

        if !entry.inputs.is_participant(player_id) {
            warn!(match_id = %match_id, player_id = %player_id, "Action from non-participant");
            return false;
        }

        let kind = action.kind();
        if !entry.inputs.push(player_id, action) {
            debug!(match_id = %match_id, player_id = %player_id, "Input queue full, action dropped");
            return false;
        }

        debug!(match_id = %match_id, player_id = %player_id, action = kind, "Action queued");
        true
    }

    /// One scheduler pass over every active instance
    pub fn tick(&self, delta_secs: f32) {
        // Work on a copy so instances ending this pass don't disturb iteration
        let entries: Vec<(String, Arc<CombatEntry>)> = self
            .combats
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        for (match_id, entry) in entries {
            let result = catch_unwind(AssertUnwindSafe(|| entry.instance.lock().update(delta_secs)));

            match result {
                Ok(report) => self.publish(&match_id, &entry, report),
                Err(panic) => {
                    let reason = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    error!(match_id = %match_id, reason = %reason, "Combat instance panicked, removing");
                    self.combats.remove(&match_id);
                    self.broadcast(
                        &match_id,
                        ServerMsg::error("combat_failed", "Combat aborted by an internal error"),
                    );
                }
            }
        }
    }

    /// Drive `tick` forever at the given rate
    pub async fn run(self: Arc<Self>, tick_rate_hz: u32) {
        let period = tick_interval(tick_rate_hz);
        let delta = tick_delta(tick_rate_hz);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(tick_rate_hz, "Combat scheduler started");

        loop {
            interval.tick().await;

            let timer = Timer::new();
            self.tick(delta);
            let elapsed = timer.elapsed();
            if elapsed > period {
                warn!(
                    elapsed_us = timer.elapsed_micros(),
                    active_combats = self.active_combats(),
                    "Combat tick overran its interval"
                );
            }
        }
    }

    fn publish(&self, match_id: &str, entry: &CombatEntry, report: TickReport) {
        let TickReport {
            events,
            snapshot,
            outcome,
        } = report;

        for event in events {
            self.broadcast(match_id, ServerMsg::from_event(match_id, event));
        }

        if let Some(snapshot) = snapshot {
            self.broadcast(match_id, ServerMsg::CombatStateUpdate { snapshot });
        }

        if let Some(outcome) = outcome {
            self.finish(match_id, entry, outcome);
        }
    }

    fn finish(&self, match_id: &str, entry: &CombatEntry, outcome: CombatOutcome) {
        if self.combats.remove(match_id).is_none() {
            return;
        }

        let resolution = match &outcome {
            CombatOutcome::Victory {
                winner_unit_id,
                loser_unit_id,
                winner_hp,
                ..
            } => {
                let winning_player_id = entry
                    .instance
                    .lock()
                    .unit_owner(winner_unit_id)
                    .map(str::to_string);
                match winning_player_id {
                    Some(winning_player_id) => CombatResolution::Victory {
                        match_id: match_id.to_string(),
                        winning_player_id,
                        winner_unit_id: winner_unit_id.clone(),
                        loser_unit_id: loser_unit_id.clone(),
                        winner_hp: *winner_hp,
                    },
                    None => {
                        error!(match_id = %match_id, winner = %winner_unit_id, "Winner has no owner, result not reported");
                        self.broadcast(match_id, ServerMsg::combat_ended(match_id, &outcome));
                        return;
                    }
                }
            }
            CombatOutcome::Draw { unit_ids, .. } => CombatResolution::Draw {
                match_id: match_id.to_string(),
                unit_ids: unit_ids.clone(),
            },
        };

        info!(match_id = %match_id, outcome = ?outcome, "Combat ended");
        self.strategy.combat_resolved(resolution);
        self.broadcast(match_id, ServerMsg::combat_ended(match_id, &outcome));
    }

    fn broadcast(&self, match_id: &str, msg: ServerMsg) {
        // No subscribers is fine
        let _ = self.room_tx.send(RoomMessage {
            match_id: match_id.to_string(),
            msg,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::catalog::UnitCatalog;
    use crate::combat::ids::SequentialIds;
    use crate::combat::instance::BoardUnit;
    use crate::combat::math::ArenaBounds;
    use crate::strategy::ChannelStrategyLayer;

    fn request(match_id: &str) -> CombatRequest {
        let catalog: UnitCatalog = serde_json::from_value(serde_json::json!({
            "knight": {
                "id": "knight",
                "name": "Knight",
                "max_hp": 100.0,
                "combat_abilities": [
                    { "id": "bolt", "name": "Bolt", "category": "attack",
                      "attack_type": "direct_projectile", "damage": 7.0 }
                ]
            }
        }))
        .unwrap();

        CombatRequest {
            match_id: match_id.into(),
            attacker_unit_id: "a".into(),
            defender_unit_id: "b".into(),
            game: GameSnapshot {
                players: vec!["p1".into(), "p2".into()],
                units: vec![
                    BoardUnit {
                        id: "a".into(),
                        owner: "p1".into(),
                        type_id: "knight".into(),
                        current_hp: 100.0,
                    },
                    BoardUnit {
                        id: "b".into(),
                        owner: "p2".into(),
                        type_id: "knight".into(),
                        current_hp: 5.0,
                    },
                ],
                unit_definitions: catalog,
                arena: ArenaBounds::default(),
            },
        }
    }

    fn manager() -> (CombatManager, tokio::sync::mpsc::UnboundedReceiver<CombatResolution>) {
        let (strategy, rx) = ChannelStrategyLayer::new();
        let rules = ArenaRules {
            proximity_tap: None,
            time_limit_ms: None,
        };
        (
            CombatManager::new(rules, Arc::new(SequentialIds::new()), Arc::new(strategy)),
            rx,
        )
    }

    #[test]
    fn second_combat_for_same_match_is_rejected() {
        let (manager, _rx) = manager();
        let mut room = manager.subscribe();

        assert!(manager.initiate_combat(request("m1")).is_ok());
        assert_eq!(
            manager.initiate_combat(request("m1")),
            Err(CombatError::AlreadyActive("m1".into()))
        );
        assert_eq!(manager.active_combats(), 1);

        assert!(matches!(room.try_recv().unwrap().msg, ServerMsg::CombatStarted { .. }));
        match room.try_recv().unwrap().msg {
            ServerMsg::Error { code, .. } => assert_eq!(code, "combat_already_active"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unbuildable_combat_is_not_registered() {
        let (manager, _rx) = manager();
        let mut req = request("m1");
        req.defender_unit_id = "ghost".into();

        assert!(matches!(
            manager.initiate_combat(req),
            Err(CombatError::UnitNotFound(_))
        ));
        assert!(!manager.is_active("m1"));
    }

    #[test]
    fn actions_route_to_participants_only() {
        let (manager, _rx) = manager();
        manager.initiate_combat(request("m1")).unwrap();

        assert!(manager.handle_combat_action("p1", "m1", CombatAction::StopMove));
        assert!(!manager.handle_combat_action("intruder", "m1", CombatAction::StopMove));
        assert!(!manager.handle_combat_action("p1", "m404", CombatAction::StopMove));
    }

    #[test]
    fn knockout_resolves_to_strategy_layer_once() {
        let (manager, mut rx) = manager();
        let mut room = manager.subscribe();
        manager.initiate_combat(request("m1")).unwrap();

        manager.handle_combat_action(
            "p1",
            "m1",
            CombatAction::BasicAttack {
                target_position: None,
            },
        );

        // 280 units of gap at 120/s
        for _ in 0..60 {
            manager.tick(0.05);
        }

        assert_eq!(manager.active_combats(), 0);
        match rx.try_recv().unwrap() {
            CombatResolution::Victory {
                winning_player_id,
                winner_unit_id,
                loser_unit_id,
                winner_hp,
                ..
            } => {
                assert_eq!(winning_player_id, "p1");
                assert_eq!(winner_unit_id, "a");
                assert_eq!(loser_unit_id, "b");
                assert_eq!(winner_hp, 100.0);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(rx.try_recv().is_err());

        let mut saw_hit = false;
        let mut ended = 0;
        while let Ok(message) = room.try_recv() {
            match message.msg {
                ServerMsg::ProjectileHit { target_id, .. } => {
                    assert_eq!(target_id, "b");
                    saw_hit = true;
                }
                ServerMsg::CombatEnded { winner_id, .. } => {
                    assert_eq!(winner_id.as_deref(), Some("a"));
                    ended += 1;
                }
                _ => {}
            }
        }
        assert!(saw_hit);
        assert_eq!(ended, 1);

        // Nothing left to tick
        manager.tick(0.05);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn snapshot_lookup_tracks_registry() {
        let (manager, _rx) = manager();
        assert!(manager.snapshot("m1").is_none());
        manager.initiate_combat(request("m1")).unwrap();
        manager.tick(0.05);
        assert_eq!(manager.snapshot("m1").unwrap().clock_ms, 50);
    }
}
