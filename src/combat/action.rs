//! Player combat actions and the per-instance input queue

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::math::Vec2;

/// Max actions a single player may have pending between two ticks
pub const MAX_QUEUED_ACTIONS: usize = 64;

/// Input sent by a player during combat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CombatAction {
    /// Begin moving in a direction (normalized on apply)
    StartMove { direction: Vec2 },
    StopMove,
    UseAbility {
        ability_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_position: Option<Vec2>,
    },
    /// Use the unit's first ability
    BasicAttack {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_position: Option<Vec2>,
    },
}

impl CombatAction {
    pub fn kind(&self) -> &'static str {
        match self {
            CombatAction::StartMove { .. } => "start_move",
            CombatAction::StopMove => "stop_move",
            CombatAction::UseAbility { .. } => "use_ability",
            CombatAction::BasicAttack { .. } => "basic_attack",
        }
    }
}

/// Pending actions, one FIFO per participant
///
/// Shared between the network path and the tick. Only this queue is locked
/// when a player enqueues, never the simulation state.
#[derive(Debug)]
pub struct InputQueue {
    players: Vec<String>,
    queues: Mutex<Vec<VecDeque<CombatAction>>>,
}

impl InputQueue {
    pub fn new(players: Vec<String>) -> Self {
        let queues = players.iter().map(|_| VecDeque::new()).collect();
        Self {
            players,
            queues: Mutex::new(queues),
        }
    }

    pub fn is_participant(&self, player_id: &str) -> bool {
        self.players.iter().any(|p| p == player_id)
    }

    pub fn players(&self) -> &[String] {
        &self.players
    }

    /// Append an action. Returns false for non-participants or a full queue.
    pub fn push(&self, player_id: &str, action: CombatAction) -> bool {
        let Some(idx) = self.players.iter().position(|p| p == player_id) else {
            return false;
        };

        let mut queues = self.queues.lock();
        let queue = &mut queues[idx];
        if queue.len() >= MAX_QUEUED_ACTIONS {
            return false;
        }
        queue.push_back(action);
        true
    }

    /// Take every pending action, participant order first, FIFO within a player
    pub fn drain(&self) -> Vec<(String, CombatAction)> {
        let mut queues = self.queues.lock();
        let mut drained = Vec::new();
        for (player, queue) in self.players.iter().zip(queues.iter_mut()) {
            drained.extend(queue.drain(..).map(|action| (player.clone(), action)));
        }
        drained
    }

    pub fn pending(&self) -> usize {
        self.queues.lock().iter().map(VecDeque::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_wire_format() {
        let action: CombatAction =
            serde_json::from_str(r#"{"type":"use_ability","ability_id":"fireball","target_position":{"x":5,"y":6}}"#)
                .unwrap();
        assert_eq!(
            action,
            CombatAction::UseAbility {
                ability_id: "fireball".into(),
                target_position: Some(Vec2::new(5.0, 6.0)),
            }
        );

        let stop: CombatAction = serde_json::from_str(r#"{"type":"stop_move"}"#).unwrap();
        assert_eq!(stop, CombatAction::StopMove);

        let basic: CombatAction = serde_json::from_str(r#"{"type":"basic_attack"}"#).unwrap();
        assert_eq!(basic.kind(), "basic_attack");
    }

    #[test]
    fn drain_orders_by_participant_then_fifo() {
        let queue = InputQueue::new(vec!["p1".into(), "p2".into()]);
        assert!(queue.push("p2", CombatAction::StopMove));
        assert!(queue.push("p1", CombatAction::BasicAttack { target_position: None }));
        assert!(queue.push("p1", CombatAction::StopMove));
        assert!(!queue.push("intruder", CombatAction::StopMove));
        assert_eq!(queue.pending(), 3);

        let drained = queue.drain();
        let order: Vec<(&str, &str)> = drained
            .iter()
            .map(|(p, a)| (p.as_str(), a.kind()))
            .collect();
        assert_eq!(
            order,
            vec![("p1", "basic_attack"), ("p1", "stop_move"), ("p2", "stop_move")]
        );
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn queue_is_bounded() {
        let queue = InputQueue::new(vec!["p1".into()]);
        for _ in 0..MAX_QUEUED_ACTIONS {
            assert!(queue.push("p1", CombatAction::StopMove));
        }
        assert!(!queue.push("p1", CombatAction::StopMove));
    }

    #[test]
    fn concurrent_pushes_survive_interleaved_drains() {
        const PER_PLAYER: usize = 50;
        let queue = InputQueue::new(vec!["p1".into(), "p2".into()]);

        let drained = std::thread::scope(|scope| {
            for player in ["p1", "p2"] {
                let queue = &queue;
                scope.spawn(move || {
                    for i in 0..PER_PLAYER {
                        let direction = Vec2::new(i as f32, 0.0);
                        assert!(queue.push(player, CombatAction::StartMove { direction }));
                    }
                });
            }

            let mut drained = Vec::new();
            while drained.len() < 2 * PER_PLAYER {
                drained.extend(queue.drain());
                std::thread::yield_now();
            }
            drained
        });

        for player in ["p1", "p2"] {
            let xs: Vec<f32> = drained
                .iter()
                .filter(|(p, _)| p == player)
                .map(|(_, action)| match action {
                    CombatAction::StartMove { direction } => direction.x,
                    other => panic!("unexpected {:?}", other),
                })
                .collect();
            let expected: Vec<f32> = (0..PER_PLAYER).map(|i| i as f32).collect();
            assert_eq!(xs, expected, "{}", player);
        }
        assert_eq!(queue.pending(), 0);
    }
}
