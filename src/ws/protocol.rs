//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

use crate::combat::{CombatAction, CombatEvent, CombatOutcome, CombatSnapshot, EndReason};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Movement or ability input for the player's unit
    CombatAction {
        action: CombatAction,
    },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Combat instance created
    CombatStarted {
        match_id: String,
        initial_snapshot: CombatSnapshot,
        attacker_unit_id: String,
        defender_unit_id: String,
        player_ids: Vec<String>,
    },

    /// Full state at the end of a tick
    CombatStateUpdate {
        snapshot: CombatSnapshot,
    },

    MeleeHit {
        match_id: String,
        attacker_id: String,
        target_id: String,
        ability_id: String,
        damage_dealt: f32,
    },

    ProjectileHit {
        match_id: String,
        projectile_id: String,
        attacker_id: String,
        target_id: String,
        damage_dealt: f32,
        ability_id: String,
    },

    /// Combat finished. Winner fields are absent on a draw.
    CombatEnded {
        match_id: String,
        winner_id: Option<String>,
        loser_id: Option<String>,
        winner_hp: Option<f32>,
        reason: EndReason,
    },

    /// Error message
    Error {
        code: String,
        message: String,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

impl ServerMsg {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerMsg::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn from_event(match_id: &str, event: CombatEvent) -> Self {
        match event {
            CombatEvent::MeleeHit {
                attacker_id,
                target_id,
                ability_id,
                damage_dealt,
            } => ServerMsg::MeleeHit {
                match_id: match_id.to_string(),
                attacker_id,
                target_id,
                ability_id,
                damage_dealt,
            },
            CombatEvent::ProjectileHit {
                projectile_id,
                attacker_id,
                target_id,
                damage_dealt,
                ability_id,
            } => ServerMsg::ProjectileHit {
                match_id: match_id.to_string(),
                projectile_id,
                attacker_id,
                target_id,
                damage_dealt,
                ability_id,
            },
        }
    }

    pub fn combat_ended(match_id: &str, outcome: &CombatOutcome) -> Self {
        match outcome {
            CombatOutcome::Victory {
                winner_unit_id,
                loser_unit_id,
                winner_hp,
                reason,
            } => ServerMsg::CombatEnded {
                match_id: match_id.to_string(),
                winner_id: Some(winner_unit_id.clone()),
                loser_id: Some(loser_unit_id.clone()),
                winner_hp: Some(*winner_hp),
                reason: *reason,
            },
            CombatOutcome::Draw { reason, .. } => ServerMsg::CombatEnded {
                match_id: match_id.to_string(),
                winner_id: None,
                loser_id: None,
                winner_hp: None,
                reason: *reason,
            },
        }
    }
}

/// Server message addressed to everyone watching one match
#[derive(Debug, Clone)]
pub struct RoomMessage {
    pub match_id: String,
    pub msg: ServerMsg,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::math::Vec2;

    #[test]
    fn client_messages_parse() {
        let msg: ClientMsg = serde_json::from_str(
            r#"{"type":"combat_action","action":{"type":"start_move","direction":{"x":1.0,"y":0.0}}}"#,
        )
        .unwrap();
        match msg {
            ClientMsg::CombatAction {
                action: CombatAction::StartMove { direction },
            } => assert_eq!(direction, Vec2::new(1.0, 0.0)),
            other => panic!("unexpected {:?}", other),
        }

        let ping: ClientMsg = serde_json::from_str(r#"{"type":"ping","t":42}"#).unwrap();
        assert!(matches!(ping, ClientMsg::Ping { t: 42 }));
    }

    #[test]
    fn unknown_client_message_is_rejected() {
        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"teleport"}"#).is_err());
    }

    #[test]
    fn draw_has_no_winner_fields() {
        let msg = ServerMsg::combat_ended(
            "m1",
            &CombatOutcome::Draw {
                unit_ids: vec!["a".into(), "b".into()],
                reason: EndReason::Knockout,
            },
        );
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "combat_ended");
        assert!(json["winner_id"].is_null());
        assert_eq!(json["reason"], "knockout");
    }

    #[test]
    fn events_carry_match_id() {
        let msg = ServerMsg::from_event(
            "m1",
            CombatEvent::MeleeHit {
                attacker_id: "a".into(),
                target_id: "b".into(),
                ability_id: "slash".into(),
                damage_dealt: 12.0,
            },
        );
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "melee_hit");
        assert_eq!(json["match_id"], "m1");
        assert_eq!(json["damage_dealt"], 12.0);
    }
}
