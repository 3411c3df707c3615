//! Snapshot, event and outcome types emitted by an instance

use serde::{Deserialize, Serialize};

use super::projectile::ProjectileState;
use super::unit::CombatUnitState;
use super::zone::AoEZoneState;

/// Lifecycle of a combat instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatStatus {
    Active,
    Terminating,
    Ended,
}

/// Full state of one instance at the end of a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatSnapshot {
    pub match_id: String,
    /// Simulation clock (ms since the instance started)
    pub clock_ms: u64,
    pub status: CombatStatus,
    pub units: Vec<CombatUnitState>,
    pub projectiles: Vec<ProjectileState>,
    pub aoe_zones: Vec<AoEZoneState>,
}

impl CombatSnapshot {
    pub fn unit(&self, unit_id: &str) -> Option<&CombatUnitState> {
        self.units.iter().find(|u| u.id == unit_id)
    }
}

/// Discrete hit notification produced during a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CombatEvent {
    MeleeHit {
        attacker_id: String,
        target_id: String,
        ability_id: String,
        damage_dealt: f32,
    },
    ProjectileHit {
        projectile_id: String,
        attacker_id: String,
        target_id: String,
        damage_dealt: f32,
        ability_id: String,
    },
}

/// Why an instance ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Knockout,
    TimeLimit,
}

/// Final result of an instance, reported exactly once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CombatOutcome {
    Victory {
        winner_unit_id: String,
        loser_unit_id: String,
        winner_hp: f32,
        reason: EndReason,
    },
    Draw {
        unit_ids: Vec<String>,
        reason: EndReason,
    },
}

impl CombatOutcome {
    pub fn reason(&self) -> EndReason {
        match self {
            CombatOutcome::Victory { reason, .. } | CombatOutcome::Draw { reason, .. } => *reason,
        }
    }
}

/// Everything a single `update` produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub events: Vec<CombatEvent>,
    /// Present only while the instance is still active after the tick
    pub snapshot: Option<CombatSnapshot>,
    /// Present only on the tick the instance ended
    pub outcome: Option<CombatOutcome>,
}
