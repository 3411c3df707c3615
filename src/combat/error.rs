//! Combat error types

use thiserror::Error;

/// Structural failures surfaced to whoever asked for a combat
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CombatError {
    #[error("Combat already active for match {0}")]
    AlreadyActive(String),
    #[error("Unit {0} not found in game state")]
    UnitNotFound(String),
    #[error("No definition {definition_id} for unit {unit_id}")]
    MissingDefinition {
        unit_id: String,
        definition_id: String,
    },
    #[error("A unit cannot fight itself ({0})")]
    SameUnit(String),
    #[error("Units {0} and {1} belong to the same player")]
    SameOwner(String, String),
    #[error("Invalid arena {width}x{height}")]
    InvalidArena { width: f32, height: f32 },
}

impl CombatError {
    /// Stable code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            CombatError::AlreadyActive(_) => "combat_already_active",
            CombatError::UnitNotFound(_) => "unit_not_found",
            CombatError::MissingDefinition { .. } => "missing_definition",
            CombatError::SameUnit(_) => "same_unit",
            CombatError::SameOwner(_, _) => "same_owner",
            CombatError::InvalidArena { .. } => "invalid_arena",
        }
    }
}
