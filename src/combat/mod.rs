//! Real-time combat simulation

pub mod action;
pub mod catalog;
pub mod collision;
pub mod error;
pub mod ids;
pub mod instance;
pub mod manager;
pub mod math;
pub mod projectile;
pub mod snapshot;
pub mod unit;
pub mod zone;

pub use action::{CombatAction, InputQueue};
pub use catalog::{AbilityDefinition, UnitCatalog, UnitDefinition};
pub use error::CombatError;
pub use ids::{IdGenerator, SequentialIds, UuidIds};
pub use instance::{ArenaRules, BoardUnit, CombatInstance, GameSnapshot, ProximityTap};
pub use manager::{CombatManager, CombatRequest};
pub use snapshot::{CombatEvent, CombatOutcome, CombatSnapshot, CombatStatus, EndReason, TickReport};
