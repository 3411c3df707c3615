//! Unit and ability definitions consumed by the simulation
//!
//! The catalog is supplied by the strategy layer with each combat request and
//! is never mutated. Raw definitions keep every field optional the way presets
//! author them; [`AbilityDefinition::effect`] resolves them once into an
//! [`AbilityEffect`] with the defaults applied.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Default ability cooldown (ms)
pub const DEFAULT_COOLDOWN_MS: u64 = 1000;
/// Default melee damage
pub const DEFAULT_MELEE_DAMAGE: f32 = 10.0;
/// Default straight/returning projectile speed (units per second)
pub const DEFAULT_PROJECTILE_SPEED: f32 = 120.0;
/// Default straight/returning projectile range
pub const DEFAULT_PROJECTILE_RANGE: f32 = 400.0;
/// Default straight/returning projectile damage
pub const DEFAULT_PROJECTILE_DAMAGE: f32 = 5.0;
/// Default area-effect projectile speed
pub const DEFAULT_AOE_SPEED: f32 = 90.0;
/// Default area-effect radius
pub const DEFAULT_AOE_RADIUS: f32 = 50.0;
/// Default area-effect zone lifetime (ms)
pub const DEFAULT_AOE_DURATION_MS: u64 = 3000;
/// Default interval between zone damage ticks (ms)
pub const DEFAULT_AOE_TICK_INTERVAL_MS: u64 = 500;
/// Default number of times one throw may hit the same unit
pub const DEFAULT_MAX_HITS_PER_UNIT: u32 = 1;
/// Fallback hitbox radius for definitions that omit it
pub const DEFAULT_HITBOX_RADIUS: f32 = 10.0;
/// Fallback combat speed for definitions that omit it
pub const DEFAULT_COMBAT_SPEED: f32 = 100.0;

/// Broad category of an ability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityCategory {
    Attack,
    Support,
    Movement,
    Passive,
}

/// Attack mechanism of an `attack` ability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackType {
    Melee,
    DirectProjectile,
    AoeProjectile,
    BoomerangProjectile,
}

/// Ability definition as authored in a preset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub category: AbilityCategory,
    #[serde(default)]
    pub attack_type: Option<AttackType>,
    #[serde(default)]
    pub damage: Option<f32>,
    /// Melee reach beyond both hitboxes, projectile travel distance, or
    /// outbound distance for returning projectiles
    #[serde(default)]
    pub range: Option<f32>,
    #[serde(default)]
    pub cooldown_ms: Option<u64>,
    #[serde(default)]
    pub projectile_speed: Option<f32>,
    #[serde(default)]
    pub aoe_radius: Option<f32>,
    #[serde(default)]
    pub aoe_duration_ms: Option<u64>,
    #[serde(default)]
    pub aoe_damage_per_tick: Option<f32>,
    #[serde(default)]
    pub aoe_tick_interval_ms: Option<u64>,
    #[serde(default)]
    pub impact_delay_ms: Option<u64>,
    #[serde(default)]
    pub max_hits_per_unit: Option<u32>,
}

/// Which flight behavior a non-area projectile uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileVariant {
    Direct,
    Boomerang,
}

/// Parameters of the ground zone left by an area-effect impact
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ZoneSpec {
    pub radius: f32,
    pub duration_ms: u64,
    pub damage_per_tick: Option<f32>,
    pub tick_interval_ms: u64,
}

/// Resolved behavior of an ability, matched once at dispatch
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AbilityEffect {
    /// Cone strike in front of the attacker. `range` is `None` when the
    /// definition leaves it to the attacker's hitbox radius.
    Melee { range: Option<f32>, damage: f32 },
    Projectile {
        variant: ProjectileVariant,
        speed: f32,
        range: f32,
        damage: f32,
        max_hits_per_unit: u32,
    },
    AreaEffect {
        speed: f32,
        impact_damage: f32,
        impact_delay_ms: Option<u64>,
        zone: ZoneSpec,
    },
    /// Only consumes its cooldown
    Utility,
    /// An `attack` with no mechanism; consumes its cooldown and is logged
    Misconfigured,
}

impl AbilityDefinition {
    pub fn cooldown_ms(&self) -> u64 {
        self.cooldown_ms.unwrap_or(DEFAULT_COOLDOWN_MS)
    }

    /// Resolve the definition into its effect, applying defaults
    pub fn effect(&self) -> AbilityEffect {
        if self.category != AbilityCategory::Attack {
            return AbilityEffect::Utility;
        }

        match self.attack_type {
            Some(AttackType::Melee) => AbilityEffect::Melee {
                range: self.range,
                damage: self.damage.unwrap_or(DEFAULT_MELEE_DAMAGE),
            },
            Some(attack @ (AttackType::DirectProjectile | AttackType::BoomerangProjectile)) => {
                let variant = if attack == AttackType::BoomerangProjectile {
                    ProjectileVariant::Boomerang
                } else {
                    ProjectileVariant::Direct
                };
                AbilityEffect::Projectile {
                    variant,
                    speed: self.projectile_speed.unwrap_or(DEFAULT_PROJECTILE_SPEED),
                    range: self.range.unwrap_or(DEFAULT_PROJECTILE_RANGE),
                    damage: self.damage.unwrap_or(DEFAULT_PROJECTILE_DAMAGE),
                    max_hits_per_unit: self.max_hits_per_unit.unwrap_or(DEFAULT_MAX_HITS_PER_UNIT),
                }
            }
            Some(AttackType::AoeProjectile) => AbilityEffect::AreaEffect {
                speed: self.projectile_speed.unwrap_or(DEFAULT_AOE_SPEED),
                impact_damage: self.damage.unwrap_or(0.0),
                impact_delay_ms: self.impact_delay_ms,
                zone: ZoneSpec {
                    radius: self.aoe_radius.unwrap_or(DEFAULT_AOE_RADIUS),
                    duration_ms: self.aoe_duration_ms.unwrap_or(DEFAULT_AOE_DURATION_MS),
                    damage_per_tick: self.aoe_damage_per_tick,
                    tick_interval_ms: self
                        .aoe_tick_interval_ms
                        .unwrap_or(DEFAULT_AOE_TICK_INTERVAL_MS),
                },
            },
            None => AbilityEffect::Misconfigured,
        }
    }
}

/// Combat-relevant definition of a unit type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub max_hp: f32,
    #[serde(default = "default_combat_speed")]
    pub combat_speed: f32,
    #[serde(default = "default_hitbox_radius")]
    pub hitbox_radius: f32,
    /// Ordered; the first entry doubles as the basic attack
    #[serde(default)]
    pub combat_abilities: Vec<AbilityDefinition>,
}

fn default_combat_speed() -> f32 {
    DEFAULT_COMBAT_SPEED
}

fn default_hitbox_radius() -> f32 {
    DEFAULT_HITBOX_RADIUS
}

impl UnitDefinition {
    pub fn ability(&self, ability_id: &str) -> Option<&AbilityDefinition> {
        self.combat_abilities.iter().find(|a| a.id == ability_id)
    }

    pub fn basic_ability(&self) -> Option<&AbilityDefinition> {
        self.combat_abilities.first()
    }
}

/// Read-only lookup of unit definitions by id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitCatalog {
    units: HashMap<String, UnitDefinition>,
}

impl UnitCatalog {
    pub fn new(units: HashMap<String, UnitDefinition>) -> Self {
        Self { units }
    }

    pub fn get(&self, definition_id: &str) -> Option<&UnitDefinition> {
        self.units.get(definition_id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl FromIterator<UnitDefinition> for UnitCatalog {
    fn from_iter<I: IntoIterator<Item = UnitDefinition>>(iter: I) -> Self {
        Self {
            units: iter.into_iter().map(|u| (u.id.clone(), u)).collect(),
        }
    }
}
