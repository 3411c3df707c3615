//! Runtime state of a combatant

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::catalog::UnitDefinition;
use super::math::{ArenaBounds, Vec2, MOVING_EPSILON_SQ};

/// One of the two units fighting in an instance (authoritative)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatUnitState {
    pub id: String,
    pub owner: String,
    pub definition_id: String,

    // Position and movement
    pub position: Vec2,
    pub velocity: Vec2,
    pub facing: Vec2,
    pub last_movement_direction: Option<Vec2>,

    // Combat
    pub current_hp: f32,
    pub max_hp: f32,
    /// Ability id -> clock time (ms) at which it is usable again
    pub ability_cooldowns: BTreeMap<String, u64>,

    #[serde(skip)]
    pub intended_direction: Vec2,
    #[serde(skip)]
    pub hitbox_radius: f32,
    #[serde(skip)]
    pub combat_speed: f32,
    #[serde(skip)]
    pub proximity_ready_at_ms: u64,
}

impl CombatUnitState {
    /// Build a combatant. HP is clamped into [0, max_hp], cooldowns start ready.
    pub fn new(
        id: impl Into<String>,
        owner: impl Into<String>,
        definition: &UnitDefinition,
        current_hp: f32,
        position: Vec2,
        facing: Vec2,
        now_ms: u64,
    ) -> Self {
        let max_hp = definition.max_hp.max(0.0);
        let current_hp = if current_hp.is_finite() {
            current_hp.clamp(0.0, max_hp)
        } else {
            max_hp
        };

        Self {
            id: id.into(),
            owner: owner.into(),
            definition_id: definition.id.clone(),
            position,
            velocity: Vec2::ZERO,
            facing,
            last_movement_direction: None,
            current_hp,
            max_hp,
            ability_cooldowns: definition
                .combat_abilities
                .iter()
                .map(|a| (a.id.clone(), now_ms))
                .collect(),
            intended_direction: Vec2::ZERO,
            hitbox_radius: definition.hitbox_radius.max(0.0),
            combat_speed: definition.combat_speed.max(0.0),
            proximity_ready_at_ms: now_ms,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.current_hp > 0.0
    }

    pub fn is_moving(&self) -> bool {
        self.velocity.length_sq() > MOVING_EPSILON_SQ
    }

    /// Direction used for melee cones and projectile launches:
    /// current velocity, then last movement direction, then +x.
    /// `facing` is reported to clients only and never aims.
    pub fn aim_direction(&self) -> Vec2 {
        if self.is_moving() {
            return self.velocity.normalize();
        }
        self.last_movement_direction.unwrap_or(Vec2::RIGHT)
    }

    pub fn ability_ready(&self, ability_id: &str, now_ms: u64) -> bool {
        now_ms >= self.ability_cooldowns.get(ability_id).copied().unwrap_or(0)
    }

    pub fn start_cooldown(&mut self, ability_id: &str, now_ms: u64, cooldown_ms: u64) {
        self.ability_cooldowns
            .insert(ability_id.to_string(), now_ms.saturating_add(cooldown_ms));
    }

    /// Subtract damage, clamping HP at 0. Returns true if this hit was lethal.
    pub fn apply_damage(&mut self, damage: f32) -> bool {
        let was_alive = self.is_alive();
        let damage = damage.max(0.0);
        self.current_hp = (self.current_hp - damage).max(0.0);
        was_alive && !self.is_alive()
    }

    pub fn set_intended_direction(&mut self, direction: Vec2) {
        self.intended_direction = direction.normalize();
        if !self.intended_direction.is_zero() {
            self.facing = self.intended_direction;
        }
    }

    pub fn stop(&mut self) {
        self.intended_direction = Vec2::ZERO;
        self.velocity = Vec2::ZERO;
    }

    /// Integrate one step of movement and keep the hitbox inside the arena
    pub fn integrate(&mut self, dt: f32, bounds: &ArenaBounds) {
        if !self.is_alive() {
            self.velocity = Vec2::ZERO;
            return;
        }

        self.velocity = self.intended_direction * self.combat_speed;
        self.position += self.velocity * dt;

        if self.is_moving() {
            let direction = self.velocity.normalize();
            self.facing = direction;
            self.last_movement_direction = Some(direction);
        }

        self.position = bounds.clamp_circle(self.position, self.hitbox_radius);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::catalog::{AbilityCategory, AbilityDefinition};

    fn definition() -> UnitDefinition {
        UnitDefinition {
            id: "knight".into(),
            name: "Knight".into(),
            max_hp: 100.0,
            combat_speed: 100.0,
            hitbox_radius: 10.0,
            combat_abilities: vec![AbilityDefinition {
                id: "sword".into(),
                name: String::new(),
                category: AbilityCategory::Attack,
                attack_type: None,
                damage: None,
                range: None,
                cooldown_ms: None,
                projectile_speed: None,
                aoe_radius: None,
                aoe_duration_ms: None,
                aoe_damage_per_tick: None,
                aoe_tick_interval_ms: None,
                impact_delay_ms: None,
                max_hits_per_unit: None,
            }],
        }
    }

    fn unit() -> CombatUnitState {
        CombatUnitState::new("u1", "p1", &definition(), 250.0, Vec2::new(100.0, 100.0), Vec2::RIGHT, 0)
    }

    #[test]
    fn initial_hp_is_clamped() {
        let u = unit();
        assert_eq!(u.current_hp, 100.0);
        assert!(u.ability_ready("sword", 0));
    }

    #[test]
    fn damage_clamps_and_reports_lethal_once() {
        let mut u = unit();
        assert!(!u.apply_damage(60.0));
        assert!(u.apply_damage(60.0));
        assert_eq!(u.current_hp, 0.0);
        assert!(!u.apply_damage(10.0));
        assert!(!u.apply_damage(-50.0));
        assert_eq!(u.current_hp, 0.0);
    }

    #[test]
    fn cooldown_gates_until_end() {
        let mut u = unit();
        u.start_cooldown("sword", 100, 1000);
        assert!(!u.ability_ready("sword", 1099));
        assert!(u.ability_ready("sword", 1100));
    }

    #[test]
    fn integrate_tracks_direction_and_clamps() {
        let bounds = ArenaBounds::new(200.0, 200.0);
        let mut u = unit();
        u.set_intended_direction(Vec2::new(0.0, -5.0));
        for _ in 0..40 {
            u.integrate(0.05, &bounds);
        }
        assert_eq!(u.position.y, 10.0);
        assert_eq!(u.last_movement_direction, Some(Vec2::new(0.0, -1.0)));

        u.stop();
        u.integrate(0.05, &bounds);
        assert!(!u.is_moving());
        assert_eq!(u.aim_direction(), Vec2::new(0.0, -1.0));
    }

    #[test]
    fn unit_that_never_moved_aims_right_regardless_of_facing() {
        let mut u = unit();
        u.facing = Vec2::LEFT;
        assert_eq!(u.aim_direction(), Vec2::RIGHT);

        // Intent alone is not movement
        u.set_intended_direction(Vec2::new(0.0, 1.0));
        assert_eq!(u.aim_direction(), Vec2::RIGHT);
    }
}
