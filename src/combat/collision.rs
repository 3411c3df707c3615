//! Hit detection: melee cones, projectile overlap, area damage

use std::f32::consts::FRAC_PI_4;

use super::math::{angle_between, circles_overlap, Vec2};
use super::projectile::ProjectileState;
use super::unit::CombatUnitState;

/// Half-angle of the melee cone (90 degrees total)
pub const MELEE_CONE_HALF_ANGLE: f32 = FRAC_PI_4;

/// Collision checks shared by the instance pipeline
pub struct CollisionSystem;

impl CollisionSystem {
    /// Whether `target` is reachable by a melee strike from `attacker`
    /// with the given reach beyond both hitboxes
    pub fn melee_hits(attacker: &CombatUnitState, facing: Vec2, range: f32, target: &CombatUnitState) -> bool {
        let reach = range + attacker.hitbox_radius + target.hitbox_radius;
        if attacker.position.distance_sq(target.position) > reach * reach {
            return false;
        }
        Self::in_cone(attacker.position, facing, target.position, MELEE_CONE_HALF_ANGLE)
    }

    /// Whether `point` lies within `half_angle` of `facing` as seen from `origin`
    pub fn in_cone(origin: Vec2, facing: Vec2, point: Vec2, half_angle: f32) -> bool {
        let to_point = point - origin;
        if to_point.is_zero() {
            return true;
        }
        angle_between(facing, to_point).abs() <= half_angle
    }

    /// Projectile body overlaps the unit's hitbox
    pub fn projectile_hits(projectile: &ProjectileState, unit: &CombatUnitState) -> bool {
        circles_overlap(projectile.position, projectile.radius, unit.position, unit.hitbox_radius)
    }

    /// Units of opposing owners within `radius` of each other's centers
    pub fn within_radius(a: &CombatUnitState, b: &CombatUnitState, radius: f32) -> bool {
        a.position.distance_sq(b.position) <= radius * radius
    }

    /// Damage every living unit not owned by `attacker_owner` (and not
    /// `exclude`) whose center lies within `radius` of `center`. Returns the
    /// ids of the units hit.
    pub fn apply_area_damage(
        units: &mut [CombatUnitState],
        center: Vec2,
        radius: f32,
        damage: f32,
        attacker_owner: &str,
        exclude: Option<&str>,
    ) -> Vec<String> {
        let radius_sq = radius * radius;
        units
            .iter_mut()
            .filter(|u| u.is_alive() && u.owner != attacker_owner)
            .filter(|u| exclude != Some(u.id.as_str()))
            .filter(|u| u.position.distance_sq(center) <= radius_sq)
            .map(|u| {
                u.apply_damage(damage);
                u.id.clone()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::catalog::UnitDefinition;

    fn unit(id: &str, owner: &str, x: f32, y: f32) -> CombatUnitState {
        let def = UnitDefinition {
            id: "grunt".into(),
            name: String::new(),
            max_hp: 50.0,
            combat_speed: 100.0,
            hitbox_radius: 10.0,
            combat_abilities: Vec::new(),
        };
        CombatUnitState::new(id, owner, &def, 50.0, Vec2::new(x, y), Vec2::RIGHT, 0)
    }

    #[test]
    fn melee_range_includes_hitboxes() {
        let a = unit("a", "p1", 100.0, 100.0);
        assert!(CollisionSystem::melee_hits(&a, Vec2::RIGHT, 35.0, &unit("b", "p2", 155.0, 100.0)));
        assert!(!CollisionSystem::melee_hits(&a, Vec2::RIGHT, 35.0, &unit("b", "p2", 155.5, 100.0)));
    }

    #[test]
    fn melee_cone_edges() {
        let a = unit("a", "p1", 100.0, 100.0);
        // 45 degrees is inside, 90 and 180 are not
        assert!(CollisionSystem::melee_hits(&a, Vec2::RIGHT, 35.0, &unit("b", "p2", 120.0, 119.0)));
        assert!(!CollisionSystem::melee_hits(&a, Vec2::RIGHT, 35.0, &unit("b", "p2", 100.0, 140.0)));
        assert!(!CollisionSystem::melee_hits(&a, Vec2::RIGHT, 35.0, &unit("b", "p2", 60.0, 100.0)));
    }

    #[test]
    fn area_damage_skips_allies_and_dead() {
        let mut units = vec![
            unit("a", "p1", 100.0, 100.0),
            unit("b", "p2", 120.0, 100.0),
            unit("c", "p2", 300.0, 100.0),
        ];
        let hit = CollisionSystem::apply_area_damage(&mut units, Vec2::new(100.0, 100.0), 50.0, 20.0, "p1", None);
        assert_eq!(hit, vec!["b".to_string()]);
        assert_eq!(units[0].current_hp, 50.0);
        assert_eq!(units[1].current_hp, 30.0);
        assert_eq!(units[2].current_hp, 50.0);

        units[1].current_hp = 0.0;
        let hit = CollisionSystem::apply_area_damage(&mut units, Vec2::new(100.0, 100.0), 50.0, 20.0, "p1", None);
        assert!(hit.is_empty());
    }

    #[test]
    fn area_damage_skips_excluded_unit() {
        let mut units = vec![
            unit("a", "p1", 100.0, 100.0),
            unit("b", "p2", 110.0, 100.0),
            unit("c", "p2", 90.0, 100.0),
        ];
        let hit = CollisionSystem::apply_area_damage(&mut units, Vec2::new(100.0, 100.0), 50.0, 20.0, "p1", Some("c"));
        assert_eq!(hit, vec!["b".to_string()]);
        assert_eq!(units[1].current_hp, 30.0);
        assert_eq!(units[2].current_hp, 50.0);
    }
}
