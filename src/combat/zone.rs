//! Ground zones left behind by area-effect impacts

use serde::{Deserialize, Serialize};

use super::catalog::ZoneSpec;
use super::math::Vec2;

/// Time-bounded circular damage zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AoEZoneState {
    pub id: String,
    pub owner_unit_id: String,
    pub ability_id: String,
    pub position: Vec2,
    pub radius: f32,
    pub expires_at_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damage_per_tick: Option<f32>,
    pub tick_interval_ms: u64,
    #[serde(skip)]
    pub last_tick_ms: u64,
}

impl AoEZoneState {
    pub fn from_impact(
        id: String,
        owner_unit_id: &str,
        ability_id: &str,
        center: Vec2,
        spec: ZoneSpec,
        now_ms: u64,
    ) -> Self {
        Self {
            id,
            owner_unit_id: owner_unit_id.to_string(),
            ability_id: ability_id.to_string(),
            position: center,
            radius: spec.radius,
            expires_at_ms: now_ms.saturating_add(spec.duration_ms),
            damage_per_tick: spec.damage_per_tick,
            tick_interval_ms: spec.tick_interval_ms,
            last_tick_ms: now_ms,
        }
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }

    /// Damage to apply this step, if a tick is due. Marks the tick as done.
    pub fn take_tick(&mut self, now_ms: u64) -> Option<f32> {
        let damage = self.damage_per_tick.filter(|d| *d > 0.0)?;
        if now_ms < self.last_tick_ms.saturating_add(self.tick_interval_ms) {
            return None;
        }
        self.last_tick_ms = now_ms;
        Some(damage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(damage_per_tick: Option<f32>) -> AoEZoneState {
        AoEZoneState::from_impact(
            "aoe_1".into(),
            "u1",
            "fireball",
            Vec2::new(10.0, 10.0),
            ZoneSpec {
                radius: 50.0,
                duration_ms: 3000,
                damage_per_tick,
                tick_interval_ms: 500,
            },
            1000,
        )
    }

    #[test]
    fn ticks_once_per_interval() {
        let mut z = zone(Some(4.0));
        assert_eq!(z.take_tick(1000), None);
        assert_eq!(z.take_tick(1450), None);
        assert_eq!(z.take_tick(1500), Some(4.0));
        assert_eq!(z.take_tick(1550), None);
        assert_eq!(z.take_tick(2000), Some(4.0));
    }

    #[test]
    fn expiry_is_inclusive() {
        let z = zone(None);
        assert!(!z.is_expired(3999));
        assert!(z.is_expired(4000));
    }

    #[test]
    fn zone_without_tick_damage_never_ticks() {
        let mut z = zone(None);
        assert_eq!(z.take_tick(10_000), None);
        let mut zero = zone(Some(0.0));
        assert_eq!(zero.take_tick(10_000), None);
    }
}
