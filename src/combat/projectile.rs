//! Projectiles and their per-variant flight rules

use std::collections::BTreeMap;
use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use super::catalog::ZoneSpec;
use super::math::{angle_between, ArenaBounds, Vec2};

/// Collision radius of every non-area projectile
pub const PROJECTILE_RADIUS: f32 = 5.0;
/// How long a unit is immune to the same projectile after being hit (ms)
pub const PROJECTILE_HIT_COOLDOWN_MS: u64 = 500;
/// Max steering of a returning projectile (radians per second)
pub const BOOMERANG_TURN_RATE: f32 = TAU;
/// Extra lifetime granted to returning projectiles (ms)
pub const BOOMERANG_LIFESPAN_BUFFER_MS: u64 = 1000;

/// Travel phase of a returning projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoomerangPhase {
    Outbound,
    Returning,
}

/// Variant-specific projectile data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum ProjectileKind {
    Direct {
        start_position: Vec2,
        max_range: f32,
    },
    Boomerang {
        start_position: Vec2,
        max_range: f32,
        phase: BoomerangPhase,
        max_hits_per_unit: u32,
    },
    AreaEffect {
        target_position: Vec2,
        radius: f32,
        impact_at_ms: u64,
        #[serde(skip)]
        zone: ZoneSpec,
    },
}

/// A projectile in flight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileState {
    pub id: String,
    pub owner_unit_id: String,
    pub ability_id: String,
    pub position: Vec2,
    pub velocity: Vec2,
    pub speed: f32,
    pub damage: f32,
    pub radius: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at_ms: Option<u64>,
    #[serde(flatten)]
    pub kind: ProjectileKind,

    /// Unit id -> times hit by this throw
    #[serde(skip)]
    pub hits: BTreeMap<String, u32>,
    /// Unit id -> clock time until which it cannot be hit again
    #[serde(skip)]
    pub hit_cooldowns: BTreeMap<String, u64>,
}

/// Result of advancing a projectile by one step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Flight {
    Flying,
    Retired,
    /// Area-effect projectile reached its impact time; spawn a zone
    Impact { center: Vec2, zone: ZoneSpec },
}

/// Travel time in ms for `distance` at `speed` units per second
pub fn travel_time_ms(distance: f32, speed: f32) -> u64 {
    if speed <= 0.0 || !speed.is_finite() {
        return 0;
    }
    ((distance / speed) * 1000.0).round().max(0.0) as u64
}

impl ProjectileState {
    /// Straight projectile launched from `origin` along `direction`
    #[allow(clippy::too_many_arguments)]
    pub fn direct(
        id: String,
        owner_unit_id: &str,
        ability_id: &str,
        origin: Vec2,
        direction: Vec2,
        speed: f32,
        range: f32,
        damage: f32,
        now_ms: u64,
    ) -> Self {
        Self {
            id,
            owner_unit_id: owner_unit_id.to_string(),
            ability_id: ability_id.to_string(),
            position: origin,
            velocity: direction.normalize() * speed,
            speed,
            damage,
            radius: PROJECTILE_RADIUS,
            expires_at_ms: Some(now_ms.saturating_add(travel_time_ms(range, speed))),
            kind: ProjectileKind::Direct {
                start_position: origin,
                max_range: range,
            },
            hits: BTreeMap::new(),
            hit_cooldowns: BTreeMap::new(),
        }
    }

    /// Returning projectile; lives long enough for the round trip plus a buffer
    #[allow(clippy::too_many_arguments)]
    pub fn boomerang(
        id: String,
        owner_unit_id: &str,
        ability_id: &str,
        origin: Vec2,
        direction: Vec2,
        speed: f32,
        range: f32,
        damage: f32,
        max_hits_per_unit: u32,
        now_ms: u64,
    ) -> Self {
        let lifespan = travel_time_ms(range, speed)
            .saturating_mul(2)
            .saturating_add(BOOMERANG_LIFESPAN_BUFFER_MS);
        Self {
            id,
            owner_unit_id: owner_unit_id.to_string(),
            ability_id: ability_id.to_string(),
            position: origin,
            velocity: direction.normalize() * speed,
            speed,
            damage,
            radius: PROJECTILE_RADIUS,
            expires_at_ms: Some(now_ms.saturating_add(lifespan)),
            kind: ProjectileKind::Boomerang {
                start_position: origin,
                max_range: range,
                phase: BoomerangPhase::Outbound,
                max_hits_per_unit,
            },
            hits: BTreeMap::new(),
            hit_cooldowns: BTreeMap::new(),
        }
    }

    /// Lobbed projectile aimed at `target`. Impacts after `impact_delay_ms`,
    /// or after the travel time when no delay is configured.
    #[allow(clippy::too_many_arguments)]
    pub fn area_effect(
        id: String,
        owner_unit_id: &str,
        ability_id: &str,
        origin: Vec2,
        target: Vec2,
        speed: f32,
        impact_damage: f32,
        impact_delay_ms: Option<u64>,
        zone: ZoneSpec,
        now_ms: u64,
    ) -> Self {
        let delay = impact_delay_ms.unwrap_or_else(|| travel_time_ms(origin.distance(target), speed));
        Self {
            id,
            owner_unit_id: owner_unit_id.to_string(),
            ability_id: ability_id.to_string(),
            position: origin,
            velocity: (target - origin).normalize() * speed,
            speed,
            damage: impact_damage,
            radius: zone.radius,
            expires_at_ms: None,
            kind: ProjectileKind::AreaEffect {
                target_position: target,
                radius: zone.radius,
                impact_at_ms: now_ms.saturating_add(delay),
                zone,
            },
            hits: BTreeMap::new(),
            hit_cooldowns: BTreeMap::new(),
        }
    }

    /// Area-effect projectiles never collide with units directly
    pub fn collides(&self) -> bool {
        !matches!(self.kind, ProjectileKind::AreaEffect { .. })
    }

    /// Advance one step.
    ///
    /// `owner` is the owning unit's position and hitbox radius, or `None`
    /// if it no longer exists.
    pub fn advance(
        &mut self,
        dt: f32,
        now_ms: u64,
        owner: Option<(Vec2, f32)>,
        bounds: &ArenaBounds,
    ) -> Flight {
        let expired = self.expires_at_ms.is_some_and(|at| now_ms >= at);

        let flight = match &mut self.kind {
            ProjectileKind::Direct {
                start_position,
                max_range,
            } => {
                self.position += self.velocity * dt;
                if self.position.distance_sq(*start_position) >= *max_range * *max_range || expired {
                    Flight::Retired
                } else {
                    Flight::Flying
                }
            }
            ProjectileKind::Boomerang {
                start_position,
                max_range,
                phase,
                ..
            } => {
                self.position += self.velocity * dt;
                if *phase == BoomerangPhase::Outbound
                    && self.position.distance_sq(*start_position) >= *max_range * *max_range
                {
                    *phase = BoomerangPhase::Returning;
                }

                let mut flight = Flight::Flying;
                if *phase == BoomerangPhase::Returning {
                    match owner {
                        Some((owner_position, owner_radius)) => {
                            self.velocity = steer(self.velocity, owner_position - self.position, self.speed, dt);
                            if self.position.distance_sq(owner_position) <= owner_radius * owner_radius {
                                flight = Flight::Retired;
                            }
                        }
                        None => flight = Flight::Retired,
                    }
                }
                if expired {
                    flight = Flight::Retired;
                }
                flight
            }
            ProjectileKind::AreaEffect {
                target_position,
                impact_at_ms,
                zone,
                ..
            } => {
                // Travel toward the target and hold there until impact
                let step = self.velocity * dt;
                let remaining = *target_position - self.position;
                if step.length_sq() >= remaining.length_sq() {
                    self.position = *target_position;
                    self.velocity = Vec2::ZERO;
                } else {
                    self.position += step;
                }

                if now_ms >= *impact_at_ms {
                    Flight::Impact {
                        center: *target_position,
                        zone: *zone,
                    }
                } else {
                    Flight::Flying
                }
            }
        };

        match flight {
            Flight::Flying if !bounds.contains(self.position) => Flight::Retired,
            other => other,
        }
    }

    /// Whether `unit_id` may be hit by this projectile right now
    pub fn can_hit(&self, unit_id: &str, now_ms: u64) -> bool {
        if self
            .hit_cooldowns
            .get(unit_id)
            .is_some_and(|until| now_ms < *until)
        {
            return false;
        }
        match &self.kind {
            ProjectileKind::Boomerang {
                max_hits_per_unit, ..
            } => self.hits.get(unit_id).copied().unwrap_or(0) < *max_hits_per_unit,
            _ => true,
        }
    }

    /// Record a hit. Returns true if the projectile is consumed by it.
    pub fn register_hit(&mut self, unit_id: &str, now_ms: u64) -> bool {
        self.hit_cooldowns.insert(
            unit_id.to_string(),
            now_ms.saturating_add(PROJECTILE_HIT_COOLDOWN_MS),
        );
        *self.hits.entry(unit_id.to_string()).or_insert(0) += 1;
        matches!(self.kind, ProjectileKind::Direct { .. })
    }

    pub fn boomerang_phase(&self) -> Option<BoomerangPhase> {
        match &self.kind {
            ProjectileKind::Boomerang { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

/// Turn `velocity` toward `desired` by at most the turn rate, keeping speed
fn steer(velocity: Vec2, desired: Vec2, speed: f32, dt: f32) -> Vec2 {
    if desired.is_zero() || velocity.is_zero() {
        return velocity;
    }
    let max_turn = BOOMERANG_TURN_RATE * dt;
    let turn = angle_between(velocity, desired).clamp(-max_turn, max_turn);
    velocity.rotate(turn).normalize() * speed
}
