//! A single authoritative combat between two units
//!
//! The instance owns every piece of per-match state and is advanced by the
//! scheduler through [`CombatInstance::update`]. Each update runs a fixed
//! pipeline: inputs, units, projectiles, zones, collisions, end condition.
//! Termination is returned in the [`TickReport`] rather than signalled
//! through a callback.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::util::time::delta_to_millis;

use super::action::{CombatAction, InputQueue};
use super::catalog::{AbilityEffect, ProjectileVariant, UnitCatalog, UnitDefinition};
use super::collision::CollisionSystem;
use super::error::CombatError;
use super::ids::IdGenerator;
use super::math::{ArenaBounds, Vec2};
use super::projectile::{Flight, ProjectileState};
use super::snapshot::{
    CombatEvent, CombatOutcome, CombatSnapshot, CombatStatus, EndReason, TickReport,
};
use super::unit::CombatUnitState;
use super::zone::AoEZoneState;

/// Ability id reported for proximity taps
pub const PROXIMITY_TAP_ABILITY_ID: &str = "basic_melee";

/// A unit as it stands on the strategy board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardUnit {
    pub id: String,
    pub owner: String,
    pub type_id: String,
    pub current_hp: f32,
}

/// Strategy-layer state handed over when combat starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Players in seating order; the first one fights from the left
    pub players: Vec<String>,
    pub units: Vec<BoardUnit>,
    pub unit_definitions: UnitCatalog,
    #[serde(default)]
    pub arena: ArenaBounds,
}

/// Baseline hit landed whenever opposing units stand close together
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximityTap {
    pub radius: f32,
    pub damage: f32,
    /// Minimum time between two taps from the same unit (ms)
    pub interval_ms: u64,
}

impl Default for ProximityTap {
    fn default() -> Self {
        Self {
            radius: 30.0,
            damage: 10.0,
            interval_ms: 500,
        }
    }
}

/// Per-server rules applied to every instance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArenaRules {
    pub proximity_tap: Option<ProximityTap>,
    /// Optional cap on combat length (ms of simulation time)
    pub time_limit_ms: Option<u64>,
}

impl Default for ArenaRules {
    fn default() -> Self {
        Self {
            proximity_tap: Some(ProximityTap::default()),
            time_limit_ms: None,
        }
    }
}

/// One running combat
pub struct CombatInstance {
    match_id: String,
    status: CombatStatus,
    clock_ms: u64,
    bounds: ArenaBounds,
    rules: ArenaRules,
    /// Attacker first, defender second
    units: Vec<CombatUnitState>,
    /// Definitions, index-aligned with `units`
    definitions: Vec<UnitDefinition>,
    projectiles: Vec<ProjectileState>,
    zones: Vec<AoEZoneState>,
    inputs: Arc<InputQueue>,
    ids: Arc<dyn IdGenerator>,
    outcome: Option<CombatOutcome>,
}

impl CombatInstance {
    /// Build an instance from the two board units about to fight
    pub fn new(
        match_id: impl Into<String>,
        attacker_id: &str,
        defender_id: &str,
        game: &GameSnapshot,
        rules: ArenaRules,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self, CombatError> {
        let match_id = match_id.into();

        if attacker_id == defender_id {
            return Err(CombatError::SameUnit(attacker_id.to_string()));
        }

        let bounds = game.arena;
        if !(bounds.width.is_finite() && bounds.height.is_finite())
            || bounds.width <= 0.0
            || bounds.height <= 0.0
        {
            return Err(CombatError::InvalidArena {
                width: bounds.width,
                height: bounds.height,
            });
        }

        let find = |id: &str| {
            game.units
                .iter()
                .find(|u| u.id == id)
                .ok_or_else(|| CombatError::UnitNotFound(id.to_string()))
        };
        let attacker = find(attacker_id)?;
        let defender = find(defender_id)?;

        if attacker.owner == defender.owner {
            return Err(CombatError::SameOwner(attacker.id.clone(), defender.id.clone()));
        }

        let definition = |unit: &BoardUnit| {
            game.unit_definitions
                .get(&unit.type_id)
                .cloned()
                .ok_or_else(|| CombatError::MissingDefinition {
                    unit_id: unit.id.clone(),
                    definition_id: unit.type_id.clone(),
                })
        };
        let definitions = vec![definition(attacker)?, definition(defender)?];

        // Player one fights from the left quarter facing right
        let defender_on_left = game.players.first() == Some(&defender.owner);
        let left = Vec2::new(bounds.width * 0.25, bounds.height / 2.0);
        let right = Vec2::new(bounds.width * 0.75, bounds.height / 2.0);
        let placement = |on_left: bool| {
            if on_left {
                (left, Vec2::RIGHT)
            } else {
                (right, Vec2::LEFT)
            }
        };

        let units = [attacker, defender]
            .into_iter()
            .zip(&definitions)
            .zip([!defender_on_left, defender_on_left])
            .map(|((board, def), on_left)| {
                let (position, facing) = placement(on_left);
                let position = bounds.clamp_circle(position, def.hitbox_radius);
                CombatUnitState::new(&board.id, &board.owner, def, board.current_hp, position, facing, 0)
            })
            .collect::<Vec<_>>();

        let inputs = Arc::new(InputQueue::new(vec![
            attacker.owner.clone(),
            defender.owner.clone(),
        ]));

        info!(
            match_id = %match_id,
            attacker = %attacker.id,
            defender = %defender.id,
            "Combat instance created"
        );

        Ok(Self {
            match_id,
            status: CombatStatus::Active,
            clock_ms: 0,
            bounds,
            rules,
            units,
            definitions,
            projectiles: Vec::new(),
            zones: Vec::new(),
            inputs,
            ids,
            outcome: None,
        })
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    pub fn status(&self) -> CombatStatus {
        self.status
    }

    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    pub fn outcome(&self) -> Option<&CombatOutcome> {
        self.outcome.as_ref()
    }

    /// Handle for enqueuing actions without locking the instance
    pub fn input_queue(&self) -> Arc<InputQueue> {
        Arc::clone(&self.inputs)
    }

    /// Attacker and defender unit ids
    pub fn unit_ids(&self) -> Vec<String> {
        self.units.iter().map(|u| u.id.clone()).collect()
    }

    pub fn player_ids(&self) -> &[String] {
        self.inputs.players()
    }

    pub fn unit_owner(&self, unit_id: &str) -> Option<&str> {
        self.unit(unit_id).map(|u| u.owner.as_str())
    }

    pub fn unit(&self, unit_id: &str) -> Option<&CombatUnitState> {
        self.unit_index(unit_id).map(|idx| &self.units[idx])
    }

    /// Queue an action for the next tick. Non-participants are ignored.
    pub fn queue_input_action(&self, player_id: &str, action: CombatAction) -> bool {
        if !self.inputs.is_participant(player_id) {
            warn!(match_id = %self.match_id, player_id = %player_id, "Input from non-participant");
            return false;
        }
        if !self.inputs.push(player_id, action) {
            debug!(match_id = %self.match_id, player_id = %player_id, "Input queue full, action dropped");
            return false;
        }
        true
    }

    pub fn snapshot(&self) -> CombatSnapshot {
        CombatSnapshot {
            match_id: self.match_id.clone(),
            clock_ms: self.clock_ms,
            status: self.status,
            units: self.units.clone(),
            projectiles: self.projectiles.clone(),
            aoe_zones: self.zones.clone(),
        }
    }

    /// Advance the simulation by `delta_secs`
    pub fn update(&mut self, delta_secs: f32) -> TickReport {
        if self.status != CombatStatus::Active {
            return TickReport::default();
        }

        let dt = if delta_secs.is_finite() {
            delta_secs.max(0.0)
        } else {
            0.0
        };
        self.clock_ms = self.clock_ms.saturating_add(delta_to_millis(dt));

        let mut events = Vec::new();
        self.process_inputs(&mut events);
        self.advance_units(dt);
        self.advance_projectiles(dt);
        self.advance_zones();
        self.detect_collisions(&mut events);
        let outcome = self.check_end_condition();

        let snapshot = (self.status == CombatStatus::Active).then(|| self.snapshot());
        TickReport {
            events,
            snapshot,
            outcome,
        }
    }

    fn unit_index_for_player(&self, player_id: &str) -> Option<usize> {
        self.units.iter().position(|u| u.owner == player_id)
    }

    fn unit_index(&self, unit_id: &str) -> Option<usize> {
        self.units.iter().position(|u| u.id == unit_id)
    }

    fn process_inputs(&mut self, events: &mut Vec<CombatEvent>) {
        for (player_id, action) in self.inputs.drain() {
            let Some(idx) = self.unit_index_for_player(&player_id) else {
                warn!(match_id = %self.match_id, player_id = %player_id, "No unit for player");
                continue;
            };
            if !self.units[idx].is_alive() {
                continue;
            }

            match action {
                CombatAction::StartMove { direction } => {
                    if !direction.is_finite() {
                        debug!(match_id = %self.match_id, player_id = %player_id, "Non-finite move direction dropped");
                        continue;
                    }
                    let direction = direction.normalize();
                    if direction.is_zero() {
                        self.units[idx].stop();
                    } else {
                        self.units[idx].set_intended_direction(direction);
                    }
                }
                CombatAction::StopMove => self.units[idx].stop(),
                CombatAction::UseAbility {
                    ability_id,
                    target_position,
                } => self.try_ability(idx, Some(&ability_id), target_position, events),
                CombatAction::BasicAttack { target_position } => {
                    self.try_ability(idx, None, target_position, events)
                }
            }
        }
    }

    /// Resolve, gate and execute an ability. `None` means the basic attack.
    fn try_ability(
        &mut self,
        idx: usize,
        ability_id: Option<&str>,
        target: Option<Vec2>,
        events: &mut Vec<CombatEvent>,
    ) {
        let definition = &self.definitions[idx];
        let ability = match ability_id {
            Some(id) => definition.ability(id),
            None => definition.basic_ability(),
        };
        let Some(ability) = ability.cloned() else {
            warn!(
                match_id = %self.match_id,
                unit_id = %self.units[idx].id,
                ability_id = ability_id.unwrap_or("<basic>"),
                "Unknown ability"
            );
            return;
        };

        let now = self.clock_ms;
        if !self.units[idx].ability_ready(&ability.id, now) {
            debug!(match_id = %self.match_id, ability_id = %ability.id, "Ability on cooldown");
            return;
        }

        if target.is_some_and(|t| !t.is_finite()) {
            debug!(match_id = %self.match_id, ability_id = %ability.id, "Non-finite target dropped");
            return;
        }

        let effect = ability.effect();
        if matches!(effect, AbilityEffect::AreaEffect { .. }) && target.is_none() {
            warn!(match_id = %self.match_id, ability_id = %ability.id, "Area ability without target position");
            return;
        }

        self.units[idx].start_cooldown(&ability.id, now, ability.cooldown_ms());
        self.execute_ability(idx, &ability.id, effect, target, events);
    }

    fn execute_ability(
        &mut self,
        idx: usize,
        ability_id: &str,
        effect: AbilityEffect,
        target: Option<Vec2>,
        events: &mut Vec<CombatEvent>,
    ) {
        let now = self.clock_ms;
        let caster = &self.units[idx];

        match effect {
            AbilityEffect::Melee { range, damage } => {
                let range = range.unwrap_or(caster.hitbox_radius);
                let facing = caster.aim_direction();
                let targets: Vec<usize> = self
                    .units
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.is_alive() && t.owner != caster.owner)
                    .filter(|(_, t)| CollisionSystem::melee_hits(caster, facing, range, t))
                    .map(|(j, _)| j)
                    .collect();

                let attacker_id = caster.id.clone();
                for j in targets {
                    self.units[j].apply_damage(damage);
                    events.push(CombatEvent::MeleeHit {
                        attacker_id: attacker_id.clone(),
                        target_id: self.units[j].id.clone(),
                        ability_id: ability_id.to_string(),
                        damage_dealt: damage,
                    });
                }
            }
            AbilityEffect::Projectile {
                variant,
                speed,
                range,
                damage,
                max_hits_per_unit,
            } => {
                let id = match self.ids.next_id("proj") {
                    Ok(id) => id,
                    Err(e) => {
                        error!(match_id = %self.match_id, error = %e, "Projectile spawn aborted");
                        return;
                    }
                };
                let origin = caster.position;
                let direction = caster.aim_direction();
                let projectile = match variant {
                    ProjectileVariant::Direct => ProjectileState::direct(
                        id, &caster.id, ability_id, origin, direction, speed, range, damage, now,
                    ),
                    ProjectileVariant::Boomerang => ProjectileState::boomerang(
                        id,
                        &caster.id,
                        ability_id,
                        origin,
                        direction,
                        speed,
                        range,
                        damage,
                        max_hits_per_unit,
                        now,
                    ),
                };
                self.projectiles.push(projectile);
            }
            AbilityEffect::AreaEffect {
                speed,
                impact_damage,
                impact_delay_ms,
                zone,
            } => {
                let Some(target) = target else {
                    return;
                };
                let id = match self.ids.next_id("proj") {
                    Ok(id) => id,
                    Err(e) => {
                        error!(match_id = %self.match_id, error = %e, "Projectile spawn aborted");
                        return;
                    }
                };
                let target = self.bounds.clamp_circle(target, 0.0);
                let projectile = ProjectileState::area_effect(
                    id,
                    &caster.id,
                    ability_id,
                    caster.position,
                    target,
                    speed,
                    impact_damage,
                    impact_delay_ms,
                    zone,
                    now,
                );
                self.projectiles.push(projectile);
            }
            AbilityEffect::Utility => {
                debug!(match_id = %self.match_id, ability_id = %ability_id, "Utility ability used");
            }
            AbilityEffect::Misconfigured => {
                warn!(match_id = %self.match_id, ability_id = %ability_id, "Attack ability has no attack type");
            }
        }
    }

    fn advance_units(&mut self, dt: f32) {
        let bounds = self.bounds;
        for unit in &mut self.units {
            unit.integrate(dt, &bounds);
        }
    }

    fn advance_projectiles(&mut self, dt: f32) {
        let now = self.clock_ms;
        let bounds = self.bounds;
        let units = &self.units;
        let mut impacts = Vec::new();

        self.projectiles.retain_mut(|p| {
            let owner = units
                .iter()
                .find(|u| u.id == p.owner_unit_id)
                .map(|u| (u.position, u.hitbox_radius));
            match p.advance(dt, now, owner, &bounds) {
                Flight::Flying => true,
                Flight::Retired => false,
                Flight::Impact { center, zone } => {
                    impacts.push((p.owner_unit_id.clone(), p.ability_id.clone(), p.damage, center, zone));
                    false
                }
            }
        });

        for (owner_unit_id, ability_id, impact_damage, center, spec) in impacts {
            let id = match self.ids.next_id("aoe") {
                Ok(id) => id,
                Err(e) => {
                    error!(match_id = %self.match_id, error = %e, "Zone spawn aborted");
                    continue;
                }
            };
            let zone = AoEZoneState::from_impact(id, &owner_unit_id, &ability_id, center, spec, now);

            if impact_damage > 0.0 {
                if let Some(owner) = self.unit_owner(&owner_unit_id).map(str::to_owned) {
                    let hit = CollisionSystem::apply_area_damage(
                        &mut self.units,
                        zone.position,
                        zone.radius,
                        impact_damage,
                        &owner,
                        Some(owner_unit_id.as_str()),
                    );
                    debug!(match_id = %self.match_id, zone = %zone.id, hit = ?hit, "Area impact");
                }
            }
            self.zones.push(zone);
        }
    }

    fn advance_zones(&mut self) {
        let now = self.clock_ms;
        let mut ticks = Vec::new();

        self.zones.retain_mut(|zone| {
            if zone.is_expired(now) {
                return false;
            }
            if let Some(damage) = zone.take_tick(now) {
                ticks.push((zone.owner_unit_id.clone(), zone.position, zone.radius, damage));
            }
            true
        });

        for (owner_unit_id, center, radius, damage) in ticks {
            if let Some(owner) = self.unit_owner(&owner_unit_id).map(str::to_owned) {
                let hit = CollisionSystem::apply_area_damage(
                    &mut self.units,
                    center,
                    radius,
                    damage,
                    &owner,
                    Some(owner_unit_id.as_str()),
                );
                if !hit.is_empty() {
                    debug!(match_id = %self.match_id, hit = ?hit, damage, "Zone tick");
                }
            }
        }
    }

    fn detect_collisions(&mut self, events: &mut Vec<CombatEvent>) {
        let now = self.clock_ms;
        let mut spent = Vec::new();

        for projectile in self.projectiles.iter_mut().filter(|p| p.collides()) {
            let Some(owner_player) = self
                .units
                .iter()
                .find(|u| u.id == projectile.owner_unit_id)
                .map(|u| u.owner.clone())
            else {
                continue;
            };

            for unit in self.units.iter_mut() {
                if !unit.is_alive() || unit.id == projectile.owner_unit_id || unit.owner == owner_player {
                    continue;
                }
                if !projectile.can_hit(&unit.id, now) || !CollisionSystem::projectile_hits(projectile, unit) {
                    continue;
                }

                unit.apply_damage(projectile.damage);
                events.push(CombatEvent::ProjectileHit {
                    projectile_id: projectile.id.clone(),
                    attacker_id: projectile.owner_unit_id.clone(),
                    target_id: unit.id.clone(),
                    damage_dealt: projectile.damage,
                    ability_id: projectile.ability_id.clone(),
                });

                if projectile.register_hit(&unit.id, now) {
                    spent.push(projectile.id.clone());
                    break;
                }
            }
        }

        if !spent.is_empty() {
            self.projectiles.retain(|p| !spent.contains(&p.id));
        }

        if let Some(tap) = self.rules.proximity_tap {
            self.apply_proximity_taps(tap, events);
        }
    }

    /// Taps are decided from the positions and HP at the start of this phase
    /// and then applied together, so neither unit strikes first.
    fn apply_proximity_taps(&mut self, tap: ProximityTap, events: &mut Vec<CombatEvent>) {
        let now = self.clock_ms;
        let mut taps = Vec::new();

        for (i, attacker) in self.units.iter().enumerate() {
            if !attacker.is_alive() || now < attacker.proximity_ready_at_ms {
                continue;
            }
            for (j, target) in self.units.iter().enumerate() {
                if i != j
                    && target.is_alive()
                    && target.owner != attacker.owner
                    && CollisionSystem::within_radius(attacker, target, tap.radius)
                {
                    taps.push((i, j));
                }
            }
        }

        for (i, j) in taps {
            self.units[i].proximity_ready_at_ms = now.saturating_add(tap.interval_ms);
            self.units[j].apply_damage(tap.damage);
            events.push(CombatEvent::MeleeHit {
                attacker_id: self.units[i].id.clone(),
                target_id: self.units[j].id.clone(),
                ability_id: PROXIMITY_TAP_ABILITY_ID.to_string(),
                damage_dealt: tap.damage,
            });
        }
    }

    fn check_end_condition(&mut self) -> Option<CombatOutcome> {
        if self.status != CombatStatus::Active {
            return None;
        }

        let defeated: Vec<usize> = (0..self.units.len())
            .filter(|&i| !self.units[i].is_alive())
            .collect();

        let outcome = match defeated.as_slice() {
            [] => self.time_limit_outcome()?,
            [loser] => match (0..self.units.len()).find(|i| i != loser) {
                Some(winner) => CombatOutcome::Victory {
                    winner_unit_id: self.units[winner].id.clone(),
                    loser_unit_id: self.units[*loser].id.clone(),
                    winner_hp: self.units[winner].current_hp,
                    reason: EndReason::Knockout,
                },
                None => {
                    error!(match_id = %self.match_id, "Defeat with no opponent, forcing draw");
                    self.draw(EndReason::Knockout)
                }
            },
            _ => self.draw(EndReason::Knockout),
        };

        self.status = CombatStatus::Terminating;
        info!(match_id = %self.match_id, clock_ms = self.clock_ms, outcome = ?outcome, "Combat finished");
        self.outcome = Some(outcome.clone());
        self.projectiles.clear();
        self.zones.clear();
        self.status = CombatStatus::Ended;

        Some(outcome)
    }

    /// Higher HP fraction wins once the limit is reached; equal fractions draw
    fn time_limit_outcome(&self) -> Option<CombatOutcome> {
        let limit = self.rules.time_limit_ms?;
        if self.clock_ms < limit {
            return None;
        }

        let fraction = |u: &CombatUnitState| {
            if u.max_hp > 0.0 {
                u.current_hp / u.max_hp
            } else {
                0.0
            }
        };
        let (a, b) = (&self.units[0], &self.units[1]);
        let (fa, fb) = (fraction(a), fraction(b));

        let (winner, loser) = if fa > fb {
            (a, b)
        } else if fb > fa {
            (b, a)
        } else {
            return Some(self.draw(EndReason::TimeLimit));
        };

        Some(CombatOutcome::Victory {
            winner_unit_id: winner.id.clone(),
            loser_unit_id: loser.id.clone(),
            winner_hp: winner.current_hp,
            reason: EndReason::TimeLimit,
        })
    }

    fn draw(&self, reason: EndReason) -> CombatOutcome {
        CombatOutcome::Draw {
            unit_ids: self.unit_ids(),
            reason,
        }
    }

    #[cfg(test)]
    fn unit_mut(&mut self, unit_id: &str) -> &mut CombatUnitState {
        let idx = self.unit_index(unit_id).expect("unit exists");
        &mut self.units[idx]
    }
}
