//! Reaction layer: what the simulation does in response to each event
//!
//! Reactions are plain fns keyed by event kind. Core handlers are registered
//! first, equipment reactions after, and they run in registration order. A
//! reaction may mutate the state and push follow-up events; [`process_events`]
//! drains the queue to a fixpoint.

use std::collections::{BTreeMap, VecDeque};

use glam::Vec2;
use rand::Rng;

use super::board::{BrickId, Overlay};
use super::equipment::{Equipment, EquipmentId};
use super::event::{
    BlastTarget, DamageSource, EntityId, EventBus, EventKind, GameEvent, HarmCause, Resource,
};
use super::state::GameState;
use crate::tuning::BallKind;

/// Event handler
pub type Reaction = fn(&mut GameState, &GameEvent, &mut Vec<GameEvent>);

/// Ordered reactions per event kind
#[derive(Clone)]
pub struct ReactionTable {
    handlers: BTreeMap<EventKind, Vec<Reaction>>,
}

impl std::fmt::Debug for ReactionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: BTreeMap<&str, usize> = self
            .handlers
            .iter()
            .map(|(kind, list)| (kind.as_str(), list.len()))
            .collect();
        f.debug_struct("ReactionTable")
            .field("handlers", &counts)
            .finish()
    }
}

impl Default for ReactionTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl ReactionTable {
    pub fn empty() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Core handlers plus every equipment reaction
    pub fn standard() -> Self {
        let mut table = Self::empty();

        // Core
        table.register(EventKind::DamageBrick, damage_brick);
        table.register(EventKind::BrickHit, brick_hit);
        table.register(EventKind::DamageTaken, damage_taken);
        table.register(EventKind::BallHealed, ball_healed);
        table.register(EventKind::Explode, explode);
        table.register(EventKind::BrickDestroyed, brick_destroyed);
        table.register(EventKind::WallHit, wall_hit);
        table.register(EventKind::DyingBallDeath, orphan_minis);

        // Equipment
        table.register(EventKind::BrickHit, ramp_on_hit);
        table.register(EventKind::BrickDestroyed, vampire);
        table.register(EventKind::BrickDestroyed, nullifier_arm);
        table.register(EventKind::BrickDestroyed, chain_lightning);
        table.register(EventKind::WallHit, ramp_reset);
        table.register(EventKind::WallHit, wall_explosion);
        table.register(EventKind::WallHit, clingy);
        table.register(EventKind::WallHit, breadcrumbs);
        table.register(EventKind::XpCollected, orb_harvester);

        table
    }

    /// Append a reaction after those already registered for `kind`
    pub fn register(&mut self, kind: EventKind, reaction: Reaction) {
        self.handlers.entry(kind).or_default().push(reaction);
    }

    pub fn handlers(&self, kind: EventKind) -> &[Reaction] {
        self.handlers.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    /// Total registered reactions
    pub fn len(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Drain `initial` and everything it triggers.
///
/// Each event runs its reactions, then goes to the bus, then into the
/// returned log. Whenever the queue runs dry, destroyed bricks are swept and
/// their `BrickDestroyed` events start the next round.
pub fn process_events(
    state: &mut GameState,
    initial: Vec<GameEvent>,
    bus: &mut EventBus,
) -> Vec<GameEvent> {
    let max_events = state.settings.max_events_per_drain;
    let max_sweeps = state.settings.max_sweep_passes;

    let mut queue: VecDeque<GameEvent> = initial.into();
    let mut processed = Vec::with_capacity(queue.len());
    let mut follow_ups = Vec::new();
    let mut sweeps = 0;

    loop {
        while let Some(event) = queue.pop_front() {
            if processed.len() >= max_events {
                log::warn!(
                    "Event drain hit {} events; dropping {} queued",
                    max_events,
                    queue.len() + 1
                );
                return processed;
            }

            let handlers = state.reactions.handlers(event.kind()).to_vec();
            for handler in handlers {
                handler(state, &event, &mut follow_ups);
            }
            queue.extend(follow_ups.drain(..));

            bus.dispatch(&event);
            processed.push(event);
        }

        if !state.board.has_destroyed() {
            break;
        }
        if sweeps >= max_sweeps {
            log::warn!(
                "Brick sweep hit {} passes; leaving destroyed bricks for the next drain",
                max_sweeps
            );
            break;
        }
        sweeps += 1;
        let destroyed = state.board.sweep_destroyed();

        for brick in destroyed {
            log::debug!("Brick {} destroyed", brick.id);
            queue.push_back(GameEvent::BrickDestroyed {
                brick: brick.id,
                pos: state.board.brick_center(&brick),
                overlay: brick.overlay,
                yields: brick.yields,
                source: brick.last_hit,
            });
        }
    }

    processed
}

fn brick_pos(state: &GameState, id: BrickId) -> Vec2 {
    state
        .board
        .brick(id)
        .map(|b| state.board.brick_center(b))
        .unwrap_or_default()
}

/// Applicable equipment item of this id for a ball or mini-ball
fn equipped(state: &GameState, entity: EntityId, id: EquipmentId) -> Option<Equipment> {
    let wielder = state.wielder_of(entity)?;
    state.loadouts.resolve(&wielder).find(id).copied()
}

fn ramp_of(state: &mut GameState, entity: EntityId) -> Option<&mut f32> {
    if let Some(ball) = state.balls.iter_mut().find(|b| b.id == entity) {
        return Some(&mut ball.ramp_damage);
    }
    state
        .minis
        .iter_mut()
        .find(|m| m.id == entity)
        .map(|m| &mut m.ramp_damage)
}

// === Core ===

fn damage_brick(state: &mut GameState, event: &GameEvent, out: &mut Vec<GameEvent>) {
    let GameEvent::DamageBrick {
        brick,
        amount,
        source,
    } = *event
    else {
        return;
    };
    let Some(target) = state.board.brick_mut(brick).filter(|b| !b.is_destroyed()) else {
        return;
    };
    let dealt = target.hit(amount, source);
    out.push(GameEvent::BrickHit {
        brick,
        pos: brick_pos(state, brick),
        damage_dealt: dealt,
        source,
        contact: false,
        executed: false,
    });
}

fn brick_hit(state: &mut GameState, event: &GameEvent, out: &mut Vec<GameEvent>) {
    let GameEvent::BrickHit {
        brick,
        pos,
        damage_dealt,
        source: DamageSource::Entity(entity),
        contact: true,
        ..
    } = *event
    else {
        return;
    };

    if damage_dealt > 0 {
        state.combo += 1;
        if let Some(ball) = state.ball_mut(entity).filter(|b| b.kind == BallKind::Fire) {
            ball.ignite(1);
        }
    }

    let Some(target) = state.board.brick(brick) else {
        return;
    };
    let retaliation = target.retaliation;
    let spiked = target.overlay == Some(Overlay::Spike);
    let at = state.entity_pos(entity).unwrap_or(pos);

    if retaliation > 0.0 {
        out.push(GameEvent::DamageTaken {
            entity,
            amount: retaliation,
            pos: at,
            cause: HarmCause::Retaliation,
        });
    }
    if spiked {
        out.push(GameEvent::DamageTaken {
            entity,
            amount: state.settings.tuning.spike_retaliation,
            pos: at,
            cause: HarmCause::Overlay(Overlay::Spike),
        });
    }
}

fn damage_taken(state: &mut GameState, event: &GameEvent, out: &mut Vec<GameEvent>) {
    let GameEvent::DamageTaken { entity, amount, .. } = *event else {
        return;
    };
    let cell = state.board.cell_size;

    if let Some(ball) = state.balls.iter_mut().find(|b| b.id == entity) {
        if ball.take_damage(amount) {
            log::debug!("Ball {} is dying", entity);
            if ball.dies_immediately() {
                out.extend(ball.die(&state.settings.tuning, cell));
            }
        }
        return;
    }
    if let Some(mini) = state.mini_mut(entity) {
        out.extend(mini.take_damage(amount));
    }
}

fn ball_healed(state: &mut GameState, event: &GameEvent, _out: &mut Vec<GameEvent>) {
    let GameEvent::BallHealed { entity, amount } = *event else {
        return;
    };
    let healed = match state.ball_mut(entity) {
        Some(ball) => ball.heal(amount),
        None => state.mini_mut(entity).map_or(0.0, |m| m.heal(amount)),
    };
    log::debug!("Entity {} healed {:.1}", entity, healed);
}

fn explode(state: &mut GameState, event: &GameEvent, out: &mut Vec<GameEvent>) {
    let GameEvent::Explode {
        pos,
        radius,
        damage,
        target,
        source,
    } = *event
    else {
        return;
    };

    match target {
        BlastTarget::Bricks => {
            for brick in state.board.bricks_within(pos, radius) {
                out.push(GameEvent::DamageBrick {
                    brick,
                    amount: damage,
                    source,
                });
            }
        }
        BlastTarget::Entities => {
            let caught = |at: Vec2, r: f32| at.distance(pos) <= radius + r;
            let balls = state
                .balls
                .iter()
                .filter(|b| !b.is_ghost() && b.is_active())
                .filter(|b| caught(b.motion.pos, b.motion.radius))
                .map(|b| (b.id, b.motion.pos));
            let minis = state
                .minis
                .iter()
                .filter(|m| !m.dead && caught(m.motion.pos, m.motion.radius))
                .map(|m| (m.id, m.motion.pos));
            for (entity, at) in balls.chain(minis) {
                out.push(GameEvent::DamageTaken {
                    entity,
                    amount: damage as f32,
                    pos: at,
                    cause: HarmCause::Explosion,
                });
            }
        }
    }
}

fn brick_destroyed(state: &mut GameState, event: &GameEvent, out: &mut Vec<GameEvent>) {
    let GameEvent::BrickDestroyed {
        brick,
        pos,
        overlay,
        yields,
        ..
    } = *event
    else {
        return;
    };

    if yields.coins > 0 {
        out.push(GameEvent::CoinCollected {
            amount: yields.coins,
            pos,
        });
    }
    if yields.xp_orbs > 0 {
        out.push(GameEvent::XpCollected {
            orbs: yields.xp_orbs,
            pos,
        });
    }
    let resources = [
        (Resource::Food, yields.food),
        (Resource::Wood, yields.wood),
        (Resource::Gems, yields.gems),
    ];
    for (resource, amount) in resources {
        if amount > 0 {
            out.push(GameEvent::ResourceCollected {
                resource,
                amount,
                pos,
            });
        }
    }

    if overlay == Some(Overlay::Mine) {
        let tuning = &state.settings.tuning;
        out.push(GameEvent::Explode {
            pos,
            radius: tuning.mine_radius * state.board.cell_size,
            damage: tuning.mine_damage.max(0.0) as u32,
            target: BlastTarget::Entities,
            source: DamageSource::Overlay { brick },
        });
    }
}

fn wall_hit(state: &mut GameState, event: &GameEvent, out: &mut Vec<GameEvent>) {
    let GameEvent::WallHit { entity, pos, .. } = *event else {
        return;
    };
    if let Some(ball) = state.ball_mut(entity) {
        ball.wall_hits += 1;
    } else if let Some(mini) = state.mini_mut(entity) {
        mini.wall_hits += 1;
    } else {
        return;
    }

    let amount = state.settings.tuning.wall_hit_self_damage;
    if amount > 0.0 {
        out.push(GameEvent::DamageTaken {
            entity,
            amount,
            pos,
            cause: HarmCause::Wall,
        });
    }
}

/// Minis never outlive their parent
fn orphan_minis(state: &mut GameState, event: &GameEvent, out: &mut Vec<GameEvent>) {
    let GameEvent::DyingBallDeath { entity, .. } = *event else {
        return;
    };
    for mini in state.minis.iter_mut().filter(|m| m.parent_id == entity) {
        out.extend(mini.orphan());
    }
}

// === Equipment ===

fn ramp_on_hit(state: &mut GameState, event: &GameEvent, _out: &mut Vec<GameEvent>) {
    let GameEvent::BrickHit {
        damage_dealt,
        source: DamageSource::Entity(entity),
        ..
    } = *event
    else {
        return;
    };
    if damage_dealt == 0 {
        return;
    }
    let Some(Equipment::Ramp { per_hit, max_bonus }) = equipped(state, entity, EquipmentId::Ramp)
    else {
        return;
    };
    if let Some(ramp) = ramp_of(state, entity) {
        *ramp = (*ramp + per_hit).min(max_bonus);
    }
}

fn ramp_reset(state: &mut GameState, event: &GameEvent, _out: &mut Vec<GameEvent>) {
    let GameEvent::WallHit { entity, .. } = *event else {
        return;
    };
    if equipped(state, entity, EquipmentId::Ramp).is_none() {
        return;
    }
    if let Some(ramp) = ramp_of(state, entity) {
        *ramp = 0.0;
    }
}

fn vampire(state: &mut GameState, event: &GameEvent, out: &mut Vec<GameEvent>) {
    let GameEvent::BrickDestroyed {
        source: Some(source),
        ..
    } = *event
    else {
        return;
    };
    let Some(owner) = source.owner() else {
        return;
    };
    if let Some(Equipment::Vampire { heal }) = equipped(state, owner, EquipmentId::Vampire) {
        out.push(GameEvent::BallHealed {
            entity: owner,
            amount: heal,
        });
    }
}

/// A kill by the wearer (or one of its minis) starts the nullifier cooldown
fn nullifier_arm(state: &mut GameState, event: &GameEvent, _out: &mut Vec<GameEvent>) {
    let GameEvent::BrickDestroyed {
        source: Some(source),
        ..
    } = *event
    else {
        return;
    };
    let Some(owner) = source.owner() else {
        return;
    };
    let Some(Equipment::Nullifier { cooldown, .. }) =
        equipped(state, owner, EquipmentId::Nullifier)
    else {
        return;
    };
    let main = state.mini(owner).map_or(owner, |m| m.parent_id);
    if let Some(ball) = state.ball_mut(main) {
        ball.nullifier_ticks = ball.nullifier_ticks.max(cooldown);
    }
}

fn chain_lightning(state: &mut GameState, event: &GameEvent, out: &mut Vec<GameEvent>) {
    let GameEvent::BrickDestroyed {
        pos,
        source: Some(source),
        ..
    } = *event
    else {
        return;
    };
    let Some(owner) = source.owner() else {
        return;
    };
    let Some(Equipment::ChainLightning {
        damage,
        range,
        max_jumps,
    }) = equipped(state, owner, EquipmentId::ChainLightning)
    else {
        return;
    };

    let depth = source.chain_depth();
    if depth >= max_jumps.min(state.settings.max_chain_depth) {
        return;
    }
    let candidates = state
        .board
        .bricks_within(pos, range * state.board.cell_size);
    if candidates.is_empty() {
        return;
    }
    let brick = candidates[state.rng.random_range(0..candidates.len())];
    log::debug!("Chain lightning hop {} to brick {}", depth + 1, brick);
    out.push(GameEvent::DamageBrick {
        brick,
        amount: damage,
        source: DamageSource::Chain {
            owner,
            depth: depth + 1,
        },
    });
}

fn wall_explosion(state: &mut GameState, event: &GameEvent, out: &mut Vec<GameEvent>) {
    let GameEvent::WallHit {
        entity, pos, mini, ..
    } = *event
    else {
        return;
    };
    let Some(Equipment::WallExplosion {
        damage,
        radius,
        mini_explodes,
    }) = equipped(state, entity, EquipmentId::WallExplosion)
    else {
        return;
    };
    if mini && !mini_explodes {
        return;
    }
    out.push(GameEvent::Explode {
        pos,
        radius: radius * state.board.cell_size,
        damage,
        target: BlastTarget::Bricks,
        source: DamageSource::Explosion {
            owner: Some(entity),
        },
    });
}

/// Redirect a wall bounce toward the nearest brick
fn clingy(state: &mut GameState, event: &GameEvent, _out: &mut Vec<GameEvent>) {
    let GameEvent::WallHit {
        entity,
        mini: false,
        ..
    } = *event
    else {
        return;
    };
    let Some(Equipment::Clingy { cooldown }) = equipped(state, entity, EquipmentId::Clingy) else {
        return;
    };
    let Some(ball) = state.ball(entity).filter(|b| b.clingy_ticks == 0) else {
        return;
    };
    let from = ball.motion.pos;
    let Some(target) = state
        .board
        .nearest_brick(from, f32::INFINITY, &[])
        .map(|id| brick_pos(state, id))
    else {
        return;
    };
    let dir = (target - from).normalize_or_zero();
    if dir == Vec2::ZERO {
        return;
    }
    if let Some(ball) = state.ball_mut(entity) {
        ball.motion.vel = dir * ball.motion.speed();
        ball.clingy_ticks = cooldown;
    }
}

fn breadcrumbs(state: &mut GameState, event: &GameEvent, out: &mut Vec<GameEvent>) {
    let GameEvent::WallHit { entity, pos, .. } = *event else {
        return;
    };
    let Some(Equipment::Breadcrumbs { every }) = equipped(state, entity, EquipmentId::Breadcrumbs)
    else {
        return;
    };
    let wall_hits = match state.ball(entity) {
        Some(ball) => ball.wall_hits,
        None => state.mini(entity).map_or(0, |m| m.wall_hits),
    };
    if every > 0 && wall_hits > 0 && wall_hits % every == 0 {
        out.push(GameEvent::SpawnBreadcrumb { entity, pos });
    }
}

/// Heal once per threshold crossed, carrying the remainder
fn orb_harvester(state: &mut GameState, event: &GameEvent, out: &mut Vec<GameEvent>) {
    let GameEvent::XpCollected { orbs, .. } = *event else {
        return;
    };
    let wearers: Vec<EntityId> = state
        .balls
        .iter()
        .filter(|b| !b.is_ghost() && !b.is_dead())
        .map(|b| b.id)
        .collect();

    for entity in wearers {
        let Some(Equipment::OrbHarvester {
            orbs_per_heal,
            heal,
        }) = equipped(state, entity, EquipmentId::OrbHarvester)
        else {
            continue;
        };
        if orbs_per_heal == 0 {
            continue;
        }
        let Some(ball) = state.ball_mut(entity) else {
            continue;
        };
        ball.orb_progress += orbs;
        let triggers = ball.orb_progress / orbs_per_heal;
        ball.orb_progress %= orbs_per_heal;
        for _ in 0..triggers {
            out.push(GameEvent::BallHealed {
                entity,
                amount: heal,
            });
        }
    }
}
