//! Fixed timestep simulation tick
//!
//! Core combat loop that advances the simulation deterministically. Order per
//! tick: input, timers and overlays, movement with collision (balls by id,
//! then mini-balls, then projectiles), event drain, cleanup, turn-end check.

use glam::Vec2;

use super::board::{BrickId, Overlay};
use super::collision::{travel, travel_projectile};
use super::damage::Arsenal;
use super::entity::{BallPhase, ProjectileKind};
use super::event::{EntityId, EventBus, GameEvent, HarmCause};
use super::reactions::process_events;
use super::state::{GameState, TurnPhase};

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Aim angle for the preview ghosts
    pub aim: Option<f32>,
    /// Launch waiting balls at this angle
    pub launch: Option<f32>,
    /// Cast this ball's power-up
    pub power_up: Option<EntityId>,
    /// Force the turn to end
    pub end_turn: bool,
}

/// Advance the game state by one fixed timestep.
///
/// Returns every event processed this tick, in processing order.
pub fn tick(state: &mut GameState, input: &TickInput, bus: &mut EventBus) -> Vec<GameEvent> {
    state.time_ticks += 1;
    let mut events = Vec::new();

    // === Input ===
    if let Some(theta) = input.launch {
        state.launch(theta);
    } else if let Some(theta) = input.aim {
        state.aim(theta);
    }
    if let Some(id) = input.power_up {
        events.extend(state.apply_power_up(id));
    }
    if input.end_turn {
        let mut log = process_events(state, events, bus);
        let ended = state.end_turn();
        log.extend(process_events(state, vec![ended], bus));
        return log;
    }

    // === Timers ===
    events.extend(update_timers(state));
    if state.turn == TurnPhase::Running {
        events.extend(fire_overlays(state));
    }

    // === Movement ===
    // Everything this tick scales with the combo as it stood at tick start
    let combo = state.combo;
    events.extend(move_balls(state, combo));
    events.extend(move_minis(state, combo));
    events.extend(move_projectiles(state));

    let mut log = process_events(state, events, bus);

    // === Cleanup ===
    let orphaned = sweep_orphans(state);
    if !orphaned.is_empty() {
        log.extend(process_events(state, orphaned, bus));
    }
    state.balls.retain(|b| !b.is_dead());
    state.minis.retain(|m| !m.dead);
    state.projectiles.retain(|p| !p.dead);

    if state.turn == TurnPhase::Running && !state.in_flight() {
        let ended = state.end_turn();
        log.extend(process_events(state, vec![ended], bus));
    }

    log
}

/// Run one rendered frame: one tick, or two with speed-up. Input applies to
/// the first tick only.
pub fn advance_frame(state: &mut GameState, input: &TickInput, bus: &mut EventBus) -> Vec<GameEvent> {
    let idle = TickInput::default();
    let mut events = Vec::new();
    for i in 0..state.settings.ticks_per_frame() {
        let input = if i == 0 { input } else { &idle };
        events.extend(tick(state, input, bus));
    }
    events
}

fn update_timers(state: &mut GameState) -> Vec<GameEvent> {
    let mut events = Vec::new();

    for ball in state.balls.iter_mut() {
        events.extend(ball.tick_timers());
    }

    for mini in state.minis.iter_mut().filter(|m| !m.dead) {
        mini.contacts.tick();
        mini.nullified = state
            .balls
            .iter()
            .find(|b| b.id == mini.parent_id)
            .is_some_and(|b| b.nullifier_ticks > 0);
    }

    let tuning = &state.settings.tuning;
    let blast = tuning.homing_blast_radius * state.board.cell_size;
    for projectile in state.projectiles.iter_mut().filter(|p| !p.dead) {
        if projectile.kind == ProjectileKind::Homing {
            let target = state
                .board
                .nearest_brick(projectile.motion.pos, f32::INFINITY, &[])
                .and_then(|id| state.board.brick(id))
                .map(|b| state.board.brick_center(b));
            if let Some(target) = target {
                projectile.steer(target, tuning.homing_turn_rate);
            }
        }
        events.extend(projectile.tick_lifespan(blast));
    }

    events
}

/// Entities overlays can hurt: active real balls and living minis
fn overlay_targets(state: &GameState) -> Vec<(EntityId, Vec2)> {
    let balls = state
        .balls
        .iter()
        .filter(|b| !b.is_ghost() && b.is_active())
        .map(|b| (b.id, b.motion.pos));
    let minis = state
        .minis
        .iter()
        .filter(|m| !m.dead)
        .map(|m| (m.id, m.motion.pos));
    balls.chain(minis).collect()
}

fn fire_overlays(state: &mut GameState) -> Vec<GameEvent> {
    let period = state.settings.tuning.overlay_period_ticks;
    if period == 0 {
        return Vec::new();
    }

    let mut ready: Vec<(BrickId, Overlay)> = Vec::new();
    for brick in state.board.bricks_mut().filter(|b| !b.is_destroyed()) {
        let Some(overlay) = brick.overlay else {
            continue;
        };
        if !matches!(
            overlay,
            Overlay::Sniper | Overlay::Laser | Overlay::Healer | Overlay::Zapper
        ) {
            continue;
        }
        brick.overlay_timer += 1;
        if brick.overlay_timer >= period {
            brick.overlay_timer = 0;
            ready.push((brick.id, overlay));
        }
    }
    if ready.is_empty() {
        return Vec::new();
    }

    let targets = overlay_targets(state);
    let battery_alive = state
        .board
        .living()
        .any(|b| b.overlay == Some(Overlay::ZapBattery));
    let tuning = &state.settings.tuning;
    let mut events = Vec::new();

    for (id, overlay) in ready {
        let Some(rect) = state.board.brick(id).map(|b| state.board.brick_rect(b)) else {
            continue;
        };
        let harm = |entity: EntityId, pos: Vec2, amount: f32| GameEvent::DamageTaken {
            entity,
            amount,
            pos,
            cause: HarmCause::Overlay(overlay),
        };

        match overlay {
            Overlay::Sniper => {
                let center = rect.center();
                let nearest = targets.iter().min_by(|a, b| {
                    a.1.distance_squared(center)
                        .total_cmp(&b.1.distance_squared(center))
                });
                if let Some(&(entity, pos)) = nearest {
                    events.push(harm(entity, pos, tuning.sniper_damage));
                }
            }
            Overlay::Laser => {
                for &(entity, pos) in &targets {
                    let in_row = pos.y >= rect.min.y && pos.y <= rect.max.y;
                    let in_col = pos.x >= rect.min.x && pos.x <= rect.max.x;
                    if in_row || in_col {
                        events.push(harm(entity, pos, tuning.laser_damage));
                    }
                }
            }
            Overlay::Zapper => {
                if !battery_alive {
                    continue;
                }
                let reach = tuning.zapper_range * state.board.cell_size;
                for &(entity, pos) in &targets {
                    if rect.distance_to(pos) <= reach {
                        events.push(harm(entity, pos, tuning.zapper_damage));
                    }
                }
            }
            Overlay::Healer => {
                for neighbour in state.board.neighbours(id) {
                    let healed = state
                        .board
                        .brick_mut(neighbour)
                        .map_or(0, |b| b.heal(tuning.healer_amount));
                    if healed > 0 {
                        events.push(GameEvent::BrickHealed {
                            brick: neighbour,
                            amount: healed,
                        });
                    }
                }
            }
            Overlay::Spike | Overlay::Mine | Overlay::ZapBattery => {}
        }
    }

    events
}

fn move_balls(state: &mut GameState, combo: u32) -> Vec<GameEvent> {
    let cell = state.board.cell_size;
    let arsenal = Arsenal {
        tuning: &state.settings.tuning,
        loadouts: &state.loadouts,
        inventory: &state.inventory,
    };
    let mut events = Vec::new();

    for ball in state.balls.iter_mut().filter(|b| b.is_active()) {
        let moved = travel(ball, &mut state.board, &arsenal, combo);
        events.extend(moved.events);

        let contact = moved.brick_contact || moved.wall.is_some();
        if moved.left_board || (ball.phase == BallPhase::Dying && contact) {
            events.extend(ball.die(arsenal.tuning, cell));
        }
    }
    events
}

fn move_minis(state: &mut GameState, combo: u32) -> Vec<GameEvent> {
    let arsenal = Arsenal {
        tuning: &state.settings.tuning,
        loadouts: &state.loadouts,
        inventory: &state.inventory,
    };
    let mut events = Vec::new();

    for mini in state.minis.iter_mut().filter(|m| !m.dead) {
        events.extend(travel(mini, &mut state.board, &arsenal, combo).events);
    }
    events
}

fn move_projectiles(state: &mut GameState) -> Vec<GameEvent> {
    let blast = state.settings.tuning.homing_blast_radius * state.board.cell_size;
    let mut events = Vec::new();
    for projectile in state.projectiles.iter_mut().filter(|p| !p.dead) {
        events.extend(travel_projectile(projectile, &mut state.board, blast));
    }
    events
}

/// Kill minis whose parent is dead or gone
fn sweep_orphans(state: &mut GameState) -> Vec<GameEvent> {
    let mut events = Vec::new();
    for mini in state.minis.iter_mut().filter(|m| !m.dead) {
        let parent_alive = state
            .balls
            .iter()
            .any(|b| b.id == mini.parent_id && !b.is_dead());
        if !parent_alive {
            events.extend(mini.orphan());
        }
    }
    events
}
