//! Simulation context
//!
//! Everything a tick reads or mutates lives here: the board, entity lists,
//! loadouts and inventory, combo and turn phase, and the seeded RNG.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::board::{Board, Brick, BrickId};
use super::damage::Arsenal;
use super::entity::{Ball, MiniBall, Motion, Projectile, ProjectileKind, Striker, ball_radius};
use super::equipment::{Loadouts, Wielder};
use super::event::{BlastTarget, DamageSource, EntityId, GameEvent};
use super::inventory::{Inventory, InstanceId};
use super::powerup::PowerUpEffect;
use super::reactions::ReactionTable;
use crate::consts::*;
use crate::settings::Settings;
use crate::tuning::{BallKind, Tuning};
use crate::{direction, heading};

/// Angle between neighbouring projectiles in a volley
const VOLLEY_SPREAD: f32 = 0.15;

/// Turn lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// Balls wait for launch
    Aiming,
    /// Balls are in flight
    Running,
}

fn fresh_rng() -> Pcg32 {
    Pcg32::seed_from_u64(0)
}

/// Complete simulation state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub settings: Settings,
    pub board: Board,
    /// Main balls and ghosts (sorted by id for determinism)
    pub balls: Vec<Ball>,
    pub minis: Vec<MiniBall>,
    pub projectiles: Vec<Projectile>,
    pub loadouts: Loadouts,
    pub inventory: Inventory,
    /// Consecutive damaging contacts this turn
    pub combo: u32,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub turn: TurnPhase,
    #[serde(skip, default = "fresh_rng")]
    pub rng: Pcg32,
    #[serde(skip)]
    pub reactions: ReactionTable,
    next_id: EntityId,
}

impl GameState {
    pub fn new(board: Board, settings: Settings) -> Self {
        let rng = Pcg32::seed_from_u64(settings.seed);
        Self {
            settings,
            board,
            balls: Vec::new(),
            minis: Vec::new(),
            projectiles: Vec::new(),
            loadouts: Loadouts::default(),
            inventory: Inventory::default(),
            combo: 0,
            time_ticks: 0,
            turn: TurnPhase::Aiming,
            rng,
            reactions: ReactionTable::standard(),
            next_id: 1,
        }
    }

    #[inline]
    pub fn tuning(&self) -> &Tuning {
        &self.settings.tuning
    }

    pub fn arsenal(&self) -> Arsenal<'_> {
        Arsenal {
            tuning: &self.settings.tuning,
            loadouts: &self.loadouts,
            inventory: &self.inventory,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn ball(&self, id: EntityId) -> Option<&Ball> {
        self.balls.iter().find(|b| b.id == id)
    }

    pub fn ball_mut(&mut self, id: EntityId) -> Option<&mut Ball> {
        self.balls.iter_mut().find(|b| b.id == id)
    }

    pub fn mini(&self, id: EntityId) -> Option<&MiniBall> {
        self.minis.iter().find(|m| m.id == id)
    }

    pub fn mini_mut(&mut self, id: EntityId) -> Option<&mut MiniBall> {
        self.minis.iter_mut().find(|m| m.id == id)
    }

    /// Equipment identity of a ball or mini-ball
    pub fn wielder_of(&self, id: EntityId) -> Option<Wielder> {
        if let Some(ball) = self.ball(id) {
            return Some(ball.wielder());
        }
        self.mini(id).map(|m| m.wielder())
    }

    pub fn entity_pos(&self, id: EntityId) -> Option<Vec2> {
        if let Some(ball) = self.ball(id) {
            return Some(ball.motion.pos);
        }
        self.mini(id).map(|m| m.motion.pos)
    }

    /// Spawn an idle ball; stats come from the tuning table and, when the
    /// instance has an inventory record, its enchantments
    pub fn spawn_ball(&mut self, kind: BallKind, instance: Option<InstanceId>, pos: Vec2) -> EntityId {
        let id = self.next_entity_id();
        let tuning = &self.settings.tuning;
        let stats = tuning.ball(kind);
        let record = instance.and_then(|i| self.inventory.record(i));
        let area = record.map_or(1.0, |r| r.area_factor());
        let speed_mult = record.map_or(1.0, |r| r.speed_multiplier());
        let cell = self.board.cell_size;

        let motion = Motion::at(pos, ball_radius(cell, &stats, area));
        let mut ball =
            Ball::new(id, kind, &stats, motion).with_speed(stats.speed * cell * speed_mult);
        match (instance, record) {
            (Some(instance), Some(record)) => ball = ball.with_record(instance, record),
            (instance, _) => ball.instance = instance,
        }
        if kind == BallKind::Doom {
            ball.doom_ticks = Some(tuning.doom_ticks);
        }

        log::debug!("Spawned ball {} ({})", id, kind.as_str());
        self.balls.push(ball);
        self.normalize_order();
        id
    }

    /// Point waiting balls along `theta` and refresh their ghost previews
    pub fn aim(&mut self, theta: f32) {
        self.balls.retain(|b| !b.is_ghost());
        let lifetime = self.settings.ghost_lifetime_ticks;
        let dir = direction(theta);

        let templates: Vec<Ball> = self
            .balls
            .iter_mut()
            .filter(|b| b.can_launch())
            .map(|b| {
                b.aim();
                b.clone()
            })
            .collect();

        for template in templates {
            let id = self.next_entity_id();
            let mut ghost = template.into_ghost(lifetime);
            ghost.id = id;
            ghost.contacts = Default::default();
            ghost.launch(dir);
            self.balls.push(ghost);
        }
        self.normalize_order();
    }

    /// Send every waiting ball along `theta`
    pub fn launch(&mut self, theta: f32) {
        self.balls.retain(|b| !b.is_ghost());
        let dir = direction(theta);
        let mut launched = 0;
        for ball in self.balls.iter_mut().filter(|b| b.can_launch()) {
            ball.launch(dir);
            launched += 1;
        }
        if launched > 0 {
            self.turn = TurnPhase::Running;
            self.combo = 0;
            log::info!("Launched {} balls at tick {}", launched, self.time_ticks);
        }
    }

    /// Spawn mini-balls fanned out around the parent's heading
    pub fn spawn_minis(&mut self, parent_id: EntityId, count: u32) -> Vec<EntityId> {
        let Some(parent) = self.ball(parent_id).filter(|b| !b.is_dead()).cloned() else {
            return Vec::new();
        };
        let cell = self.board.cell_size;
        let radius = cell * MINI_RADIUS_FACTOR;
        let speed = self.settings.tuning.mini_speed * cell;
        let hp = self.settings.tuning.mini_max_hp;
        let base = launch_heading(parent.motion.vel);

        let mut ids = Vec::with_capacity(count as usize);
        for i in 0..count {
            let angle = base + std::f32::consts::TAU * (i as f32 + 0.5) / count as f32;
            let motion = Motion::at(parent.motion.pos, radius).with_vel(direction(angle) * speed);
            let id = self.next_entity_id();
            self.minis.push(MiniBall::new(id, &parent, motion, hp));
            ids.push(id);
        }
        ids
    }

    /// Fire a volley from a ball along its heading
    pub fn spawn_projectiles(
        &mut self,
        owner: EntityId,
        kind: ProjectileKind,
        count: u32,
        damage: u32,
    ) -> Vec<EntityId> {
        let Some((pos, vel)) = self.ball(owner).map(|b| (b.motion.pos, b.motion.vel)) else {
            return Vec::new();
        };
        let tuning = &self.settings.tuning;
        let cell = self.board.cell_size;
        let radius = cell * PROJECTILE_RADIUS_FACTOR;
        let speed = tuning.projectile_speed * cell;
        let lifespan = tuning.projectile_lifespan_ticks;
        let base = launch_heading(vel);
        let first = base - VOLLEY_SPREAD * (count.saturating_sub(1)) as f32 / 2.0;

        let mut ids = Vec::with_capacity(count as usize);
        for i in 0..count {
            let angle = first + VOLLEY_SPREAD * i as f32;
            let motion = Motion::at(pos, radius).with_vel(direction(angle) * speed);
            let id = self.next_entity_id();
            self.projectiles
                .push(Projectile::new(id, owner, kind, motion, damage, lifespan));
            ids.push(id);
        }
        ids
    }

    /// Place fresh bricks in free cells near `pos`, keeping the caster clear
    pub fn spawn_bricks(&mut self, pos: Vec2, keep_clear: f32, count: u32, health: i32) -> Vec<BrickId> {
        let center = self.board.cell_of(pos);
        let cells = self
            .board
            .free_cells_near(center, count as usize, (pos, keep_clear));
        let mut placed = Vec::with_capacity(cells.len());
        for (col, row) in cells {
            match self.board.place(Brick::new(col, row, health.max(1))) {
                Ok(id) => placed.push(id),
                Err(e) => log::debug!("Skipped spawned brick: {}", e),
            }
        }
        placed
    }

    /// Up to `count` living bricks nearest to `pos`
    pub fn nearest_bricks(&self, pos: Vec2, count: u32) -> Vec<BrickId> {
        let mut found = Vec::new();
        for _ in 0..count {
            match self.board.nearest_brick(pos, f32::INFINITY, &found) {
                Some(id) => found.push(id),
                None => break,
            }
        }
        found
    }

    /// Cast a ball's power-up. Returns the events describing it.
    pub fn apply_power_up(&mut self, id: EntityId) -> Vec<GameEvent> {
        let Some(ball) = self.balls.iter_mut().find(|b| b.id == id) else {
            return Vec::new();
        };
        let effects = ball.use_power_up(&self.settings.tuning);
        if effects.is_empty() {
            return Vec::new();
        }
        let (kind, pos, radius) = (ball.kind, ball.motion.pos, ball.motion.radius);
        let cell = self.board.cell_size;

        let mut events = vec![GameEvent::PowerUpUsed {
            entity: id,
            kind,
            pos,
            effects: effects.clone(),
        }];

        for effect in effects {
            match effect {
                PowerUpEffect::Explode { radius, damage } => events.push(GameEvent::Explode {
                    pos,
                    radius: radius * cell,
                    damage,
                    target: BlastTarget::Bricks,
                    source: DamageSource::Explosion { owner: Some(id) },
                }),
                PowerUpEffect::SpawnMiniBalls { count } => {
                    self.spawn_minis(id, count);
                    events.push(GameEvent::SpawnMiniBalls {
                        parent: id,
                        count,
                        pos,
                    });
                }
                PowerUpEffect::SpawnProjectiles {
                    kind,
                    count,
                    damage,
                } => {
                    self.spawn_projectiles(id, kind, count, damage);
                    events.push(GameEvent::SpawnProjectiles {
                        owner: id,
                        kind,
                        count,
                        pos,
                    });
                }
                PowerUpEffect::SpawnBricks { count, health } => {
                    let bricks = self.spawn_bricks(pos, radius, count, health);
                    events.push(GameEvent::SpawnBricks { owner: id, bricks });
                }
                PowerUpEffect::Heal { amount } => {
                    events.push(GameEvent::BallHealed { entity: id, amount });
                }
                PowerUpEffect::Zap { targets, damage } => {
                    for brick in self.nearest_bricks(pos, targets) {
                        events.push(GameEvent::DamageBrick {
                            brick,
                            amount: damage,
                            source: DamageSource::Chain {
                                owner: id,
                                depth: 0,
                            },
                        });
                    }
                }
                // Applied to the ball by use_power_up
                PowerUpEffect::EnterPiercing { .. }
                | PowerUpEffect::EnterPhasing { .. }
                | PowerUpEffect::Ignite { .. }
                | PowerUpEffect::Empower { .. } => {}
            }
        }
        events
    }

    /// Anything still moving that keeps the turn going
    pub fn in_flight(&self) -> bool {
        self.balls.iter().any(|b| !b.is_ghost() && b.is_active())
            || self.minis.iter().any(|m| !m.dead)
            || self.projectiles.iter().any(|p| !p.dead)
    }

    /// Forced or natural end of turn: clear everything in flight
    pub fn end_turn(&mut self) -> GameEvent {
        log::info!(
            "Turn ended at tick {} (combo {}, {} bricks left)",
            self.time_ticks,
            self.combo,
            self.board.living_count()
        );
        self.balls.clear();
        self.minis.clear();
        self.projectiles.clear();
        self.combo = 0;
        self.turn = TurnPhase::Aiming;
        GameEvent::TurnEnded {
            tick: self.time_ticks,
        }
    }

    /// Ensure entities are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.balls.sort_by_key(|b| b.id);
        self.minis.sort_by_key(|m| m.id);
        self.projectiles.sort_by_key(|p| p.id);
    }
}

/// Heading of a velocity, straight up when at rest
fn launch_heading(vel: Vec2) -> f32 {
    if vel.length_squared() > f32::EPSILON {
        heading(vel)
    } else {
        -std::f32::consts::FRAC_PI_2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::BallPhase;
    use crate::sim::inventory::{BallRecord, Enchantment};

    fn state() -> GameState {
        GameState::new(Board::new(10, 8, 10.0, Vec2::ZERO), Settings::default())
    }

    #[test]
    fn test_spawn_ball_uses_record() {
        let mut state = state();
        state.inventory.records.insert(
            InstanceId(4),
            BallRecord::new(BallKind::Classic)
                .with(Enchantment::Health(25.0))
                .with(Enchantment::PowerUpUses(2))
                .with(Enchantment::Speed(2.0)),
        );
        let id = state.spawn_ball(BallKind::Classic, Some(InstanceId(4)), Vec2::new(50.0, 70.0));
        let ball = state.ball(id).unwrap();
        assert_eq!(ball.instance, Some(InstanceId(4)));
        assert_eq!(ball.max_hp, 125.0);
        assert_eq!(ball.power_up_uses, 3);
        assert!((ball.speed - 5.0).abs() < 1e-5);
        assert_eq!(ball.phase, BallPhase::Idle);
    }

    #[test]
    fn test_aim_refreshes_ghosts_and_launch_clears_them() {
        let mut state = state();
        let id = state.spawn_ball(BallKind::Classic, None, Vec2::new(50.0, 70.0));
        state.aim(-1.0);
        state.aim(-1.2);
        assert_eq!(state.balls.len(), 2);
        let ghost = state.balls.iter().find(|b| b.is_ghost()).unwrap();
        assert_eq!(ghost.phase, BallPhase::Moving);
        assert_eq!(ghost.ghost_ticks, Some(state.settings.ghost_lifetime_ticks));
        assert_eq!(state.ball(id).unwrap().phase, BallPhase::Aiming);

        state.launch(-1.2);
        assert_eq!(state.balls.len(), 1);
        assert_eq!(state.ball(id).unwrap().phase, BallPhase::Moving);
        assert_eq!(state.turn, TurnPhase::Running);
    }

    #[test]
    fn test_split_power_up_spawns_minis() {
        let mut state = state();
        let id = state.spawn_ball(BallKind::Split, Some(InstanceId(8)), Vec2::new(50.0, 40.0));
        state.launch(-1.0);
        let events = state.apply_power_up(id);
        assert!(matches!(events[0], GameEvent::PowerUpUsed { entity, .. } if entity == id));
        assert!(matches!(
            events[1],
            GameEvent::SpawnMiniBalls { parent, count: 2, .. } if parent == id
        ));
        assert_eq!(state.minis.len(), 2);
        for mini in &state.minis {
            assert_eq!(mini.parent_kind, BallKind::Split);
            assert_eq!(mini.parent_instance, Some(InstanceId(8)));
            assert!((mini.motion.speed() - 3.0).abs() < 1e-4);
        }
        // Out of charges
        assert!(state.apply_power_up(id).is_empty());
    }

    #[test]
    fn test_builder_places_bricks_clear_of_ball() {
        let mut state = state();
        let id = state.spawn_ball(BallKind::Builder, None, Vec2::new(55.0, 45.0));
        let events = state.apply_power_up(id);
        let Some(GameEvent::SpawnBricks { bricks, .. }) = events.last() else {
            panic!("no spawn event: {:?}", events);
        };
        assert_eq!(bricks.len(), 3);
        assert_eq!(state.board.living_count(), 3);
        assert_eq!(state.board.brick_at(5, 4), None);
    }

    #[test]
    fn test_volley_fans_around_heading() {
        let mut state = state();
        let id = state.spawn_ball(BallKind::Shotgun, None, Vec2::new(50.0, 40.0));
        state.launch(0.0);
        state.apply_power_up(id);
        assert_eq!(state.projectiles.len(), 5);
        let headings: Vec<f32> = state
            .projectiles
            .iter()
            .map(|p| heading(p.motion.vel))
            .collect();
        assert!((headings[2]).abs() < 1e-5);
        assert!((headings[0] + 2.0 * VOLLEY_SPREAD).abs() < 1e-5);
        assert!(state.projectiles.iter().all(|p| p.damage == 3));
    }

    #[test]
    fn test_end_turn_clears_flight() {
        let mut state = state();
        let id = state.spawn_ball(BallKind::Cell, None, Vec2::new(50.0, 40.0));
        state.launch(-1.0);
        state.apply_power_up(id);
        state.combo = 7;
        assert!(state.in_flight());
        assert!(matches!(state.end_turn(), GameEvent::TurnEnded { .. }));
        assert!(!state.in_flight());
        assert!(state.balls.is_empty() && state.minis.is_empty());
        assert_eq!(state.combo, 0);
        assert_eq!(state.turn, TurnPhase::Aiming);
    }

    #[test]
    fn test_state_json_skips_runtime_parts() {
        let mut state = state();
        state.spawn_ball(BallKind::Fire, None, Vec2::new(50.0, 40.0));
        let json = serde_json::to_string(&state).unwrap();
        let back: GameState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.balls.len(), 1);
        assert!(!back.reactions.is_empty());
    }
}
