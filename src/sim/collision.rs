//! Collision detection and response against the brick grid
//!
//! Circles against axis-aligned rectangles. Broad phase walks the grid cells
//! under the entity's bounding box; narrow phase either clamps the center to
//! the brick footprint (regular entities, one brick per sub-step) or uses a
//! sum-of-radii overlap test (giants, every overlapping brick at once).

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::board::{Board, BrickId};
use super::damage::{Arsenal, compute_damage};
use super::entity::{Motion, Projectile, ProjectileKind, Striker};
use super::equipment::{ActiveEquipment, Equipment, EquipmentId};
use super::event::{DamageSource, GameEvent, HarmCause};
use crate::consts::{MAX_SUBSTEPS, SUBSTEP_RADIUS_FACTOR};

/// Axis-aligned rectangle in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Minkowski sum with a circle's bounding square
    pub fn expand(&self, radius: f32) -> Self {
        Self::new(self.min - Vec2::splat(radius), self.max + Vec2::splat(radius))
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    #[inline]
    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min, self.max)
    }

    /// Distance from `p` to the rectangle (0 inside)
    #[inline]
    pub fn distance_to(&self, p: Vec2) -> f32 {
        (p - self.closest_point(p)).length()
    }
}

/// Face of a rectangle (or wall of the board) that was hit.
///
/// Screen coordinates: `Top` is the face at `min.y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

/// Inclusive cell box under a circle
pub fn cell_span(board: &Board, pos: Vec2, radius: f32) -> ((i32, i32), (i32, i32)) {
    (
        board.cell_of(pos - Vec2::splat(radius)),
        board.cell_of(pos + Vec2::splat(radius)),
    )
}

#[inline]
pub fn circle_touches_rect(center: Vec2, radius: f32, rect: &Aabb) -> bool {
    rect.distance_to(center) <= radius
}

/// Entry/exit times of a 1D ray against [lo, hi]
fn slab(start: f32, delta: f32, lo: f32, hi: f32) -> (f32, f32) {
    if delta.abs() < f32::EPSILON {
        // No motion on this axis: always inside or never
        if start >= lo && start <= hi {
            (f32::NEG_INFINITY, f32::INFINITY)
        } else {
            (f32::INFINITY, f32::NEG_INFINITY)
        }
    } else {
        let t1 = (lo - start) / delta;
        let t2 = (hi - start) / delta;
        (t1.min(t2), t1.max(t2))
    }
}

/// Which face of `rect` the circle entered through while moving from `prev`
/// to `cur`.
///
/// Ray-slab test against the rectangle inflated by `radius`. `None` when the
/// slab intervals do not overlap or the entry time falls outside [0, 1]. The
/// axis with the later entry wins; ties go to y.
pub fn detect_collision_side(prev: Vec2, cur: Vec2, rect: &Aabb, radius: f32) -> Option<Side> {
    let inflated = rect.expand(radius);
    let delta = cur - prev;
    let (x_entry, x_exit) = slab(prev.x, delta.x, inflated.min.x, inflated.max.x);
    let (y_entry, y_exit) = slab(prev.y, delta.y, inflated.min.y, inflated.max.y);

    let entry = x_entry.max(y_entry);
    let exit = x_exit.min(y_exit);
    if entry > exit || !(0.0..=1.0).contains(&entry) {
        return None;
    }

    if x_entry > y_entry {
        Some(if delta.x > 0.0 { Side::Left } else { Side::Right })
    } else {
        Some(if delta.y > 0.0 { Side::Top } else { Side::Bottom })
    }
}

/// Face the center is closest to crossing
pub fn least_penetration_side(pos: Vec2, rect: &Aabb) -> Side {
    let candidates = [
        (pos.x - rect.min.x, Side::Left),
        (rect.max.x - pos.x, Side::Right),
        (pos.y - rect.min.y, Side::Top),
        (rect.max.y - pos.y, Side::Bottom),
    ];
    let mut best = candidates[0];
    for candidate in &candidates[1..] {
        if candidate.0 < best.0 {
            best = *candidate;
        }
    }
    best.1
}

/// Reflect off a rectangle face and push the circle out of it
pub fn bounce(motion: &mut Motion, rect: &Aabb, side: Side) {
    let r = motion.radius;
    match side {
        Side::Left => {
            motion.vel.x = -motion.vel.x.abs();
            motion.pos.x = rect.min.x - r;
        }
        Side::Right => {
            motion.vel.x = motion.vel.x.abs();
            motion.pos.x = rect.max.x + r;
        }
        Side::Top => {
            motion.vel.y = -motion.vel.y.abs();
            motion.pos.y = rect.min.y - r;
        }
        Side::Bottom => {
            motion.vel.y = motion.vel.y.abs();
            motion.pos.y = rect.max.y + r;
        }
    }
}

/// Keep a circle inside the board. Returns the wall hit, x walls first.
pub fn bounce_off_walls(motion: &mut Motion, bounds: &Aabb) -> Option<Side> {
    let r = motion.radius;
    let mut hit = None;

    if motion.pos.x - r < bounds.min.x {
        motion.pos.x = bounds.min.x + r;
        motion.vel.x = motion.vel.x.abs();
        hit = Some(Side::Left);
    } else if motion.pos.x + r > bounds.max.x {
        motion.pos.x = bounds.max.x - r;
        motion.vel.x = -motion.vel.x.abs();
        hit = Some(Side::Right);
    }

    if motion.pos.y - r < bounds.min.y {
        motion.pos.y = bounds.min.y + r;
        motion.vel.y = motion.vel.y.abs();
        hit = hit.or(Some(Side::Top));
    } else if motion.pos.y + r > bounds.max.y {
        motion.pos.y = bounds.max.y - r;
        motion.vel.y = -motion.vel.y.abs();
        hit = hit.or(Some(Side::Bottom));
    }

    hit
}

/// Sub-moves needed so no single move exceeds 0.8 radius
pub fn substep_count(speed: f32, radius: f32) -> u32 {
    if !speed.is_finite() || speed <= 0.0 {
        return 1;
    }
    if radius <= 0.0 {
        return MAX_SUBSTEPS;
    }
    let steps = (speed / (radius * SUBSTEP_RADIUS_FACTOR)).ceil();
    if steps >= MAX_SUBSTEPS as f32 {
        MAX_SUBSTEPS
    } else {
        (steps as u32).max(1)
    }
}

/// Outcome of one sub-step of brick interaction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contact {
    pub events: Vec<GameEvent>,
    /// Ends the entity's movement for this tick
    pub terminal: bool,
    /// Bricks touched
    pub bricks: Vec<BrickId>,
}

fn strike_brick(
    board: &mut Board,
    id: BrickId,
    damage: u32,
    source: DamageSource,
    contact: bool,
) -> (GameEvent, u32, bool) {
    let pos = board
        .brick(id)
        .map(|b| board.brick_center(b))
        .unwrap_or_default();
    let (dealt, destroyed) = match board.brick_mut(id) {
        Some(brick) => (brick.hit(damage, source), brick.is_destroyed()),
        None => (0, false),
    };
    let event = GameEvent::BrickHit {
        brick: id,
        pos,
        damage_dealt: dealt,
        source,
        contact,
        executed: false,
    };
    (event, dealt, destroyed)
}

/// Executioner kill, if the item is equipped and the brick qualifies
fn try_execute(
    board: &mut Board,
    id: BrickId,
    equipment: &ActiveEquipment,
    source: DamageSource,
) -> Option<GameEvent> {
    let Some(Equipment::Executioner { threshold }) = equipment.find(EquipmentId::Executioner)
    else {
        return None;
    };
    let brick = board.brick(id)?;
    if brick.goal || brick.health > *threshold {
        return None;
    }
    let pos = board.brick_center(brick);
    let dealt = board.brick_mut(id)?.execute(source);
    log::debug!("Brick {} executed", id);
    Some(GameEvent::BrickHit {
        brick: id,
        pos,
        damage_dealt: dealt,
        source,
        contact: true,
        executed: true,
    })
}

fn bounce_off_brick<S: Striker + ?Sized>(striker: &mut S, rect: &Aabb) {
    let motion = striker.motion_mut();
    let side = detect_collision_side(motion.prev_pos, motion.pos, rect, motion.radius)
        .unwrap_or_else(|| least_penetration_side(motion.pos, rect));
    bounce(motion, rect, side);
}

/// One sub-step of brick interaction for a ball or mini-ball
pub fn resolve<S: Striker + ?Sized>(
    striker: &mut S,
    board: &mut Board,
    arsenal: &Arsenal,
    combo: u32,
) -> Contact {
    if striker.is_giant() {
        resolve_overlap(striker, board, arsenal, combo)
    } else {
        resolve_point(striker, board, arsenal, combo)
    }
}

fn resolve_point<S: Striker + ?Sized>(
    striker: &mut S,
    board: &mut Board,
    arsenal: &Arsenal,
    combo: u32,
) -> Contact {
    let Motion { pos, radius, .. } = *striker.motion();
    let (min, max) = cell_span(board, pos, radius);

    for id in board.bricks_in_cells(min, max) {
        let Some(brick) = board.brick(id) else {
            continue;
        };
        let rect = board.brick_rect(brick);
        if !circle_touches_rect(pos, radius, &rect) {
            continue;
        }
        // Already passed through during this traversal
        if striker.contacts().is_bypassing() && striker.contacts().pierced.contains(&id) {
            continue;
        }

        let mut contact = Contact {
            terminal: true,
            bricks: vec![id],
            ..Default::default()
        };

        if striker.is_ghost() || striker.contacts().on_cooldown(id) {
            bounce_off_brick(striker, &rect);
            return contact;
        }

        let entity = striker.id();
        let source = DamageSource::Entity(entity);
        let equipment = arsenal.equipment(&striker.wielder());
        if let Some(event) = try_execute(board, id, &equipment, source) {
            contact.events.push(event);
            return contact;
        }

        let damage = compute_damage(&striker.strike_profile(arsenal.tuning), arsenal, combo);

        if striker.contacts().is_bypassing() {
            let contacts = striker.contacts_mut();
            contacts.pierced.insert(id);
            let piercing = contacts.piercing_contacts_left > 0;
            if piercing {
                contacts.piercing_contacts_left -= 1;
            }
            let (event, _, _) = strike_brick(board, id, damage, source, true);
            contact.events.push(event);
            if piercing && arsenal.tuning.pierce_self_damage > 0.0 {
                contact.events.push(GameEvent::DamageTaken {
                    entity,
                    amount: arsenal.tuning.pierce_self_damage,
                    pos,
                    cause: HarmCause::Pierce,
                });
            }
            return contact;
        }

        let (event, dealt, destroyed) = strike_brick(board, id, damage, source, true);
        contact.events.push(event);
        if dealt > 0 && !destroyed {
            striker.contacts_mut().start_cooldown(id);
        }
        bounce_off_brick(striker, &rect);
        return contact;
    }

    Contact::default()
}

fn resolve_overlap<S: Striker + ?Sized>(
    striker: &mut S,
    board: &mut Board,
    arsenal: &Arsenal,
    combo: u32,
) -> Contact {
    let Motion { pos, radius, .. } = *striker.motion();
    let (min, max) = cell_span(board, pos, radius);
    let entity = striker.id();
    let source = DamageSource::Entity(entity);
    let ghost = striker.is_ghost();
    let profile = striker.strike_profile(arsenal.tuning);
    let equipment = arsenal.equipment(&profile.wielder);

    let mut contact = Contact::default();
    let mut dealt_total = 0;

    for id in board.bricks_in_cells(min, max) {
        let Some(brick) = board.brick(id) else {
            continue;
        };
        let center = board.brick_center(brick);
        let brick_radius = 0.5 * brick.width.min(brick.height) as f32 * board.cell_size;
        if pos.distance(center) > radius + brick_radius {
            continue;
        }
        if !striker.contacts_mut().pierced.insert(id) {
            continue;
        }
        contact.bricks.push(id);
        if ghost {
            continue;
        }

        let event = match try_execute(board, id, &equipment, source) {
            Some(event) => event,
            None => {
                let damage = compute_damage(&profile, arsenal, combo);
                strike_brick(board, id, damage, source, true).0
            }
        };
        if let GameEvent::BrickHit { damage_dealt, .. } = &event {
            dealt_total += damage_dealt;
        }
        contact.events.push(event);
    }

    let loss = striker.absorb_strain(dealt_total);
    if loss > 0.0 {
        contact.events.push(GameEvent::DamageTaken {
            entity,
            amount: loss,
            pos,
            cause: HarmCause::GiantStrain,
        });
    }
    contact
}

/// One sub-step of brick interaction for a projectile
pub fn resolve_projectile(projectile: &mut Projectile, board: &mut Board, blast_radius: f32) -> Contact {
    let Motion { pos, radius, .. } = projectile.motion;
    let (min, max) = cell_span(board, pos, radius);
    let source = projectile.source();
    let mut contact = Contact::default();

    for id in board.bricks_in_cells(min, max) {
        let Some(brick) = board.brick(id) else {
            continue;
        };
        if !circle_touches_rect(pos, radius, &board.brick_rect(brick)) {
            continue;
        }
        if projectile.pierced.contains(&id) {
            continue;
        }
        contact.bricks.push(id);

        match projectile.kind {
            ProjectileKind::Bullet => {
                let (event, _, _) = strike_brick(board, id, projectile.damage, source, false);
                contact.events.push(event);
                projectile.dead = true;
                contact.terminal = true;
                return contact;
            }
            ProjectileKind::Sniper => {
                projectile.pierced.insert(id);
                let (event, _, _) = strike_brick(board, id, projectile.damage, source, false);
                contact.events.push(event);
            }
            ProjectileKind::Homing => {
                contact.events.push(projectile.detonate(blast_radius));
                contact.terminal = true;
                return contact;
            }
        }
    }
    contact
}

/// Result of moving an entity for one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Travel {
    pub events: Vec<GameEvent>,
    pub brick_contact: bool,
    pub wall: Option<Side>,
    /// A giant drifted fully off the board
    pub left_board: bool,
}

/// Move a ball or mini-ball through one tick of sub-steps.
///
/// Stops early on the first brick bounce/hit or wall bounce.
pub fn travel<S: Striker + ?Sized>(
    striker: &mut S,
    board: &mut Board,
    arsenal: &Arsenal,
    combo: u32,
) -> Travel {
    let steps = substep_count(striker.motion().speed(), striker.motion().radius);
    let bounds = board.bounds();
    let mut travel = Travel::default();

    for _ in 0..steps {
        let motion = striker.motion_mut();
        let delta = motion.vel / steps as f32;
        motion.advance(delta);

        let contact = resolve(striker, board, arsenal, combo);
        travel.brick_contact |= !contact.bricks.is_empty();
        travel.events.extend(contact.events);
        if contact.terminal {
            break;
        }

        if striker.is_giant() {
            let motion = striker.motion();
            if !bounds.expand(motion.radius).contains(motion.pos) {
                striker.contacts_mut().pierced.clear();
                travel.left_board = true;
                break;
            }
            continue;
        }

        if let Some(side) = bounce_off_walls(striker.motion_mut(), &bounds) {
            striker.contacts_mut().pierced.clear();
            travel.wall = Some(side);
            if !striker.is_ghost() {
                travel.events.push(GameEvent::WallHit {
                    entity: striker.id(),
                    pos: striker.motion().pos,
                    side,
                    mini: striker.wielder().mini,
                });
            }
            break;
        }
    }
    travel
}

/// Move a projectile through one tick of sub-steps
pub fn travel_projectile(projectile: &mut Projectile, board: &mut Board, blast_radius: f32) -> Vec<GameEvent> {
    let steps = substep_count(projectile.motion.speed(), projectile.motion.radius);
    let bounds = board.bounds();
    let mut events = Vec::new();

    for _ in 0..steps {
        let delta = projectile.motion.vel / steps as f32;
        projectile.motion.advance(delta);

        let contact = resolve_projectile(projectile, board, blast_radius);
        events.extend(contact.events);
        if projectile.dead {
            break;
        }
        if !bounds.contains(projectile.motion.pos) {
            projectile.dead = true;
            events.push(GameEvent::ProjectileExpired {
                entity: projectile.id,
                kind: projectile.kind,
                pos: projectile.motion.pos,
            });
            break;
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::board::Brick;
    use crate::sim::entity::{Ball, BallPhase, ball_radius};
    use crate::sim::equipment::{EquipmentItem, Loadouts};
    use crate::sim::inventory::Inventory;
    use crate::tuning::{BallKind, Tuning};
    use proptest::prelude::*;

    const CELL: f32 = 10.0;

    struct World {
        board: Board,
        tuning: Tuning,
        loadouts: Loadouts,
        inventory: Inventory,
    }

    impl World {
        fn new() -> Self {
            Self {
                board: Board::new(10, 8, CELL, Vec2::ZERO),
                tuning: Tuning::default(),
                loadouts: Loadouts::default(),
                inventory: Inventory::default(),
            }
        }

        fn brick(&mut self, col: i32, row: i32, health: i32) -> BrickId {
            self.board.place(Brick::new(col, row, health)).unwrap()
        }

        fn ball(&self, kind: BallKind, pos: Vec2, vel: Vec2) -> Ball {
            let stats = self.tuning.ball(kind);
            let radius = ball_radius(CELL, &stats, 1.0);
            let mut motion = Motion::at(pos, radius).with_vel(vel);
            motion.prev_pos = pos - vel;
            let mut ball = Ball::new(1, kind, &stats, motion);
            ball.phase = BallPhase::Moving;
            ball
        }

        fn resolve(&mut self, ball: &mut Ball) -> Contact {
            let arsenal = Arsenal {
                tuning: &self.tuning,
                loadouts: &self.loadouts,
                inventory: &self.inventory,
            };
            resolve(ball, &mut self.board, &arsenal, 0)
        }

        fn travel(&mut self, ball: &mut Ball) -> Travel {
            let arsenal = Arsenal {
                tuning: &self.tuning,
                loadouts: &self.loadouts,
                inventory: &self.inventory,
            };
            travel(ball, &mut self.board, &arsenal, 0)
        }
    }

    fn hits(contact: &Contact) -> Vec<(BrickId, u32)> {
        contact
            .events
            .iter()
            .filter_map(|e| match e {
                GameEvent::BrickHit {
                    brick, damage_dealt, ..
                } => Some((*brick, *damage_dealt)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_side_detection_by_later_entry() {
        let rect = Aabb::new(Vec2::ZERO, Vec2::splat(10.0));
        assert_eq!(
            detect_collision_side(Vec2::new(5.0, -3.0), Vec2::new(5.0, -0.5), &rect, 1.0),
            Some(Side::Top)
        );
        assert_eq!(
            detect_collision_side(Vec2::new(13.0, 5.0), Vec2::new(10.5, 5.0), &rect, 1.0),
            Some(Side::Right)
        );
        // Corner approach: y enters later
        assert_eq!(
            detect_collision_side(Vec2::new(-3.0, -2.0), Vec2::new(-0.5, -0.8), &rect, 1.0),
            Some(Side::Top)
        );
    }

    #[test]
    fn test_side_detection_none_cases() {
        let rect = Aabb::new(Vec2::ZERO, Vec2::splat(10.0));
        // Zero velocity
        let p = Vec2::new(5.0, -0.5);
        assert_eq!(detect_collision_side(p, p, &rect, 1.0), None);
        // Entry beyond this move
        assert_eq!(
            detect_collision_side(Vec2::new(5.0, -10.0), Vec2::new(5.0, -8.0), &rect, 1.0),
            None
        );
        // Passing beside the rectangle
        assert_eq!(
            detect_collision_side(Vec2::new(-5.0, -5.0), Vec2::new(-5.0, 15.0), &rect, 1.0),
            None
        );
    }

    #[test]
    fn test_least_penetration_fallback() {
        let rect = Aabb::new(Vec2::ZERO, Vec2::splat(10.0));
        assert_eq!(least_penetration_side(Vec2::new(1.0, 5.0), &rect), Side::Left);
        assert_eq!(least_penetration_side(Vec2::new(5.0, 9.5), &rect), Side::Bottom);
    }

    #[test]
    fn test_bounce_flips_and_clamps() {
        let rect = Aabb::new(Vec2::new(20.0, 20.0), Vec2::new(30.0, 30.0));
        let mut motion = Motion::at(Vec2::new(18.0, 25.0), 3.0).with_vel(Vec2::new(2.0, 1.0));
        bounce(&mut motion, &rect, Side::Left);
        assert_eq!(motion.vel, Vec2::new(-2.0, 1.0));
        assert_eq!(motion.pos.x, 17.0);
    }

    #[test]
    fn test_wall_bounce_keeps_circle_inside() {
        let bounds = Aabb::new(Vec2::ZERO, Vec2::new(100.0, 80.0));
        let mut motion = Motion::at(Vec2::new(98.0, 1.0), 3.0).with_vel(Vec2::new(4.0, -4.0));
        assert_eq!(bounce_off_walls(&mut motion, &bounds), Some(Side::Right));
        assert_eq!(motion.pos, Vec2::new(97.0, 3.0));
        assert_eq!(motion.vel, Vec2::new(-4.0, 4.0));

        let mut motion = Motion::at(Vec2::new(50.0, 40.0), 3.0).with_vel(Vec2::X);
        assert_eq!(bounce_off_walls(&mut motion, &bounds), None);
    }

    #[test]
    fn test_substep_count_edges() {
        assert_eq!(substep_count(0.0, 3.0), 1);
        assert_eq!(substep_count(f32::NAN, 3.0), 1);
        assert_eq!(substep_count(2.4, 3.0), 1);
        assert_eq!(substep_count(2.5, 3.0), 2);
        assert_eq!(substep_count(1.0e9, 1.0), MAX_SUBSTEPS);
        assert_eq!(substep_count(1.0, 0.0), MAX_SUBSTEPS);
    }

    #[test]
    fn test_classic_ball_destroys_fresh_brick() {
        let mut world = World::new();
        let id = world.brick(2, 2, 10);
        let mut ball = world.ball(BallKind::Classic, Vec2::new(17.5, 25.0), Vec2::new(2.0, 0.0));

        let contact = world.resolve(&mut ball);
        assert!(contact.terminal);
        assert_eq!(hits(&contact), vec![(id, 10)]);
        assert_eq!(contact.events.len(), 1);
        assert!(world.board.brick(id).unwrap().is_destroyed());
        assert!(ball.contacts.cooldowns.is_empty());
        assert_eq!(ball.motion.vel, Vec2::new(-2.0, 0.0));
        assert!((ball.motion.pos.x - 17.0).abs() < 1e-4);
    }

    #[test]
    fn test_cooldown_blocks_repeat_damage() {
        let mut world = World::new();
        let id = world.brick(2, 2, 30);
        let mut ball = world.ball(BallKind::Classic, Vec2::new(17.5, 25.0), Vec2::new(2.0, 0.0));

        assert_eq!(hits(&world.resolve(&mut ball)), vec![(id, 10)]);
        assert!(ball.contacts.on_cooldown(id));

        // Still touching: bounces without damage
        ball.motion.vel = Vec2::new(2.0, 0.0);
        ball.motion.pos = Vec2::new(17.5, 25.0);
        let contact = world.resolve(&mut ball);
        assert!(contact.terminal);
        assert!(contact.events.is_empty());
        assert_eq!(ball.motion.vel.x, -2.0);
        assert_eq!(world.board.brick(id).unwrap().health, 20);
    }

    #[test]
    fn test_trash_bin_always_deals_set_damage() {
        let mut world = World::new();
        world.loadouts.equip_kind(
            BallKind::Strong,
            0,
            EquipmentItem::new(Equipment::TrashBin { set_damage: 5 }),
        );
        let id = world.brick(2, 2, 50);
        let mut ball = world.ball(BallKind::Strong, Vec2::new(17.5, 25.0), Vec2::new(2.0, 0.0));
        ball.power_up_buff = 25.0;
        assert_eq!(hits(&world.resolve(&mut ball)), vec![(id, 5)]);
    }

    #[test]
    fn test_piercing_passes_two_then_bounces() {
        let mut world = World::new();
        let first = world.brick(2, 2, 50);
        let second = world.brick(4, 2, 50);
        let third = world.brick(6, 2, 50);
        let mut ball = world.ball(BallKind::Piercing, Vec2::new(25.0, 25.0), Vec2::new(2.0, 0.0));
        ball.contacts.piercing_contacts_left = 2;

        let contact = world.resolve(&mut ball);
        assert_eq!(hits(&contact), vec![(first, 9)]);
        assert!(matches!(
            contact.events[1],
            GameEvent::DamageTaken {
                cause: HarmCause::Pierce,
                ..
            }
        ));
        assert_eq!(ball.motion.vel, Vec2::new(2.0, 0.0));

        // Lingering inside an already pierced brick does nothing
        assert_eq!(world.resolve(&mut ball), Contact::default());

        ball.motion.pos = Vec2::new(45.0, 25.0);
        let contact = world.resolve(&mut ball);
        assert_eq!(hits(&contact), vec![(second, 9)]);
        assert_eq!(contact.events.len(), 2);
        assert_eq!(ball.contacts.piercing_contacts_left, 0);
        assert_eq!(ball.motion.vel, Vec2::new(2.0, 0.0));

        ball.motion.pos = Vec2::new(57.5, 25.0);
        ball.motion.prev_pos = Vec2::new(55.5, 25.0);
        let contact = world.resolve(&mut ball);
        assert_eq!(hits(&contact), vec![(third, 9)]);
        assert_eq!(contact.events.len(), 1);
        assert_eq!(ball.motion.vel, Vec2::new(-2.0, 0.0));
        assert!(ball.contacts.on_cooldown(third));
    }

    #[test]
    fn test_pierced_brick_is_solid_once_piercing_ends() {
        let mut world = World::new();
        let brick = world.brick(2, 2, 50);
        let mut ball = world.ball(BallKind::Piercing, Vec2::new(25.0, 25.0), Vec2::new(2.0, 0.0));
        ball.contacts.piercing_contacts_left = 1;

        let contact = world.resolve(&mut ball);
        assert_eq!(hits(&contact), vec![(brick, 9)]);
        assert_eq!(ball.contacts.piercing_contacts_left, 0);

        // Coming back from the right face
        ball.motion.pos = Vec2::new(32.5, 25.0);
        ball.motion.prev_pos = Vec2::new(34.5, 25.0);
        ball.motion.vel = Vec2::new(-2.0, 0.0);
        let contact = world.resolve(&mut ball);
        assert!(contact.terminal);
        assert_eq!(hits(&contact), vec![(brick, 9)]);
        assert_eq!(world.board.brick(brick).unwrap().health, 32);
        assert_eq!(ball.motion.vel, Vec2::new(2.0, 0.0));
    }

    #[test]
    fn test_giant_hits_every_overlapping_brick() {
        let mut world = World::new();
        let ids: Vec<_> = [(2, 2), (3, 2), (2, 3), (3, 3)]
            .iter()
            .map(|&(c, r)| world.brick(c, r, 50))
            .collect();
        let mut ball = world.ball(BallKind::Giant, Vec2::new(30.0, 30.0), Vec2::new(0.0, -1.0));
        ball.damage_dealt_for_hp_loss = 50;

        let contact = world.resolve(&mut ball);
        assert!(!contact.terminal);
        let hit = hits(&contact);
        assert_eq!(hit, ids.iter().map(|&id| (id, 20)).collect::<Vec<_>>());
        // 50 + 80 = 130: one HP lost, 30 carried
        assert!(matches!(
            contact.events.last(),
            Some(GameEvent::DamageTaken {
                cause: HarmCause::GiantStrain,
                amount,
                ..
            }) if *amount == 1.0
        ));
        assert_eq!(ball.damage_dealt_for_hp_loss, 30);
        assert_eq!(ball.motion.vel, Vec2::new(0.0, -1.0));

        // Each brick once per traversal
        let again = world.resolve(&mut ball);
        assert!(again.events.is_empty());
    }

    #[test]
    fn test_executioner_kills_low_bricks_but_not_goals() {
        let mut world = World::new();
        world.loadouts.equip_kind(
            BallKind::Classic,
            0,
            EquipmentItem::new(Equipment::Executioner { threshold: 40 }),
        );
        let low = world.brick(2, 2, 35);
        let mut ball = world.ball(BallKind::Classic, Vec2::new(17.5, 25.0), Vec2::new(2.0, 0.0));
        let contact = world.resolve(&mut ball);
        assert!(matches!(
            contact.events[..],
            [GameEvent::BrickHit {
                damage_dealt: 35,
                executed: true,
                ..
            }]
        ));
        // No bounce, no cooldown
        assert_eq!(ball.motion.vel, Vec2::new(2.0, 0.0));
        assert!(ball.contacts.cooldowns.is_empty());
        assert!(world.board.brick(low).unwrap().is_destroyed());

        let goal = world.board.place(Brick::new(2, 5, 35).as_goal()).unwrap();
        let mut ball = world.ball(BallKind::Classic, Vec2::new(17.5, 55.0), Vec2::new(2.0, 0.0));
        assert_eq!(hits(&world.resolve(&mut ball)), vec![(goal, 10)]);
    }

    #[test]
    fn test_ghost_bounces_without_damage() {
        let mut world = World::new();
        let id = world.brick(2, 2, 10);
        let mut ball = world
            .ball(BallKind::Classic, Vec2::new(17.5, 25.0), Vec2::new(2.0, 0.0))
            .into_ghost(30);
        let contact = world.resolve(&mut ball);
        assert!(contact.terminal);
        assert!(contact.events.is_empty());
        assert_eq!(ball.motion.vel.x, -2.0);
        assert_eq!(world.board.brick(id).unwrap().health, 10);
    }

    #[test]
    fn test_wall_bounce_clears_pierced_and_reports() {
        let mut world = World::new();
        let mut ball = world.ball(BallKind::Classic, Vec2::new(5.0, 40.0), Vec2::new(-3.0, 0.0));
        ball.contacts.pierced.insert(99);
        let travel = world.travel(&mut ball);
        assert_eq!(travel.wall, Some(Side::Left));
        assert!(ball.contacts.pierced.is_empty());
        assert!((ball.motion.pos.x - 3.0).abs() < 1e-4);
        assert!(matches!(
            travel.events[..],
            [GameEvent::WallHit {
                side: Side::Left,
                mini: false,
                ..
            }]
        ));
    }

    #[test]
    fn test_travel_stops_at_first_brick() {
        let mut world = World::new();
        let near = world.brick(2, 2, 50);
        world.brick(4, 2, 50);
        // Fast enough to reach both bricks in one tick without the early stop
        let mut ball = world.ball(BallKind::Classic, Vec2::new(12.0, 25.0), Vec2::new(30.0, 0.0));
        let travel = world.travel(&mut ball);
        assert!(travel.brick_contact);
        let bricks: Vec<_> = travel
            .events
            .iter()
            .filter_map(|e| match e {
                GameEvent::BrickHit { brick, .. } => Some(*brick),
                _ => None,
            })
            .collect();
        assert_eq!(bricks, vec![near]);
        assert!(ball.motion.vel.x < 0.0);
    }

    #[test]
    fn test_giant_leaves_board_instead_of_bouncing() {
        let mut world = World::new();
        let mut ball = world.ball(BallKind::Giant, Vec2::new(50.0, 2.0), Vec2::new(0.0, -12.0));
        ball.contacts.pierced.insert(3);
        let travel = world.travel(&mut ball);
        assert!(travel.left_board);
        assert_eq!(travel.wall, None);
        assert!(ball.contacts.pierced.is_empty());
    }

    #[test]
    fn test_bullet_stops_and_sniper_pierces() {
        let mut world = World::new();
        let a = world.brick(2, 2, 50);
        let b = world.brick(3, 2, 50);

        let motion = Motion::at(Vec2::new(19.5, 25.0), 1.0).with_vel(Vec2::new(2.0, 0.0));
        let mut bullet = Projectile::new(5, 1, ProjectileKind::Bullet, motion, 7, 100);
        let contact = resolve_projectile(&mut bullet, &mut world.board, 10.0);
        assert!(bullet.dead);
        assert!(matches!(
            contact.events[..],
            [GameEvent::BrickHit {
                damage_dealt: 7,
                contact: false,
                ..
            }]
        ));

        let motion = Motion::at(Vec2::new(30.0, 25.0), 1.0).with_vel(Vec2::new(2.0, 0.0));
        let mut sniper = Projectile::new(6, 1, ProjectileKind::Sniper, motion, 7, 100);
        let contact = resolve_projectile(&mut sniper, &mut world.board, 10.0);
        assert!(!sniper.dead);
        assert_eq!(contact.bricks, vec![a, b]);
        assert!(resolve_projectile(&mut sniper, &mut world.board, 10.0).events.is_empty());
    }

    #[test]
    fn test_homing_explodes_on_impact() {
        let mut world = World::new();
        world.brick(2, 2, 50);
        let motion = Motion::at(Vec2::new(19.5, 25.0), 1.0).with_vel(Vec2::new(2.0, 0.0));
        let mut homing = Projectile::new(5, 1, ProjectileKind::Homing, motion, 9, 100);
        let contact = resolve_projectile(&mut homing, &mut world.board, 10.0);
        assert!(homing.dead);
        assert!(matches!(
            contact.events[..],
            [GameEvent::Explode {
                damage: 9,
                radius,
                ..
            }] if radius == 10.0
        ));
        assert_eq!(world.board.brick(1).unwrap().health, 50);
    }

    #[test]
    fn test_projectile_expires_off_board() {
        let mut world = World::new();
        let motion = Motion::at(Vec2::new(99.0, 40.0), 1.0).with_vel(Vec2::new(3.0, 0.0));
        let mut bullet = Projectile::new(5, 1, ProjectileKind::Bullet, motion, 7, 100);
        let events = travel_projectile(&mut bullet, &mut world.board, 10.0);
        assert!(bullet.dead);
        assert!(matches!(events[..], [GameEvent::ProjectileExpired { entity: 5, .. }]));
    }

    proptest! {
        #[test]
        fn prop_substeps_never_exceed_fraction_of_radius(
            speed in 0.001f32..500.0,
            radius in 0.5f32..50.0,
        ) {
            let steps = substep_count(speed, radius);
            prop_assert!(steps >= 1);
            if steps < MAX_SUBSTEPS {
                prop_assert!(speed / steps as f32 <= radius * SUBSTEP_RADIUS_FACTOR * 1.0001);
            }
            if speed > radius * SUBSTEP_RADIUS_FACTOR {
                prop_assert!(steps >= 2);
            }
        }

        #[test]
        fn prop_travel_stays_on_board(
            x in 3.0f32..97.0,
            y in 3.0f32..77.0,
            vx in -40.0f32..40.0,
            vy in -40.0f32..40.0,
        ) {
            let mut world = World::new();
            let mut ball = world.ball(BallKind::Classic, Vec2::new(x, y), Vec2::new(vx, vy));
            for _ in 0..5 {
                world.travel(&mut ball);
                let p = ball.motion.pos;
                prop_assert!(p.x >= 3.0 - 1e-3 && p.x <= 97.0 + 1e-3);
                prop_assert!(p.y >= 3.0 - 1e-3 && p.y <= 77.0 + 1e-3);
            }
        }
    }
}
