//! Brick board: a fixed grid of cells, each owned by at most one brick
//!
//! Multi-cell bricks own every cell of their footprint but are a single entity
//! stored once in an id-ordered map.

use std::collections::BTreeMap;
use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::Aabb;
use super::event::DamageSource;

pub type BrickId = u32;

/// Secondary behaviour attached to a brick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Overlay {
    Spike,
    Mine,
    Sniper,
    Laser,
    Healer,
    Zapper,
    ZapBattery,
}

/// Resources released when a brick is destroyed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Yields {
    pub coins: u32,
    pub food: u32,
    pub wood: u32,
    pub gems: u32,
    pub xp_orbs: u32,
}

/// A destructible grid-aligned obstacle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brick {
    pub id: BrickId,
    /// Top-left cell of the footprint
    pub col: i32,
    pub row: i32,
    /// Footprint in cells
    pub width: i32,
    pub height: i32,
    pub health: i32,
    pub max_health: i32,
    /// Damage-reduction layers; each hit strips one and is halved
    pub armor: u32,
    pub overlay: Option<Overlay>,
    /// Damage dealt back to an entity that touches this brick
    pub retaliation: f32,
    pub yields: Yields,
    /// Goal bricks cannot be executed
    pub goal: bool,
    /// Ticks until the overlay fires again
    #[serde(default)]
    pub overlay_timer: u32,
    /// Most recent damage source, for attribution on destruction
    #[serde(default)]
    pub last_hit: Option<DamageSource>,
}

impl Brick {
    /// A 1x1 brick at the given cell (id is assigned on placement)
    pub fn new(col: i32, row: i32, health: i32) -> Self {
        Self {
            id: 0,
            col,
            row,
            width: 1,
            height: 1,
            health,
            max_health: health,
            armor: 0,
            overlay: None,
            retaliation: 0.0,
            yields: Yields::default(),
            goal: false,
            overlay_timer: 0,
            last_hit: None,
        }
    }

    pub fn with_size(mut self, width: i32, height: i32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self
    }

    pub fn with_armor(mut self, layers: u32) -> Self {
        self.armor = layers;
        self
    }

    pub fn with_overlay(mut self, overlay: Overlay) -> Self {
        self.overlay = Some(overlay);
        self
    }

    pub fn with_retaliation(mut self, damage: f32) -> Self {
        self.retaliation = damage;
        self
    }

    pub fn with_yields(mut self, yields: Yields) -> Self {
        self.yields = yields;
        self
    }

    pub fn as_goal(mut self) -> Self {
        self.goal = true;
        self
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.health <= 0
    }

    /// Apply a hit. Returns the health actually removed.
    pub fn hit(&mut self, amount: u32, source: DamageSource) -> u32 {
        if amount == 0 || self.is_destroyed() {
            return 0;
        }
        let mut amount = amount;
        if self.armor > 0 {
            self.armor -= 1;
            amount = (amount / 2).max(1);
        }
        let dealt = amount.min(self.health as u32);
        self.health -= dealt as i32;
        self.last_hit = Some(source);
        dealt
    }

    /// Lethal hit that ignores armor. Returns the health removed.
    pub fn execute(&mut self, source: DamageSource) -> u32 {
        if self.is_destroyed() {
            return 0;
        }
        let dealt = self.health as u32;
        self.health = 0;
        self.armor = 0;
        self.last_hit = Some(source);
        dealt
    }

    /// Restore health up to max. Returns the amount restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        if self.is_destroyed() || amount <= 0 {
            return 0;
        }
        let before = self.health;
        self.health = (self.health + amount).min(self.max_health);
        self.health - before
    }

    /// Every cell in the footprint
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        (self.row..self.row + self.height)
            .flat_map(move |r| (self.col..self.col + self.width).map(move |c| (c, r)))
    }
}

/// Why a brick could not be placed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementError {
    OutOfBounds { col: i32, row: i32 },
    Occupied { col: i32, row: i32, by: BrickId },
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementError::OutOfBounds { col, row } => {
                write!(f, "cell ({}, {}) is outside the board", col, row)
            }
            PlacementError::Occupied { col, row, by } => {
                write!(f, "cell ({}, {}) is already owned by brick {}", col, row, by)
            }
        }
    }
}

impl std::error::Error for PlacementError {}

/// The brick grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub cols: i32,
    pub rows: i32,
    pub cell_size: f32,
    /// Pixel position of the top-left corner of cell (0, 0)
    pub origin: Vec2,
    cells: Vec<Option<BrickId>>,
    bricks: BTreeMap<BrickId, Brick>,
    next_id: BrickId,
}

impl Board {
    pub fn new(cols: i32, rows: i32, cell_size: f32, origin: Vec2) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        Self {
            cols,
            rows,
            cell_size,
            origin,
            cells: vec![None; (cols * rows) as usize],
            bricks: BTreeMap::new(),
            next_id: 1,
        }
    }

    #[inline]
    pub fn in_bounds(&self, col: i32, row: i32) -> bool {
        col >= 0 && row >= 0 && col < self.cols && row < self.rows
    }

    #[inline]
    fn index(&self, col: i32, row: i32) -> usize {
        (row * self.cols + col) as usize
    }

    /// Place a brick, claiming every cell of its footprint
    pub fn place(&mut self, mut brick: Brick) -> Result<BrickId, PlacementError> {
        for (col, row) in brick.cells() {
            if !self.in_bounds(col, row) {
                return Err(PlacementError::OutOfBounds { col, row });
            }
            if let Some(by) = self.cells[self.index(col, row)] {
                return Err(PlacementError::Occupied { col, row, by });
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        brick.id = id;
        for (col, row) in brick.cells() {
            let idx = self.index(col, row);
            self.cells[idx] = Some(id);
        }
        self.bricks.insert(id, brick);
        Ok(id)
    }

    pub fn brick(&self, id: BrickId) -> Option<&Brick> {
        self.bricks.get(&id)
    }

    pub fn brick_mut(&mut self, id: BrickId) -> Option<&mut Brick> {
        self.bricks.get_mut(&id)
    }

    /// All bricks in id order (including destroyed ones awaiting sweep)
    pub fn bricks(&self) -> impl Iterator<Item = &Brick> {
        self.bricks.values()
    }

    pub fn bricks_mut(&mut self) -> impl Iterator<Item = &mut Brick> {
        self.bricks.values_mut()
    }

    /// Bricks still standing
    pub fn living(&self) -> impl Iterator<Item = &Brick> {
        self.bricks.values().filter(|b| !b.is_destroyed())
    }

    pub fn living_count(&self) -> usize {
        self.living().count()
    }

    /// Any destroyed brick still waiting for a sweep
    pub fn has_destroyed(&self) -> bool {
        self.bricks.values().any(|b| b.is_destroyed())
    }

    /// Brick owning a cell
    pub fn brick_at(&self, col: i32, row: i32) -> Option<BrickId> {
        if !self.in_bounds(col, row) {
            return None;
        }
        self.cells[self.index(col, row)]
    }

    /// Cell containing a pixel position (may be outside the board)
    pub fn cell_of(&self, pos: Vec2) -> (i32, i32) {
        let local = (pos - self.origin) / self.cell_size;
        (local.x.floor() as i32, local.y.floor() as i32)
    }

    pub fn cell_rect(&self, col: i32, row: i32) -> Aabb {
        let min = self.origin + Vec2::new(col as f32, row as f32) * self.cell_size;
        Aabb::new(min, min + Vec2::splat(self.cell_size))
    }

    /// Pixel rectangle covered by a brick's footprint
    pub fn brick_rect(&self, brick: &Brick) -> Aabb {
        let min = self.origin + Vec2::new(brick.col as f32, brick.row as f32) * self.cell_size;
        let size = Vec2::new(brick.width as f32, brick.height as f32) * self.cell_size;
        Aabb::new(min, min + size)
    }

    pub fn brick_center(&self, brick: &Brick) -> Vec2 {
        self.brick_rect(brick).center()
    }

    /// The wall rectangle
    pub fn bounds(&self) -> Aabb {
        let size = Vec2::new(self.cols as f32, self.rows as f32) * self.cell_size;
        Aabb::new(self.origin, self.origin + size)
    }

    /// Living bricks owning any cell in the inclusive cell box, ascending id
    pub fn bricks_in_cells(&self, min: (i32, i32), max: (i32, i32)) -> Vec<BrickId> {
        let col_lo = min.0.max(0);
        let row_lo = min.1.max(0);
        let col_hi = max.0.min(self.cols - 1);
        let row_hi = max.1.min(self.rows - 1);

        let mut found = Vec::new();
        for row in row_lo..=row_hi {
            for col in col_lo..=col_hi {
                if let Some(id) = self.cells[self.index(col, row)] {
                    found.push(id);
                }
            }
        }
        found.sort_unstable();
        found.dedup();
        found.retain(|id| self.bricks.get(id).is_some_and(|b| !b.is_destroyed()));
        found
    }

    /// Living bricks whose footprint lies within `radius` of `pos`
    pub fn bricks_within(&self, pos: Vec2, radius: f32) -> Vec<BrickId> {
        self.living()
            .filter(|b| self.brick_rect(b).distance_to(pos) <= radius)
            .map(|b| b.id)
            .collect()
    }

    /// Nearest living brick to `pos` (by footprint distance), ties broken by id
    pub fn nearest_brick(&self, pos: Vec2, max_dist: f32, exclude: &[BrickId]) -> Option<BrickId> {
        let mut best: Option<(f32, BrickId)> = None;
        for brick in self.living() {
            if exclude.contains(&brick.id) {
                continue;
            }
            let dist = self.brick_rect(brick).distance_to(pos);
            if dist > max_dist {
                continue;
            }
            if best.is_none_or(|(d, _)| dist < d) {
                best = Some((dist, brick.id));
            }
        }
        best.map(|(_, id)| id)
    }

    /// Living bricks touching a brick's footprint (8-neighbourhood)
    pub fn neighbours(&self, id: BrickId) -> Vec<BrickId> {
        let Some(brick) = self.bricks.get(&id) else {
            return Vec::new();
        };
        let mut found = self.bricks_in_cells(
            (brick.col - 1, brick.row - 1),
            (brick.col + brick.width, brick.row + brick.height),
        );
        found.retain(|&other| other != id);
        found
    }

    /// Up to `count` empty cells around `center`, nearest ring first, skipping
    /// cells that would overlap the keep-clear circle
    pub fn free_cells_near(
        &self,
        center: (i32, i32),
        count: usize,
        keep_clear: (Vec2, f32),
    ) -> Vec<(i32, i32)> {
        let mut found = Vec::new();
        let max_ring = self.cols.max(self.rows);
        for ring in 1..=max_ring {
            for row in center.1 - ring..=center.1 + ring {
                for col in center.0 - ring..=center.0 + ring {
                    if (col - center.0).abs() != ring && (row - center.1).abs() != ring {
                        continue;
                    }
                    if !self.in_bounds(col, row) || self.brick_at(col, row).is_some() {
                        continue;
                    }
                    if self.cell_rect(col, row).distance_to(keep_clear.0) <= keep_clear.1 {
                        continue;
                    }
                    found.push((col, row));
                    if found.len() == count {
                        return found;
                    }
                }
            }
        }
        found
    }

    /// Remove every destroyed brick, freeing its cells
    pub fn sweep_destroyed(&mut self) -> Vec<Brick> {
        let dead: Vec<BrickId> = self
            .bricks
            .values()
            .filter(|b| b.is_destroyed())
            .map(|b| b.id)
            .collect();

        let mut removed = Vec::with_capacity(dead.len());
        for id in dead {
            if let Some(brick) = self.bricks.remove(&id) {
                for (col, row) in brick.cells() {
                    let idx = self.index(col, row);
                    if self.cells[idx] == Some(id) {
                        self.cells[idx] = None;
                    }
                }
                removed.push(brick);
            }
        }
        removed
    }
}
