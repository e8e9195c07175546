//! Brickfall headless demo
//!
//! Builds a small board, launches a mixed volley and runs the turn to
//! completion, tallying the event traffic. Pass a settings JSON path as the
//! first argument to override the defaults.

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    use glam::Vec2;

    use brickfall::consts::SIM_HZ;
    use brickfall::sim::{
        Board, Brick, EntityId, Equipment, EquipmentItem, EventBus, GameEvent, GameState,
        Overlay, TickInput, Yields, advance_frame,
    };
    use brickfall::{BallKind, Settings};

    /// Give up on the turn after two minutes of frames
    const MAX_FRAMES: u32 = SIM_HZ * 120;
    /// Frame on which the first ball casts its power-up
    const FIRST_CAST_FRAME: u32 = 20;

    fn load_settings() -> Settings {
        match std::env::args().nth(1) {
            Some(path) => Settings::load(&path).unwrap_or_else(|e| {
                log::error!("Failed to load settings from {}: {}", path, e);
                Settings::default()
            }),
            None => Settings::default(),
        }
    }

    fn build_board() -> Board {
        let mut board = Board::new(12, 16, 32.0, Vec2::ZERO);
        let yields = Yields {
            coins: 1,
            xp_orbs: 2,
            ..Default::default()
        };

        for row in 1..6 {
            for col in 0..12 {
                let mut brick = Brick::new(col, row, 10 + row * 5).with_yields(yields);
                match (col + row) % 7 {
                    0 => brick = brick.with_overlay(Overlay::Mine),
                    3 => brick = brick.with_armor(2),
                    5 => brick = brick.with_retaliation(2.0),
                    _ => {}
                }
                if let Err(e) = board.place(brick) {
                    log::warn!("Skipped brick: {}", e);
                }
            }
        }

        let goal = Brick::new(5, 8, 200).with_size(2, 2).as_goal();
        if let Err(e) = board.place(goal) {
            log::warn!("Skipped goal brick: {}", e);
        }
        board
    }

    fn equip(state: &mut GameState) {
        let loadouts = &mut state.loadouts;
        loadouts.equip_kind(
            BallKind::Classic,
            0,
            EquipmentItem::new(Equipment::Sharpened { bonus: 2.0 }),
        );
        loadouts.equip_kind(
            BallKind::Classic,
            1,
            EquipmentItem::new(Equipment::Ramp {
                per_hit: 1.0,
                max_bonus: 6.0,
            }),
        );
        loadouts.equip_kind(
            BallKind::Explosive,
            0,
            EquipmentItem::new(Equipment::ChainLightning {
                damage: 8,
                range: 2.0,
                max_jumps: 3,
            }),
        );
        loadouts.equip_kind(
            BallKind::Split,
            0,
            EquipmentItem::new(Equipment::WallExplosion {
                damage: 6,
                radius: 1.0,
                mini_explodes: true,
            })
            .for_minis(),
        );
        loadouts.equip_kind(
            BallKind::Giant,
            0,
            EquipmentItem::new(Equipment::Executioner { threshold: 5 }),
        );
    }

    pub fn run() {
        let settings = load_settings();
        let mut state = GameState::new(build_board(), settings);
        equip(&mut state);

        let bounds = state.board.bounds();
        let start = Vec2::new(bounds.center().x, bounds.max.y - state.board.cell_size * 2.0);
        let kinds = [
            BallKind::Classic,
            BallKind::Explosive,
            BallKind::Split,
            BallKind::Giant,
            BallKind::Piercing,
            BallKind::Homing,
        ];
        let balls: Vec<EntityId> = kinds
            .iter()
            .map(|&kind| state.spawn_ball(kind, None, start))
            .collect();

        let tally: Rc<RefCell<BTreeMap<&'static str, usize>>> = Rc::default();
        let mut bus = EventBus::new();
        {
            let tally = tally.clone();
            bus.subscribe_all(move |event| {
                *tally.borrow_mut().entry(event.kind().as_str()).or_default() += 1;
            });
        }

        let theta = -1.2;
        let aim = TickInput {
            aim: Some(theta),
            ..Default::default()
        };
        advance_frame(&mut state, &aim, &mut bus);

        let mut input = TickInput {
            launch: Some(theta),
            ..Default::default()
        };
        let mut ended = false;
        for frame in 0..MAX_FRAMES {
            if let Some(&id) = frame
                .checked_sub(FIRST_CAST_FRAME)
                .and_then(|i| balls.get(i as usize))
            {
                input.power_up = Some(id);
            }

            let events = advance_frame(&mut state, &input, &mut bus);
            input = TickInput::default();
            if events
                .iter()
                .any(|e| matches!(e, GameEvent::TurnEnded { .. }))
            {
                log::info!("Turn finished after {} frames", frame + 1);
                ended = true;
                break;
            }
        }

        if !ended {
            log::warn!("Turn still running after {} frames, ending it", MAX_FRAMES);
            let stop = TickInput {
                end_turn: true,
                ..Default::default()
            };
            advance_frame(&mut state, &stop, &mut bus);
        }

        println!("Events after {} ticks:", state.time_ticks);
        for (kind, count) in tally.borrow().iter() {
            println!("  {:<20} {}", kind, count);
        }
        println!("Bricks left: {}", state.board.living_count());
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Brickfall demo starting...");
    demo::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Library-only on the web; the host drives `advance_frame` itself
}
