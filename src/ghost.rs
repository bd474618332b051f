use crate::constants::{
    pursuer_speed_factors, CLYDE_RETREAT_DISTANCE, INKY_PIVOT_TILES, PINKY_LOOKAHEAD_TILES,
    PLAYER_SPEED, PURSUER_EYES_FACTOR, PURSUER_SCARED_FACTOR, PURSUER_TRANSITION_FACTOR,
};
use crate::movement::Mover;
use crate::rng::Rng;
use crate::types::{
    Direction, Point, PursuerKind, PursuerMode, PursuerView, ScaredPalette, Vec2,
};
use crate::world::MazeWorld;

pub const HOUSE_DOOR: Point = Point { x: 13.5, y: 11.0 };
pub const HOUSE_CENTER: Point = Point { x: 13.5, y: 14.0 };
const BOUNCE_TOP: f32 = 13.5;
const BOUNCE_BOTTOM: f32 = 14.5;
const EYES_TARGET: Vec2 = Vec2 { x: 13, y: 11 };

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HousePhase {
    Outside,
    Waiting,
    Leaving,
    Entering,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PursuerIntent {
    LeftHouse,
    Restored,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerTarget {
    pub tile: Vec2,
    pub direction: Direction,
}

pub struct PursuerContext<'a> {
    pub world: &'a MazeWorld,
    pub players: &'a [PlayerTarget],
    pub leader_tile: Vec2,
}

#[derive(Clone, Debug)]
pub struct Pursuer {
    pub kind: PursuerKind,
    pub mover: Mover,
    pub mode: PursuerMode,
    pub default_mode: PursuerMode,
    pub house: HousePhase,
    pub palette: ScaredPalette,
    pub allow_collision: bool,
    pub paused: bool,
    pub cruise: bool,
    speed_level: u32,
    speed_tier: usize,
    pending_reversal: bool,
    decided_at: Option<Vec2>,
    spawn_mode: PursuerMode,
    spawn_house: HousePhase,
}

impl Pursuer {
    pub fn new(kind: PursuerKind) -> Self {
        let (position, direction, mode, house) = match kind {
            PursuerKind::Blinky => (
                HOUSE_DOOR,
                Direction::Left,
                PursuerMode::Scatter,
                HousePhase::Outside,
            ),
            PursuerKind::Pinky => (
                HOUSE_CENTER,
                Direction::Down,
                PursuerMode::Idle,
                HousePhase::Waiting,
            ),
            PursuerKind::Inky => (
                Point::new(11.5, 14.0),
                Direction::Up,
                PursuerMode::Idle,
                HousePhase::Waiting,
            ),
            PursuerKind::Clyde => (
                Point::new(15.5, 14.0),
                Direction::Up,
                PursuerMode::Idle,
                HousePhase::Waiting,
            ),
        };
        Self {
            kind,
            mover: Mover::new(position, direction),
            mode,
            default_mode: PursuerMode::Scatter,
            house,
            palette: ScaredPalette::Blue,
            allow_collision: true,
            paused: false,
            cruise: false,
            speed_level: 1,
            speed_tier: 0,
            pending_reversal: false,
            decided_at: None,
            spawn_mode: mode,
            spawn_house: house,
        }
    }

    pub fn home_corner(&self, world: &MazeWorld) -> Vec2 {
        let right = world.width - 1;
        let bottom = world.height - 1;
        match self.kind {
            PursuerKind::Blinky => Vec2::new(right, 0),
            PursuerKind::Pinky => Vec2::new(0, 0),
            PursuerKind::Inky => Vec2::new(right, bottom),
            PursuerKind::Clyde => Vec2::new(0, bottom),
        }
    }

    pub fn set_speed_level(&mut self, speed_level: u32) {
        self.speed_level = speed_level;
        self.reset_default_speed();
    }

    pub fn reset_default_speed(&mut self) {
        self.speed_tier = 0;
        self.cruise = false;
    }

    pub fn speed_up(&mut self) {
        self.cruise = true;
        self.speed_tier = (self.speed_tier + 1).min(2);
    }

    pub fn default_speed(&self) -> f32 {
        PLAYER_SPEED * pursuer_speed_factors(self.speed_level)[self.speed_tier]
    }

    pub fn current_speed(&self, world: &MazeWorld) -> f32 {
        if self.mode == PursuerMode::Eaten {
            return PLAYER_SPEED * PURSUER_EYES_FACTOR;
        }
        match self.house {
            HousePhase::Waiting | HousePhase::Leaving => {
                return PLAYER_SPEED * PURSUER_TRANSITION_FACTOR;
            }
            HousePhase::Entering => return PLAYER_SPEED * PURSUER_EYES_FACTOR,
            HousePhase::Outside => {}
        }
        if self.mode == PursuerMode::Frightened {
            return PLAYER_SPEED * PURSUER_SCARED_FACTOR;
        }
        if world.in_tunnel_zone(self.mover.position) {
            return PLAYER_SPEED * PURSUER_TRANSITION_FACTOR;
        }
        self.default_speed()
    }

    pub fn update(
        &mut self,
        ctx: &PursuerContext,
        rng: &mut Rng,
        dt_ms: u64,
    ) -> Option<PursuerIntent> {
        if !self.mover.moving || self.paused {
            return None;
        }
        let speed = self.current_speed(ctx.world);
        let distance = speed * dt_ms as f32 / 1000.0;

        match self.house {
            HousePhase::Waiting => {
                self.bounce(distance);
                None
            }
            HousePhase::Leaving => {
                if !self.mover.move_toward(HOUSE_DOOR, distance) {
                    return None;
                }
                self.house = HousePhase::Outside;
                self.mover.direction = Direction::Left;
                self.decided_at = None;
                if self.mode == PursuerMode::Idle {
                    self.mode = self.default_mode;
                }
                Some(PursuerIntent::LeftHouse)
            }
            HousePhase::Entering => {
                if !self.mover.move_toward(HOUSE_CENTER, distance) {
                    return None;
                }
                self.house = HousePhase::Leaving;
                self.mode = self.default_mode;
                self.palette = ScaredPalette::Blue;
                Some(PursuerIntent::Restored)
            }
            HousePhase::Outside => {
                self.step_outside(ctx, rng, speed, dt_ms);
                None
            }
        }
    }

    fn bounce(&mut self, distance: f32) {
        let target_y = if self.mover.direction == Direction::Up {
            BOUNCE_TOP
        } else {
            BOUNCE_BOTTOM
        };
        let target = Point::new(self.mover.position.x, target_y);
        let going = self.mover.direction;
        if self.mover.move_toward(target, distance) {
            self.mover.direction = going.opposite();
        } else {
            self.mover.direction = going;
        }
    }

    fn step_outside(&mut self, ctx: &PursuerContext, rng: &mut Rng, speed: f32, dt_ms: u64) {
        if self.pending_reversal {
            self.pending_reversal = false;
            self.reverse(ctx, rng);
        }

        if self.mover.at_center() {
            let tile = self.mover.tile(ctx.world);
            if self.decided_at != Some(tile) {
                self.mover.direction = self.choose_direction(tile, ctx, rng);
                self.decided_at = Some(tile);
            }
        }

        let Some(tile) = self.mover.advance(ctx.world, speed, dt_ms) else {
            return;
        };

        if self.mode == PursuerMode::Eaten
            && tile.y == EYES_TARGET.y
            && (tile.x == EYES_TARGET.x || tile.x == EYES_TARGET.x + 1)
        {
            self.house = HousePhase::Entering;
            self.mover.direction = Direction::Down;
            self.decided_at = None;
            return;
        }

        self.mover.direction = self.choose_direction(tile, ctx, rng);
        self.decided_at = Some(tile);
    }

    fn reverse(&mut self, ctx: &PursuerContext, rng: &mut Rng) {
        let reversed = self.mover.direction.opposite();
        self.mover.direction = reversed;
        if !self.mover.at_center() {
            return;
        }
        let tile = self.mover.tile(ctx.world);
        if !ctx.world.can_move(tile, reversed) {
            self.mover.direction = self.choose_direction(tile, ctx, rng);
        }
        self.decided_at = Some(tile);
    }

    fn choose_direction(&self, tile: Vec2, ctx: &PursuerContext, rng: &mut Rng) -> Direction {
        let current = self.mover.direction;
        if self.mode == PursuerMode::Frightened {
            let options = legal_options(ctx.world, tile, current);
            if options.is_empty() {
                return dead_end_fallback(ctx.world, tile, current);
            }
            return options[rng.pick_index(options.len())];
        }
        choose_toward(ctx.world, tile, current, self.target_tile(tile, ctx))
    }

    pub fn target_tile(&self, own_tile: Vec2, ctx: &PursuerContext) -> Vec2 {
        match self.mode {
            PursuerMode::Eaten => EYES_TARGET,
            PursuerMode::Chase => self.chase_target(own_tile, ctx),
            PursuerMode::Scatter if self.cruise && self.kind == PursuerKind::Blinky => {
                self.chase_target(own_tile, ctx)
            }
            _ => self.home_corner(ctx.world),
        }
    }

    fn chase_target(&self, own_tile: Vec2, ctx: &PursuerContext) -> Vec2 {
        let nearest = ctx.players.iter().min_by(|a, b| {
            own_tile
                .distance(a.tile)
                .total_cmp(&own_tile.distance(b.tile))
        });
        let Some(player) = nearest else {
            return self.home_corner(ctx.world);
        };

        match self.kind {
            PursuerKind::Blinky => player.tile,
            PursuerKind::Pinky => player.tile.step(player.direction, PINKY_LOOKAHEAD_TILES),
            PursuerKind::Inky => {
                let pivot = player.tile.step(player.direction, INKY_PIVOT_TILES);
                let leader = ctx.leader_tile;
                Vec2::new(
                    leader.x + 2 * (pivot.x - leader.x),
                    leader.y + 2 * (pivot.y - leader.y),
                )
            }
            PursuerKind::Clyde => {
                if own_tile.distance(player.tile) > CLYDE_RETREAT_DISTANCE {
                    player.tile
                } else {
                    self.home_corner(ctx.world)
                }
            }
        }
    }

    pub fn change_mode(&mut self, next: PursuerMode) {
        self.default_mode = next;
        if matches!(self.mode, PursuerMode::Scatter | PursuerMode::Chase) && self.mode != next {
            self.mode = next;
            if self.house == HousePhase::Outside {
                self.pending_reversal = true;
            }
        }
    }

    pub fn become_scared(&mut self) -> bool {
        if self.mode == PursuerMode::Eaten {
            return false;
        }
        if self.mode != PursuerMode::Frightened && self.house == HousePhase::Outside {
            self.pending_reversal = true;
        }
        self.mode = PursuerMode::Frightened;
        self.palette = ScaredPalette::Blue;
        true
    }

    pub fn end_scared(&mut self) {
        if self.mode != PursuerMode::Frightened {
            return;
        }
        self.mode = if self.house == HousePhase::Waiting {
            PursuerMode::Idle
        } else {
            self.default_mode
        };
        self.palette = ScaredPalette::Blue;
    }

    pub fn toggle_palette(&mut self) {
        self.palette = match self.palette {
            ScaredPalette::Blue => ScaredPalette::White,
            ScaredPalette::White => ScaredPalette::Blue,
        };
    }

    pub fn become_eaten(&mut self) {
        self.mode = PursuerMode::Eaten;
        self.palette = ScaredPalette::Blue;
        self.pending_reversal = false;
    }

    pub fn end_idle(&mut self) -> bool {
        if self.house != HousePhase::Waiting {
            return false;
        }
        self.house = HousePhase::Leaving;
        true
    }

    pub fn is_waiting(&self) -> bool {
        self.house == HousePhase::Waiting
    }

    pub fn collides_with(&self, player: Point) -> bool {
        self.allow_collision
            && self.mover.display
            && self.mode != PursuerMode::Eaten
            && self.house != HousePhase::Entering
            && self.mover.position.distance(player) < 1.0
    }

    pub fn reset(&mut self) {
        self.mover.reset();
        self.mode = self.spawn_mode;
        self.default_mode = PursuerMode::Scatter;
        self.house = self.spawn_house;
        self.palette = ScaredPalette::Blue;
        self.allow_collision = true;
        self.paused = false;
        self.pending_reversal = false;
        self.decided_at = None;
    }

    pub fn view(&self, world: &MazeWorld) -> PursuerView {
        let pixel = self.mover.pixel(world);
        PursuerView {
            kind: self.kind,
            x: pixel.x,
            y: pixel.y,
            dir: self.mover.direction,
            mode: self.mode,
            palette: self.palette,
            display: self.mover.display,
        }
    }
}

fn legal_options(world: &MazeWorld, tile: Vec2, current: Direction) -> Vec<Direction> {
    Direction::PRIORITY
        .into_iter()
        .filter(|dir| *dir != current.opposite() && world.can_move(tile, *dir))
        .collect()
}

fn dead_end_fallback(world: &MazeWorld, tile: Vec2, current: Direction) -> Direction {
    if world.can_move(tile, current.opposite()) {
        current.opposite()
    } else {
        current
    }
}

pub fn choose_toward(world: &MazeWorld, tile: Vec2, current: Direction, target: Vec2) -> Direction {
    let options = legal_options(world, tile, current);
    let mut best: Option<(Direction, f32)> = None;
    for dir in options {
        let distance = tile.step(dir, 1).distance(target);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((dir, distance)),
        }
    }
    match best {
        Some((dir, _)) => dir,
        None => dead_end_fallback(world, tile, current),
    }
}
