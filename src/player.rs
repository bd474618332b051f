use crate::movement::Mover;
use crate::types::{Direction, PlayerView, Point};
use crate::world::MazeWorld;

pub const PLAYER_SPAWNS: [(f32, f32); 4] = [(13.5, 23.0), (13.5, 5.0), (6.0, 14.0), (21.0, 14.0)];

#[derive(Clone, Debug)]
pub struct Player {
    pub index: usize,
    pub enabled: bool,
    pub autopilot: bool,
    pub mover: Mover,
    pub dying: bool,
    pub(crate) think_at_ms: u64,
}

impl Player {
    pub fn new(index: usize) -> Self {
        let (x, y) = PLAYER_SPAWNS[index % PLAYER_SPAWNS.len()];
        Self {
            index,
            enabled: true,
            autopilot: false,
            mover: Mover::new(Point::new(x, y), Direction::Left),
            dying: false,
            think_at_ms: 0,
        }
    }

    pub fn change_direction(&mut self, dir: Direction, start_moving: bool) {
        if !self.enabled || self.dying {
            return;
        }
        self.mover.queued = Some(dir);
        if start_moving {
            self.mover.moving = true;
        }
    }

    pub fn update(&mut self, world: &MazeWorld, speed: f32, dt_ms: u64) {
        if !self.enabled || !self.mover.moving || self.dying {
            return;
        }

        if self.mover.queued == Some(self.mover.direction.opposite()) {
            self.mover.direction = self.mover.direction.opposite();
            self.mover.queued = None;
        }

        if self.mover.at_center() {
            let tile = self.mover.tile(world);
            self.mover.apply_queued_turn(world, tile);
            if !world.can_move(tile, self.mover.direction) {
                return;
            }
        }

        if let Some(tile) = self.mover.advance(world, speed, dt_ms) {
            self.mover.apply_queued_turn(world, tile);
        }
    }

    pub fn grid_position(&self) -> Point {
        self.mover.position
    }

    pub fn is_active(&self) -> bool {
        self.enabled && self.mover.display && !self.dying
    }

    pub fn begin_death_animation(&mut self) {
        self.dying = true;
        self.mover.moving = false;
    }

    pub fn reset(&mut self) {
        self.mover.reset();
        self.mover.display = self.enabled;
        self.dying = false;
    }

    pub fn view(&self, world: &MazeWorld) -> PlayerView {
        let pixel = self.mover.pixel(world);
        PlayerView {
            index: self.index,
            x: pixel.x,
            y: pixel.y,
            dir: self.mover.direction,
            enabled: self.enabled,
            display: self.mover.display,
            moving: self.mover.moving,
            dying: self.dying,
            autopilot: self.autopilot,
        }
    }
}
