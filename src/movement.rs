use crate::types::{Direction, PixelPos, Point, Vec2};
use crate::world::{is_at_center, MazeWorld};

const AXIS_EPSILON: f32 = 1e-4;

#[derive(Clone, Debug)]
pub struct Mover {
    pub position: Point,
    pub direction: Direction,
    pub queued: Option<Direction>,
    pub moving: bool,
    pub display: bool,
    spawn_position: Point,
    spawn_direction: Direction,
}

impl Mover {
    pub fn new(position: Point, direction: Direction) -> Self {
        Self {
            position,
            direction,
            queued: None,
            moving: false,
            display: true,
            spawn_position: position,
            spawn_direction: direction,
        }
    }

    pub fn reset(&mut self) {
        self.position = self.spawn_position;
        self.direction = self.spawn_direction;
        self.queued = None;
        self.moving = false;
        self.display = true;
    }

    pub fn spawn_position(&self) -> Point {
        self.spawn_position
    }

    pub fn pixel(&self, world: &MazeWorld) -> PixelPos {
        world.to_pixel(self.position)
    }

    pub fn tile(&self, world: &MazeWorld) -> Vec2 {
        world.nearest_tile(self.position)
    }

    pub fn at_center(&self) -> bool {
        is_at_center(self.position)
    }

    pub fn next_center(&self, world: &MazeWorld) -> Vec2 {
        if self.at_center() {
            return self.tile(world);
        }
        let (dx, dy) = self.direction.offset();
        let x = step_to_center(self.position.x, dx);
        let y = step_to_center(self.position.y, dy);
        Vec2::new(x as i32, y as i32)
    }

    pub fn advance(&mut self, world: &MazeWorld, speed: f32, dt_ms: u64) -> Option<Vec2> {
        let distance = speed * dt_ms as f32 / 1000.0;
        if distance <= 0.0 {
            return None;
        }

        let (dx, dy) = self.direction.offset();
        let horizontal = dx != 0;
        let sign = if horizontal { dx as f32 } else { dy as f32 };
        let value = if horizontal {
            self.position.x
        } else {
            self.position.y
        };

        let rounded = value.round();
        let next_center = if (value - rounded).abs() < AXIS_EPSILON {
            rounded + sign
        } else {
            step_to_center(value, sign as i32)
        };

        let mut moved = value + sign * distance;
        let reached = if sign > 0.0 {
            moved >= next_center - AXIS_EPSILON
        } else {
            moved <= next_center + AXIS_EPSILON
        };
        if reached {
            moved = next_center;
        }

        if horizontal {
            self.position.x = moved;
        } else {
            self.position.y = moved;
        }

        if let Some(wrapped) = world.wrap(self.position) {
            self.position = wrapped;
            return None;
        }

        if reached {
            Some(world.nearest_tile(self.position))
        } else {
            None
        }
    }

    pub fn apply_queued_turn(&mut self, world: &MazeWorld, tile: Vec2) -> bool {
        let Some(queued) = self.queued else {
            return false;
        };
        if !world.can_move(tile, queued) {
            return false;
        }
        self.direction = queued;
        self.queued = None;
        true
    }

    pub fn move_toward(&mut self, target: Point, distance: f32) -> bool {
        let mut budget = distance;
        let dx = target.x - self.position.x;
        if dx.abs() <= budget {
            self.position.x = target.x;
            budget -= dx.abs();
        } else {
            self.position.x += budget * dx.signum();
            budget = 0.0;
        }
        if dx.abs() > AXIS_EPSILON {
            self.direction = if dx > 0.0 {
                Direction::Right
            } else {
                Direction::Left
            };
        }

        let dy = target.y - self.position.y;
        if budget > 0.0 || dy.abs() <= AXIS_EPSILON {
            if dy.abs() <= budget {
                self.position.y = target.y;
            } else {
                self.position.y += budget * dy.signum();
            }
            if dy.abs() > AXIS_EPSILON {
                self.direction = if dy > 0.0 {
                    Direction::Down
                } else {
                    Direction::Up
                };
            }
        }

        self.position == target
    }
}

fn step_to_center(value: f32, sign: i32) -> f32 {
    match sign.signum() {
        1 => value.ceil(),
        -1 => value.floor(),
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TICK_MS;

    fn world() -> MazeWorld {
        MazeWorld::classic(8.0)
    }

    #[test]
    fn advance_snaps_onto_crossed_center() {
        let world = world();
        let mut mover = Mover::new(Point::new(1.9, 5.0), Direction::Right);
        let reached = mover.advance(&world, 11.0, TICK_MS);
        assert_eq!(reached, Some(Vec2::new(2, 5)));
        assert_eq!(mover.position, Point::new(2.0, 5.0));

        let reached = mover.advance(&world, 11.0, TICK_MS);
        assert_eq!(reached, None);
        assert!((mover.position.x - 2.22).abs() < 1e-4);
    }

    #[test]
    fn next_center_looks_ahead_along_heading() {
        let world = world();
        let mover = Mover::new(Point::new(13.5, 23.0), Direction::Left);
        assert_eq!(mover.next_center(&world), Vec2::new(13, 23));
        let mover = Mover::new(Point::new(13.5, 23.0), Direction::Right);
        assert_eq!(mover.next_center(&world), Vec2::new(14, 23));
    }

    #[test]
    fn leaving_the_tunnel_wraps_without_a_decision() {
        let world = world();
        let mut mover = Mover::new(Point::new(-0.7, 14.0), Direction::Left);
        let reached = mover.advance(&world, 11.0, TICK_MS);
        assert_eq!(reached, None);
        assert_eq!(mover.position, Point::new(27.75, 14.0));
    }

    #[test]
    fn queued_turn_waits_for_an_open_tile() {
        let world = world();
        let mut mover = Mover::new(Point::new(1.0, 1.0), Direction::Right);
        mover.queued = Some(Direction::Up);
        assert!(!mover.apply_queued_turn(&world, Vec2::new(1, 1)));
        assert_eq!(mover.queued, Some(Direction::Up));

        mover.queued = Some(Direction::Down);
        assert!(mover.apply_queued_turn(&world, Vec2::new(1, 1)));
        assert_eq!(mover.direction, Direction::Down);
        assert_eq!(mover.queued, None);
    }

    #[test]
    fn scripted_move_goes_horizontal_then_vertical() {
        let mut mover = Mover::new(Point::new(11.5, 14.0), Direction::Up);
        assert!(!mover.move_toward(Point::new(13.5, 11.0), 1.5));
        assert_eq!(mover.position, Point::new(13.0, 14.0));
        assert_eq!(mover.direction, Direction::Right);

        assert!(!mover.move_toward(Point::new(13.5, 11.0), 1.0));
        assert_eq!(mover.position, Point::new(13.5, 13.5));
        assert_eq!(mover.direction, Direction::Up);

        assert!(mover.move_toward(Point::new(13.5, 11.0), 5.0));
        assert_eq!(mover.position, Point::new(13.5, 11.0));
    }

    #[test]
    fn reset_restores_spawn_state() {
        let world = world();
        let mut mover = Mover::new(Point::new(13.5, 23.0), Direction::Left);
        mover.moving = true;
        mover.display = false;
        mover.queued = Some(Direction::Up);
        let _ = mover.advance(&world, 11.0, TICK_MS);
        mover.reset();
        assert_eq!(mover.position, Point::new(13.5, 23.0));
        assert_eq!(mover.direction, Direction::Left);
        assert_eq!(mover.queued, None);
        assert!(!mover.moving);
        assert!(mover.display);
    }
}
