use crate::types::{PickupKind, PickupView, Point};
use crate::world::MazeWorld;

pub const FRUIT_POSITION: Point = Point { x: 13.5, y: 17.0 };

const CONSUME_DISTANCE: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PickupConsumed {
    pub kind: PickupKind,
    pub points: u32,
}

#[derive(Clone, Debug)]
pub struct Pickup {
    pub kind: PickupKind,
    pub position: Point,
    pub points: u32,
    pub consumed: bool,
    pub visible: bool,
    nearby: bool,
}

impl Pickup {
    pub fn new(kind: PickupKind, position: Point, points: u32) -> Self {
        let visible = kind != PickupKind::Fruit;
        Self {
            kind,
            position,
            points,
            consumed: !visible,
            visible,
            nearby: true,
        }
    }

    pub fn fruit() -> Self {
        Self::new(PickupKind::Fruit, FRUIT_POSITION, 0)
    }

    pub fn is_available(&self) -> bool {
        self.visible && !self.consumed
    }

    pub fn refresh_proximity(&mut self, players: &[Point], radius: Option<f32>) {
        self.nearby = match radius {
            None => true,
            Some(radius) => players
                .iter()
                .any(|player| self.position.distance(*player) <= radius),
        };
    }

    pub fn is_nearby(&self) -> bool {
        self.nearby
    }

    pub fn check_consumption(&mut self, players: &[Point]) -> Option<PickupConsumed> {
        if !self.nearby || !self.is_available() {
            return None;
        }
        let touched = players
            .iter()
            .any(|player| self.position.distance(*player) < CONSUME_DISTANCE);
        if !touched {
            return None;
        }
        self.consumed = true;
        self.visible = false;
        Some(PickupConsumed {
            kind: self.kind,
            points: self.points,
        })
    }

    pub fn show_fruit(&mut self, points: u32) {
        self.points = points;
        self.consumed = false;
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn view(&self, world: &MazeWorld) -> PickupView {
        let pixel = world.to_pixel(self.position);
        PickupView {
            kind: self.kind,
            x: pixel.x,
            y: pixel.y,
            points: self.points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_is_consumed_once_within_half_a_tile() {
        let mut dot = Pickup::new(PickupKind::Dot, Point::new(3.0, 5.0), 10);
        assert!(dot.check_consumption(&[Point::new(3.6, 5.0)]).is_none());

        let consumed = dot.check_consumption(&[Point::new(9.0, 9.0), Point::new(3.4, 5.0)]);
        assert_eq!(
            consumed,
            Some(PickupConsumed {
                kind: PickupKind::Dot,
                points: 10,
            })
        );
        assert!(!dot.visible);
        assert!(dot.check_consumption(&[Point::new(3.0, 5.0)]).is_none());
    }

    #[test]
    fn far_pickups_are_skipped_when_sweep_has_a_radius() {
        let mut pellet = Pickup::new(PickupKind::PowerPellet, Point::new(1.0, 3.0), 50);
        pellet.refresh_proximity(&[Point::new(20.0, 20.0)], Some(4.0));
        assert!(!pellet.is_nearby());
        pellet.refresh_proximity(&[Point::new(20.0, 20.0)], None);
        assert!(pellet.is_nearby());
    }

    #[test]
    fn fruit_is_only_consumable_while_shown() {
        let mut fruit = Pickup::fruit();
        assert!(fruit.check_consumption(&[FRUIT_POSITION]).is_none());
        fruit.show_fruit(300);
        let consumed = fruit.check_consumption(&[FRUIT_POSITION]).expect("fruit is shown");
        assert_eq!(consumed.points, 300);

        fruit.show_fruit(300);
        fruit.hide();
        assert!(fruit.check_consumption(&[FRUIT_POSITION]).is_none());
    }
}
