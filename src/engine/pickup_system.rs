use super::*;
use crate::constants::{
    fruit_points, DOT_POINTS, EXTRA_LIFE_SCORE, FRUIT_THRESHOLDS, FRUIT_VISIBLE_MS,
    PICKUP_SWEEP_MS, PICKUP_SWEEP_RADIUS, POWER_PELLET_POINTS, SPEED_UP_THRESHOLDS,
};
use crate::pickup::FRUIT_POSITION;

impl GameEngine {
    pub(super) fn rebuild_pickups(&mut self) {
        self.pickups = self
            .world
            .pickup_tiles()
            .into_iter()
            .filter_map(|(tile, kind)| {
                let kind = MazeWorld::pickup_kind(kind)?;
                let points = match kind {
                    PickupKind::Dot => DOT_POINTS,
                    PickupKind::PowerPellet => POWER_PELLET_POINTS,
                    PickupKind::Fruit => return None,
                };
                Some(Pickup::new(kind, tile.as_point(), points))
            })
            .collect();
        self.remaining_dots = self.pickups.len() as u32;
        self.sweep_elapsed_ms = PICKUP_SWEEP_MS;
    }

    pub(super) fn update_pickups(&mut self, dt_ms: u64) {
        let positions = self.active_player_positions();

        self.sweep_elapsed_ms += dt_ms;
        if self.sweep_elapsed_ms >= PICKUP_SWEEP_MS {
            self.sweep_elapsed_ms = 0;
            for pickup in &mut self.pickups {
                pickup.refresh_proximity(&positions, Some(PICKUP_SWEEP_RADIUS));
            }
        }
        if positions.is_empty() {
            return;
        }

        for (idx, pickup) in self.pickups.iter_mut().enumerate() {
            if let Some(consumed) = pickup.check_consumption(&positions) {
                self.intents.push_back(Intent::PickupConsumed {
                    slot: PickupSlot::Maze(idx),
                    kind: consumed.kind,
                    points: consumed.points,
                });
            }
        }
        if let Some(consumed) = self.fruit.check_consumption(&positions) {
            self.intents.push_back(Intent::PickupConsumed {
                slot: PickupSlot::Fruit,
                kind: consumed.kind,
                points: consumed.points,
            });
        }
    }

    pub(super) fn handle_pickup_consumed(&mut self, slot: PickupSlot, kind: PickupKind, points: u32) {
        self.intents.push_back(Intent::AwardPoints {
            points,
            kind: kind.into(),
        });
        if kind == PickupKind::Fruit {
            let expiry = self.fruit_timer.take();
            self.cancel_timer(expiry);
            self.events.push(RuntimeEvent::FruitHidden);
            self.push_timeline(format!("fruit eaten for {points}"));
            return;
        }

        let position = match slot {
            PickupSlot::Maze(idx) => self
                .pickups
                .get(idx)
                .map(|pickup| pickup.position)
                .unwrap_or(FRUIT_POSITION),
            PickupSlot::Fruit => FRUIT_POSITION,
        };
        self.dot_consumed(position);
        if kind == PickupKind::PowerPellet && !self.level_clearing {
            self.power_up();
        }
    }

    pub(super) fn dot_consumed(&mut self, position: Point) {
        self.remaining_dots = self.remaining_dots.saturating_sub(1);
        let pixel = self.world.to_pixel(position);
        self.events.push(RuntimeEvent::DotConsumed {
            x: pixel.x,
            y: pixel.y,
            remaining: self.remaining_dots,
        });

        let remaining = self.remaining_dots;
        if FRUIT_THRESHOLDS.contains(&remaining) && self.fruit_thresholds_fired.insert(remaining) {
            self.show_fruit();
        }
        if SPEED_UP_THRESHOLDS.contains(&remaining)
            && self.speed_up_thresholds_fired.insert(remaining)
        {
            if let Some(leader) = self
                .pursuers
                .iter_mut()
                .find(|pursuer| pursuer.kind == PursuerKind::Blinky)
            {
                leader.speed_up();
            }
            self.push_timeline(format!("leader sped up at {remaining} dots"));
        }

        if !self.level_clearing && remaining <= self.options.level_clear_remaining_dots {
            self.start_level_clear();
        }
    }

    pub(super) fn award_points(&mut self, points: u32, kind: PointsKind) {
        self.score = self.score.saturating_add(points);
        self.events.push(RuntimeEvent::AwardPoints { points, kind });

        if !self.extra_life_given && self.score >= EXTRA_LIFE_SCORE {
            self.extra_life_given = true;
            self.lives += 1;
            self.events.push(RuntimeEvent::ExtraLife { lives: self.lives });
            self.push_timeline("extra life".to_string());
        }
        if self.score > self.high_score {
            self.high_score = self.score;
            self.events.push(RuntimeEvent::HighScore {
                score: self.high_score,
            });
        }
    }

    pub(super) fn show_fruit(&mut self) {
        let points = fruit_points(self.level);
        let previous = self.fruit_timer.take();
        self.cancel_timer(previous);
        self.fruit.show_fruit(points);
        let pixel = self.world.to_pixel(self.fruit.position);
        self.events.push(RuntimeEvent::FruitShown {
            x: pixel.x,
            y: pixel.y,
            points,
        });
        self.fruit_timer = Some(self.schedule(FRUIT_VISIBLE_MS, TimerAction::FruitExpire));
    }

    pub(super) fn hide_fruit(&mut self) {
        let expiry = self.fruit_timer.take();
        self.cancel_timer(expiry);
        if self.fruit.is_available() {
            self.events.push(RuntimeEvent::FruitHidden);
        }
        self.fruit.hide();
    }
}
