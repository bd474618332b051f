use super::*;
use crate::constants::{
    AUTOPILOT_DANGER_TILES, AUTOPILOT_HUNT_TILES, AUTOPILOT_THINK_MAX_MS, AUTOPILOT_THINK_MIN_MS,
};
use crate::ghost::HousePhase;

use super::utils::manhattan;

impl GameEngine {
    pub(super) fn update_autopilots(&mut self) {
        if !self.allow_key_presses {
            return;
        }
        for idx in 0..self.players.len() {
            let player = &self.players[idx];
            if !player.autopilot || !player.enabled || player.dying {
                continue;
            }
            if self.elapsed_ms < player.think_at_ms {
                continue;
            }
            let delay = self.rng.int(AUTOPILOT_THINK_MIN_MS, AUTOPILOT_THINK_MAX_MS);
            self.players[idx].think_at_ms = self.elapsed_ms + delay.max(0) as u64;

            if let Some(dir) = self.choose_autopilot_direction(idx) {
                self.steer_player(idx, dir);
            }
        }
    }

    fn choose_autopilot_direction(&self, player_idx: usize) -> Option<Direction> {
        let player = &self.players[player_idx];
        let from = player.mover.next_center(&self.world);

        let mut threats = Vec::new();
        let mut prey = Vec::new();
        for pursuer in &self.pursuers {
            if !pursuer.mover.display || pursuer.house != HousePhase::Outside {
                continue;
            }
            let tile = pursuer.mover.tile(&self.world);
            match pursuer.mode {
                PursuerMode::Frightened => prey.push(tile),
                PursuerMode::Eaten => {}
                _ => threats.push(tile),
            }
        }

        let nearest_threat = threats.iter().map(|tile| manhattan(from, *tile)).min();
        if nearest_threat.is_some_and(|dist| dist <= AUTOPILOT_DANGER_TILES) {
            return self.choose_escape_direction(from, &threats);
        }

        let near_threat = |tile: Vec2| threats.iter().any(|threat| manhattan(tile, *threat) <= 1);

        if prey
            .iter()
            .any(|tile| manhattan(from, *tile) <= AUTOPILOT_HUNT_TILES)
        {
            if let Some(dir) =
                self.world
                    .first_step_toward(from, |tile| prey.contains(&tile), near_threat)
            {
                return Some(dir);
            }
        }

        let mut food: HashSet<Vec2> = self
            .pickups
            .iter()
            .filter(|pickup| pickup.is_available())
            .map(|pickup| self.world.nearest_tile(pickup.position))
            .collect();
        if self.fruit.is_available() {
            food.insert(self.world.nearest_tile(self.fruit.position));
        }
        self.world
            .first_step_toward(from, |tile| food.contains(&tile), near_threat)
            .or_else(|| {
                self.world
                    .first_step_toward(from, |tile| food.contains(&tile), |_| false)
            })
    }

    fn choose_escape_direction(&self, from: Vec2, threats: &[Vec2]) -> Option<Direction> {
        let mut best: Option<(Direction, i32)> = None;
        for dir in Direction::PRIORITY {
            let Some(next) = self.world.neighbor(from, dir) else {
                continue;
            };
            let score = threats
                .iter()
                .map(|threat| manhattan(next, *threat))
                .min()
                .unwrap_or(i32::MAX);
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((dir, score));
            }
        }
        best.map(|(dir, _)| dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{READY_INITIAL_MS, TICK_MS};

    fn autopilot_engine() -> GameEngine {
        GameEngine::new(GameEngineOptions {
            start_level: 9,
            autopilot_players: vec![0],
            seed: 3,
            ..GameEngineOptions::default()
        })
    }

    #[test]
    fn autopilot_waits_for_ready_then_eats_dots() {
        let mut engine = autopilot_engine();
        for _ in 0..(READY_INITIAL_MS / TICK_MS - 1) {
            engine.step(TICK_MS);
        }
        assert!(!engine.players[0].mover.moving);
        assert_eq!(engine.score(), 0);

        for _ in 0..100 {
            engine.step(TICK_MS);
        }
        assert!(engine.score() > 0);
        assert!(engine.remaining_dots() < 244);
    }

    #[test]
    fn autopilot_runs_away_from_close_threats() {
        let mut engine = autopilot_engine();
        engine.players[0].mover.position = Point::new(6.0, 5.0);
        engine.pursuers[0].mover.position = Point::new(8.0, 5.0);
        engine.pursuers[0].mode = PursuerMode::Chase;

        let dir = engine.choose_autopilot_direction(0).expect("has options");
        assert_ne!(dir, Direction::Right);
    }

    #[test]
    fn autopilot_hunts_frightened_pursuers() {
        let mut engine = autopilot_engine();
        engine.players[0].mover.position = Point::new(6.0, 5.0);
        engine.pursuers[0].mover.position = Point::new(9.0, 5.0);
        engine.pursuers[0].mode = PursuerMode::Frightened;

        assert_eq!(engine.choose_autopilot_direction(0), Some(Direction::Right));
    }

    #[test]
    fn manual_players_are_left_alone() {
        let mut engine = autopilot_engine();
        engine.set_autopilot(0, false);
        for _ in 0..400 {
            engine.step(TICK_MS);
        }
        assert!(!engine.players[0].mover.moving);
    }
}
