use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use crate::constants::{
    DEFAULT_LEVEL_CLEAR_REMAINING, DEFAULT_TILE_SIZE, PICKUP_SWEEP_MS, PLAYER_SPEED, STARTING_LIVES,
};
use crate::ghost::{PlayerTarget, Pursuer, PursuerContext, PursuerIntent};
use crate::levels::{LevelConfig, LevelTable};
use crate::pickup::Pickup;
use crate::player::Player;
use crate::rng::Rng;
use crate::timer::{TimerId, TimerSet};
use crate::types::{
    Direction, FruitView, GameOverReason, GameSummary, PickupKind, Point, PointsKind,
    PursuerKind, PursuerMode, RuntimeEvent, Snapshot, TimelineEvent, Vec2, WorldInit,
};
use crate::world::MazeWorld;

mod autopilot;
mod pickup_system;
mod power_system;
mod sequence_system;
mod utils;

use self::sequence_system::{Sequence, SequenceStep};
use self::utils::{reverse_controls, route_seat, seat_owner};

const PLAYER_SLOTS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TimerAction {
    ModeCycle(PursuerMode),
    ReleasePursuer,
    PowerFlash(u32),
    FruitExpire,
    Sequence(u64),
}

impl TimerAction {
    fn label(self) -> &'static str {
        match self {
            Self::ModeCycle(_) => "mode_cycle",
            Self::ReleasePursuer => "release_pursuer",
            Self::PowerFlash(_) => "power_flash",
            Self::FruitExpire => "fruit_expire",
            Self::Sequence(_) => "sequence",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PickupSlot {
    Maze(usize),
    Fruit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Intent {
    PickupConsumed {
        slot: PickupSlot,
        kind: PickupKind,
        points: u32,
    },
    AwardPoints {
        points: u32,
        kind: PointsKind,
    },
    PlayerCaught {
        player: usize,
    },
    PursuerCaught {
        player: usize,
        pursuer: usize,
    },
    PursuerRestored {
        pursuer: usize,
    },
    ReleasePursuer,
}

#[derive(Clone, Debug)]
pub struct GameEngineOptions {
    pub start_level: u32,
    pub level_clear_remaining_dots: u32,
    pub tile_size: f32,
    pub level_table: LevelTable,
    pub high_score: u32,
    pub seed: u32,
    pub autopilot_players: Vec<usize>,
}

impl Default for GameEngineOptions {
    fn default() -> Self {
        Self {
            start_level: 1,
            level_clear_remaining_dots: DEFAULT_LEVEL_CLEAR_REMAINING,
            tile_size: DEFAULT_TILE_SIZE,
            level_table: LevelTable::classic(),
            high_score: 0,
            seed: 1,
            autopilot_players: Vec::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GameEngine {
    pub world: MazeWorld,
    pub config: LevelConfig,

    options: GameEngineOptions,
    rng: Rng,
    players: Vec<Player>,
    pursuers: Vec<Pursuer>,
    pickups: Vec<Pickup>,
    fruit: Pickup,
    timers: TimerSet<TimerAction>,
    sequences: BTreeMap<u64, Sequence>,
    next_sequence_id: u64,
    intents: VecDeque<Intent>,
    events: Vec<RuntimeEvent>,
    timeline: Vec<TimelineEvent>,

    score: u32,
    high_score: u32,
    lives: u32,
    level: u32,
    remaining_dots: u32,
    extra_life_given: bool,
    scared: BTreeSet<usize>,
    eaten_count: u32,
    combo: u32,
    fruit_thresholds_fired: HashSet<u32>,
    speed_up_thresholds_fired: HashSet<u32>,
    cycle_mode: PursuerMode,
    idle_queue: VecDeque<usize>,
    cycle_timer: Option<TimerId>,
    release_timer: Option<TimerId>,
    flash_timer: Option<TimerId>,
    fruit_timer: Option<TimerId>,
    frozen_players: Vec<usize>,
    pause_held_timers: Vec<TimerId>,

    allow_key_presses: bool,
    allow_player_movement: bool,
    allow_pause: bool,
    cutscene: bool,
    paused: bool,
    level_clearing: bool,
    maze_white: bool,
    maze_covered: bool,
    game_over_shown: bool,
    sweep_elapsed_ms: u64,

    elapsed_ms: u64,
    tick_counter: u64,
    ended: bool,
    end_reason: Option<GameOverReason>,
}

impl GameEngine {
    pub fn new(options: GameEngineOptions) -> Self {
        let world = MazeWorld::classic(options.tile_size);
        let config = options
            .level_table
            .get(options.start_level)
            .unwrap_or_default();
        let players = (0..PLAYER_SLOTS)
            .map(|index| {
                let mut player = Player::new(index);
                player.autopilot = options.autopilot_players.contains(&index);
                player
            })
            .collect();
        let pursuers = PursuerKind::ALL.into_iter().map(Pursuer::new).collect();

        let mut engine = Self {
            world,
            config,
            rng: Rng::new(options.seed),
            high_score: options.high_score,
            options,
            players,
            pursuers,
            pickups: Vec::new(),
            fruit: Pickup::fruit(),
            timers: TimerSet::new(),
            sequences: BTreeMap::new(),
            next_sequence_id: 1,
            intents: VecDeque::new(),
            events: Vec::new(),
            timeline: Vec::new(),
            score: 0,
            lives: STARTING_LIVES,
            level: 1,
            remaining_dots: 0,
            extra_life_given: false,
            scared: BTreeSet::new(),
            eaten_count: 0,
            combo: 0,
            fruit_thresholds_fired: HashSet::new(),
            speed_up_thresholds_fired: HashSet::new(),
            cycle_mode: PursuerMode::Scatter,
            idle_queue: VecDeque::new(),
            cycle_timer: None,
            release_timer: None,
            flash_timer: None,
            fruit_timer: None,
            frozen_players: Vec::new(),
            pause_held_timers: Vec::new(),
            allow_key_presses: true,
            allow_player_movement: false,
            allow_pause: false,
            cutscene: true,
            paused: false,
            level_clearing: false,
            maze_white: false,
            maze_covered: false,
            game_over_shown: false,
            sweep_elapsed_ms: 0,
            elapsed_ms: 0,
            tick_counter: 0,
            ended: false,
            end_reason: None,
        };
        engine.reset_round();
        engine.start_gameplay(true);
        engine
    }

    pub fn restart(&mut self, start_level: Option<u32>) {
        if let Some(level) = start_level {
            self.options.start_level = level;
        }
        self.reset_round();
        self.start_gameplay(true);
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn remaining_dots(&self) -> u32 {
        self.remaining_dots
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn active_players(&self) -> usize {
        self.config.active_players
    }

    pub fn set_autopilot(&mut self, player: usize, autopilot: bool) {
        if let Some(player) = self.players.get_mut(player) {
            player.autopilot = autopilot;
        }
    }

    pub fn get_world_init(&self) -> WorldInit {
        WorldInit {
            width: self.world.width,
            height: self.world.height,
            tile_size: self.world.tile_size,
            tiles: self.world.rows(),
            pickups: self.available_pickup_views(),
        }
    }

    pub fn step(&mut self, dt_ms: u64) {
        if self.ended || self.paused {
            return;
        }
        self.tick_counter += 1;
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);

        self.fire_due_timers();
        self.drain_intents();
        if self.ended {
            return;
        }

        self.update_autopilots();

        let targets = self.player_targets();
        let leader_tile = self.leader_tile();
        self.update_players(dt_ms);
        self.update_pursuers(dt_ms, &targets, leader_tile);
        self.drain_intents();

        self.resolve_collisions();
        self.drain_intents();

        self.update_pickups(dt_ms);
        self.drain_intents();
    }

    pub fn request_direction(&mut self, player: usize, dir: Direction) {
        let dir = reverse_controls(
            dir,
            self.config.horizontal_reversed,
            self.config.vertical_reversed,
        );
        self.steer_player(player, dir);
    }

    pub fn seat_input(&mut self, seat: usize, dir: Direction) -> bool {
        let Some(player) = route_seat(self.config.active_players, seat, dir) else {
            return false;
        };
        self.request_direction(player, dir);
        true
    }

    pub fn seat_player(&self, seat: usize) -> Option<usize> {
        seat_owner(self.config.active_players, seat)
    }

    fn steer_player(&mut self, player: usize, dir: Direction) {
        if !self.allow_key_presses || self.paused || self.ended {
            return;
        }
        let start_moving = self.allow_player_movement;
        if let Some(player) = self.players.get_mut(player) {
            player.change_direction(dir, start_moving);
        }
    }

    pub fn toggle_pause(&mut self) -> bool {
        if !self.allow_pause || self.ended {
            return false;
        }
        if self.paused {
            for id in std::mem::take(&mut self.pause_held_timers) {
                self.timers.resume(id, self.elapsed_ms);
            }
            self.paused = false;
        } else {
            self.pause_held_timers = self.timers.pause_all(self.elapsed_ms);
            self.paused = true;
        }
        self.events.push(RuntimeEvent::Paused {
            paused: self.paused,
        });
        true
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        let snapshot = Snapshot {
            tick: self.tick_counter,
            now_ms: self.elapsed_ms,
            level: self.level,
            score: self.score,
            high_score: self.high_score,
            lives: self.lives,
            remaining_dots: self.remaining_dots,
            paused: self.paused,
            maze_white: self.maze_white,
            maze_covered: self.maze_covered,
            game_over_shown: self.game_over_shown,
            players: self
                .players
                .iter()
                .map(|player| player.view(&self.world))
                .collect(),
            pursuers: self
                .pursuers
                .iter()
                .map(|pursuer| pursuer.view(&self.world))
                .collect(),
            pickups: self.available_pickup_views(),
            fruit: self.fruit_view(),
            events: if include_events {
                std::mem::take(&mut self.events)
            } else {
                Vec::new()
            },
            timeline: self
                .timeline
                .iter()
                .rev()
                .take(24)
                .cloned()
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect(),
        };
        snapshot
    }

    pub fn build_summary(&self) -> GameSummary {
        GameSummary {
            reason: self.end_reason.unwrap_or(GameOverReason::GameOver),
            duration_ms: self.elapsed_ms,
            level: self.level,
            score: self.score,
            high_score: self.high_score,
            lives: self.lives,
            remaining_dots: self.remaining_dots,
            timeline: self.timeline.clone(),
        }
    }

    fn available_pickup_views(&self) -> Vec<crate::types::PickupView> {
        self.pickups
            .iter()
            .filter(|pickup| pickup.is_available())
            .map(|pickup| pickup.view(&self.world))
            .collect()
    }

    fn fruit_view(&self) -> Option<FruitView> {
        if !self.fruit.is_available() {
            return None;
        }
        let pixel = self.world.to_pixel(self.fruit.position);
        Some(FruitView {
            x: pixel.x,
            y: pixel.y,
            points: self.fruit.points,
        })
    }

    fn reset_round(&mut self) {
        self.timers.clear();
        self.sequences.clear();
        self.intents.clear();
        self.score = 0;
        self.lives = STARTING_LIVES;
        self.level = self.options.start_level.max(1);
        self.extra_life_given = false;
        self.scared.clear();
        self.eaten_count = 0;
        self.combo = 0;
        self.idle_queue.clear();
        self.cycle_timer = None;
        self.release_timer = None;
        self.flash_timer = None;
        self.fruit_timer = None;
        self.frozen_players.clear();
        self.pause_held_timers.clear();
        self.allow_key_presses = true;
        self.allow_player_movement = false;
        self.allow_pause = false;
        self.cutscene = true;
        self.paused = false;
        self.level_clearing = false;
        self.maze_white = false;
        self.maze_covered = false;
        self.game_over_shown = false;
        self.sweep_elapsed_ms = 0;
        self.ended = false;
        self.end_reason = None;
        self.timeline.clear();
        self.push_timeline("round started".to_string());

        self.setup_for_level();
        self.rebuild_pickups();
    }

    fn setup_for_level(&mut self) {
        if let Some(config) = self.options.level_table.get(self.level) {
            self.config = config;
        }
        for player in &mut self.players {
            player.enabled = player.index < self.config.active_players;
            player.reset();
        }
        for pursuer in &mut self.pursuers {
            pursuer.set_speed_level(self.config.speed_level);
            pursuer.reset();
        }
        self.fruit.hide();
        self.fruit_thresholds_fired.clear();
        self.speed_up_thresholds_fired.clear();
        self.events.push(RuntimeEvent::LevelStarted { level: self.level });
        self.push_timeline(format!("level {} started", self.level));
    }

    fn reset_entities(&mut self) {
        for player in &mut self.players {
            player.reset();
        }
        for pursuer in &mut self.pursuers {
            pursuer.reset();
        }
        self.sweep_elapsed_ms = PICKUP_SWEEP_MS;
    }

    fn update_players(&mut self, dt_ms: u64) {
        for player in &mut self.players {
            player.update(&self.world, PLAYER_SPEED, dt_ms);
        }
    }

    fn update_pursuers(&mut self, dt_ms: u64, targets: &[PlayerTarget], leader_tile: Vec2) {
        let ctx = PursuerContext {
            world: &self.world,
            players: targets,
            leader_tile,
        };
        for idx in 0..self.pursuers.len() {
            match self.pursuers[idx].update(&ctx, &mut self.rng, dt_ms) {
                Some(PursuerIntent::LeftHouse) => self.intents.push_back(Intent::ReleasePursuer),
                Some(PursuerIntent::Restored) => {
                    self.intents
                        .push_back(Intent::PursuerRestored { pursuer: idx });
                }
                None => {}
            }
        }
    }

    fn player_targets(&self) -> Vec<PlayerTarget> {
        self.players
            .iter()
            .filter(|player| player.is_active())
            .map(|player| PlayerTarget {
                tile: player.mover.tile(&self.world),
                direction: player.mover.direction,
            })
            .collect()
    }

    fn leader_tile(&self) -> Vec2 {
        self.pursuers
            .iter()
            .find(|pursuer| pursuer.kind == PursuerKind::Blinky)
            .map(|pursuer| pursuer.mover.tile(&self.world))
            .unwrap_or(Vec2::new(0, 0))
    }

    fn active_player_positions(&self) -> Vec<Point> {
        self.players
            .iter()
            .filter(|player| player.is_active())
            .map(|player| player.grid_position())
            .collect()
    }

    fn resolve_collisions(&mut self) {
        for (player_idx, player) in self.players.iter().enumerate() {
            if !player.is_active() {
                continue;
            }
            let position = player.grid_position();
            for (pursuer_idx, pursuer) in self.pursuers.iter().enumerate() {
                if !pursuer.collides_with(position) {
                    continue;
                }
                if pursuer.mode == PursuerMode::Frightened {
                    self.intents.push_back(Intent::PursuerCaught {
                        player: player_idx,
                        pursuer: pursuer_idx,
                    });
                } else {
                    self.intents.push_back(Intent::PlayerCaught { player: player_idx });
                }
            }
        }
    }

    fn drain_intents(&mut self) {
        while let Some(intent) = self.intents.pop_front() {
            self.handle_intent(intent);
        }
    }

    fn handle_intent(&mut self, intent: Intent) {
        match intent {
            Intent::PickupConsumed { slot, kind, points } => {
                self.handle_pickup_consumed(slot, kind, points);
            }
            Intent::AwardPoints { points, kind } => self.award_points(points, kind),
            Intent::PlayerCaught { player } => {
                if self.cutscene || self.ended {
                    return;
                }
                self.start_death_sequence(player);
            }
            Intent::PursuerCaught { player, pursuer } => {
                let Some(target) = self.pursuers.get(pursuer) else {
                    return;
                };
                if target.mode != PursuerMode::Frightened || !target.allow_collision {
                    return;
                }
                self.eat_pursuer(player, pursuer);
            }
            Intent::PursuerRestored { pursuer } => {
                self.eaten_count = self.eaten_count.saturating_sub(1);
                if let Some(restored) = self.pursuers.get(pursuer) {
                    self.events.push(RuntimeEvent::PursuerRestored {
                        pursuer: restored.kind,
                    });
                }
            }
            Intent::ReleasePursuer => {
                self.events.push(RuntimeEvent::ReleasePursuer);
                self.schedule_release();
            }
        }
    }

    fn schedule(&mut self, delay_ms: u64, action: TimerAction) -> TimerId {
        let id = self.timers.schedule(self.elapsed_ms, delay_ms, action);
        self.events.push(RuntimeEvent::TimerScheduled {
            timer_id: id.0,
            label: action.label().to_string(),
        });
        id
    }

    fn cancel_timer(&mut self, id: Option<TimerId>) {
        let Some(id) = id else {
            return;
        };
        if self.timers.cancel(id) {
            self.events
                .push(RuntimeEvent::TimerCancelled { timer_id: id.0 });
        }
    }

    fn fire_due_timers(&mut self) {
        while let Some((id, action)) = self.timers.pop_due(self.elapsed_ms) {
            self.handle_timer(id, action);
            if self.ended {
                return;
            }
        }
    }

    fn handle_timer(&mut self, id: TimerId, action: TimerAction) {
        match action {
            TimerAction::ModeCycle(next) => {
                if self.cycle_timer == Some(id) {
                    self.cycle_timer = None;
                }
                for pursuer in &mut self.pursuers {
                    pursuer.change_mode(next);
                }
                self.start_mode_cycle(next);
            }
            TimerAction::ReleasePursuer => {
                if self.release_timer == Some(id) {
                    self.release_timer = None;
                }
                if let Some(idx) = self.idle_queue.pop_front() {
                    self.pursuers[idx].end_idle();
                }
            }
            TimerAction::PowerFlash(toggles) => {
                if self.flash_timer == Some(id) {
                    self.flash_timer = None;
                }
                self.power_flash(toggles);
            }
            TimerAction::FruitExpire => {
                if self.fruit_timer == Some(id) {
                    self.fruit_timer = None;
                }
                self.hide_fruit();
            }
            TimerAction::Sequence(sequence_id) => self.run_sequence_step(sequence_id),
        }
    }

    fn push_timeline(&mut self, label: String) {
        self.timeline.push(TimelineEvent {
            at_ms: self.elapsed_ms,
            label,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{
        EXTRA_LIFE_SCORE, READY_INITIAL_MS, READY_MS, SCATTER_MS, TICK_MS,
    };
    use crate::ghost::HousePhase;
    use crate::types::ScaredPalette;

    fn engine_at_level(level: u32) -> GameEngine {
        GameEngine::new(GameEngineOptions {
            start_level: level,
            seed: 42,
            ..GameEngineOptions::default()
        })
    }

    fn advance_clock(engine: &mut GameEngine, ms: u64) {
        let end = engine.elapsed_ms + ms;
        while engine.elapsed_ms < end {
            engine.elapsed_ms = (engine.elapsed_ms + TICK_MS).min(end);
            engine.fire_due_timers();
            engine.drain_intents();
        }
    }

    fn finish_ready(engine: &mut GameEngine) {
        advance_clock(engine, READY_INITIAL_MS);
        assert!(engine.allow_player_movement);
    }

    fn pursuer_points(engine: &mut GameEngine) -> Vec<u32> {
        engine
            .build_snapshot(true)
            .events
            .into_iter()
            .filter_map(|event| match event {
                RuntimeEvent::AwardPoints {
                    points,
                    kind: PointsKind::Pursuer,
                } => Some(points),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn new_round_starts_with_ready_countdown() {
        let mut engine = engine_at_level(1);
        assert_eq!(engine.lives(), STARTING_LIVES);
        assert_eq!(engine.level(), 1);
        assert_eq!(engine.remaining_dots(), 244);
        assert!(!engine.allow_player_movement);
        assert!(engine.cutscene);

        engine.request_direction(0, Direction::Right);
        for _ in 0..(READY_INITIAL_MS / TICK_MS - 1) {
            engine.step(TICK_MS);
        }
        assert_eq!(engine.players[0].mover.position, Point::new(13.5, 23.0));
        assert!(!engine.allow_player_movement);

        engine.step(TICK_MS);
        assert!(engine.allow_player_movement);
        assert!(engine.allow_pause);
        assert!(engine.pursuers.iter().all(|pursuer| pursuer.mover.moving));
        assert_eq!(engine.idle_queue.len(), 3);
        assert!(engine.release_timer.is_some());
    }

    #[test]
    fn first_release_happens_after_level_delay() {
        let mut engine = engine_at_level(1);
        finish_ready(&mut engine);
        let pinky = &engine.pursuers[1];
        assert_eq!(pinky.house, HousePhase::Waiting);
        advance_clock(&mut engine, 4_000);
        assert_eq!(engine.pursuers[1].house, HousePhase::Leaving);
        assert_eq!(engine.pursuers[2].house, HousePhase::Waiting);
    }

    #[test]
    fn cycle_switches_to_chase_after_scatter() {
        let mut engine = engine_at_level(1);
        finish_ready(&mut engine);
        assert_eq!(engine.pursuers[0].mode, PursuerMode::Scatter);
        advance_clock(&mut engine, SCATTER_MS);
        assert_eq!(engine.pursuers[0].mode, PursuerMode::Chase);
        assert_eq!(engine.cycle_mode, PursuerMode::Chase);
        assert_eq!(engine.pursuers[1].default_mode, PursuerMode::Chase);
    }

    #[test]
    fn player_starts_moving_on_first_request_after_ready() {
        let mut engine = engine_at_level(1);
        finish_ready(&mut engine);
        engine.request_direction(0, Direction::Right);
        engine.step(TICK_MS);
        assert_eq!(engine.players[0].mover.direction, Direction::Right);
        assert!(engine.players[0].mover.position.x > 13.5);
    }

    #[test]
    fn reversed_controls_flip_requests() {
        let mut engine = engine_at_level(3);
        assert!(engine.config.horizontal_reversed);
        finish_ready(&mut engine);
        engine.request_direction(0, Direction::Left);
        engine.step(TICK_MS);
        assert_eq!(engine.players[0].mover.direction, Direction::Right);
    }

    #[test]
    fn combo_doubles_and_resets_on_next_pellet() {
        let mut engine = engine_at_level(1);
        finish_ready(&mut engine);
        let _ = engine.build_snapshot(true);

        engine.power_up();
        for pursuer in 0..4 {
            engine
                .intents
                .push_back(Intent::PursuerCaught { player: 0, pursuer });
            engine.drain_intents();
            advance_clock(&mut engine, 1_000);
        }
        assert_eq!(pursuer_points(&mut engine), vec![100, 200, 400, 800]);
        assert_eq!(engine.score, 1_500);
        assert_eq!(engine.eaten_count, 4);

        for pursuer in &mut engine.pursuers {
            pursuer.reset();
        }
        engine.power_up();
        engine
            .intents
            .push_back(Intent::PursuerCaught { player: 0, pursuer: 0 });
        engine.drain_intents();
        assert_eq!(pursuer_points(&mut engine), vec![100]);
    }

    #[test]
    fn eating_freezes_everyone_and_pauses_power_timer() {
        let mut engine = engine_at_level(1);
        finish_ready(&mut engine);
        engine.power_up();
        let flash = engine.flash_timer.expect("flash timer armed");
        advance_clock(&mut engine, 1_000);
        let remaining = engine
            .timers
            .remaining_ms(flash, engine.elapsed_ms)
            .expect("timer alive");

        engine
            .intents
            .push_back(Intent::PursuerCaught { player: 0, pursuer: 0 });
        engine.drain_intents();
        assert!(!engine.allow_player_movement);
        assert!(!engine.players[0].mover.display);
        assert!(!engine.pursuers[0].mover.display);
        assert!(engine.pursuers.iter().all(|p| p.paused && !p.allow_collision));
        assert_eq!(engine.pursuers[0].mode, PursuerMode::Eaten);

        advance_clock(&mut engine, 999);
        assert_eq!(
            engine.timers.remaining_ms(flash, engine.elapsed_ms),
            Some(remaining)
        );
        advance_clock(&mut engine, 1);
        assert!(engine.allow_player_movement);
        assert!(engine.players[0].mover.display);
        assert!(engine.pursuers.iter().all(|p| !p.paused && p.allow_collision));
        assert!(!engine.timers.is_paused(flash));
    }

    #[test]
    fn eaten_pursuers_leave_the_scared_set_and_end_the_flash_chain() {
        let mut engine = engine_at_level(1);
        finish_ready(&mut engine);
        engine.power_up();
        engine
            .intents
            .push_back(Intent::PursuerCaught { player: 0, pursuer: 0 });
        engine.drain_intents();
        assert_eq!(engine.scared, BTreeSet::from([1, 2, 3]));

        for pursuer in 1..4 {
            advance_clock(&mut engine, 1_000);
            engine
                .intents
                .push_back(Intent::PursuerCaught { player: 0, pursuer });
            engine.drain_intents();
        }
        assert!(engine.scared.is_empty());
        advance_clock(&mut engine, 1_000 + 6_000);
        assert!(engine.flash_timer.is_none());
    }

    #[test]
    fn touching_a_chasing_pursuer_kills_the_player() {
        let mut engine = engine_at_level(1);
        finish_ready(&mut engine);
        engine.pursuers[0].mover.position = engine.players[0].mover.position;
        engine.step(TICK_MS);
        assert!(engine.cutscene);
        assert!(!engine.allow_player_movement);

        advance_clock(&mut engine, 750);
        assert_eq!(engine.lives, STARTING_LIVES - 1);
        assert!(engine.players[0].dying);
    }

    #[test]
    fn touching_a_scared_pursuer_eats_it() {
        let mut engine = engine_at_level(1);
        finish_ready(&mut engine);
        engine.power_up();
        let _ = engine.build_snapshot(true);
        engine.pursuers[0].mover.position = engine.players[0].mover.position;
        engine.step(TICK_MS);

        assert_eq!(engine.pursuers[0].mode, PursuerMode::Eaten);
        assert!(!engine.scared.contains(&0));
        assert_eq!(pursuer_points(&mut engine), vec![100]);
        assert_eq!(engine.lives, STARTING_LIVES);
        assert!(!engine.cutscene);
    }

    #[test]
    fn power_flash_toggles_then_reverts_to_cycle_mode() {
        let mut engine = engine_at_level(1);
        finish_ready(&mut engine);
        engine.power_up();
        assert_eq!(engine.pursuers[0].mode, PursuerMode::Frightened);
        advance_clock(&mut engine, 5_000);
        assert_eq!(engine.pursuers[0].palette, ScaredPalette::White);
        advance_clock(&mut engine, 250);
        assert_eq!(engine.pursuers[0].palette, ScaredPalette::Blue);
        advance_clock(&mut engine, 250 * 8);
        assert_eq!(engine.pursuers[0].mode, PursuerMode::Chase);
        assert!(engine.scared.is_empty());
    }

    #[test]
    fn pickup_sweep_only_arms_pickups_near_players() {
        let mut engine = engine_at_level(1);
        finish_ready(&mut engine);
        engine.update_pickups(0);
        let near = engine
            .pickups
            .iter()
            .find(|pickup| pickup.position == Point::new(12.0, 23.0))
            .expect("dot beside spawn");
        let far = engine
            .pickups
            .iter()
            .find(|pickup| pickup.position == Point::new(1.0, 29.0))
            .expect("corner dot");
        assert!(near.is_nearby());
        assert!(!far.is_nearby());
        assert_eq!(engine.sweep_elapsed_ms, 0);

        engine.reset_entities();
        assert_eq!(engine.sweep_elapsed_ms, PICKUP_SWEEP_MS);
    }

    #[test]
    fn pellet_intents_run_in_arrival_order() {
        let mut engine = engine_at_level(1);
        finish_ready(&mut engine);
        let _ = engine.build_snapshot(true);
        let pellet = engine
            .pickups
            .iter()
            .position(|pickup| pickup.kind == PickupKind::PowerPellet)
            .expect("maze has pellets");
        engine.pickups[pellet].consumed = true;
        engine.intents.push_back(Intent::PickupConsumed {
            slot: PickupSlot::Maze(pellet),
            kind: PickupKind::PowerPellet,
            points: 50,
        });
        engine.drain_intents();

        let events = engine.build_snapshot(true).events;
        let power = events
            .iter()
            .position(|event| matches!(event, RuntimeEvent::PowerPelletConsumed))
            .expect("power event");
        let award = events
            .iter()
            .position(|event| matches!(event, RuntimeEvent::AwardPoints { points: 50, .. }))
            .expect("award event");
        assert!(power < award);
        assert_eq!(engine.score, 50);
        assert_eq!(engine.remaining_dots, 243);
    }

    #[test]
    fn speed_up_thresholds_fire_once_each() {
        let mut engine = engine_at_level(1);
        finish_ready(&mut engine);
        let slow = engine.pursuers[0].default_speed();

        engine.remaining_dots = 41;
        engine.dot_consumed(Point::new(1.0, 1.0));
        let medium = engine.pursuers[0].default_speed();
        assert!(medium > slow);

        engine.remaining_dots = 41;
        engine.dot_consumed(Point::new(1.0, 1.0));
        assert_eq!(engine.pursuers[0].default_speed(), medium);

        engine.remaining_dots = 21;
        engine.dot_consumed(Point::new(1.0, 1.0));
        let fast = engine.pursuers[0].default_speed();
        assert!(fast > medium);
        assert!(engine.pursuers[1..]
            .iter()
            .all(|pursuer| pursuer.default_speed() == slow));
    }

    #[test]
    fn fruit_appears_at_thresholds_and_expires() {
        let mut engine = engine_at_level(2);
        finish_ready(&mut engine);
        engine.remaining_dots = 175;
        engine.dot_consumed(Point::new(1.0, 1.0));
        assert!(engine.fruit.is_available());
        assert_eq!(engine.fruit.points, 300);
        assert!(engine.build_snapshot(false).fruit.is_some());

        advance_clock(&mut engine, 9_980);
        assert!(engine.fruit.is_available());
        advance_clock(&mut engine, 20);
        assert!(!engine.fruit.is_available());
    }

    #[test]
    fn extra_life_is_granted_once() {
        let mut engine = engine_at_level(1);
        engine.award_points(EXTRA_LIFE_SCORE, PointsKind::Fruit);
        assert_eq!(engine.lives, STARTING_LIVES + 1);
        engine.award_points(EXTRA_LIFE_SCORE, PointsKind::Fruit);
        assert_eq!(engine.lives, STARTING_LIVES + 1);
        assert_eq!(engine.high_score(), 2 * EXTRA_LIFE_SCORE);
    }

    #[test]
    fn death_restarts_with_one_less_life_and_restores_entities() {
        let mut engine = engine_at_level(1);
        finish_ready(&mut engine);
        engine.request_direction(0, Direction::Right);
        for _ in 0..30 {
            engine.step(TICK_MS);
        }
        let blinky_spawn = engine.pursuers[0].mover.spawn_position();

        engine.intents.push_back(Intent::PlayerCaught { player: 0 });
        engine.drain_intents();
        assert!(engine.cutscene);
        assert!(engine.cycle_timer.is_none());
        assert!(engine.release_timer.is_none());

        advance_clock(&mut engine, 750);
        assert!(engine.players[0].dying);
        assert_eq!(engine.lives, STARTING_LIVES - 1);
        assert!(engine.pursuers.iter().all(|pursuer| !pursuer.mover.display));

        advance_clock(&mut engine, 2_250);
        assert!(engine.maze_covered);
        advance_clock(&mut engine, 500);
        assert!(!engine.maze_covered);
        assert_eq!(engine.players[0].mover.position, Point::new(13.5, 23.0));
        assert_eq!(engine.players[0].mover.direction, Direction::Left);
        assert_eq!(engine.pursuers[0].mover.position, blinky_spawn);
        assert_eq!(engine.pursuers[0].mode, PursuerMode::Scatter);
        assert_eq!(engine.pursuers[1].mode, PursuerMode::Idle);
        assert!(!engine.players[0].dying);

        advance_clock(&mut engine, READY_MS);
        assert!(engine.allow_player_movement);
        assert!(!engine.is_ended());
    }

    #[test]
    fn losing_last_life_ends_round_without_level_change() {
        let mut engine = engine_at_level(4);
        finish_ready(&mut engine);
        engine.lives = 0;
        engine.intents.push_back(Intent::PlayerCaught { player: 0 });
        engine.drain_intents();

        advance_clock(&mut engine, 750 + 2_250);
        assert!(engine.game_over_shown);
        assert!(!engine.is_ended());
        advance_clock(&mut engine, 2_500);
        assert!(engine.is_ended());
        let summary = engine.build_summary();
        assert_eq!(summary.reason, GameOverReason::GameOver);
        assert_eq!(summary.level, 4);
        assert!(summary.remaining_dots > 0);
    }

    #[test]
    fn one_death_per_tick_even_with_several_collisions() {
        let mut engine = engine_at_level(1);
        finish_ready(&mut engine);
        engine.intents.push_back(Intent::PlayerCaught { player: 0 });
        engine.intents.push_back(Intent::PlayerCaught { player: 1 });
        engine.drain_intents();
        advance_clock(&mut engine, 750);
        assert_eq!(engine.lives, STARTING_LIVES - 1);
    }

    #[test]
    fn clearing_the_maze_advances_the_level() {
        let mut engine = engine_at_level(1);
        finish_ready(&mut engine);
        engine.score = 1_234;
        engine.remaining_dots = 1;
        engine.dot_consumed(Point::new(1.0, 1.0));
        assert!(engine.level_clearing);
        assert!(!engine.allow_key_presses);

        advance_clock(&mut engine, 2_000);
        assert!(engine.maze_white);
        advance_clock(&mut engine, 250);
        assert!(!engine.maze_white);
        advance_clock(&mut engine, 250 * 5);
        assert!(engine.maze_covered);
        advance_clock(&mut engine, 500);
        assert_eq!(engine.level(), 2);
        assert_eq!(engine.remaining_dots(), 244);
        assert_eq!(engine.score, 1_234);
        assert!(engine.allow_key_presses);
        assert!(!engine.level_clearing);
        assert_eq!(engine.config, LevelTable::classic().get(2).expect("level 2"));
    }

    #[test]
    fn clearing_the_last_level_ends_in_finale() {
        let mut engine = engine_at_level(11);
        finish_ready(&mut engine);
        engine.remaining_dots = 1;
        engine.dot_consumed(Point::new(1.0, 1.0));
        advance_clock(&mut engine, 2_000 + 250 * 6 + 500);
        assert!(engine.is_ended());
        assert_eq!(engine.build_summary().reason, GameOverReason::Finale);
    }

    #[test]
    fn level_clear_threshold_is_configurable() {
        let mut engine = GameEngine::new(GameEngineOptions {
            level_clear_remaining_dots: 120,
            ..GameEngineOptions::default()
        });
        finish_ready(&mut engine);
        engine.remaining_dots = 122;
        engine.dot_consumed(Point::new(1.0, 1.0));
        assert!(!engine.level_clearing);
        engine.dot_consumed(Point::new(1.0, 1.0));
        assert!(engine.level_clearing);
    }

    #[test]
    fn unknown_level_keeps_current_configuration() {
        let table = LevelTable::from_json(
            r#"{"levels":[{"level":1,"activePlayers":2,"speedLevel":3},{"level":3,"activePlayers":1,"speedLevel":5}]}"#,
        )
        .expect("table");
        let mut engine = GameEngine::new(GameEngineOptions {
            level_table: table,
            ..GameEngineOptions::default()
        });
        let level_one = engine.config;
        engine.level = 2;
        engine.setup_for_level();
        assert_eq!(engine.config, level_one);
        assert!(engine.players[1].enabled);
        assert!(!engine.players[2].enabled);
    }

    #[test]
    fn pause_is_refused_in_cutscenes_and_freezes_timers() {
        let mut engine = engine_at_level(1);
        assert!(!engine.toggle_pause());
        finish_ready(&mut engine);

        let cycle = engine.cycle_timer.expect("cycle armed");
        let before = engine.timers.remaining_ms(cycle, engine.elapsed_ms);
        assert!(engine.toggle_pause());
        let tick = engine.tick_counter;
        for _ in 0..100 {
            engine.step(TICK_MS);
        }
        assert_eq!(engine.tick_counter, tick);
        engine.request_direction(0, Direction::Right);
        assert_eq!(engine.players[0].mover.queued, None);

        assert!(engine.toggle_pause());
        assert_eq!(engine.timers.remaining_ms(cycle, engine.elapsed_ms), before);
    }

    #[test]
    fn seat_input_respects_shared_controls() {
        let mut engine = engine_at_level(5);
        finish_ready(&mut engine);
        assert!(engine.seat_input(0, Direction::Up));
        assert!(!engine.seat_input(0, Direction::Left));
        assert!(engine.seat_input(3, Direction::Right));
        assert_eq!(engine.players[0].mover.queued, Some(Direction::Up));
        assert_eq!(engine.players[1].mover.queued, Some(Direction::Right));
    }

    #[test]
    fn snapshot_drains_events_only_when_requested() {
        let mut engine = engine_at_level(1);
        let peek = engine.build_snapshot(false);
        assert!(peek.events.is_empty());
        let drained = engine.build_snapshot(true);
        assert!(drained
            .events
            .iter()
            .any(|event| matches!(event, RuntimeEvent::Ready { duration_ms: 4_500 })));
        assert!(engine.build_snapshot(true).events.is_empty());
    }

    #[test]
    fn same_seed_autopilot_runs_are_identical() {
        let options = GameEngineOptions {
            seed: 9,
            autopilot_players: vec![0, 1, 2, 3],
            ..GameEngineOptions::default()
        };
        let mut a = GameEngine::new(options.clone());
        let mut b = GameEngine::new(options);
        for _ in 0..1_500 {
            a.step(TICK_MS);
            b.step(TICK_MS);
        }
        assert_eq!(a.score(), b.score());
        assert_eq!(a.remaining_dots(), b.remaining_dots());
        assert!(a.score() > 0);
        let pa = a.build_snapshot(false);
        let pb = b.build_snapshot(false);
        for (left, right) in pa.players.iter().zip(pb.players.iter()) {
            assert_eq!((left.x, left.y), (right.x, right.y));
        }
    }

    #[test]
    fn restart_resets_score_and_level() {
        let mut engine = engine_at_level(1);
        engine.award_points(500, PointsKind::Fruit);
        engine.restart(Some(5));
        assert_eq!(engine.score(), 0);
        assert_eq!(engine.level(), 5);
        assert_eq!(engine.active_players(), 2);
        assert_eq!(engine.high_score(), 500);
        assert!(engine.cutscene);
    }
}
