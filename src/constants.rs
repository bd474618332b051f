pub const TICK_RATE: u32 = 50;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;
pub const MAX_STEPS_PER_FRAME: u32 = 5;

pub const DEFAULT_TILE_SIZE: f32 = 8.0;

pub const PLAYER_SPEED: f32 = 11.0;
pub const PURSUER_SLOW_FACTOR: f32 = 0.75;
pub const PURSUER_MEDIUM_FACTOR: f32 = 0.875;
pub const PURSUER_FAST_FACTOR: f32 = 1.0;
pub const PURSUER_SCARED_FACTOR: f32 = 0.5;
pub const PURSUER_TRANSITION_FACTOR: f32 = 0.4;
pub const PURSUER_EYES_FACTOR: f32 = 2.0;

pub const STARTING_LIVES: u32 = 2;
pub const EXTRA_LIFE_SCORE: u32 = 10_000;

pub const DOT_POINTS: u32 = 10;
pub const POWER_PELLET_POINTS: u32 = 50;
pub const PURSUER_BASE_POINTS: u32 = 100;

pub const FRUIT_THRESHOLDS: [u32; 2] = [174, 74];
pub const SPEED_UP_THRESHOLDS: [u32; 2] = [40, 20];
pub const DEFAULT_LEVEL_CLEAR_REMAINING: u32 = 0;

pub const PICKUP_SWEEP_MS: u64 = 500;
pub const PICKUP_SWEEP_RADIUS: f32 = 8.0;
pub const FRUIT_VISIBLE_MS: u64 = 10_000;

pub const READY_INITIAL_MS: u64 = 4_500;
pub const READY_MS: u64 = 2_000;

pub const SCATTER_MS: u64 = 7_000;
pub const CHASE_MS: u64 = 20_000;

pub const POWER_FLASH_INTERVAL_MS: u64 = 250;
pub const POWER_FLASH_TOGGLES: u32 = 9;
pub const EAT_FREEZE_MS: u64 = 1_000;

pub const DEATH_FREEZE_MS: u64 = 750;
pub const DEATH_ANIMATION_MS: u64 = 2_250;
pub const MAZE_UNCOVER_MS: u64 = 500;
pub const GAME_OVER_TEXT_MS: u64 = 2_250;
pub const GAME_OVER_END_MS: u64 = 2_500;

pub const LEVEL_CLEAR_DELAY_MS: u64 = 2_000;
pub const MAZE_FLASH_MS: u64 = 250;

pub const PINKY_LOOKAHEAD_TILES: i32 = 4;
pub const INKY_PIVOT_TILES: i32 = 2;
pub const CLYDE_RETREAT_DISTANCE: f32 = 8.0;

pub const AUTOPILOT_THINK_MIN_MS: i32 = 120;
pub const AUTOPILOT_THINK_MAX_MS: i32 = 260;
pub const AUTOPILOT_DANGER_TILES: i32 = 3;
pub const AUTOPILOT_HUNT_TILES: i32 = 6;

pub fn fruit_points(level: u32) -> u32 {
    match level {
        1 => 100,
        2 => 300,
        3 => 500,
        4 => 700,
        5 => 1000,
        6 => 2000,
        7 => 3000,
        _ => 5000,
    }
}

pub fn power_duration_ms(speed_level: u32) -> u64 {
    7u64.saturating_sub(u64::from(speed_level)) * 1000
}

pub fn release_delay_ms(speed_level: u32) -> u64 {
    let steps = i64::from(speed_level) - 1;
    (8 - steps * 4).max(0) as u64 * 1000
}

pub fn pursuer_speed_factors(speed_level: u32) -> [f32; 3] {
    let bonus = speed_level as f32 / 100.0;
    [
        PURSUER_SLOW_FACTOR + bonus,
        PURSUER_MEDIUM_FACTOR + bonus,
        PURSUER_FAST_FACTOR + bonus,
    ]
}
