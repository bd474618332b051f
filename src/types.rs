use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const PRIORITY: [Direction; 4] = [Self::Up, Self::Left, Self::Down, Self::Right];

    pub fn parse_move(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    pub fn offset(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

impl Vec2 {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, dir: Direction, tiles: i32) -> Self {
        let (dx, dy) = dir.offset();
        Self {
            x: self.x + dx * tiles,
            y: self.y + dy * tiles,
        }
    }

    pub fn distance(self, other: Vec2) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn as_point(self) -> Point {
        Point::new(self.x as f32, self.y as f32)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PixelPos {
    pub x: f32,
    pub y: f32,
}

impl PixelPos {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PursuerKind {
    Blinky,
    Pinky,
    Inky,
    Clyde,
}

impl PursuerKind {
    pub const ALL: [PursuerKind; 4] = [Self::Blinky, Self::Pinky, Self::Inky, Self::Clyde];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PursuerMode {
    Scatter,
    Chase,
    Frightened,
    Eaten,
    Idle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaredPalette {
    Blue,
    White,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PickupKind {
    Dot,
    PowerPellet,
    Fruit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PointsKind {
    Dot,
    PowerPellet,
    Fruit,
    Pursuer,
}

impl From<PickupKind> for PointsKind {
    fn from(kind: PickupKind) -> Self {
        match kind {
            PickupKind::Dot => Self::Dot,
            PickupKind::PowerPellet => Self::PowerPellet,
            PickupKind::Fruit => Self::Fruit,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    GameOver,
    Finale,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub index: usize,
    pub x: f32,
    pub y: f32,
    pub dir: Direction,
    pub enabled: bool,
    pub display: bool,
    pub moving: bool,
    pub dying: bool,
    pub autopilot: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct PursuerView {
    pub kind: PursuerKind,
    pub x: f32,
    pub y: f32,
    pub dir: Direction,
    pub mode: PursuerMode,
    pub palette: ScaredPalette,
    pub display: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct PickupView {
    pub kind: PickupKind,
    pub x: f32,
    pub y: f32,
    pub points: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct WorldInit {
    pub width: i32,
    pub height: i32,
    #[serde(rename = "tileSize")]
    pub tile_size: f32,
    pub tiles: Vec<String>,
    pub pickups: Vec<PickupView>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TimelineEvent {
    #[serde(rename = "atMs")]
    pub at_ms: u64,
    pub label: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    AwardPoints {
        points: u32,
        kind: PointsKind,
    },
    DotConsumed {
        x: f32,
        y: f32,
        remaining: u32,
    },
    PowerPelletConsumed,
    PursuerEaten {
        pursuer: PursuerKind,
        x: f32,
        y: f32,
        size: f32,
        points: u32,
    },
    PursuerRestored {
        pursuer: PursuerKind,
    },
    TimerScheduled {
        #[serde(rename = "timerId")]
        timer_id: u64,
        label: String,
    },
    TimerCancelled {
        #[serde(rename = "timerId")]
        timer_id: u64,
    },
    ReleasePursuer,
    FruitShown {
        x: f32,
        y: f32,
        points: u32,
    },
    FruitHidden,
    ExtraLife {
        lives: u32,
    },
    PlayerDied {
        player: usize,
    },
    MazeFlash {
        white: bool,
    },
    MazeCover {
        visible: bool,
    },
    Ready {
        #[serde(rename = "durationMs")]
        duration_ms: u64,
    },
    LevelStarted {
        level: u32,
    },
    HighScore {
        score: u32,
    },
    GameOver,
    Finale,
    Paused {
        paused: bool,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct FruitView {
    pub x: f32,
    pub y: f32,
    pub points: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "nowMs")]
    pub now_ms: u64,
    pub level: u32,
    pub score: u32,
    #[serde(rename = "highScore")]
    pub high_score: u32,
    pub lives: u32,
    #[serde(rename = "remainingDots")]
    pub remaining_dots: u32,
    pub paused: bool,
    #[serde(rename = "mazeWhite")]
    pub maze_white: bool,
    #[serde(rename = "mazeCovered")]
    pub maze_covered: bool,
    #[serde(rename = "gameOverShown")]
    pub game_over_shown: bool,
    pub players: Vec<PlayerView>,
    pub pursuers: Vec<PursuerView>,
    pub pickups: Vec<PickupView>,
    pub fruit: Option<FruitView>,
    pub events: Vec<RuntimeEvent>,
    pub timeline: Vec<TimelineEvent>,
}

#[derive(Clone, Debug, Serialize)]
pub struct HighScoreResponse {
    #[serde(rename = "highScore")]
    pub high_score: u32,
    #[serde(rename = "updatedAtIso")]
    pub updated_at_iso: Option<String>,
    #[serde(rename = "generatedAtIso")]
    pub generated_at_iso: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct GameSummary {
    pub reason: GameOverReason,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    pub level: u32,
    pub score: u32,
    #[serde(rename = "highScore")]
    pub high_score: u32,
    pub lives: u32,
    #[serde(rename = "remainingDots")]
    pub remaining_dots: u32,
    pub timeline: Vec<TimelineEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_is_an_involution() {
        for dir in Direction::PRIORITY {
            assert_ne!(dir.opposite(), dir);
            assert_eq!(dir.opposite().opposite(), dir);
        }
    }

    #[test]
    fn runtime_events_serialize_with_snake_case_tag() {
        let value = serde_json::to_value(RuntimeEvent::PursuerEaten {
            pursuer: PursuerKind::Inky,
            x: 4.0,
            y: 5.0,
            size: 8.0,
            points: 400,
        })
        .expect("event should serialize");
        assert_eq!(value["type"], "pursuer_eaten");
        assert_eq!(value["pursuer"], "inky");
        assert_eq!(value["points"], 400);

        let value = serde_json::to_value(RuntimeEvent::TimerCancelled { timer_id: 7 })
            .expect("event should serialize");
        assert_eq!(value["type"], "timer_cancelled");
        assert_eq!(value["timerId"], 7);
    }
}
