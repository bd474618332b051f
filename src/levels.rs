use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelConfig {
    #[serde(rename = "activePlayers")]
    pub active_players: usize,
    #[serde(rename = "speedLevel")]
    pub speed_level: u32,
    #[serde(rename = "horizontalReversed", default)]
    pub horizontal_reversed: bool,
    #[serde(rename = "verticalReversed", default)]
    pub vertical_reversed: bool,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            active_players: 4,
            speed_level: 1,
            horizontal_reversed: false,
            vertical_reversed: false,
        }
    }
}

impl LevelConfig {
    fn new(active_players: usize, speed_level: u32, horizontal: bool, vertical: bool) -> Self {
        Self {
            active_players,
            speed_level,
            horizontal_reversed: horizontal,
            vertical_reversed: vertical,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LevelTableFile {
    levels: Vec<LevelEntry>,
}

#[derive(Debug, Deserialize)]
struct LevelEntry {
    level: u32,
    #[serde(flatten)]
    config: LevelConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LevelTable {
    levels: BTreeMap<u32, LevelConfig>,
}

impl Default for LevelTable {
    fn default() -> Self {
        Self::classic()
    }
}

impl LevelTable {
    pub fn classic() -> Self {
        let entries = [
            (1, LevelConfig::new(4, 2, false, false)),
            (2, LevelConfig::new(4, 5, false, false)),
            (3, LevelConfig::new(4, 5, true, false)),
            (4, LevelConfig::new(4, 5, true, true)),
            (5, LevelConfig::new(2, 2, false, false)),
            (6, LevelConfig::new(2, 5, false, false)),
            (7, LevelConfig::new(2, 5, true, false)),
            (8, LevelConfig::new(2, 5, true, true)),
            (9, LevelConfig::new(1, 2, false, false)),
            (10, LevelConfig::new(1, 5, false, false)),
            (11, LevelConfig::new(1, 5, true, true)),
        ];
        Self {
            levels: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, level: u32) -> Option<LevelConfig> {
        self.levels.get(&level).copied()
    }

    pub fn last_level(&self) -> u32 {
        self.levels.keys().next_back().copied().unwrap_or(1)
    }

    pub fn first_level(&self) -> u32 {
        self.levels.keys().next().copied().unwrap_or(1)
    }

    pub fn from_json(raw: &str) -> Option<Self> {
        let parsed: LevelTableFile = serde_json::from_str(raw).ok()?;
        let mut levels = BTreeMap::new();
        for entry in parsed.levels {
            if !matches!(entry.config.active_players, 1 | 2 | 4) || entry.level == 0 {
                return None;
            }
            levels.insert(entry.level, entry.config);
        }
        if levels.is_empty() {
            return None;
        }
        Some(Self { levels })
    }

    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) => {
                eprintln!(
                    "[level-table] failed to read {}: {error}; using built-in table",
                    path.to_string_lossy()
                );
                return Self::classic();
            }
        };
        match Self::from_json(&raw) {
            Some(table) => table,
            None => {
                eprintln!(
                    "[level-table] invalid table in {}; using built-in table",
                    path.to_string_lossy()
                );
                Self::classic()
            }
        }
    }
}
