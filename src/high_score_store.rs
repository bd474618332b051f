use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::types::HighScoreResponse;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct HighScoreFile {
    version: u8,
    #[serde(rename = "highScore", alias = "high_score")]
    high_score: u32,
    #[serde(rename = "updatedAt", alias = "updated_at", default)]
    updated_at: Option<String>,
}

pub struct HighScoreStore {
    file_path: PathBuf,
    high_score: u32,
    updated_at: Option<String>,
}

impl HighScoreStore {
    pub fn new(file_path: PathBuf) -> Self {
        let (high_score, updated_at) = match load_file(&file_path) {
            Some(file) => (file.high_score, file.updated_at),
            None => (0, None),
        };
        Self {
            file_path,
            high_score,
            updated_at,
        }
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn record(&mut self, score: u32) -> bool {
        if score <= self.high_score {
            return false;
        }
        self.high_score = score;
        self.updated_at = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
        self.save();
        true
    }

    pub fn build_response(&self) -> HighScoreResponse {
        HighScoreResponse {
            high_score: self.high_score,
            updated_at_iso: self.updated_at.clone(),
            generated_at_iso: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    fn save(&self) {
        if let Some(parent) = self.file_path.parent() {
            if let Err(error) = fs::create_dir_all(parent) {
                eprintln!(
                    "[high-score-store] failed to create parent dir {}: {error}",
                    parent.display()
                );
                return;
            }
        }

        let payload = HighScoreFile {
            version: 1,
            high_score: self.high_score,
            updated_at: self.updated_at.clone(),
        };
        match serde_json::to_string_pretty(&payload) {
            Ok(text) => {
                if let Err(error) = fs::write(&self.file_path, text) {
                    eprintln!(
                        "[high-score-store] failed to write {}: {error}",
                        self.file_path.display()
                    );
                }
            }
            Err(error) => {
                eprintln!(
                    "[high-score-store] failed to serialize payload for {}: {error}",
                    self.file_path.display()
                );
            }
        }
    }
}

fn load_file(path: &Path) -> Option<HighScoreFile> {
    let text = match fs::read_to_string(path) {
        Ok(value) => value,
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                eprintln!("[high-score-store] failed to read {}: {error}", path.display());
            }
            return None;
        }
    };
    match serde_json::from_str::<HighScoreFile>(&text) {
        Ok(file) if file.version == 1 => Some(file),
        Ok(file) => {
            eprintln!(
                "[high-score-store] unsupported version {} at {}",
                file.version,
                path.display()
            );
            None
        }
        Err(error) => {
            eprintln!(
                "[high-score-store] failed to parse {}: {error}",
                path.display()
            );
            None
        }
    }
}
