use clap::Parser;
use maze_chase_rust_server::constants::TICK_MS;
use maze_chase_rust_server::engine::{GameEngine, GameEngineOptions};
use maze_chase_rust_server::levels::LevelTable;
use maze_chase_rust_server::types::{GameOverReason, PointsKind, RuntimeEvent, Snapshot};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    level: Option<u32>,
    #[arg(long)]
    minutes: Option<u32>,
    #[arg(long)]
    scenario_count: Option<usize>,
    #[arg(long)]
    run_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
    #[arg(long)]
    level_table: Option<PathBuf>,
    #[arg(long)]
    clear_threshold: Option<u32>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    level: u32,
    minutes: u32,
    seed: u32,
    #[serde(rename = "clearThreshold")]
    clear_threshold: u32,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    #[serde(rename = "startLevel")]
    start_level: u32,
    outcome: String,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    #[serde(rename = "finalLevel")]
    final_level: u32,
    score: u32,
    lives: u32,
    #[serde(rename = "dotsEaten")]
    dots_eaten: u32,
    #[serde(rename = "pelletsEaten")]
    pellets_eaten: u32,
    #[serde(rename = "pursuersEaten")]
    pursuers_eaten: u32,
    #[serde(rename = "fruitsEaten")]
    fruits_eaten: u32,
    deaths: u32,
    #[serde(rename = "levelsStarted")]
    levels_started: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioRunResult {
    #[serde(flatten)]
    result: ScenarioResultLine,
    #[serde(rename = "anomalyRecords")]
    anomaly_records: Vec<AnomalyRecord>,
    finished_tick: u64,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageDurationMs")]
    average_duration_ms: u64,
    #[serde(rename = "bestScore")]
    best_score: u32,
    #[serde(rename = "outcomeCounts")]
    outcome_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    #[serde(rename = "timestampMs")]
    timestamp_ms: u64,
    level: String,
    event: String,
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tick: Option<u64>,
    details: Value,
}

#[derive(Clone, Copy, Debug, Default)]
struct EventTally {
    dots: u32,
    pellets: u32,
    pursuers: u32,
    fruits: u32,
    deaths: u32,
    levels: u32,
}

impl EventTally {
    fn observe(&mut self, event: &RuntimeEvent) {
        match event {
            RuntimeEvent::AwardPoints { kind, .. } => match kind {
                PointsKind::Dot => self.dots += 1,
                PointsKind::PowerPellet => self.pellets += 1,
                PointsKind::Fruit => self.fruits += 1,
                PointsKind::Pursuer => {}
            },
            RuntimeEvent::PursuerEaten { .. } => self.pursuers += 1,
            RuntimeEvent::PlayerDied { .. } => self.deaths += 1,
            RuntimeEvent::LevelStarted { .. } => self.levels += 1,
            _ => {}
        }
    }
}

#[derive(Clone, Debug, Default)]
struct Watermarks {
    score: u32,
    remaining_dots: Option<u32>,
}

fn main() {
    let cli = Cli::parse();
    let scenarios = resolve_scenarios(&cli);
    let level_table = match cli.level_table.as_ref() {
        Some(path) => LevelTable::load(path),
        None => LevelTable::classic(),
    };
    let run_started_at_ms = now_ms();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let run_id = cli
        .run_id
        .clone()
        .unwrap_or_else(|| default_run_id(seed_hint, run_started_at_ms));
    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut outcome_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_duration_ms = 0u64;
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        emit_log(
            "info",
            "scenario_started",
            &run_id,
            Some(&scenario.name),
            Some(scenario.seed),
            None,
            json!({
                "level": scenario.level,
                "minutes": scenario.minutes,
                "clearThreshold": scenario.clear_threshold,
            }),
        );
        let scenario_run = run_scenario(&scenario, &level_table);

        for anomaly in &scenario_run.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                &run_id,
                Some(&scenario.name),
                Some(scenario.seed),
                Some(anomaly.tick),
                json!({
                    "message": anomaly.message,
                }),
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        total_duration_ms += scenario_run.result.duration_ms;
        *outcome_counts
            .entry(scenario_run.result.outcome.clone())
            .or_insert(0) += 1;

        emit_log(
            "info",
            "scenario_finished",
            &run_id,
            Some(&scenario.name),
            Some(scenario.seed),
            Some(scenario_run.finished_tick),
            json!({
                "outcome": scenario_run.result.outcome,
                "durationMs": scenario_run.result.duration_ms,
                "score": scenario_run.result.score,
                "finalLevel": scenario_run.result.final_level,
                "anomalyCount": scenario_run.anomaly_records.len(),
            }),
        );

        match serde_json::to_string(&scenario_run.result) {
            Ok(line) => println!("{line}"),
            Err(error) => emit_log(
                "error",
                "result_serialize_failed",
                &run_id,
                Some(&scenario.name),
                Some(scenario.seed),
                None,
                json!({ "error": error.to_string() }),
            ),
        }
        scenario_results.push(scenario_run.result);
    }

    let run_finished_at_ms = now_ms();
    let summary = build_run_summary(
        run_id.clone(),
        run_started_at_ms,
        run_finished_at_ms,
        scenario_results,
        outcome_counts,
        total_anomalies,
        total_duration_ms,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &run_id,
                None,
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "info",
        "run_finished",
        &run_id,
        None,
        None,
        None,
        json!({
            "scenarioCount": summary.scenario_count,
            "anomalyCount": summary.anomaly_count,
            "averageDurationMs": summary.average_duration_ms,
            "bestScore": summary.best_score,
            "outcomeCounts": summary.outcome_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn run_scenario(scenario: &Scenario, level_table: &LevelTable) -> ScenarioRunResult {
    let mut engine = GameEngine::new(GameEngineOptions {
        start_level: scenario.level,
        level_clear_remaining_dots: scenario.clear_threshold,
        level_table: level_table.clone(),
        seed: scenario.seed,
        autopilot_players: vec![0, 1, 2, 3],
        ..GameEngineOptions::default()
    });
    let time_limit_ms = u64::from(scenario.minutes) * 60_000;

    let mut tally = EventTally::default();
    let mut anomalies = AnomalyLog::default();
    let mut watermarks = Watermarks::default();
    let mut last_tick = 0u64;

    while !engine.is_ended() && engine.elapsed_ms() < time_limit_ms {
        engine.step(TICK_MS);
        let snapshot = engine.build_snapshot(true);
        last_tick = snapshot.tick;
        for message in collect_snapshot_anomalies(&snapshot, &engine, &mut watermarks) {
            anomalies.push(snapshot.tick, message);
        }
        for event in &snapshot.events {
            tally.observe(event);
        }
    }

    let summary = engine.build_summary();
    let outcome = if engine.is_ended() {
        game_over_reason_key(summary.reason)
    } else {
        "time_limit".to_string()
    };

    ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            start_level: scenario.level,
            outcome,
            duration_ms: summary.duration_ms,
            final_level: summary.level,
            score: summary.score,
            lives: summary.lives,
            dots_eaten: tally.dots,
            pellets_eaten: tally.pellets,
            pursuers_eaten: tally.pursuers,
            fruits_eaten: tally.fruits,
            deaths: tally.deaths,
            levels_started: tally.levels,
            anomalies: anomalies.messages,
        },
        anomaly_records: anomalies.records,
        finished_tick: last_tick,
    }
}

fn collect_snapshot_anomalies(
    snapshot: &Snapshot,
    engine: &GameEngine,
    watermarks: &mut Watermarks,
) -> Vec<String> {
    let mut anomalies = Vec::new();
    let level_started = snapshot
        .events
        .iter()
        .any(|event| matches!(event, RuntimeEvent::LevelStarted { .. }));

    if snapshot.pickups.len() as u32 != snapshot.remaining_dots {
        anomalies.push(format!(
            "remaining dot count {} disagrees with {} visible pickups",
            snapshot.remaining_dots,
            snapshot.pickups.len()
        ));
    }
    if let Some(previous) = watermarks.remaining_dots {
        if snapshot.remaining_dots > previous && !level_started {
            anomalies.push(format!(
                "remaining dots grew from {previous} to {} without a new level",
                snapshot.remaining_dots
            ));
        }
    }
    watermarks.remaining_dots = Some(snapshot.remaining_dots);

    if snapshot.score < watermarks.score {
        anomalies.push(format!(
            "score went backwards: {} -> {}",
            watermarks.score, snapshot.score
        ));
    }
    watermarks.score = snapshot.score;
    if snapshot.high_score < snapshot.score {
        anomalies.push(format!(
            "high score {} below score {}",
            snapshot.high_score, snapshot.score
        ));
    }

    let world = &engine.world;
    let max_x = (world.width + 1) as f32 * world.tile_size;
    let max_y = world.height as f32 * world.tile_size;
    let min_x = -world.tile_size;
    for player in &snapshot.players {
        if !player.x.is_finite() || player.x < min_x || player.x > max_x || player.y < 0.0 || player.y > max_y {
            anomalies.push(format!(
                "player {} left the maze at ({:.1}, {:.1})",
                player.index, player.x, player.y
            ));
        }
    }
    for pursuer in &snapshot.pursuers {
        if !pursuer.x.is_finite() || pursuer.x < min_x || pursuer.x > max_x || pursuer.y < 0.0 || pursuer.y > max_y {
            anomalies.push(format!(
                "{:?} left the maze at ({:.1}, {:.1})",
                pursuer.kind, pursuer.x, pursuer.y
            ));
        }
    }
    if snapshot.players.iter().filter(|player| player.enabled).count() != engine.active_players() {
        anomalies.push(format!(
            "enabled players do not match level config ({})",
            engine.active_players()
        ));
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = normalize_seed(cli.seed.unwrap_or_else(|| {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }));
    let clear_threshold = cli.clear_threshold.unwrap_or(0);
    let minutes = cli.minutes.unwrap_or(3).clamp(1, 30);

    if cli.level.is_some() || cli.scenario_count.is_some() {
        let level = cli.level.unwrap_or(1).max(1);
        let count = cli.scenario_count.unwrap_or(1).clamp(1, 100);
        return (0..count)
            .map(|idx| Scenario {
                name: format!("custom-level{level}-{}", idx + 1),
                level,
                minutes,
                seed: normalize_seed(u64::from(seed) + idx as u64),
                clear_threshold,
            })
            .collect();
    }

    [(1, "quartet-level1"), (5, "duo-level5"), (9, "solo-level9")]
        .into_iter()
        .enumerate()
        .map(|(idx, (level, name))| Scenario {
            name: name.to_string(),
            level,
            minutes,
            seed: normalize_seed(u64::from(seed) + idx as u64),
            clear_threshold,
        })
        .collect()
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

#[derive(Debug, Default)]
struct AnomalyLog {
    messages: Vec<String>,
    records: Vec<AnomalyRecord>,
    seen: HashSet<String>,
}

impl AnomalyLog {
    fn push(&mut self, tick: u64, message: String) {
        if self.seen.insert(message.clone()) {
            self.messages.push(message.clone());
        }
        self.records.push(AnomalyRecord { tick, message });
    }
}

fn default_run_id(seed: u32, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    run_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    scenarios: Vec<ScenarioResultLine>,
    outcome_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
    total_duration_ms: u64,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let average_duration_ms = if scenario_count == 0 {
        0
    } else {
        total_duration_ms / scenario_count as u64
    };
    let best_score = scenarios
        .iter()
        .map(|scenario| scenario.score)
        .max()
        .unwrap_or(0);
    RunSummary {
        run_id,
        started_at_ms,
        finished_at_ms,
        scenario_count,
        anomaly_count,
        average_duration_ms,
        best_score,
        outcome_counts,
        scenarios,
    }
}

fn emit_log(
    level: &str,
    event: &str,
    run_id: &str,
    scenario: Option<&str>,
    seed: Option<u32>,
    tick: Option<u64>,
    details: Value,
) {
    let log_line = StructuredLogLine {
        timestamp_ms: now_ms(),
        level: level.to_string(),
        event: event.to_string(),
        run_id: run_id.to_string(),
        scenario: scenario.map(|value| value.to_string()),
        seed,
        tick,
        details,
    };
    match serde_json::to_string(&log_line) {
        Ok(line) => eprintln!("{line}"),
        Err(error) => eprintln!("[simulate] failed to serialize log line: {error}"),
    }
}

fn game_over_reason_key(reason: GameOverReason) -> String {
    match reason {
        GameOverReason::GameOver => "game_over",
        GameOverReason::Finale => "finale",
    }
    .to_string()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, summary_text)
}
