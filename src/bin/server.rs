use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use maze_chase_rust_server::constants::{MAX_STEPS_PER_FRAME, TICK_MS};
use maze_chase_rust_server::engine::{GameEngine, GameEngineOptions};
use maze_chase_rust_server::game_loop::FixedStepLoop;
use maze_chase_rust_server::high_score_store::HighScoreStore;
use maze_chase_rust_server::levels::LevelTable;
use maze_chase_rust_server::server_protocol::{parse_client_message, ParsedClientMessage};
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tokio::time::MissedTickBehavior;
use tower_http::services::{ServeDir, ServeFile};

const SEAT_COUNT: usize = 4;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

type SharedState = Arc<Mutex<ServerState>>;

#[derive(Clone)]
struct ClientContext {
    tx: mpsc::Sender<OutboundMessage>,
    name: Option<String>,
    seat: Option<usize>,
}

#[derive(Clone, Debug)]
enum OutboundMessage {
    Text(String),
    Close { code: u16, reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    DisconnectOnFull,
}

struct ServerState {
    clients: HashMap<String, ClientContext>,
    seats: [Option<String>; SEAT_COUNT],
    game: GameEngine,
    frame_loop: FixedStepLoop,
    clock: Instant,
    level_table: LevelTable,
    high_score_store: HighScoreStore,
    round_reported: bool,
}

impl ServerState {
    fn new(high_score_store: HighScoreStore, level_table: LevelTable, start_level: u32) -> Self {
        let game = GameEngine::new(GameEngineOptions {
            start_level,
            level_table: level_table.clone(),
            high_score: high_score_store.high_score(),
            seed: rand::random::<u32>(),
            autopilot_players: (0..SEAT_COUNT).collect(),
            ..GameEngineOptions::default()
        });
        Self {
            clients: HashMap::new(),
            seats: Default::default(),
            game,
            frame_loop: FixedStepLoop::new(TICK_MS, MAX_STEPS_PER_FRAME),
            clock: Instant::now(),
            level_table,
            high_score_store,
            round_reported: false,
        }
    }

    fn now_ms(&self) -> u64 {
        self.clock.elapsed().as_millis() as u64
    }
}

#[tokio::main]
async fn main() {
    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let high_score_path = std::env::var("HIGH_SCORE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".data/high-score.json"));

    let start_level = std::env::var("START_LEVEL")
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|level| *level > 0)
        .unwrap_or(1);

    let level_table = match std::env::var("LEVEL_TABLE_PATH") {
        Ok(raw) => LevelTable::load(&PathBuf::from(raw)),
        Err(_) => LevelTable::classic(),
    };

    let state = Arc::new(Mutex::new(ServerState::new(
        HighScoreStore::new(high_score_path),
        level_table,
        start_level,
    )));
    start_tick_loop(state.clone());

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/high-score", get(high_score_handler))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir() {
        let index_file = static_dir.join("index.html");
        println!(
            "[server] static file root: {}",
            static_dir.to_string_lossy()
        );
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        eprintln!("[server] static file root not found. set STATIC_DIR to serve a client.");
        app
    };

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind server socket");

    println!("[server] listening on :{port} (start level {start_level})");
    axum::serve(listener, app)
        .await
        .expect("server runtime failed");
}

fn resolve_static_dir() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var("STATIC_DIR") {
        let path = PathBuf::from(raw);
        if path.join("index.html").is_file() {
            return Some(path);
        }
    }

    let candidates = [PathBuf::from("dist/client"), PathBuf::from("public")];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn high_score_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(guard.high_score_store.build_response())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let client_id = make_id("client");
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(256);

    {
        let mut guard = state.lock().await;
        guard.clients.insert(
            client_id.clone(),
            ClientContext {
                tx: tx.clone(),
                name: None,
                seat: None,
            },
        );
    }

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let should_close = matches!(outbound, OutboundMessage::Close { .. });
            let result = match outbound {
                OutboundMessage::Text(payload) => {
                    ws_sender.send(Message::Text(payload.into())).await
                }
                OutboundMessage::Close { code, reason } => {
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    ws_sender.send(Message::Close(Some(frame))).await
                }
            };
            if result.is_err() || should_close {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        match message {
            Message::Text(raw) => {
                handle_client_message(state.clone(), &client_id, raw.to_string()).await;
            }
            Message::Binary(raw) => {
                if let Ok(text) = String::from_utf8(raw.to_vec()) {
                    handle_client_message(state.clone(), &client_id, text).await;
                } else {
                    send_error_to_client(&state, &client_id, "invalid utf8 message").await;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    handle_disconnect(state, &client_id).await;
    drop(tx);
    let _ = writer.await;
}

async fn handle_client_message(state: SharedState, client_id: &str, raw: String) {
    let Some(message) = parse_client_message(&raw) else {
        send_error_to_client(&state, client_id, "invalid message").await;
        return;
    };

    let mut guard = state.lock().await;
    if !matches!(
        message,
        ParsedClientMessage::Hello { .. } | ParsedClientMessage::Ping { .. }
    ) && !is_greeted(&guard, client_id)
    {
        send_error(&mut guard, client_id, "send hello first");
        return;
    }

    match message {
        ParsedClientMessage::Hello { name } => handle_hello(&mut guard, client_id, name),
        ParsedClientMessage::Ping { t } => {
            send_to_client(
                &mut guard,
                client_id,
                &json!({
                    "type": "pong",
                    "t": t,
                }),
                QueuePolicy::DisconnectOnFull,
            );
        }
        ParsedClientMessage::Input { dir, seat, player } => {
            let own_seat = guard.clients.get(client_id).and_then(|ctx| ctx.seat);
            if let Some(player) = player {
                guard.game.request_direction(player, dir);
            } else if let Some(seat) = seat.or(own_seat) {
                guard.game.seat_input(seat, dir);
            } else {
                send_error(&mut guard, client_id, "spectators cannot steer");
            }
        }
        ParsedClientMessage::Pause => {
            if guard.game.toggle_pause() {
                let paused = guard.game.is_paused();
                let now_ms = guard.now_ms();
                guard.frame_loop.set_paused(paused);
                guard.frame_loop.advance(now_ms);
                println!("[server] round {}", if paused { "paused" } else { "resumed" });
            } else {
                send_error(&mut guard, client_id, "pause is not allowed right now");
            }
        }
        ParsedClientMessage::Start { level } => {
            if let Some(level) = level {
                if guard.level_table.get(level).is_none() {
                    send_error(&mut guard, client_id, "unknown level");
                    return;
                }
            }
            restart_round(&mut guard, level);
        }
    }
}

fn handle_hello(state: &mut ServerState, client_id: &str, requested_name: String) {
    let name = sanitize_name(&requested_name);
    let already_seated = state.clients.get(client_id).and_then(|ctx| ctx.seat);
    let seat = already_seated.or_else(|| state.seats.iter().position(|seat| seat.is_none()));

    if let Some(seat) = seat {
        state.seats[seat] = Some(client_id.to_string());
        sync_autopilot(state);
    }
    if let Some(ctx) = state.clients.get_mut(client_id) {
        ctx.name = Some(name.clone());
        ctx.seat = seat;
    }
    println!(
        "[server] {name} joined {}",
        seat.map(|seat| format!("seat {seat}"))
            .unwrap_or_else(|| "as spectator".to_string())
    );

    send_to_client(
        state,
        client_id,
        &json!({
            "type": "welcome",
            "clientId": client_id,
            "name": name,
            "seat": seat,
        }),
        QueuePolicy::DisconnectOnFull,
    );
    send_initial_state(state, client_id);
}

fn send_initial_state(state: &mut ServerState, client_id: &str) {
    let world = state.game.get_world_init();
    let config = state.game.config;
    let snapshot = state.game.build_snapshot(false);

    send_to_client(
        state,
        client_id,
        &json!({
            "type": "game_init",
            "world": world,
            "config": config,
            "level": snapshot.level,
        }),
        QueuePolicy::DisconnectOnFull,
    );
    send_to_client(
        state,
        client_id,
        &json!({
            "type": "state",
            "snapshot": snapshot,
        }),
        QueuePolicy::DisconnectOnFull,
    );
}

fn restart_round(state: &mut ServerState, level: Option<u32>) {
    state.game.restart(level);
    sync_autopilot(state);
    state.frame_loop = FixedStepLoop::new(TICK_MS, MAX_STEPS_PER_FRAME);
    state.round_reported = false;
    println!("[server] round started at level {}", state.game.level());

    let world = state.game.get_world_init();
    let config = state.game.config;
    broadcast(
        state,
        &json!({
            "type": "game_init",
            "world": world,
            "config": config,
            "level": state.game.level(),
        }),
        QueuePolicy::DisconnectOnFull,
    );
}

async fn handle_disconnect(state: SharedState, client_id: &str) {
    let mut guard = state.lock().await;
    disconnect_client_internal(&mut guard, client_id);
}

fn disconnect_client_internal(state: &mut ServerState, client_id: &str) {
    let Some(context) = state.clients.remove(client_id) else {
        return;
    };
    let Some(seat) = context.seat else {
        return;
    };
    if state.seats[seat].as_deref() == Some(client_id) {
        state.seats[seat] = None;
        sync_autopilot(state);
        println!("[server] seat {seat} released");
    }
}

fn sync_autopilot(state: &mut ServerState) {
    for player in 0..SEAT_COUNT {
        let steered = state.seats.iter().enumerate().any(|(seat, occupant)| {
            occupant.is_some() && state.game.seat_player(seat) == Some(player)
        });
        state.game.set_autopilot(player, !steered);
    }
}

fn start_tick_loop(state: SharedState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            tick_game(&mut guard);
        }
    });
}

fn tick_game(state: &mut ServerState) {
    if state.game.is_ended() && state.round_reported {
        return;
    }
    sync_autopilot(state);
    let now_ms = state.now_ms();
    let ServerState {
        frame_loop, game, ..
    } = state;
    frame_loop.run(now_ms, |dt_ms| game.step(dt_ms));

    if state.game.high_score() > state.high_score_store.high_score() {
        let score = state.game.high_score();
        state.high_score_store.record(score);
    }

    let snapshot = state.game.build_snapshot(true);
    broadcast(
        state,
        &json!({
            "type": "state",
            "snapshot": snapshot,
        }),
        QueuePolicy::DropOnFull,
    );

    if state.game.is_ended() && !state.round_reported {
        state.round_reported = true;
        let summary = state.game.build_summary();
        println!(
            "[server] round over: {:?} at level {} with {} points",
            summary.reason, summary.level, summary.score
        );
        broadcast(
            state,
            &json!({
                "type": "game_over",
                "summary": summary,
            }),
            QueuePolicy::DisconnectOnFull,
        );
    }
}

fn send_to_client(state: &mut ServerState, client_id: &str, message: &Value, policy: QueuePolicy) {
    let send_failed = if let Some(client) = state.clients.get(client_id) {
        client
            .tx
            .try_send(OutboundMessage::Text(message.to_string()))
            .is_err()
    } else {
        false
    };
    if send_failed && policy == QueuePolicy::DisconnectOnFull {
        close_client(state, client_id, "outbound queue full");
    }
}

fn broadcast(state: &mut ServerState, message: &Value, policy: QueuePolicy) {
    let payload = message.to_string();
    let mut failed_clients = Vec::new();
    for (client_id, client) in &state.clients {
        if client.name.is_none() {
            continue;
        }
        if client
            .tx
            .try_send(OutboundMessage::Text(payload.clone()))
            .is_err()
            && policy == QueuePolicy::DisconnectOnFull
        {
            failed_clients.push(client_id.clone());
        }
    }
    for client_id in failed_clients {
        close_client(state, &client_id, "outbound queue full");
    }
}

fn close_client(state: &mut ServerState, client_id: &str, reason: &str) {
    if let Some(client) = state.clients.get(client_id) {
        let _ = client.tx.try_send(OutboundMessage::Close {
            code: 4002,
            reason: reason.to_string(),
        });
    }
    disconnect_client_internal(state, client_id);
}

fn is_greeted(state: &ServerState, client_id: &str) -> bool {
    state
        .clients
        .get(client_id)
        .map(|ctx| ctx.name.is_some())
        .unwrap_or(false)
}

fn send_error(state: &mut ServerState, client_id: &str, message: &str) {
    send_to_client(
        state,
        client_id,
        &json!({
            "type": "error",
            "message": message,
        }),
        QueuePolicy::DisconnectOnFull,
    );
}

async fn send_error_to_client(state: &SharedState, client_id: &str, message: &str) {
    let mut guard = state.lock().await;
    send_error(&mut guard, client_id, message);
}

fn sanitize_name(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "Player".to_string();
    }
    trimmed.chars().take(16).collect()
}

fn make_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{seq}")
}
