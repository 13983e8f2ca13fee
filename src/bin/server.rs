use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use rand::distr::Alphanumeric;
use rand::Rng;
use scarecrow_bot_server::chat::ChatResponder;
use scarecrow_bot_server::commands::{self, Command, CommandActor, PERM_ADMIN, PERM_MANAGE, PERM_SAY};
use scarecrow_bot_server::config::load_config;
use scarecrow_bot_server::constants::{POSITION_LOCK_MS, TICK_MS};
use scarecrow_bot_server::scarecrow::{DamageVerdict, ScarecrowManager};
use scarecrow_bot_server::sim_world::SimWorld;
use scarecrow_bot_server::snapshot_store::SnapshotStore;
use scarecrow_bot_server::types::{ActorId, Anchor};
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

type SharedState = Arc<Mutex<ServerState>>;

struct ClientContext {
    tx: mpsc::Sender<String>,
    actor_id: ActorId,
    name: Option<String>,
    permissions: HashSet<String>,
    position: Anchor,
}

/// Bot speech queued from off-main chat tasks, broadcast by the tick loop.
struct BotSay {
    message: String,
}

struct ServerState {
    clients: HashMap<String, ClientContext>,
    world: SimWorld,
    manager: ScarecrowManager,
    chat: Arc<ChatResponder>,
    bot_tx: mpsc::UnboundedSender<BotSay>,
    position_lock: Option<JoinHandle<()>>,
}

#[derive(Debug)]
enum ParsedClientMessage {
    Hello { name: String, op: bool },
    Chat { message: String },
    Attack { amount: f64 },
    Pos { x: f64, y: f64, z: f64 },
    Ping { t: f64 },
}

#[tokio::main]
async fn main() {
    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let config_path = std::env::var("CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.json"));
    let snapshot_path = std::env::var("SNAPSHOT_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".data/scarecrow.json"));

    let config = load_config(&config_path);
    let chat = Arc::new(ChatResponder::new(config.bot.clone(), rand::rng().random()));

    let mut world = SimWorld::new();
    let mut manager =
        ScarecrowManager::new(config.clone(), SnapshotStore::new(snapshot_path));
    manager.load_snapshot(&mut world);

    let (bot_tx, bot_rx) = mpsc::unbounded_channel::<BotSay>();
    let state = Arc::new(Mutex::new(ServerState {
        clients: HashMap::new(),
        world,
        manager,
        chat,
        bot_tx,
        position_lock: None,
    }));

    start_tick_loop(state.clone(), bot_rx);
    if config.scarecrow.lock_to_ground {
        let handle = start_position_lock(state.clone());
        state.lock().await.position_lock = Some(handle);
    }

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_handler))
        .with_state(state.clone());

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind server socket");

    println!("[server] listening on :{port}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .expect("server runtime failed");
}

async fn shutdown_signal(state: SharedState) {
    let _ = tokio::signal::ctrl_c().await;
    let mut guard = state.lock().await;
    let st = &mut *guard;
    st.manager.save_snapshot(&st.world);
    stop_position_lock(st);
    println!("[server] shutting down");
}

fn start_tick_loop(state: SharedState, mut bot_rx: mpsc::UnboundedReceiver<BotSay>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
        loop {
            interval.tick().await;
            let mut pending = Vec::new();
            while let Ok(action) = bot_rx.try_recv() {
                pending.push(action);
            }
            if pending.is_empty() {
                continue;
            }
            let mut guard = state.lock().await;
            let st = &mut *guard;
            for say in pending {
                let bot_name = st.manager.bot_name(&st.world);
                let line = st.chat.format_broadcast(&bot_name, &say.message);
                broadcast(
                    st,
                    &json!({
                        "type": "chat",
                        "from": "bot",
                        "message": line,
                    }),
                );
            }
        }
    })
}

/// The position enforcement loop. Started once at boot when lockToGround is
/// set; `stop_position_lock` takes the handle so a second stop is a no-op.
fn start_position_lock(state: SharedState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(POSITION_LOCK_MS));
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            let st = &mut *guard;
            st.manager.enforce_anchor(&mut st.world);
        }
    })
}

fn stop_position_lock(state: &mut ServerState) {
    if let Some(handle) = state.position_lock.take() {
        handle.abort();
        println!("[server] position lock stopped");
    }
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let client_id = make_id("client");
    let (tx, mut rx) = mpsc::channel::<String>(256);

    {
        let mut guard = state.lock().await;
        guard.clients.insert(
            client_id.clone(),
            ClientContext {
                tx: tx.clone(),
                actor_id: ActorId(make_id("player")),
                name: None,
                permissions: HashSet::new(),
                position: Anchor::new("world", 0.0, 64.0, 0.0),
            },
        );
    }

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if ws_sender.send(Message::Text(payload.into())).await.is_err() {
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
            Message::Close(_) => break,
            _ => {}
        }
    }

    handle_disconnect(state, &client_id).await;
    drop(tx);
    let _ = writer.await;
}

async fn handle_disconnect(state: SharedState, client_id: &str) {
    let mut guard = state.lock().await;
    let Some(context) = guard.clients.remove(client_id) else {
        return;
    };
    if let Some(name) = context.name {
        broadcast(
            &mut guard,
            &json!({
                "type": "system",
                "message": format!("{name} left"),
            }),
        );
    }
}

async fn handle_client_message(state: SharedState, client_id: &str, raw: String) {
    let Some(message) = parse_client_message(&raw) else {
        send_error_to_client(&state, client_id, "invalid message").await;
        return;
    };

    match message {
        ParsedClientMessage::Hello { name, op } => {
            handle_hello(state, client_id, name, op).await;
        }
        ParsedClientMessage::Ping { t } => {
            let mut guard = state.lock().await;
            send_to_client(&mut guard, client_id, &json!({ "type": "pong", "t": t }));
        }
        ParsedClientMessage::Pos { x, y, z } => {
            let mut guard = state.lock().await;
            if let Some(client) = guard.clients.get_mut(client_id) {
                client.position.x = x;
                client.position.y = y;
                client.position.z = z;
            }
        }
        ParsedClientMessage::Chat { message } => {
            handle_chat(state, client_id, message).await;
        }
        ParsedClientMessage::Attack { amount } => {
            handle_attack(state, client_id, amount).await;
        }
    }
}

async fn handle_hello(state: SharedState, client_id: &str, name: String, op: bool) {
    let session_token = make_session_token();
    let mut guard = state.lock().await;

    let joined_name = {
        let Some(client) = guard.clients.get_mut(client_id) else {
            return;
        };
        let name = sanitize_name(&name);
        client.name = Some(name.clone());
        client.permissions.insert(PERM_SAY.to_string());
        if op {
            client.permissions.insert(PERM_MANAGE.to_string());
            client.permissions.insert(PERM_ADMIN.to_string());
        }
        name
    };

    let status = {
        let st = &mut *guard;
        st.manager.status(&st.world)
    };
    send_to_client(
        &mut guard,
        client_id,
        &json!({
            "type": "welcome",
            "name": joined_name,
            "sessionToken": session_token,
            "scarecrow": status,
        }),
    );
    broadcast(
        &mut guard,
        &json!({
            "type": "system",
            "message": format!("{joined_name} joined"),
        }),
    );
}

async fn handle_chat(state: SharedState, client_id: &str, message: String) {
    let trimmed = message.trim().to_string();
    if trimmed.is_empty() {
        return;
    }
    if let Some(rest) = trimmed.strip_prefix("/scarecrow") {
        let args: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
        handle_command(state, client_id, args).await;
        return;
    }
    if trimmed.starts_with('/') {
        send_error_to_client(&state, client_id, "unknown command").await;
        return;
    }

    // Broadcast the player line, then run the reply decision outside the
    // state lock; only the resulting broadcast is marshaled back to the
    // tick loop.
    let (actor_id, sender_name, chat, bot_tx) = {
        let mut guard = state.lock().await;
        let Some(client) = guard.clients.get(client_id) else {
            return;
        };
        let Some(name) = client.name.clone() else {
            send_to_client(
                &mut guard,
                client_id,
                &json!({ "type": "error", "message": "send hello first" }),
            );
            return;
        };
        let actor_id = client.actor_id.clone();
        let chat = guard.chat.clone();
        let bot_tx = guard.bot_tx.clone();
        broadcast(
            &mut guard,
            &json!({
                "type": "chat",
                "from": name,
                "message": trimmed,
            }),
        );
        (actor_id, name, chat, bot_tx)
    };

    if let Some(reply) = chat.on_chat(&actor_id, &trimmed, now_ms()) {
        println!("[chat] replying to {sender_name}");
        let _ = bot_tx.send(BotSay { message: reply });
    }
}

async fn handle_attack(state: SharedState, client_id: &str, amount: f64) {
    if amount <= 0.0 {
        send_error_to_client(&state, client_id, "attack amount must be positive").await;
        return;
    }
    let mut guard = state.lock().await;
    let payload = {
        let st = &mut *guard;
        match st.manager.entity_id().cloned() {
            None => json!({ "type": "error", "message": "no scarecrow to attack" }),
            Some(entity) => {
                let verdict = st.manager.on_entity_damage(&mut st.world, &entity, amount);
                match verdict {
                    DamageVerdict::NotMine => {
                        json!({ "type": "attack_result", "result": "ignored" })
                    }
                    DamageVerdict::Cancelled => json!({
                        "type": "attack_result",
                        "result": "cancelled",
                        "hp": st.manager.current_hp(&st.world),
                    }),
                    DamageVerdict::Absorbed { remaining_hp } => json!({
                        "type": "attack_result",
                        "result": "absorbed",
                        "hp": remaining_hp,
                    }),
                }
            }
        }
    };
    send_to_client(&mut guard, client_id, &payload);
}

async fn handle_command(state: SharedState, client_id: &str, args: Vec<String>) {
    let mut guard = state.lock().await;
    let actor = {
        let Some(client) = guard.clients.get(client_id) else {
            return;
        };
        let Some(name) = client.name.clone() else {
            send_to_client(
                &mut guard,
                client_id,
                &json!({ "type": "error", "message": "send hello first" }),
            );
            return;
        };
        CommandActor {
            name,
            permissions: client.permissions.clone(),
            anchor: Some(client.position.clone()),
        }
    };

    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(message) => {
            send_to_client(
                &mut guard,
                client_id,
                &json!({ "type": "command_result", "messages": [message] }),
            );
            return;
        }
    };

    let outcome = {
        let st = &mut *guard;
        commands::execute(&command, &actor, &mut st.world, &mut st.manager, &st.chat)
    };

    if let Some(anchor) = outcome.teleport_actor {
        if let Some(client) = guard.clients.get_mut(client_id) {
            client.position = anchor;
        }
    }
    if !outcome.messages.is_empty() {
        send_to_client(
            &mut guard,
            client_id,
            &json!({ "type": "command_result", "messages": outcome.messages }),
        );
    }
    if let Some(line) = outcome.broadcast {
        broadcast(
            &mut guard,
            &json!({
                "type": "chat",
                "from": "bot",
                "message": line,
            }),
        );
    }
}

fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let message_type = value.get("type")?.as_str()?;
    match message_type {
        "hello" => Some(ParsedClientMessage::Hello {
            name: value.get("name")?.as_str()?.to_string(),
            op: value.get("op").and_then(Value::as_bool).unwrap_or(false),
        }),
        "chat" => Some(ParsedClientMessage::Chat {
            message: value.get("message")?.as_str()?.to_string(),
        }),
        "attack" => Some(ParsedClientMessage::Attack {
            amount: value.get("amount").and_then(Value::as_f64).unwrap_or(1.0),
        }),
        "pos" => Some(ParsedClientMessage::Pos {
            x: value.get("x").and_then(Value::as_f64)?,
            y: value.get("y").and_then(Value::as_f64)?,
            z: value.get("z").and_then(Value::as_f64)?,
        }),
        "ping" => Some(ParsedClientMessage::Ping {
            t: value.get("t").and_then(Value::as_f64).unwrap_or(0.0),
        }),
        _ => None,
    }
}

fn send_to_client(state: &mut ServerState, client_id: &str, message: &Value) {
    if let Some(client) = state.clients.get(client_id) {
        // Slow consumers just drop messages; nothing here is load-bearing.
        let _ = client.tx.try_send(message.to_string());
    }
}

fn broadcast(state: &mut ServerState, message: &Value) {
    let payload = message.to_string();
    for client in state.clients.values() {
        if client.name.is_some() {
            let _ = client.tx.try_send(payload.clone());
        }
    }
}

async fn send_error_to_client(state: &SharedState, client_id: &str, message: &str) {
    let mut guard = state.lock().await;
    send_to_client(
        &mut guard,
        client_id,
        &json!({ "type": "error", "message": message }),
    );
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

fn make_session_token() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
