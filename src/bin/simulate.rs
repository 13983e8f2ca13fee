use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use scarecrow_bot_server::chat::ChatResponder;
use scarecrow_bot_server::config::{load_config, BotConfig};
use scarecrow_bot_server::constants::{MIN_VISIBLE_HEALTH, POSITION_LOCK_TOLERANCE};
use scarecrow_bot_server::host::EntityHost;
use scarecrow_bot_server::rng::Rng;
use scarecrow_bot_server::scarecrow::{DamageVerdict, ScarecrowManager};
use scarecrow_bot_server::sim_world::SimWorld;
use scarecrow_bot_server::snapshot_store::SnapshotStore;
use scarecrow_bot_server::types::{ActorId, Anchor, EntityId, Vec3};
use serde::Serialize;
use serde_json::{json, Value};

/// Offline exerciser: runs a scripted attack/chat/drift scenario against the
/// in-process world and reports any invariant violation as an anomaly.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    seed: Option<u32>,
    #[arg(long)]
    rounds: Option<usize>,
    #[arg(long)]
    attackers: Option<usize>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    round: usize,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    seed: u32,
    rounds: usize,
    attackers: usize,
    #[serde(rename = "attacksDelivered")]
    attacks_delivered: usize,
    #[serde(rename = "attacksCancelled")]
    attacks_cancelled: usize,
    #[serde(rename = "chatLines")]
    chat_lines: usize,
    #[serde(rename = "botReplies")]
    bot_replies: usize,
    #[serde(rename = "positionCorrections")]
    position_corrections: usize,
    #[serde(rename = "finalHp")]
    final_hp: f64,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    anomalies: Vec<AnomalyRecord>,
}

fn main() {
    let cli = Cli::parse();
    let seed = cli.seed.unwrap_or(42);
    let rounds = cli.rounds.unwrap_or(200);
    let attackers = cli.attackers.unwrap_or(4).max(1);

    let config = match cli.config.as_ref() {
        Some(path) => load_config(path),
        None => BotConfig::default(),
    };

    emit_log(
        "info",
        "run_started",
        json!({
            "seed": seed,
            "rounds": rounds,
            "attackers": attackers,
        }),
    );

    let summary = run_scenario(config, seed, rounds, attackers);

    for anomaly in &summary.anomalies {
        emit_log(
            "warn",
            "anomaly_detected",
            json!({
                "round": anomaly.round,
                "message": anomaly.message,
            }),
        );
    }
    emit_log(
        "info",
        "run_finished",
        json!({
            "attacksDelivered": summary.attacks_delivered,
            "attacksCancelled": summary.attacks_cancelled,
            "botReplies": summary.bot_replies,
            "positionCorrections": summary.position_corrections,
            "finalHp": summary.final_hp,
            "anomalyCount": summary.anomaly_count,
        }),
    );

    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
    }

    if summary.anomaly_count > 0 {
        std::process::exit(1);
    }
}

fn run_scenario(config: BotConfig, seed: u32, rounds: usize, attackers: usize) -> RunSummary {
    let workdir = std::env::temp_dir().join(format!("scarecrow-sim-{seed}"));
    let snapshot_path = workdir.join("scarecrow.json");
    let store = SnapshotStore::new(snapshot_path.clone());
    store.delete();

    let mut world = SimWorld::new();
    let mut manager = ScarecrowManager::new(config.clone(), store);
    let chat = ChatResponder::new(config.bot.clone(), seed);
    let mut rng = Rng::new(seed.wrapping_mul(2_654_435_761));

    let mut anomalies: Vec<AnomalyRecord> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut attacks_delivered = 0usize;
    let mut attacks_cancelled = 0usize;
    let mut chat_lines = 0usize;
    let mut bot_replies = 0usize;
    let mut position_corrections = 0usize;

    let anchor = Anchor::new("world", 0.0, 64.0, 0.0);
    if let Err(error) = manager.create(&mut world, anchor, &config.bot.name) {
        push_anomaly(&mut anomalies, &mut seen, 0, format!("create failed: {error:?}"));
        return finish(seed, rounds, attackers, &world, &manager, anomalies, 0, 0, 0, 0, 0);
    }
    let entity = match manager.entity_id().cloned() {
        Some(entity) => entity,
        None => {
            push_anomaly(&mut anomalies, &mut seen, 0, "no entity after create".to_string());
            return finish(seed, rounds, attackers, &world, &manager, anomalies, 0, 0, 0, 0, 0);
        }
    };

    let min_hp = config.scarecrow.min_hp;
    let max_hp = config.scarecrow.max_hp;
    let chat_pool = [
        "hello there",
        "anyone seen the crops?",
        "nice weather today",
        "scarecrow looks angry",
        "help, zombies!",
    ];

    for round in 1..=rounds {
        let now = (round as u64) * 1_000;

        // A few attackers swing each round, sometimes far harder than the
        // pool can survive.
        for attacker in 0..attackers {
            if rng.percent() < 60 {
                continue;
            }
            let amount = if rng.percent() < 10 {
                max_hp * 2.0
            } else {
                1.0 + f64::from(rng.percent() % 20)
            };
            match manager.on_entity_damage(&mut world, &entity, amount) {
                DamageVerdict::NotMine => {
                    push_anomaly(
                        &mut anomalies,
                        &mut seen,
                        round,
                        format!("tracked entity not recognized (attacker {attacker})"),
                    );
                }
                DamageVerdict::Cancelled => attacks_cancelled += 1,
                DamageVerdict::Absorbed { .. } => attacks_delivered += 1,
            }
        }

        // Chat traffic from a rotating cast of players.
        let actor = ActorId(format!("player_{}", round % attackers.max(2)));
        let line = chat_pool[rng.pick_index(chat_pool.len())];
        chat_lines += 1;
        if chat.on_chat(&actor, line, now).is_some() {
            bot_replies += 1;
        }

        // Occasional drift, then one enforcement tick.
        if rng.percent() < 25 {
            let dx = f64::from(rng.percent()) / 20.0;
            world.displace(&entity, Vec3::new(dx, 0.0, 0.3));
        }
        if manager.enforce_anchor(&mut world) {
            position_corrections += 1;
        }

        // Light healing keeps the sequence from saturating at the floor.
        if rng.percent() < 20 {
            manager.heal(&mut world, f64::from(rng.percent() % 15));
        }

        check_invariants(
            &world, &manager, &entity, min_hp, max_hp, round, &mut anomalies, &mut seen,
        );
    }

    // Restart path: persist, drop the manager, re-acquire from the snapshot.
    manager.save_snapshot(&world);
    let hp_before = manager.current_hp(&world);
    drop(manager);
    let mut restarted =
        ScarecrowManager::new(config, SnapshotStore::new(snapshot_path));
    restarted.load_snapshot(&mut world);
    if restarted.entity_id() != Some(&entity) {
        push_anomaly(
            &mut anomalies,
            &mut seen,
            rounds,
            "restart did not re-acquire the snapshotted entity".to_string(),
        );
    } else if (restarted.current_hp(&world) - hp_before).abs() > 1e-9 {
        push_anomaly(
            &mut anomalies,
            &mut seen,
            rounds,
            format!(
                "hp changed across restart: {hp_before} -> {}",
                restarted.current_hp(&world)
            ),
        );
    }

    finish(
        seed,
        rounds,
        attackers,
        &world,
        &restarted,
        anomalies,
        attacks_delivered,
        attacks_cancelled,
        chat_lines,
        bot_replies,
        position_corrections,
    )
}

fn check_invariants(
    world: &SimWorld,
    manager: &ScarecrowManager,
    entity: &EntityId,
    min_hp: f64,
    max_hp: f64,
    round: usize,
    anomalies: &mut Vec<AnomalyRecord>,
    seen: &mut HashSet<String>,
) {
    if !world.is_alive(entity) {
        push_anomaly(anomalies, seen, round, "tracked entity died".to_string());
        return;
    }
    let hp = manager.current_hp(world);
    if !(min_hp..=max_hp).contains(&hp) {
        push_anomaly(anomalies, seen, round, format!("hp {hp} escaped the clamp"));
    }
    if let Some(health) = world.host_health(entity) {
        if health < MIN_VISIBLE_HEALTH {
            push_anomaly(
                anomalies,
                seen,
                round,
                format!("host health {health} below visible floor"),
            );
        }
    }
    if let (Some(position), Some(record_anchor)) = (world.position(entity), manager.anchor()) {
        if position.distance(&record_anchor.position()) > POSITION_LOCK_TOLERANCE + 5.0 {
            push_anomaly(
                anomalies,
                seen,
                round,
                "entity drifted far beyond the enforcement window".to_string(),
            );
        }
    }
}

fn finish(
    seed: u32,
    rounds: usize,
    attackers: usize,
    world: &SimWorld,
    manager: &ScarecrowManager,
    anomalies: Vec<AnomalyRecord>,
    attacks_delivered: usize,
    attacks_cancelled: usize,
    chat_lines: usize,
    bot_replies: usize,
    position_corrections: usize,
) -> RunSummary {
    RunSummary {
        seed,
        rounds,
        attackers,
        attacks_delivered,
        attacks_cancelled,
        chat_lines,
        bot_replies,
        position_corrections,
        final_hp: manager.current_hp(world),
        anomaly_count: anomalies.len(),
        anomalies,
    }
}

fn push_anomaly(
    anomalies: &mut Vec<AnomalyRecord>,
    seen: &mut HashSet<String>,
    round: usize,
    message: String,
) {
    if seen.insert(message.clone()) {
        anomalies.push(AnomalyRecord { round, message });
    }
}

fn emit_log(level: &str, event: &str, details: Value) {
    let line = json!({
        "timestampMs": now_ms(),
        "level": level,
        "event": event,
        "details": details,
    });
    println!("{line}");
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(summary)
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;
    std::fs::write(path, text)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
