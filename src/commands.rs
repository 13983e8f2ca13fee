use std::collections::HashSet;

use crate::chat::ChatResponder;
use crate::host::EntityHost;
use crate::scarecrow::{CreateError, ScarecrowManager};
use crate::types::Anchor;

pub const PERM_ADMIN: &str = "scarecrow.admin";
pub const PERM_MANAGE: &str = "scarecrow.manage";
pub const PERM_SAY: &str = "scarecrow.say";

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Create { name: Option<String> },
    Remove,
    Move,
    Teleport,
    Heal { amount: f64 },
    Damage { amount: f64 },
    Status,
    Say { message: String },
    ToggleChat,
    Help,
}

impl Command {
    /// Parse errors carry the exact message shown to the caller.
    pub fn parse(args: &[String]) -> Result<Command, String> {
        let Some(subcommand) = args.first() else {
            return Ok(Command::Help);
        };
        match subcommand.to_lowercase().as_str() {
            "create" => {
                let name = if args.len() > 1 {
                    Some(args[1..].join(" "))
                } else {
                    None
                };
                Ok(Command::Create { name })
            }
            "remove" => Ok(Command::Remove),
            "move" => Ok(Command::Move),
            "tp" | "teleport" => Ok(Command::Teleport),
            "heal" => Ok(Command::Heal {
                amount: parse_amount(args.get(1), "heal")?,
            }),
            "damage" => Ok(Command::Damage {
                amount: parse_amount(args.get(1), "damage")?,
            }),
            "status" => Ok(Command::Status),
            "say" => {
                if args.len() < 2 {
                    return Err("Usage: /scarecrow say <message>".to_string());
                }
                Ok(Command::Say {
                    message: args[1..].join(" "),
                })
            }
            "togglechat" => Ok(Command::ToggleChat),
            _ => Ok(Command::Help),
        }
    }

    /// `None` means the command is open to everyone; help (including the
    /// unknown-subcommand fallback) always prints usage.
    pub fn required_permission(&self) -> Option<&'static str> {
        match self {
            Command::Create { .. } | Command::Remove | Command::ToggleChat => Some(PERM_ADMIN),
            Command::Move
            | Command::Teleport
            | Command::Heal { .. }
            | Command::Damage { .. }
            | Command::Status => Some(PERM_MANAGE),
            Command::Say { .. } => Some(PERM_SAY),
            Command::Help => None,
        }
    }
}

fn parse_amount(raw: Option<&String>, verb: &str) -> Result<f64, String> {
    let Some(raw) = raw else {
        return Err(format!("Usage: /scarecrow {verb} <amount>"));
    };
    let amount: f64 = raw
        .parse()
        .map_err(|_| format!("Invalid number: {raw}"))?;
    if amount <= 0.0 {
        return Err("Amount must be positive.".to_string());
    }
    Ok(amount)
}

/// Whoever issued the command: display name, granted permission scopes, and
/// a position when the caller is an in-world player.
#[derive(Clone, Debug)]
pub struct CommandActor {
    pub name: String,
    pub permissions: HashSet<String>,
    pub anchor: Option<Anchor>,
}

impl CommandActor {
    pub fn has_permission(&self, scope: &str) -> bool {
        self.permissions.contains(scope)
    }
}

#[derive(Clone, Debug, Default)]
pub struct CommandOutcome {
    /// Lines sent back to the caller only.
    pub messages: Vec<String>,
    /// Bot speech to broadcast to everyone, already formatted.
    pub broadcast: Option<String>,
    /// Set when the caller should be teleported (the `tp` subcommand).
    pub teleport_actor: Option<Anchor>,
}

impl CommandOutcome {
    fn reply(message: impl Into<String>) -> Self {
        Self {
            messages: vec![message.into()],
            ..Self::default()
        }
    }
}

const NO_PERMISSION: &str = "You don't have permission to use this command.";
const PLAYERS_ONLY: &str = "This command can only be used by players.";
const NO_SCARECROW: &str = "No scarecrow exists.";

pub fn execute(
    command: &Command,
    actor: &CommandActor,
    host: &mut dyn EntityHost,
    manager: &mut ScarecrowManager,
    chat: &ChatResponder,
) -> CommandOutcome {
    if let Some(scope) = command.required_permission() {
        if !actor.has_permission(scope) {
            return CommandOutcome::reply(NO_PERMISSION);
        }
    }

    match command {
        Command::Create { name } => handle_create(actor, host, manager, name.as_deref()),
        Command::Remove => {
            if !manager.has_live_record(&*host) {
                return CommandOutcome::reply(NO_SCARECROW);
            }
            manager.remove(host);
            CommandOutcome::reply("Scarecrow removed.")
        }
        Command::Move => {
            let Some(anchor) = actor.anchor.clone() else {
                return CommandOutcome::reply(PLAYERS_ONLY);
            };
            if !manager.has_live_record(&*host) {
                return CommandOutcome::reply(NO_SCARECROW);
            }
            manager.move_to(host, anchor);
            CommandOutcome::reply("Scarecrow moved to your location.")
        }
        Command::Teleport => {
            if actor.anchor.is_none() {
                return CommandOutcome::reply(PLAYERS_ONLY);
            }
            let Some(anchor) = manager.anchor().cloned() else {
                return CommandOutcome::reply(NO_SCARECROW);
            };
            if !manager.has_live_record(&*host) {
                return CommandOutcome::reply(NO_SCARECROW);
            }
            CommandOutcome {
                messages: vec!["Teleported to scarecrow.".to_string()],
                teleport_actor: Some(anchor),
                ..CommandOutcome::default()
            }
        }
        Command::Heal { amount } => {
            if !manager.has_live_record(&*host) {
                return CommandOutcome::reply(NO_SCARECROW);
            }
            let old_hp = manager.current_hp(&*host);
            manager.heal(host, *amount);
            let new_hp = manager.current_hp(&*host);
            CommandOutcome::reply(format!("Scarecrow healed: {old_hp:.1} -> {new_hp:.1} HP"))
        }
        Command::Damage { amount } => {
            if !manager.has_live_record(&*host) {
                return CommandOutcome::reply(NO_SCARECROW);
            }
            let old_hp = manager.current_hp(&*host);
            manager.damage(host, *amount);
            let new_hp = manager.current_hp(&*host);
            CommandOutcome::reply(format!("Scarecrow damaged: {old_hp:.1} -> {new_hp:.1} HP"))
        }
        Command::Status => {
            let Some(status) = manager.status(&*host) else {
                return CommandOutcome::reply(NO_SCARECROW);
            };
            CommandOutcome {
                messages: vec![
                    "=== Scarecrow Status ===".to_string(),
                    format!("Name: {}", status.name),
                    format!("HP: {:.1} / {:.1}", status.hp, status.max_hp),
                    format!(
                        "Location: {:.1}, {:.1}, {:.1} in {}",
                        status.x, status.y, status.z, status.world
                    ),
                ],
                ..CommandOutcome::default()
            }
        }
        Command::Say { message } => {
            let bot_name = manager.bot_name(&*host);
            CommandOutcome {
                broadcast: Some(chat.format_broadcast(&bot_name, message)),
                ..CommandOutcome::default()
            }
        }
        Command::ToggleChat => {
            let enabled = chat.toggle();
            CommandOutcome::reply(format!(
                "Chat responses {}",
                if enabled { "enabled" } else { "disabled" }
            ))
        }
        Command::Help => CommandOutcome {
            messages: usage_lines(),
            ..CommandOutcome::default()
        },
    }
}

fn handle_create(
    actor: &CommandActor,
    host: &mut dyn EntityHost,
    manager: &mut ScarecrowManager,
    name: Option<&str>,
) -> CommandOutcome {
    let Some(anchor) = actor.anchor.clone() else {
        return CommandOutcome::reply(PLAYERS_ONLY);
    };
    let name = name
        .map(|value| value.to_string())
        .unwrap_or_else(|| manager.config().bot.name.clone());

    match manager.create(host, anchor, &name) {
        Ok(()) => CommandOutcome::reply(format!("Scarecrow created: {name}")),
        Err(CreateError::AlreadyExists) => CommandOutcome::reply(
            "A scarecrow already exists! Remove it first with /scarecrow remove",
        ),
        Err(CreateError::WorldMissing) | Err(CreateError::SpawnRejected) => {
            CommandOutcome::reply("Failed to create scarecrow.")
        }
    }
}

fn usage_lines() -> Vec<String> {
    vec![
        "=== Scarecrow Commands ===".to_string(),
        "/scarecrow create [name] - Create scarecrow".to_string(),
        "/scarecrow remove - Remove scarecrow".to_string(),
        "/scarecrow move - Move to your location".to_string(),
        "/scarecrow tp - Teleport to scarecrow".to_string(),
        "/scarecrow heal <amount> - Heal scarecrow".to_string(),
        "/scarecrow damage <amount> - Damage scarecrow".to_string(),
        "/scarecrow status - Show status".to_string(),
        "/scarecrow say <message> - Make scarecrow speak".to_string(),
        "/scarecrow togglechat - Toggle chat responses".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotConfig;
    use crate::sim_world::SimWorld;
    use crate::snapshot_store::SnapshotStore;
    use tempfile::TempDir;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|part| part.to_string()).collect()
    }

    fn admin_actor() -> CommandActor {
        CommandActor {
            name: "Op".to_string(),
            permissions: [PERM_ADMIN, PERM_MANAGE, PERM_SAY]
                .iter()
                .map(|scope| scope.to_string())
                .collect(),
            anchor: Some(Anchor::new("world", 0.0, 64.0, 0.0)),
        }
    }

    fn setup() -> (TempDir, SimWorld, ScarecrowManager, ChatResponder) {
        let dir = tempfile::tempdir().unwrap();
        let config = BotConfig::default();
        let manager = ScarecrowManager::new(
            config.clone(),
            SnapshotStore::new(dir.path().join("scarecrow.json")),
        );
        let chat = ChatResponder::new(config.bot, 1);
        (dir, SimWorld::new(), manager, chat)
    }

    #[test]
    fn parse_covers_the_full_surface() {
        assert_eq!(
            Command::parse(&args(&["create", "Straw", "Man"])).unwrap(),
            Command::Create {
                name: Some("Straw Man".to_string())
            }
        );
        assert_eq!(Command::parse(&args(&["tp"])).unwrap(), Command::Teleport);
        assert_eq!(
            Command::parse(&args(&["heal", "12.5"])).unwrap(),
            Command::Heal { amount: 12.5 }
        );
        assert_eq!(Command::parse(&args(&[])).unwrap(), Command::Help);
        assert_eq!(Command::parse(&args(&["bogus"])).unwrap(), Command::Help);
    }

    #[test]
    fn invalid_and_non_positive_amounts_are_distinct_errors() {
        assert_eq!(
            Command::parse(&args(&["damage", "abc"])).unwrap_err(),
            "Invalid number: abc"
        );
        assert_eq!(
            Command::parse(&args(&["heal", "-5"])).unwrap_err(),
            "Amount must be positive."
        );
        assert_eq!(
            Command::parse(&args(&["heal", "0"])).unwrap_err(),
            "Amount must be positive."
        );
        assert_eq!(
            Command::parse(&args(&["heal"])).unwrap_err(),
            "Usage: /scarecrow heal <amount>"
        );
    }

    #[test]
    fn permissions_gate_each_scope() {
        let (_dir, mut sim, mut manager, chat) = setup();
        let mut actor = admin_actor();
        actor.permissions = [PERM_SAY.to_string()].into_iter().collect();

        let outcome = execute(
            &Command::Remove,
            &actor,
            &mut sim,
            &mut manager,
            &chat,
        );
        assert_eq!(outcome.messages, vec![NO_PERMISSION.to_string()]);

        let outcome = execute(
            &Command::Status,
            &actor,
            &mut sim,
            &mut manager,
            &chat,
        );
        assert_eq!(outcome.messages, vec![NO_PERMISSION.to_string()]);
    }

    #[test]
    fn help_is_open_to_callers_with_no_scopes() {
        let (_dir, mut sim, mut manager, chat) = setup();
        let mut actor = admin_actor();
        actor.permissions.clear();
        let outcome = execute(&Command::Help, &actor, &mut sim, &mut manager, &chat);
        assert_eq!(outcome.messages, usage_lines());

        // Unknown subcommands fall back to the same open usage text.
        let command = Command::parse(&args(&["wibble"])).unwrap();
        let outcome = execute(&command, &actor, &mut sim, &mut manager, &chat);
        assert_eq!(outcome.messages, usage_lines());
    }

    #[test]
    fn create_then_duplicate_create_reports_conflict() {
        let (_dir, mut sim, mut manager, chat) = setup();
        let actor = admin_actor();
        let outcome = execute(
            &Command::Create {
                name: Some("Keeper".to_string()),
            },
            &actor,
            &mut sim,
            &mut manager,
            &chat,
        );
        assert_eq!(outcome.messages, vec!["Scarecrow created: Keeper".to_string()]);

        let outcome = execute(
            &Command::Create { name: None },
            &actor,
            &mut sim,
            &mut manager,
            &chat,
        );
        assert_eq!(
            outcome.messages,
            vec!["A scarecrow already exists! Remove it first with /scarecrow remove".to_string()]
        );
    }

    #[test]
    fn create_without_player_position_is_rejected() {
        let (_dir, mut sim, mut manager, chat) = setup();
        let mut actor = admin_actor();
        actor.anchor = None;
        let outcome = execute(
            &Command::Create { name: None },
            &actor,
            &mut sim,
            &mut manager,
            &chat,
        );
        assert_eq!(outcome.messages, vec![PLAYERS_ONLY.to_string()]);
    }

    #[test]
    fn heal_and_damage_report_old_and_new_hp() {
        let (_dir, mut sim, mut manager, chat) = setup();
        let actor = admin_actor();
        execute(
            &Command::Create { name: None },
            &actor,
            &mut sim,
            &mut manager,
            &chat,
        );

        let outcome = execute(
            &Command::Damage { amount: 30.0 },
            &actor,
            &mut sim,
            &mut manager,
            &chat,
        );
        assert_eq!(
            outcome.messages,
            vec!["Scarecrow damaged: 100.0 -> 70.0 HP".to_string()]
        );

        let outcome = execute(
            &Command::Heal { amount: 200.0 },
            &actor,
            &mut sim,
            &mut manager,
            &chat,
        );
        assert_eq!(
            outcome.messages,
            vec!["Scarecrow healed: 70.0 -> 100.0 HP".to_string()]
        );
    }

    #[test]
    fn mutating_commands_without_a_record_report_missing_entity() {
        let (_dir, mut sim, mut manager, chat) = setup();
        let actor = admin_actor();
        for command in [
            Command::Remove,
            Command::Move,
            Command::Teleport,
            Command::Heal { amount: 1.0 },
            Command::Damage { amount: 1.0 },
            Command::Status,
        ] {
            let outcome = execute(&command, &actor, &mut sim, &mut manager, &chat);
            assert_eq!(
                outcome.messages,
                vec![NO_SCARECROW.to_string()],
                "command {command:?}"
            );
        }
    }

    #[test]
    fn say_broadcasts_with_the_chat_format() {
        let (_dir, mut sim, mut manager, chat) = setup();
        let actor = admin_actor();
        execute(
            &Command::Create {
                name: Some("Keeper".to_string()),
            },
            &actor,
            &mut sim,
            &mut manager,
            &chat,
        );
        let outcome = execute(
            &Command::Say {
                message: "stay off the field".to_string(),
            },
            &actor,
            &mut sim,
            &mut manager,
            &chat,
        );
        assert_eq!(
            outcome.broadcast.as_deref(),
            Some("<Keeper> stay off the field")
        );
    }

    #[test]
    fn tp_yields_a_teleport_for_the_caller() {
        let (_dir, mut sim, mut manager, chat) = setup();
        let actor = admin_actor();
        execute(
            &Command::Create { name: None },
            &actor,
            &mut sim,
            &mut manager,
            &chat,
        );
        let outcome = execute(&Command::Teleport, &actor, &mut sim, &mut manager, &chat);
        let anchor = outcome.teleport_actor.expect("tp target");
        assert_eq!(anchor.x, 0.0);
        assert_eq!(anchor.world, "world");
    }

    #[test]
    fn togglechat_flips_and_reports() {
        let (_dir, mut sim, mut manager, chat) = setup();
        let actor = admin_actor();
        let outcome = execute(&Command::ToggleChat, &actor, &mut sim, &mut manager, &chat);
        assert_eq!(outcome.messages, vec!["Chat responses disabled".to_string()]);
        assert!(!chat.is_enabled());
        let outcome = execute(&Command::ToggleChat, &actor, &mut sim, &mut manager, &chat);
        assert_eq!(outcome.messages, vec!["Chat responses enabled".to_string()]);
    }
}
