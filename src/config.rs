use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BOT_NAME, DEFAULT_CHAT_FORMAT, DEFAULT_KEYWORD_COOLDOWN_GLOBAL_SECS,
    DEFAULT_KEYWORD_COOLDOWN_PER_ACTOR_SECS, DEFAULT_MAX_HP, DEFAULT_MIN_HP,
    DEFAULT_NAME_HP_FORMAT, DEFAULT_RANDOM_COOLDOWN_GLOBAL_SECS,
    DEFAULT_RANDOM_COOLDOWN_PER_ACTOR_SECS, DEFAULT_RANDOM_REPLY_CHANCE_PERCENT,
};
use crate::types::EntityKind;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScarecrowConfig {
    pub entity_type: String,
    pub max_hp: f64,
    pub min_hp: f64,
    pub invulnerable: bool,
    pub silent: bool,
    pub lock_to_ground: bool,
    pub hurt_sound: bool,
    pub damage_particles: bool,
    pub visible_name: bool,
    pub show_hp_in_name: bool,
    pub name_hp_format: String,
}

impl Default for ScarecrowConfig {
    fn default() -> Self {
        Self {
            entity_type: "VILLAGER".to_string(),
            max_hp: DEFAULT_MAX_HP,
            min_hp: DEFAULT_MIN_HP,
            invulnerable: false,
            silent: true,
            lock_to_ground: true,
            hurt_sound: true,
            damage_particles: true,
            visible_name: true,
            show_hp_in_name: true,
            name_hp_format: DEFAULT_NAME_HP_FORMAT.to_string(),
        }
    }
}

impl ScarecrowConfig {
    /// Unknown names fall back to VILLAGER rather than failing the operation.
    pub fn entity_kind(&self) -> EntityKind {
        match EntityKind::parse(&self.entity_type) {
            Some(kind) => kind,
            None => {
                eprintln!(
                    "[config] unknown entity type {:?}, using VILLAGER",
                    self.entity_type
                );
                EntityKind::Villager
            }
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeywordRule {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub replies: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KeywordReplyConfig {
    pub enabled: bool,
    pub cooldown_seconds_global: u64,
    pub cooldown_seconds_per_player: u64,
    pub rules: Vec<KeywordRule>,
}

impl Default for KeywordReplyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cooldown_seconds_global: DEFAULT_KEYWORD_COOLDOWN_GLOBAL_SECS,
            cooldown_seconds_per_player: DEFAULT_KEYWORD_COOLDOWN_PER_ACTOR_SECS,
            rules: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RandomReplyConfig {
    pub enabled: bool,
    pub chance_percent: u32,
    pub cooldown_seconds_global: u64,
    pub cooldown_seconds_per_player: u64,
    pub messages: Vec<String>,
}

impl Default for RandomReplyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chance_percent: DEFAULT_RANDOM_REPLY_CHANCE_PERCENT,
            cooldown_seconds_global: DEFAULT_RANDOM_COOLDOWN_GLOBAL_SECS,
            cooldown_seconds_per_player: DEFAULT_RANDOM_COOLDOWN_PER_ACTOR_SECS,
            messages: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChatBotConfig {
    pub name: String,
    pub chat_format: String,
    pub respond_to_chat: bool,
    pub keyword_replies: KeywordReplyConfig,
    pub random_reply: RandomReplyConfig,
}

impl Default for ChatBotConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_BOT_NAME.to_string(),
            chat_format: DEFAULT_CHAT_FORMAT.to_string(),
            respond_to_chat: true,
            keyword_replies: KeywordReplyConfig::default(),
            random_reply: RandomReplyConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub scarecrow: ScarecrowConfig,
    pub bot: ChatBotConfig,
}

/// Missing or unreadable files yield the defaults; the server keeps running.
pub fn load_config(path: &Path) -> BotConfig {
    let text = match fs::read_to_string(path) {
        Ok(value) => value,
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                eprintln!("[config] failed to read {}: {error}", path.display());
            } else {
                println!(
                    "[config] no config file at {}, using defaults",
                    path.display()
                );
            }
            return BotConfig::default();
        }
    };

    match serde_json::from_str::<BotConfig>(&text) {
        Ok(config) => config,
        Err(error) => {
            eprintln!(
                "[config] failed to parse {}: {error}; using defaults",
                path.display()
            );
            BotConfig::default()
        }
    }
}
