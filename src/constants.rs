pub const TICK_RATE: u32 = 20;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const POSITION_LOCK_MS: u64 = 250;
pub const POSITION_LOCK_TOLERANCE: f64 = 0.1;

/// Host-visible health is never allowed to reach zero for a tracked entity.
pub const MIN_VISIBLE_HEALTH: f64 = 0.1;

pub const DEFAULT_MAX_HP: f64 = 100.0;
pub const DEFAULT_MIN_HP: f64 = 1.0;
pub const DEFAULT_BOT_NAME: &str = "Scarecrow";
pub const DEFAULT_CHAT_FORMAT: &str = "<{botName}> {message}";
pub const DEFAULT_NAME_HP_FORMAT: &str = "{botName} [HP {hp}/{maxHp}]";

pub const DEFAULT_RANDOM_REPLY_CHANCE_PERCENT: u32 = 10;
pub const DEFAULT_KEYWORD_COOLDOWN_GLOBAL_SECS: u64 = 2;
pub const DEFAULT_KEYWORD_COOLDOWN_PER_ACTOR_SECS: u64 = 6;
pub const DEFAULT_RANDOM_COOLDOWN_GLOBAL_SECS: u64 = 3;
pub const DEFAULT_RANDOM_COOLDOWN_PER_ACTOR_SECS: u64 = 8;
