use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::config::ChatBotConfig;
use crate::cooldowns::CooldownTracker;
use crate::rng::Rng;
use crate::types::ActorId;

const KEYWORD_SCOPE: &str = "keyword";
const RANDOM_SCOPE: &str = "random";

/// Picks a reply for an inbound chat line: keyword rules first, then the
/// probabilistic fallback. The whole decide phase is safe to run off the
/// main loop; only the broadcast of the returned reply needs the hand-off.
pub struct ChatResponder {
    config: ChatBotConfig,
    cooldowns: CooldownTracker,
    rng: Mutex<Rng>,
    enabled: AtomicBool,
}

impl ChatResponder {
    pub fn new(config: ChatBotConfig, seed: u32) -> Self {
        let enabled = config.respond_to_chat;
        Self {
            config,
            cooldowns: CooldownTracker::new(),
            rng: Mutex::new(Rng::new(seed)),
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, value: bool) {
        self.enabled.store(value, Ordering::Relaxed);
    }

    pub fn toggle(&self) -> bool {
        !self.enabled.fetch_xor(true, Ordering::Relaxed)
    }

    pub fn clear_cooldowns(&self) {
        self.cooldowns.clear_all();
    }

    /// First strategy returning a reply wins; the other is not evaluated.
    pub fn on_chat(&self, actor: &ActorId, message: &str, now_ms: u64) -> Option<String> {
        if !self.is_enabled() {
            return None;
        }
        let folded = message.to_lowercase();
        if let Some(reply) = self.keyword_reply(actor, &folded, now_ms) {
            return Some(reply);
        }
        self.random_reply(actor, now_ms)
    }

    fn keyword_reply(&self, actor: &ActorId, folded: &str, now_ms: u64) -> Option<String> {
        let settings = &self.config.keyword_replies;
        if !settings.enabled {
            return None;
        }
        if self.cooldowns.is_on_global_cooldown(KEYWORD_SCOPE, now_ms) {
            return None;
        }
        if self
            .cooldowns
            .is_on_actor_cooldown(actor, KEYWORD_SCOPE, now_ms)
        {
            return None;
        }

        // First matching rule wins; rules keep their configured order.
        for rule in &settings.rules {
            if rule.keywords.is_empty() || rule.replies.is_empty() {
                continue;
            }
            let matched = rule
                .keywords
                .iter()
                .any(|keyword| folded.contains(&keyword.to_lowercase()));
            if !matched {
                continue;
            }

            self.cooldowns.set_global_cooldown(
                KEYWORD_SCOPE,
                settings.cooldown_seconds_global,
                now_ms,
            );
            self.cooldowns.set_actor_cooldown(
                actor,
                KEYWORD_SCOPE,
                settings.cooldown_seconds_per_player,
                now_ms,
            );
            return self.pick(&rule.replies);
        }
        None
    }

    fn random_reply(&self, actor: &ActorId, now_ms: u64) -> Option<String> {
        let settings = &self.config.random_reply;
        if !settings.enabled {
            return None;
        }
        if self.cooldowns.is_on_global_cooldown(RANDOM_SCOPE, now_ms) {
            return None;
        }
        if self
            .cooldowns
            .is_on_actor_cooldown(actor, RANDOM_SCOPE, now_ms)
        {
            return None;
        }

        let roll = match self.rng.lock() {
            Ok(mut rng) => rng.percent(),
            Err(poisoned) => poisoned.into_inner().percent(),
        };
        // A losing roll sets no cooldown.
        if roll >= settings.chance_percent {
            return None;
        }
        if settings.messages.is_empty() {
            return None;
        }

        self.cooldowns.set_global_cooldown(
            RANDOM_SCOPE,
            settings.cooldown_seconds_global,
            now_ms,
        );
        self.cooldowns.set_actor_cooldown(
            actor,
            RANDOM_SCOPE,
            settings.cooldown_seconds_per_player,
            now_ms,
        );
        self.pick(&settings.messages)
    }

    fn pick(&self, replies: &[String]) -> Option<String> {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        rng.pick(replies).cloned()
    }

    /// Template substitution happens at broadcast time, on the main loop,
    /// with the bot's current display name.
    pub fn format_broadcast(&self, bot_name: &str, message: &str) -> String {
        self.config
            .chat_format
            .replace("{botName}", bot_name)
            .replace("{message}", message)
    }
}
