use crate::config::BotConfig;
use crate::constants::{DEFAULT_MAX_HP, MIN_VISIBLE_HEALTH, POSITION_LOCK_TOLERANCE};
use crate::host::{
    CosmeticEffect, EntityHost, SpawnSettings, ATTR_HP, ATTR_MARKER, ATTR_MAX_HP, ATTR_NAME,
};
use crate::snapshot_store::{SnapshotData, SnapshotStore};
use crate::types::{Anchor, EntityId, StatusView};

#[derive(Clone, Debug)]
struct ScarecrowRecord {
    entity: EntityId,
    anchor: Anchor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateError {
    AlreadyExists,
    WorldMissing,
    SpawnRejected,
}

/// What the host must do with a native damage event it forwarded in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DamageVerdict {
    /// Not a tracked entity; let the host's own pipeline run.
    NotMine,
    /// Cancel the event entirely; no host-side damage may be applied.
    Cancelled,
    /// HP was absorbed into the attribute store; host damage must be zeroed.
    Absorbed { remaining_hp: f64 },
}

/// What the host must do with a native death event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeathVerdict {
    NotMine,
    /// Clear drops and experience; HP has been forced back to the floor.
    Neutralized,
}

/// Owns the single tracked-entity record: lifecycle, HP, anchor, snapshot.
///
/// HP lives in the entity's own persistent attributes, not only in process
/// memory, so a restart can recover it straight off the entity. The snapshot
/// file is the secondary path used to re-acquire the entity reference.
pub struct ScarecrowManager {
    config: BotConfig,
    store: SnapshotStore,
    record: Option<ScarecrowRecord>,
}

impl ScarecrowManager {
    pub fn new(config: BotConfig, store: SnapshotStore) -> Self {
        Self {
            config,
            store,
            record: None,
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn anchor(&self) -> Option<&Anchor> {
        self.record.as_ref().map(|record| &record.anchor)
    }

    pub fn entity_id(&self) -> Option<&EntityId> {
        self.record.as_ref().map(|record| &record.entity)
    }

    fn live_entity(&self, host: &dyn EntityHost) -> Option<EntityId> {
        let record = self.record.as_ref()?;
        if host.is_alive(&record.entity) {
            Some(record.entity.clone())
        } else {
            None
        }
    }

    pub fn has_live_record(&self, host: &dyn EntityHost) -> bool {
        self.live_entity(host).is_some()
    }

    /// Marker-attribute predicate: identity survives restarts on the entity
    /// itself, independent of the in-memory record.
    pub fn is_scarecrow(&self, host: &dyn EntityHost, entity: &EntityId) -> bool {
        host.attr_bool(entity, ATTR_MARKER).unwrap_or(false)
    }

    pub fn create(
        &mut self,
        host: &mut dyn EntityHost,
        anchor: Anchor,
        name: &str,
    ) -> Result<(), CreateError> {
        if self.has_live_record(&*host) {
            return Err(CreateError::AlreadyExists);
        }
        if !host.has_world(&anchor.world) {
            return Err(CreateError::WorldMissing);
        }

        let kind = self.config.scarecrow.entity_kind();
        let settings = SpawnSettings {
            ai: false,
            persistent: true,
            remove_when_far_away: false,
            silent: self.config.scarecrow.silent,
            invulnerable: self.config.scarecrow.invulnerable,
            collidable: true,
        };
        let Some(entity) = host.spawn_entity(&anchor, kind, &settings) else {
            return Err(CreateError::SpawnRejected);
        };
        if !host.is_alive(&entity) {
            // Never leave a half-configured entity behind.
            host.despawn_entity(&entity);
            return Err(CreateError::SpawnRejected);
        }

        let max_hp = self.config.scarecrow.max_hp;
        host.set_attr_bool(&entity, ATTR_MARKER, true);
        host.set_attr_f64(&entity, ATTR_HP, max_hp);
        host.set_attr_f64(&entity, ATTR_MAX_HP, max_hp);
        host.set_attr_string(&entity, ATTR_NAME, name);

        self.record = Some(ScarecrowRecord {
            entity,
            anchor: anchor.clone(),
        });
        self.set_hp(host, max_hp);
        self.save_snapshot(&*host);

        println!(
            "[scarecrow] created at {} with name: {name}",
            anchor.format_short()
        );
        Ok(())
    }

    /// Idempotent; calling with no record is a no-op apart from the log line.
    pub fn remove(&mut self, host: &mut dyn EntityHost) {
        if let Some(entity) = self.live_entity(&*host) {
            host.despawn_entity(&entity);
        }
        if self.record.take().is_some() {
            self.store.delete();
            println!("[scarecrow] removed");
        }
    }

    pub fn move_to(&mut self, host: &mut dyn EntityHost, anchor: Anchor) {
        let Some(entity) = self.live_entity(&*host) else {
            return;
        };
        host.teleport(&entity, &anchor);
        if let Some(record) = self.record.as_mut() {
            record.anchor = anchor;
        }
        self.save_snapshot(&*host);
    }

    pub fn current_hp(&self, host: &dyn EntityHost) -> f64 {
        match self.live_entity(host) {
            Some(entity) => host.attr_f64(&entity, ATTR_HP).unwrap_or(0.0),
            None => 0.0,
        }
    }

    pub fn max_hp(&self, host: &dyn EntityHost) -> f64 {
        match self.live_entity(host) {
            Some(entity) => host.attr_f64(&entity, ATTR_MAX_HP).unwrap_or(DEFAULT_MAX_HP),
            None => 0.0,
        }
    }

    pub fn bot_name(&self, host: &dyn EntityHost) -> String {
        if let Some(entity) = self.live_entity(host) {
            if let Some(name) = host.attr_string(&entity, ATTR_NAME) {
                return name;
            }
        }
        self.config.bot.name.clone()
    }

    /// Clamps into [minHP, maxHp] and writes through to the attribute store.
    /// The host-visible health bar is scaled by ratio against the host's own
    /// max-health attribute and floored above zero; the attribute maxHp stays
    /// authoritative for the clamp itself.
    pub fn set_hp(&self, host: &mut dyn EntityHost, value: f64) {
        let Some(entity) = self.live_entity(&*host) else {
            return;
        };
        self.write_hp(host, &entity, value);
    }

    /// Does not require the entity to be alive: the death interception
    /// restores HP through this path on a dead-but-present entity, and the
    /// host health write it triggers is what brings the entity back.
    fn write_hp(&self, host: &mut dyn EntityHost, entity: &EntityId, value: f64) {
        let min_hp = self.config.scarecrow.min_hp;
        let max_hp = host.attr_f64(entity, ATTR_MAX_HP).unwrap_or(DEFAULT_MAX_HP);
        let clamped = value.max(min_hp).min(max_hp);

        host.set_attr_f64(entity, ATTR_HP, clamped);

        if let Some(host_max) = host.host_max_health(entity) {
            let ratio = if max_hp > 0.0 { clamped / max_hp } else { 1.0 };
            host.set_host_health(entity, (ratio * host_max).max(MIN_VISIBLE_HEALTH));
        }

        self.update_name_display(host);
    }

    pub fn heal(&self, host: &mut dyn EntityHost, amount: f64) {
        let current = self.current_hp(&*host);
        self.set_hp(host, current + amount);
    }

    pub fn damage(&self, host: &mut dyn EntityHost, amount: f64) {
        let current = self.current_hp(&*host);
        self.set_hp(host, current - amount);
        self.play_damage_effects(host);
    }

    fn play_damage_effects(&self, host: &mut dyn EntityHost) {
        let Some(entity) = self.live_entity(&*host) else {
            return;
        };
        if self.config.scarecrow.hurt_sound {
            host.play_effect(&entity, CosmeticEffect::HurtSound);
        }
        if self.config.scarecrow.damage_particles {
            host.play_effect(&entity, CosmeticEffect::DamageParticles);
        }
    }

    pub fn update_name_display(&self, host: &mut dyn EntityHost) {
        let Some(entity) = self.live_entity(&*host) else {
            return;
        };
        if !self.config.scarecrow.visible_name {
            host.set_display_name(&entity, None);
            return;
        }

        let name = self.bot_name(&*host);
        if self.config.scarecrow.show_hp_in_name {
            let display = self
                .config
                .scarecrow
                .name_hp_format
                .replace("{botName}", &name)
                .replace("{hp}", &format!("{:.1}", self.current_hp(&*host)))
                .replace("{maxHp}", &format!("{:.1}", self.max_hp(&*host)));
            host.set_display_name(&entity, Some(&display));
        } else {
            host.set_display_name(&entity, Some(&name));
        }
    }

    /// Interception point for the host's native damage pipeline. The tracked
    /// entity must never die through it: damage that would cross the floor
    /// pins HP to exactly minHP and cancels the event.
    pub fn on_entity_damage(
        &mut self,
        host: &mut dyn EntityHost,
        entity: &EntityId,
        final_damage: f64,
    ) -> DamageVerdict {
        if !self.is_scarecrow(&*host, entity) {
            return DamageVerdict::NotMine;
        }
        if self.config.scarecrow.invulnerable {
            return DamageVerdict::Cancelled;
        }

        let current = self.current_hp(&*host);
        let min_hp = self.config.scarecrow.min_hp;
        if current - final_damage <= min_hp {
            self.set_hp(host, min_hp);
            println!("[scarecrow] reached minimum HP ({min_hp}), suppressing native death");
            DamageVerdict::Cancelled
        } else {
            self.damage(host, final_damage);
            DamageVerdict::Absorbed {
                remaining_hp: self.current_hp(&*host),
            }
        }
    }

    /// Should be unreachable given the damage interception; treated as a
    /// non-fatal anomaly when it fires anyway.
    pub fn on_entity_death(
        &mut self,
        host: &mut dyn EntityHost,
        entity: &EntityId,
    ) -> DeathVerdict {
        if !self.is_scarecrow(&*host, entity) {
            return DeathVerdict::NotMine;
        }
        eprintln!("[scarecrow] death event fired for tracked entity {entity}, neutralizing");
        // The marker is read off the entity itself, so this works even when
        // the host already flagged the entity dead before the event landed.
        self.write_hp(host, entity, self.config.scarecrow.min_hp);
        DeathVerdict::Neutralized
    }

    /// One tick of the position enforcement loop. Silent no-op when there is
    /// nothing to correct; returns whether a correction was applied.
    pub fn enforce_anchor(&self, host: &mut dyn EntityHost) -> bool {
        let Some(record) = self.record.as_ref() else {
            return false;
        };
        if !host.is_alive(&record.entity) {
            return false;
        }
        let Some(position) = host.position(&record.entity) else {
            return false;
        };
        if position.distance(&record.anchor.position()) <= POSITION_LOCK_TOLERANCE {
            return false;
        }
        host.teleport(&record.entity, &record.anchor);
        host.zero_velocity(&record.entity);
        true
    }

    pub fn status(&self, host: &dyn EntityHost) -> Option<StatusView> {
        let record = self.record.as_ref()?;
        if !host.is_alive(&record.entity) {
            return None;
        }
        Some(StatusView {
            name: self.bot_name(host),
            hp: self.current_hp(host),
            max_hp: self.max_hp(host),
            world: record.anchor.world.clone(),
            x: record.anchor.x,
            y: record.anchor.y,
            z: record.anchor.z,
        })
    }

    pub fn save_snapshot(&self, host: &dyn EntityHost) {
        let data = match (self.record.as_ref(), self.live_entity(host)) {
            (Some(record), Some(entity)) => SnapshotData {
                exists: true,
                uuid: entity.0.clone(),
                world: record.anchor.world.clone(),
                x: record.anchor.x,
                y: record.anchor.y,
                z: record.anchor.z,
                yaw: record.anchor.yaw,
                pitch: record.anchor.pitch,
                hp: self.current_hp(host),
                name: self.bot_name(host),
                saved_at_iso: String::new(),
            },
            _ => SnapshotData::absent(),
        };
        self.store.save(&data);
    }

    /// Startup path: re-acquire the snapshotted entity by its stored id. If
    /// it cannot be resolved no substitute is created; the operator recreates
    /// explicitly.
    pub fn load_snapshot(&mut self, host: &mut dyn EntityHost) {
        let Some(data) = self.store.load() else {
            println!("[scarecrow] no snapshot to restore");
            return;
        };
        if !host.has_world(&data.world) {
            eprintln!("[scarecrow] snapshot world not found: {}", data.world);
            return;
        }
        let Some(entity) = host.find_entity(&data.uuid, &data.world) else {
            eprintln!(
                "[scarecrow] snapshotted entity {} not found, use the create command to spawn a new one",
                data.uuid
            );
            return;
        };

        let anchor = Anchor {
            world: data.world.clone(),
            x: data.x,
            y: data.y,
            z: data.z,
            yaw: data.yaw,
            pitch: data.pitch,
        };
        self.record = Some(ScarecrowRecord {
            entity: entity.clone(),
            anchor: anchor.clone(),
        });
        self.set_hp(host, data.hp);
        // The entity may have drifted while the server was down.
        host.teleport(&entity, &anchor);
        println!("[scarecrow] restored tracked entity: {}", self.bot_name(&*host));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim_world::SimWorld;
    use crate::types::Vec3;
    use tempfile::TempDir;

    fn manager_with(config: BotConfig) -> (TempDir, SimWorld, ScarecrowManager) {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("scarecrow.json"));
        (dir, SimWorld::new(), ScarecrowManager::new(config, store))
    }

    fn default_manager() -> (TempDir, SimWorld, ScarecrowManager) {
        manager_with(BotConfig::default())
    }

    fn anchor_at(x: f64, y: f64, z: f64) -> Anchor {
        Anchor::new("world", x, y, z)
    }

    #[test]
    fn create_sets_full_hp_and_persists_snapshot() {
        let (_dir, mut sim, mut manager) = default_manager();
        manager
            .create(&mut sim, anchor_at(0.0, 64.0, 0.0), "Scarecrow")
            .unwrap();
        assert_eq!(manager.current_hp(&sim), 100.0);
        assert_eq!(manager.max_hp(&sim), 100.0);
        assert_eq!(manager.bot_name(&sim), "Scarecrow");
        let entity = manager.entity_id().unwrap().clone();
        assert!(manager.is_scarecrow(&sim, &entity));
        assert!(manager.config().scarecrow.lock_to_ground);

        let store = SnapshotStore::new(manager.store.path().to_path_buf());
        let data = store.load().expect("snapshot persisted on create");
        assert!(data.exists);
        assert_eq!(data.uuid, entity.0);
        assert_eq!(data.hp, 100.0);
    }

    #[test]
    fn second_create_fails_and_leaves_first_record_untouched() {
        let (_dir, mut sim, mut manager) = default_manager();
        manager
            .create(&mut sim, anchor_at(0.0, 0.0, 0.0), "First")
            .unwrap();
        manager.damage(&mut sim, 25.0);
        let result = manager.create(&mut sim, anchor_at(5.0, 0.0, 5.0), "Second");
        assert_eq!(result, Err(CreateError::AlreadyExists));
        assert_eq!(manager.bot_name(&sim), "First");
        assert_eq!(manager.current_hp(&sim), 75.0);
        assert_eq!(manager.anchor().unwrap().x, 0.0);
    }

    #[test]
    fn create_in_unknown_world_is_rejected() {
        let (_dir, mut sim, mut manager) = default_manager();
        let result = manager.create(&mut sim, Anchor::new("nether", 0.0, 0.0, 0.0), "Bot");
        assert_eq!(result, Err(CreateError::WorldMissing));
        assert!(manager.entity_id().is_none());
    }

    #[test]
    fn remove_is_idempotent_and_deletes_at_most_one_snapshot() {
        let (_dir, mut sim, mut manager) = default_manager();
        manager
            .create(&mut sim, anchor_at(0.0, 0.0, 0.0), "Bot")
            .unwrap();
        let entity = manager.entity_id().unwrap().clone();
        let snapshot_path = manager.store.path().to_path_buf();
        assert!(snapshot_path.exists());

        manager.remove(&mut sim);
        assert!(!sim.is_alive(&entity));
        assert!(!snapshot_path.exists());
        assert_eq!(manager.current_hp(&sim), 0.0);

        // Second remove with no record is a no-op.
        manager.remove(&mut sim);
        assert!(manager.entity_id().is_none());
    }

    #[test]
    fn hp_stays_clamped_over_arbitrary_sequences() {
        let (_dir, mut sim, mut manager) = default_manager();
        manager
            .create(&mut sim, anchor_at(0.0, 0.0, 0.0), "Bot")
            .unwrap();
        let steps: [(bool, f64); 8] = [
            (true, 30.0),
            (true, 500.0),
            (false, 12.5),
            (false, 1_000.0),
            (true, 0.5),
            (true, 99.5),
            (false, 3.0),
            (true, 7.0),
        ];
        for (is_damage, amount) in steps {
            if is_damage {
                manager.damage(&mut sim, amount);
            } else {
                manager.heal(&mut sim, amount);
            }
            let hp = manager.current_hp(&sim);
            assert!((1.0..=100.0).contains(&hp), "hp {hp} escaped the clamp");
        }
    }

    #[test]
    fn overdamage_pins_to_min_hp_and_cancels_native_death() {
        let (_dir, mut sim, mut manager) = default_manager();
        manager
            .create(&mut sim, anchor_at(0.0, 0.0, 0.0), "Bot")
            .unwrap();
        let entity = manager.entity_id().unwrap().clone();
        let verdict = manager.on_entity_damage(&mut sim, &entity, 150.0);
        assert_eq!(verdict, DamageVerdict::Cancelled);
        assert_eq!(manager.current_hp(&sim), 1.0);
        assert!(sim.is_alive(&entity));
        // The host never sees zero health.
        assert!(sim.host_health(&entity).unwrap() >= MIN_VISIBLE_HEALTH);
    }

    #[test]
    fn survivable_damage_is_absorbed_into_attributes() {
        let (_dir, mut sim, mut manager) = default_manager();
        manager
            .create(&mut sim, anchor_at(0.0, 0.0, 0.0), "Bot")
            .unwrap();
        let entity = manager.entity_id().unwrap().clone();
        let verdict = manager.on_entity_damage(&mut sim, &entity, 40.0);
        assert_eq!(verdict, DamageVerdict::Absorbed { remaining_hp: 60.0 });
        assert_eq!(manager.current_hp(&sim), 60.0);
    }

    #[test]
    fn untracked_entities_pass_through() {
        let (_dir, mut sim, mut manager) = default_manager();
        manager
            .create(&mut sim, anchor_at(0.0, 0.0, 0.0), "Bot")
            .unwrap();
        let stranger = sim
            .spawn_entity(
                &anchor_at(9.0, 0.0, 9.0),
                crate::types::EntityKind::Cow,
                &SpawnSettings {
                    ai: true,
                    persistent: false,
                    remove_when_far_away: true,
                    silent: false,
                    invulnerable: false,
                    collidable: true,
                },
            )
            .unwrap();
        assert_eq!(
            manager.on_entity_damage(&mut sim, &stranger, 5.0),
            DamageVerdict::NotMine
        );
        assert_eq!(
            manager.on_entity_death(&mut sim, &stranger),
            DeathVerdict::NotMine
        );
    }

    #[test]
    fn invulnerable_config_cancels_without_hp_change() {
        let mut config = BotConfig::default();
        config.scarecrow.invulnerable = true;
        let (_dir, mut sim, mut manager) = manager_with(config);
        manager
            .create(&mut sim, anchor_at(0.0, 0.0, 0.0), "Bot")
            .unwrap();
        let entity = manager.entity_id().unwrap().clone();
        assert_eq!(
            manager.on_entity_damage(&mut sim, &entity, 40.0),
            DamageVerdict::Cancelled
        );
        assert_eq!(manager.current_hp(&sim), 100.0);
    }

    #[test]
    fn death_event_is_neutralized_and_hp_restored() {
        let (_dir, mut sim, mut manager) = default_manager();
        manager
            .create(&mut sim, anchor_at(0.0, 0.0, 0.0), "Bot")
            .unwrap();
        let entity = manager.entity_id().unwrap().clone();
        manager.damage(&mut sim, 50.0);
        assert_eq!(
            manager.on_entity_death(&mut sim, &entity),
            DeathVerdict::Neutralized
        );
        assert_eq!(manager.current_hp(&sim), 1.0);
    }

    #[test]
    fn death_after_host_kill_is_neutralized_and_entity_restored() {
        let (_dir, mut sim, mut manager) = default_manager();
        manager
            .create(&mut sim, anchor_at(0.0, 0.0, 0.0), "Bot")
            .unwrap();
        let entity = manager.entity_id().unwrap().clone();

        // The host killed the entity outright before the event arrived.
        sim.force_kill(&entity);
        assert!(!sim.is_alive(&entity));

        assert_eq!(
            manager.on_entity_death(&mut sim, &entity),
            DeathVerdict::Neutralized
        );
        assert!(sim.is_alive(&entity));
        assert_eq!(manager.current_hp(&sim), 1.0);
        assert!(sim.host_health(&entity).unwrap() >= MIN_VISIBLE_HEALTH);
    }

    #[test]
    fn damage_plays_configured_effects() {
        let (_dir, mut sim, mut manager) = default_manager();
        manager
            .create(&mut sim, anchor_at(0.0, 0.0, 0.0), "Bot")
            .unwrap();
        sim.clear_effects();
        manager.damage(&mut sim, 5.0);
        let effects: Vec<_> = sim.effects().iter().map(|(_, effect)| *effect).collect();
        assert!(effects.contains(&CosmeticEffect::HurtSound));
        assert!(effects.contains(&CosmeticEffect::DamageParticles));
    }

    #[test]
    fn name_display_shows_hp_and_tracks_damage() {
        let (_dir, mut sim, mut manager) = default_manager();
        manager
            .create(&mut sim, anchor_at(0.0, 0.0, 0.0), "Bot")
            .unwrap();
        let entity = manager.entity_id().unwrap().clone();
        assert_eq!(
            sim.display_name(&entity).as_deref(),
            Some("Bot [HP 100.0/100.0]")
        );
        manager.damage(&mut sim, 30.5);
        assert_eq!(
            sim.display_name(&entity).as_deref(),
            Some("Bot [HP 69.5/100.0]")
        );
    }

    #[test]
    fn enforce_anchor_corrects_only_beyond_tolerance() {
        let (_dir, mut sim, mut manager) = default_manager();
        manager
            .create(&mut sim, anchor_at(10.0, 0.0, 10.0), "Bot")
            .unwrap();
        let entity = manager.entity_id().unwrap().clone();

        sim.displace(&entity, Vec3::new(0.05, 0.0, 0.0));
        assert!(!manager.enforce_anchor(&mut sim));

        sim.displace(&entity, Vec3::new(2.0, 0.0, 0.0));
        assert!(manager.enforce_anchor(&mut sim));
        assert_eq!(sim.position(&entity), Some(Vec3::new(10.0, 0.0, 10.0)));
        assert_eq!(sim.velocity(&entity), Some(Vec3::ZERO));
    }

    #[test]
    fn enforce_anchor_skips_silently_without_a_record() {
        let (_dir, mut sim, manager) = default_manager();
        assert!(!manager.enforce_anchor(&mut sim));
    }

    #[test]
    fn move_updates_anchor_and_future_corrections() {
        let (_dir, mut sim, mut manager) = default_manager();
        manager
            .create(&mut sim, anchor_at(0.0, 0.0, 0.0), "Bot")
            .unwrap();
        let entity = manager.entity_id().unwrap().clone();
        manager.move_to(&mut sim, anchor_at(10.0, 0.0, 10.0));
        assert_eq!(manager.anchor().unwrap().x, 10.0);
        assert!(!manager.enforce_anchor(&mut sim));

        sim.displace(&entity, Vec3::new(0.0, 0.0, 3.0));
        assert!(manager.enforce_anchor(&mut sim));
        assert_eq!(sim.position(&entity), Some(Vec3::new(10.0, 0.0, 10.0)));
    }

    #[test]
    fn restart_reacquires_entity_and_hp_from_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut sim = SimWorld::new();
        let path = dir.path().join("scarecrow.json");

        let mut manager = ScarecrowManager::new(
            BotConfig::default(),
            SnapshotStore::new(path.clone()),
        );
        manager
            .create(&mut sim, anchor_at(3.0, 64.0, -2.0), "Keeper")
            .unwrap();
        manager.damage(&mut sim, 33.0);
        manager.save_snapshot(&sim);
        let entity = manager.entity_id().unwrap().clone();
        drop(manager);

        let mut restarted =
            ScarecrowManager::new(BotConfig::default(), SnapshotStore::new(path));
        restarted.load_snapshot(&mut sim);
        assert_eq!(restarted.entity_id(), Some(&entity));
        assert_eq!(restarted.current_hp(&sim), 67.0);
        assert_eq!(restarted.bot_name(&sim), "Keeper");
        assert_eq!(sim.position(&entity), Some(Vec3::new(3.0, 64.0, -2.0)));
    }

    #[test]
    fn unresolvable_snapshot_leaves_record_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut sim = SimWorld::new();
        let path = dir.path().join("scarecrow.json");

        let mut manager = ScarecrowManager::new(
            BotConfig::default(),
            SnapshotStore::new(path.clone()),
        );
        manager
            .create(&mut sim, anchor_at(0.0, 0.0, 0.0), "Gone")
            .unwrap();
        manager.save_snapshot(&sim);
        let entity = manager.entity_id().unwrap().clone();
        sim.force_kill(&entity);
        drop(manager);

        let mut restarted =
            ScarecrowManager::new(BotConfig::default(), SnapshotStore::new(path));
        restarted.load_snapshot(&mut sim);
        assert!(restarted.entity_id().is_none());
        assert_eq!(restarted.current_hp(&sim), 0.0);
    }

    #[test]
    fn absent_snapshot_means_no_record_and_defaults() {
        let (_dir, mut sim, mut manager) = default_manager();
        manager.load_snapshot(&mut sim);
        assert!(manager.entity_id().is_none());
        assert_eq!(manager.current_hp(&sim), 0.0);
        assert_eq!(manager.bot_name(&sim), "Scarecrow");
    }

    #[test]
    fn full_lifecycle_scenario() {
        let (_dir, mut sim, mut manager) = default_manager();
        manager
            .create(&mut sim, anchor_at(0.0, 0.0, 0.0), "Bot")
            .unwrap();
        assert_eq!(manager.current_hp(&sim), 100.0);
        let entity = manager.entity_id().unwrap().clone();

        let verdict = manager.on_entity_damage(&mut sim, &entity, 150.0);
        assert_eq!(verdict, DamageVerdict::Cancelled);
        assert_eq!(manager.current_hp(&sim), 1.0);

        manager.heal(&mut sim, 200.0);
        assert_eq!(manager.current_hp(&sim), 100.0);

        manager.move_to(&mut sim, anchor_at(10.0, 0.0, 10.0));
        assert!(!manager.enforce_anchor(&mut sim));
        sim.displace(&entity, Vec3::new(0.4, 0.0, 0.0));
        assert!(manager.enforce_anchor(&mut sim));
        assert_eq!(sim.position(&entity), Some(Vec3::new(10.0, 0.0, 10.0)));
    }
}
