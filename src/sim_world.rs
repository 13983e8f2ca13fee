use std::collections::{BTreeSet, HashMap};

use crate::host::{CosmeticEffect, EntityHost, SpawnSettings};
use crate::types::{Anchor, EntityId, EntityKind, Vec3};

#[derive(Clone, Debug)]
struct SimEntity {
    kind: EntityKind,
    world: String,
    position: Vec3,
    yaw: f32,
    pitch: f32,
    velocity: Vec3,
    alive: bool,
    settings: SpawnSettings,
    host_max_health: f64,
    host_health: f64,
    display_name: Option<String>,
    attrs_f64: HashMap<String, f64>,
    attrs_bool: HashMap<String, bool>,
    attrs_string: HashMap<String, String>,
}

/// In-process world model backing the server and simulate bins and the
/// manager tests. Entities live in named worlds and carry the same
/// persistent attribute map a real host would.
#[derive(Debug, Default)]
pub struct SimWorld {
    worlds: BTreeSet<String>,
    entities: HashMap<EntityId, SimEntity>,
    effects: Vec<(EntityId, CosmeticEffect)>,
    next_entity_id: u64,
}

fn base_host_health(kind: EntityKind) -> f64 {
    match kind {
        EntityKind::IronGolem => 100.0,
        EntityKind::SnowGolem => 4.0,
        _ => 20.0,
    }
}

impl SimWorld {
    pub fn new() -> Self {
        Self::with_worlds(&["world"])
    }

    pub fn with_worlds(names: &[&str]) -> Self {
        let mut sim = Self::default();
        for name in names {
            sim.worlds.insert((*name).to_string());
        }
        sim
    }

    pub fn add_world(&mut self, name: &str) {
        self.worlds.insert(name.to_string());
    }

    fn entity(&self, id: &EntityId) -> Option<&SimEntity> {
        self.entities.get(id).filter(|entity| entity.alive)
    }

    fn entity_mut(&mut self, id: &EntityId) -> Option<&mut SimEntity> {
        self.entities.get_mut(id).filter(|entity| entity.alive)
    }

    // A dead-but-present entity (a corpse with a death event in flight)
    // still carries its attributes and vitals.
    fn raw(&self, id: &EntityId) -> Option<&SimEntity> {
        self.entities.get(id)
    }

    fn raw_mut(&mut self, id: &EntityId) -> Option<&mut SimEntity> {
        self.entities.get_mut(id)
    }

    /// Push an entity off its position, as a piston or explosion would.
    pub fn displace(&mut self, id: &EntityId, delta: Vec3) {
        if let Some(entity) = self.entity_mut(id) {
            entity.position.x += delta.x;
            entity.position.y += delta.y;
            entity.position.z += delta.z;
            entity.velocity = delta;
        }
    }

    pub fn velocity(&self, id: &EntityId) -> Option<Vec3> {
        self.entity(id).map(|entity| entity.velocity)
    }

    pub fn kind(&self, id: &EntityId) -> Option<EntityKind> {
        self.entity(id).map(|entity| entity.kind)
    }

    pub fn display_name(&self, id: &EntityId) -> Option<String> {
        self.entity(id).and_then(|entity| entity.display_name.clone())
    }

    pub fn is_silent(&self, id: &EntityId) -> Option<bool> {
        self.entity(id).map(|entity| entity.settings.silent)
    }

    pub fn effects(&self) -> &[(EntityId, CosmeticEffect)] {
        &self.effects
    }

    pub fn clear_effects(&mut self) {
        self.effects.clear();
    }

    /// Kill the entity outright, bypassing the damage pipeline. Models the
    /// host-internal shortcut the death interception has to survive.
    pub fn force_kill(&mut self, id: &EntityId) {
        if let Some(entity) = self.entities.get_mut(id) {
            entity.alive = false;
            entity.host_health = 0.0;
        }
    }
}

impl EntityHost for SimWorld {
    fn has_world(&self, world: &str) -> bool {
        self.worlds.contains(world)
    }

    fn spawn_entity(
        &mut self,
        anchor: &Anchor,
        kind: EntityKind,
        settings: &SpawnSettings,
    ) -> Option<EntityId> {
        if !self.worlds.contains(&anchor.world) {
            return None;
        }
        self.next_entity_id += 1;
        let id = EntityId(format!("entity_{}", self.next_entity_id));
        let host_max_health = base_host_health(kind);
        self.entities.insert(
            id.clone(),
            SimEntity {
                kind,
                world: anchor.world.clone(),
                position: anchor.position(),
                yaw: anchor.yaw,
                pitch: anchor.pitch,
                velocity: Vec3::ZERO,
                alive: true,
                settings: *settings,
                host_max_health,
                host_health: host_max_health,
                display_name: None,
                attrs_f64: HashMap::new(),
                attrs_bool: HashMap::new(),
                attrs_string: HashMap::new(),
            },
        );
        Some(id)
    }

    fn despawn_entity(&mut self, entity: &EntityId) {
        self.entities.remove(entity);
    }

    fn is_alive(&self, entity: &EntityId) -> bool {
        self.entity(entity).is_some()
    }

    fn teleport(&mut self, entity: &EntityId, anchor: &Anchor) {
        let world_known = self.worlds.contains(&anchor.world);
        if let Some(found) = self.entity_mut(entity) {
            if world_known {
                found.world = anchor.world.clone();
            }
            found.position = anchor.position();
            found.yaw = anchor.yaw;
            found.pitch = anchor.pitch;
        }
    }

    fn position(&self, entity: &EntityId) -> Option<Vec3> {
        self.entity(entity).map(|found| found.position)
    }

    fn zero_velocity(&mut self, entity: &EntityId) {
        if let Some(found) = self.entity_mut(entity) {
            found.velocity = Vec3::ZERO;
        }
    }

    fn find_entity(&self, uuid: &str, world: &str) -> Option<EntityId> {
        let id = EntityId(uuid.to_string());
        self.entity(&id)
            .filter(|found| found.world == world)
            .map(|_| id)
    }

    fn set_attr_f64(&mut self, entity: &EntityId, key: &str, value: f64) {
        if let Some(found) = self.raw_mut(entity) {
            found.attrs_f64.insert(key.to_string(), value);
        }
    }

    fn attr_f64(&self, entity: &EntityId, key: &str) -> Option<f64> {
        self.raw(entity).and_then(|found| found.attrs_f64.get(key).copied())
    }

    fn set_attr_bool(&mut self, entity: &EntityId, key: &str, value: bool) {
        if let Some(found) = self.raw_mut(entity) {
            found.attrs_bool.insert(key.to_string(), value);
        }
    }

    fn attr_bool(&self, entity: &EntityId, key: &str) -> Option<bool> {
        self.raw(entity).and_then(|found| found.attrs_bool.get(key).copied())
    }

    fn set_attr_string(&mut self, entity: &EntityId, key: &str, value: &str) {
        if let Some(found) = self.raw_mut(entity) {
            found.attrs_string.insert(key.to_string(), value.to_string());
        }
    }

    fn attr_string(&self, entity: &EntityId, key: &str) -> Option<String> {
        self.raw(entity).and_then(|found| found.attrs_string.get(key).cloned())
    }

    fn host_max_health(&self, entity: &EntityId) -> Option<f64> {
        self.raw(entity).map(|found| found.host_max_health)
    }

    fn host_health(&self, entity: &EntityId) -> Option<f64> {
        self.raw(entity).map(|found| found.host_health)
    }

    fn set_host_health(&mut self, entity: &EntityId, value: f64) {
        if let Some(found) = self.raw_mut(entity) {
            found.host_health = value.clamp(0.0, found.host_max_health);
            // Restoring positive health pulls a dead-but-present entity
            // back, as the host does when a death is intercepted.
            if found.host_health > 0.0 {
                found.alive = true;
            }
        }
    }

    fn set_display_name(&mut self, entity: &EntityId, name: Option<&str>) {
        if let Some(found) = self.entity_mut(entity) {
            found.display_name = name.map(|value| value.to_string());
        }
    }

    fn play_effect(&mut self, entity: &EntityId, effect: CosmeticEffect) {
        if self.is_alive(entity) {
            self.effects.push((entity.clone(), effect));
        }
    }
}
