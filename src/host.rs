use crate::types::{Anchor, EntityId, EntityKind, Vec3};

/// Persistent attribute keys stamped onto the tracked entity itself, so
/// identity and HP survive a process restart even without the snapshot file.
pub const ATTR_MARKER: &str = "scarecrow_marker";
pub const ATTR_HP: &str = "scarecrow_hp";
pub const ATTR_MAX_HP: &str = "scarecrow_max_hp";
pub const ATTR_NAME: &str = "scarecrow_name";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CosmeticEffect {
    HurtSound,
    DamageParticles,
}

#[derive(Clone, Copy, Debug)]
pub struct SpawnSettings {
    pub ai: bool,
    pub persistent: bool,
    pub remove_when_far_away: bool,
    pub silent: bool,
    pub invulnerable: bool,
    pub collidable: bool,
}

/// The host-provided entity primitives the core is built against.
///
/// The game host owns every live entity; the core only holds ids and talks
/// to the host through this seam. Whether an entity "is ours" is always
/// decided by the marker attribute, never by entity type or identity of the
/// in-memory record.
pub trait EntityHost {
    fn has_world(&self, world: &str) -> bool;

    fn spawn_entity(
        &mut self,
        anchor: &Anchor,
        kind: EntityKind,
        settings: &SpawnSettings,
    ) -> Option<EntityId>;
    fn despawn_entity(&mut self, entity: &EntityId);
    fn is_alive(&self, entity: &EntityId) -> bool;

    fn teleport(&mut self, entity: &EntityId, anchor: &Anchor);
    fn position(&self, entity: &EntityId) -> Option<Vec3>;
    fn zero_velocity(&mut self, entity: &EntityId);

    /// Resolve a previously snapshotted entity reference in the named world.
    fn find_entity(&self, uuid: &str, world: &str) -> Option<EntityId>;

    // Per-entity persistent key/value attribute store.
    fn set_attr_f64(&mut self, entity: &EntityId, key: &str, value: f64);
    fn attr_f64(&self, entity: &EntityId, key: &str) -> Option<f64>;
    fn set_attr_bool(&mut self, entity: &EntityId, key: &str, value: bool);
    fn attr_bool(&self, entity: &EntityId, key: &str) -> Option<bool>;
    fn set_attr_string(&mut self, entity: &EntityId, key: &str, value: &str);
    fn attr_string(&self, entity: &EntityId, key: &str) -> Option<String>;

    // Host-visible vitals and display.
    fn host_max_health(&self, entity: &EntityId) -> Option<f64>;
    fn host_health(&self, entity: &EntityId) -> Option<f64>;
    fn set_host_health(&mut self, entity: &EntityId, value: f64);
    fn set_display_name(&mut self, entity: &EntityId, name: Option<&str>);

    /// Best-effort cosmetic side channel; failures are not reported.
    fn play_effect(&mut self, entity: &EntityId, effect: CosmeticEffect);
}
