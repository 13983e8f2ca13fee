use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub String);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// The position a tracked entity is pinned to: world, coordinates and facing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
}

impl Anchor {
    pub fn new(world: &str, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.to_string(),
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    pub fn format_short(&self) -> String {
        format!("{:.1}, {:.1}, {:.1} in {}", self.x, self.y, self.z, self.world)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Villager,
    ArmorStand,
    Zombie,
    Skeleton,
    Cow,
    Sheep,
    IronGolem,
    SnowGolem,
}

impl EntityKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "VILLAGER" => Some(Self::Villager),
            "ARMOR_STAND" => Some(Self::ArmorStand),
            "ZOMBIE" => Some(Self::Zombie),
            "SKELETON" => Some(Self::Skeleton),
            "COW" => Some(Self::Cow),
            "SHEEP" => Some(Self::Sheep),
            "IRON_GOLEM" => Some(Self::IronGolem),
            "SNOW_GOLEM" => Some(Self::SnowGolem),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Villager => "VILLAGER",
            Self::ArmorStand => "ARMOR_STAND",
            Self::Zombie => "ZOMBIE",
            Self::Skeleton => "SKELETON",
            Self::Cow => "COW",
            Self::Sheep => "SHEEP",
            Self::IronGolem => "IRON_GOLEM",
            Self::SnowGolem => "SNOW_GOLEM",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct StatusView {
    pub name: String,
    pub hp: f64,
    #[serde(rename = "maxHp")]
    pub max_hp: f64,
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}
