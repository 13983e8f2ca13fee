pub mod chat;
pub mod commands;
pub mod config;
pub mod constants;
pub mod cooldowns;
pub mod host;
pub mod rng;
pub mod scarecrow;
pub mod sim_world;
pub mod snapshot_store;
pub mod types;
