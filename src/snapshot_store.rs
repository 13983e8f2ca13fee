use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Flat on-disk record that lets the server re-acquire its entity after a
/// restart. The entity's own attribute store stays the durable source of
/// truth for HP; this file only has to recover the reference.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotData {
    pub exists: bool,
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub world: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub pitch: f32,
    #[serde(default)]
    pub hp: f64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub saved_at_iso: String,
}

impl SnapshotData {
    pub fn absent() -> Self {
        Self {
            exists: false,
            uuid: String::new(),
            world: String::new(),
            x: 0.0,
            y: 0.0,
            z: 0.0,
            yaw: 0.0,
            pitch: 0.0,
            hp: 0.0,
            name: String::new(),
            saved_at_iso: String::new(),
        }
    }
}

pub struct SnapshotStore {
    file_path: PathBuf,
}

impl SnapshotStore {
    pub fn new(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Returns `None` when the file is absent, unreadable, or records
    /// `exists: false`. No record may be reconstructed in any of those cases.
    pub fn load(&self) -> Option<SnapshotData> {
        let text = match fs::read_to_string(&self.file_path) {
            Ok(value) => value,
            Err(error) => {
                if error.kind() != std::io::ErrorKind::NotFound {
                    eprintln!(
                        "[snapshot-store] failed to read {}: {error}",
                        self.file_path.display()
                    );
                }
                return None;
            }
        };

        let data: SnapshotData = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(error) => {
                eprintln!(
                    "[snapshot-store] failed to parse {}: {error}",
                    self.file_path.display()
                );
                return None;
            }
        };

        if !data.exists {
            return None;
        }
        Some(data)
    }

    /// IO failures are logged and absorbed; in-memory state never rolls back.
    pub fn save(&self, data: &SnapshotData) {
        let mut stamped = data.clone();
        stamped.saved_at_iso = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        if let Some(parent) = self.file_path.parent() {
            if let Err(error) = fs::create_dir_all(parent) {
                eprintln!(
                    "[snapshot-store] failed to create parent dir {}: {error}",
                    parent.display()
                );
                return;
            }
        }

        match serde_json::to_string_pretty(&stamped) {
            Ok(text) => {
                if let Err(error) = fs::write(&self.file_path, text) {
                    eprintln!(
                        "[snapshot-store] failed to write {}: {error}",
                        self.file_path.display()
                    );
                }
            }
            Err(error) => {
                eprintln!(
                    "[snapshot-store] failed to serialize snapshot for {}: {error}",
                    self.file_path.display()
                );
            }
        }
    }

    /// Deletes at most one file; absent file is a no-op.
    pub fn delete(&self) {
        match fs::remove_file(&self.file_path) {
            Ok(()) => {}
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => {
                eprintln!(
                    "[snapshot-store] failed to delete {}: {error}",
                    self.file_path.display()
                );
            }
        }
    }
}
