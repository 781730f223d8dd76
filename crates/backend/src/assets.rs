use dronenet_shared::models::{DroneRecord, Snapshot, SnapshotSource, StationRecord};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Station and drone records served by the API, loaded once at startup.
pub struct Assets {
    pub stations: Vec<StationRecord>,
    pub drones: Vec<DroneRecord>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&data).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

impl Assets {
    pub fn load(assets_dir: &Path) -> Result<Self, String> {
        let stations: Vec<StationRecord> = read_json(&assets_dir.join("stations.json"))?;
        let drones: Vec<DroneRecord> = read_json(&assets_dir.join("drones.json"))?;

        for s in &stations {
            s.validate()?;
        }
        for d in &drones {
            d.validate()?;
        }

        tracing::info!(
            stations = stations.len(),
            drones = drones.len(),
            "Loaded network snapshot"
        );

        Ok(Assets { stations, drones })
    }

    pub fn find_station(&self, id: &str) -> Option<&StationRecord> {
        self.stations.iter().find(|s| s.id == id)
    }
}

impl SnapshotSource for Assets {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            stations: self.stations.clone(),
            drones: self.drones.clone(),
        }
    }
}
