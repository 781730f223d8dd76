use std::path::{Path, PathBuf};

use dronenet_shared::calc::PlannerConfig;

/// Server settings read from the environment at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub assets_dir: PathBuf,
    /// Optional JSON file with planner overrides.
    pub planner_config: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 3000,
            assets_dir: PathBuf::from("assets"),
            planner_config: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup so tests don't touch the
    /// process environment.
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = ServerConfig::default();
        if let Some(port) = get("PORT") {
            config.port = port
                .parse()
                .map_err(|e| format!("Invalid PORT {:?}: {}", port, e))?;
        }
        if let Some(dir) = get("ASSETS_DIR") {
            config.assets_dir = PathBuf::from(dir);
        }
        config.planner_config = get("PLANNER_CONFIG")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        Ok(config)
    }

    pub fn load_planner_config(&self) -> Result<PlannerConfig, String> {
        match &self.planner_config {
            Some(path) => read_planner_config(path),
            None => Ok(PlannerConfig::default()),
        }
    }
}

fn read_planner_config(path: &Path) -> Result<PlannerConfig, String> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let config: PlannerConfig = serde_json::from_str(&data)
        .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;
    config
        .validate()
        .map_err(|e| format!("Invalid planner config in {}: {}", path.display(), e))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = ServerConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.load_planner_config().unwrap(), PlannerConfig::default());
    }

    #[test]
    fn test_reads_port_and_assets_dir() {
        let config =
            ServerConfig::from_vars(vars(&[("PORT", "8080"), ("ASSETS_DIR", "/srv/data")])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.assets_dir, PathBuf::from("/srv/data"));
    }

    #[test]
    fn test_rejects_bad_port() {
        assert!(ServerConfig::from_vars(vars(&[("PORT", "eighty")])).is_err());
    }

    #[test]
    fn test_partial_planner_override_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("planner.json");
        std::fs::write(&path, r#"{"minimumReservePct": 20.0}"#).unwrap();

        let config =
            ServerConfig::from_vars(vars(&[("PLANNER_CONFIG", path.to_str().unwrap())])).unwrap();
        let planner = config.load_planner_config().unwrap();
        assert_eq!(planner.minimum_reserve_pct, 20.0);
        assert_eq!(planner.average_speed_kmh, 21.0);
    }

    #[test]
    fn test_invalid_planner_override_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("planner.json");
        std::fs::write(&path, r#"{"averageSpeedKmh": 0.0}"#).unwrap();

        let config =
            ServerConfig::from_vars(vars(&[("PLANNER_CONFIG", path.to_str().unwrap())])).unwrap();
        assert!(config.load_planner_config().is_err());
    }
}
