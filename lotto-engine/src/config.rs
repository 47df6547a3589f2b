use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::source::FetchPacing;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Nombre de tirages analysés (0 = tout l'historique).
    pub window: u32,
    /// Taille de la fenêtre récente pour les tendances.
    pub recent_window: usize,
    /// Vivier de la stratégie chaude.
    pub hot_pool: usize,
    /// Vivier de la stratégie froide.
    pub cold_pool: usize,
    /// Vivier de chaque moitié de la stratégie équilibrée.
    pub balanced_pool: usize,
    /// Nombre maximal de numéros en hausse retenus.
    pub rising_pool: usize,
    /// Fenêtre des listes chauds/froids.
    pub hot_cold_recent: usize,
    /// Pause après chaque lot de requêtes.
    pub fetch_batch: usize,
    pub fetch_pause_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window: 50,
            recent_window: 10,
            hot_pool: 15,
            cold_pool: 15,
            balanced_pool: 10,
            rising_pool: 10,
            hot_cold_recent: 50,
            fetch_batch: 20,
            fetch_pause_ms: 100,
        }
    }
}

impl AnalysisConfig {
    pub fn pacing(&self) -> FetchPacing {
        FetchPacing {
            batch: self.fetch_batch,
            pause: Duration::from_millis(self.fetch_pause_ms),
        }
    }
}

pub fn save_config(config: &AnalysisConfig, path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_config(path: &Path) -> anyhow::Result<AnalysisConfig> {
    let json = std::fs::read_to_string(path)?;
    let config: AnalysisConfig = serde_json::from_str(&json)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.window, 50);
        assert_eq!(config.recent_window, 10);
        assert_eq!(config.hot_pool, 15);
        assert_eq!(config.cold_pool, 15);
        assert_eq!(config.pacing().pause, Duration::from_millis(100));
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lotto.json");
        let config = AnalysisConfig {
            window: 120,
            ..AnalysisConfig::default()
        };
        save_config(&config, &path).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AnalysisConfig = serde_json::from_str(r#"{"window": 200}"#).unwrap();
        assert_eq!(config.window, 200);
        assert_eq!(config.recent_window, 10);
        assert_eq!(config.fetch_batch, 20);
    }
}
