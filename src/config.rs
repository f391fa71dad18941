//! Configuration types.

use std::path::PathBuf;

use crate::error::ConfigError;

/// Geometry and styling of generated thumbnails.
#[derive(Debug, Clone)]
pub struct ThumbnailConfig {
    /// Element id of the rendered diagram on the host's surface.
    pub target_id: String,
    /// Width of the source coordinate space.
    pub view_box_width: u32,
    /// Height of the source coordinate space.
    pub view_box_height: u32,
    /// Width of the preview image.
    pub width: u32,
    /// Height of the preview image.
    pub height: u32,
    pub background: String,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            target_id: "usm".to_string(),
            view_box_width: 1280,
            view_box_height: 960,
            width: 320,
            height: 240,
            background: "#F5F5F6".to_string(),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Path of the local diagram database.
    pub db_path: PathBuf,
    /// Port the host bridge listens on.
    pub port: u16,
    pub thumbnail: ThumbnailConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/diagrams.db"),
            port: 8080,
            thumbnail: ThumbnailConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Build configuration from `DIAGRAM_SYNC_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = lookup("DIAGRAM_SYNC_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }

        if let Some(port) = lookup("DIAGRAM_SYNC_PORT") {
            config.port = port.parse().map_err(|e| ConfigError::InvalidValue {
                key: "DIAGRAM_SYNC_PORT".to_string(),
                message: format!("{port:?} is not a valid port: {e}"),
            })?;
        }

        if let Some(target) = lookup("DIAGRAM_SYNC_RENDER_TARGET") {
            if target.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "DIAGRAM_SYNC_RENDER_TARGET".to_string(),
                    message: "must not be empty".to_string(),
                });
            }
            config.thumbnail.target_id = target;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = SyncConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.db_path, PathBuf::from("./data/diagrams.db"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.thumbnail.target_id, "usm");
    }

    #[test]
    fn overrides_from_env() {
        let config = SyncConfig::from_lookup(lookup_from(&[
            ("DIAGRAM_SYNC_DB_PATH", "/tmp/d.db"),
            ("DIAGRAM_SYNC_PORT", "9001"),
            ("DIAGRAM_SYNC_RENDER_TARGET", "canvas"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/d.db"));
        assert_eq!(config.port, 9001);
        assert_eq!(config.thumbnail.target_id, "canvas");
    }

    #[test]
    fn rejects_bad_port() {
        let err = SyncConfig::from_lookup(lookup_from(&[("DIAGRAM_SYNC_PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "DIAGRAM_SYNC_PORT"));
    }
}
