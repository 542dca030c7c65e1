//! Tuning knobs for the collision grid and the wheel contact surface.
//!
//! Defaults reproduce the stock behaviour; a level editor or test harness can
//! override them from a `.toml` or `.ron` file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How a line decides which circles it can touch.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineCulling {
    /// Lines are solid from both sides; contact normals face the circle.
    #[default]
    TwoSided,
    /// Circles whose center lies behind `(-dy, dx)` are skipped. The winding
    /// order of level geometry then decides the solid side.
    OneSided,
}

/// Solver parameters copied into every contact next to the line grip.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub erp: f32,
    pub cfm: f32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self { erp: 0.8, cfm: 0.00001 }
    }
}

/// Collision system configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Smallest allowed cell edge in world units.
    pub min_cell_size: f32,
    /// Upper bound on cells per axis.
    pub max_grid_size: usize,
    /// Padding applied to boxes before mapping them to cells.
    pub cell_epsilon: f32,
    /// Lines shorter than this on both axes are ignored by queries.
    pub degenerate_line_epsilon: f32,
    /// Contacts closer than this on both axes are merged.
    pub contact_merge_distance: f32,
    /// Depths below this are reported as 0.
    pub min_contact_depth: f32,
    pub culling: LineCulling,
    pub wheel_surface: SurfaceConfig,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            min_cell_size: 2.0,
            max_grid_size: 16,
            cell_epsilon: 0.01,
            degenerate_line_epsilon: 0.0001,
            contact_merge_distance: 0.1,
            min_contact_depth: 0.01,
            culling: LineCulling::default(),
            wheel_surface: SurfaceConfig::default(),
        }
    }
}

impl CollisionConfig {
    /// Load a configuration file; the extension selects the format.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let cfg = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&contents)?,
            Some("ron") => Self::from_ron_str(&contents)?,
            _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        };
        log::debug!("loaded collision config from {}", path.display());
        Ok(cfg)
    }

    /// Save to `.toml` or `.ron`.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
            }
            Some("ron") => ron::ser::to_string_pretty(self, Default::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
            _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        };
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = ron::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the grid arithmetic cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_grid_size == 0 {
            return Err(ConfigError::Invalid {
                field: "max_grid_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.min_cell_size > 0.0) {
            return Err(ConfigError::Invalid {
                field: "min_cell_size",
                reason: format!("must be positive, got {}", self.min_cell_size),
            });
        }
        for (field, v) in [
            ("cell_epsilon", self.cell_epsilon),
            ("degenerate_line_epsilon", self.degenerate_line_epsilon),
            ("contact_merge_distance", self.contact_merge_distance),
            ("min_contact_depth", self.min_contact_depth),
        ] {
            if !(v >= 0.0) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be non-negative, got {v}"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_stock_tuning() {
        let c = CollisionConfig::default();
        assert_eq!(c.max_grid_size, 16);
        assert_eq!(c.min_cell_size, 2.0);
        assert_eq!(c.cell_epsilon, 0.01);
        assert_eq!(c.contact_merge_distance, 0.1);
        assert_eq!(c.min_contact_depth, 0.01);
        assert_eq!(c.culling, LineCulling::TwoSided);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let c = CollisionConfig::from_toml_str(
            "max_grid_size = 8\nculling = \"one_sided\"\n[wheel_surface]\nerp = 0.5\n",
        )
        .unwrap();
        assert_eq!(c.max_grid_size, 8);
        assert_eq!(c.culling, LineCulling::OneSided);
        assert_eq!(c.wheel_surface.erp, 0.5);
        assert_eq!(c.wheel_surface.cfm, 0.00001);
        assert_eq!(c.min_cell_size, 2.0);
    }

    #[test]
    fn test_ron_and_invalid_values() {
        let c = CollisionConfig::from_ron_str("(min_cell_size: 4.0)").unwrap();
        assert_eq!(c.min_cell_size, 4.0);
        let err = CollisionConfig::from_toml_str("max_grid_size = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "max_grid_size", .. }));
        assert!(matches!(
            CollisionConfig::from_toml_str("min_cell_size = -1.0"),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_file_round_trip_and_unknown_extension() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("motocol-config-{}.toml", std::process::id()));
        let mut c = CollisionConfig::default();
        c.max_grid_size = 12;
        c.save_to_file(&path).unwrap();
        let loaded = CollisionConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, c);
        let _ = std::fs::remove_file(&path);

        let bad = dir.join("motocol-config.yaml");
        assert!(matches!(
            CollisionConfig::load_from_file(&bad),
            Err(ConfigError::Io(_)) | Err(ConfigError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            c.save_to_file(&bad),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }
}
