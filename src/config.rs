use serde::{Deserialize, Serialize};

use crate::math::Vector2;

/// Configuration for the undo/redo history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HistoryConfig {
    /// Maximum number of history entries to keep. 0 = unlimited.
    pub max_entries: usize,
    /// Whether `clear_history` also empties the named-snapshot registry.
    pub clear_snapshots_on_clear: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            clear_snapshots_on_clear: false,
        }
    }
}

impl HistoryConfig {
    /// Creates config with unlimited history.
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            max_entries: 0,
            ..Self::default()
        }
    }

    /// Creates config with a specific limit.
    #[must_use]
    pub fn with_limit(max: usize) -> Self {
        Self {
            max_entries: max,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_clear_snapshots(mut self, clear: bool) -> Self {
        self.clear_snapshots_on_clear = clear;
        self
    }
}

/// Configuration for viewport culling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CullingConfig {
    /// Culling applies once the polygon count reaches this; below it every
    /// polygon is drawn.
    pub threshold: usize,
    /// World-space margin added around the viewport.
    pub margin: f64,
}

impl Default for CullingConfig {
    fn default() -> Self {
        Self {
            threshold: 50,
            margin: 0.0,
        }
    }
}

/// Top-level editor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    pub history: HistoryConfig,
    pub culling: CullingConfig,
    /// Shift applied to duplicated polygons, `[dx, dy]`.
    pub duplicate_offset: [f64; 2],
    /// Distance from the first point within which a click closes a new polygon.
    pub close_distance: f64,
    /// Pick radius for vertices, in world units.
    pub vertex_hit_radius: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history: HistoryConfig::default(),
            culling: CullingConfig::default(),
            duplicate_offset: [20.0, 20.0],
            close_distance: 10.0,
            vertex_hit_radius: 8.0,
        }
    }
}

impl EditorConfig {
    /// Parses a configuration document; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed input.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn with_history(mut self, history: HistoryConfig) -> Self {
        self.history = history;
        self
    }

    #[must_use]
    pub fn with_culling(mut self, culling: CullingConfig) -> Self {
        self.culling = culling;
        self
    }

    #[must_use]
    pub fn with_duplicate_offset(mut self, dx: f64, dy: f64) -> Self {
        self.duplicate_offset = [dx, dy];
        self
    }

    #[must_use]
    pub fn duplicate_offset(&self) -> Vector2 {
        Vector2::new(self.duplicate_offset[0], self.duplicate_offset[1])
    }
}
