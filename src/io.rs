//! JSON records exchanged with the load and save collaborators.
//!
//! The document shape is `{"polygons": [...], "version": n, "lastModified": ms}`.
//! Polygons may also arrive with their holes nested under `"holes"` and the
//! label under `"class"`, the way the segmentation service emits them; saved
//! documents are always flat.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FormatError, StoreError};
use crate::math::Point2;
use crate::model::{Polygon, PolygonId, PolygonKind, SegmentationState};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub x: f64,
    pub y: f64,
}

impl From<PointRecord> for Point2 {
    fn from(p: PointRecord) -> Self {
        Point2::new(p.x, p.y)
    }
}

impl From<&Point2> for PointRecord {
    fn from(p: &Point2) -> Self {
        Self { x: p.x, y: p.y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolygonRecord {
    pub id: String,
    pub points: Vec<PointRecord>,
    #[serde(rename = "type", default)]
    pub kind: PolygonKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
    #[serde(default, alias = "class", skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Nested holes; flattened on load, never written.
    #[serde(default, skip_serializing)]
    pub holes: Vec<PolygonRecord>,
}

fn visible_by_default() -> bool {
    true
}

impl From<&Polygon> for PolygonRecord {
    fn from(polygon: &Polygon) -> Self {
        Self {
            id: polygon.id().as_str().to_owned(),
            points: polygon.points().iter().map(PointRecord::from).collect(),
            kind: polygon.kind(),
            parent_id: polygon.parent_id().map(|id| id.as_str().to_owned()),
            color: polygon.color().map(str::to_owned),
            visible: polygon.is_visible(),
            label: polygon.label().map(str::to_owned),
            holes: Vec::new(),
        }
    }
}

impl TryFrom<PolygonRecord> for Polygon {
    type Error = StoreError;

    fn try_from(record: PolygonRecord) -> Result<Self, Self::Error> {
        let points = record.points.into_iter().map(Point2::from).collect();
        let mut polygon = Polygon::new(record.id, points)?;
        polygon.set_kind(record.kind, record.parent_id.map(PolygonId::from));
        polygon.set_color(record.color);
        polygon.set_visible(record.visible);
        polygon.set_label(record.label);
        Ok(polygon)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateRecord {
    pub polygons: Vec<PolygonRecord>,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub last_modified: u64,
}

impl From<&SegmentationState> for StateRecord {
    fn from(state: &SegmentationState) -> Self {
        Self {
            polygons: state.iter().map(PolygonRecord::from).collect(),
            version: state.version(),
            last_modified: state.last_modified(),
        }
    }
}

impl StateRecord {
    /// Converts the record into a validated state for `image_id`.
    ///
    /// Nested holes are placed right after their parent and linked to it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidParent` for a hole that nests holes of its
    /// own, otherwise the `StoreError` of the first polygon or invariant that
    /// fails.
    pub fn into_state(self, image_id: impl Into<String>) -> Result<SegmentationState, StoreError> {
        let mut flat = Vec::with_capacity(self.polygons.len());
        for mut record in self.polygons {
            let holes = std::mem::take(&mut record.holes);
            let parent = record.id.clone();
            flat.push(record);
            for mut hole in holes {
                if !hole.holes.is_empty() {
                    return Err(StoreError::InvalidParent {
                        polygon: hole.id.into(),
                        reason: "holes cannot contain holes",
                    });
                }
                hole.kind = PolygonKind::Internal;
                hole.parent_id.get_or_insert_with(|| parent.clone());
                flat.push(hole);
            }
        }
        let polygons = flat
            .into_iter()
            .map(Polygon::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SegmentationState::from_polygons(image_id, polygons)?
            .with_version(self.version)
            .with_last_modified(self.last_modified))
    }
}

/// Parses and validates a state document.
///
/// # Errors
///
/// - `FormatError::Json` for malformed JSON or a wrong shape
/// - `FormatError::Invalid` if the polygons break an invariant
pub fn load_state(image_id: &str, json: &str) -> Result<SegmentationState, FormatError> {
    let record: StateRecord = serde_json::from_str(json)?;
    let state = record.into_state(image_id)?;
    debug!(image = image_id, polygons = state.len(), version = state.version(), "loaded state");
    Ok(state)
}

/// Serializes a state as a flat document.
///
/// # Errors
///
/// Returns `FormatError::Json` if serialization fails.
pub fn save_state(state: &SegmentationState) -> Result<String, FormatError> {
    Ok(serde_json::to_string(&StateRecord::from(state))?)
}
