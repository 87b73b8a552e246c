//! Pure state transitions.
//!
//! Every function takes the current [`SegmentationState`] by reference and
//! returns a new, validated state; the input is never modified. Failures
//! leave nothing behind: the caller still holds the untouched input.

mod polygon;
mod vertex;

pub use polygon::{
    add_polygon, combine_polygons, create_polygon, delete_polygon, duplicate_polygon, set_color,
    set_label, set_visible, simplify_polygon, slice_polygon,
};
pub use vertex::{add_vertex, delete_vertex, duplicate_vertex, move_vertex, replace_vertex_range};

use crate::error::{GeometryError, StoreError};
use crate::math::Point2;
use crate::model::{Polygon, PolygonId, SegmentationState};

/// Prefix of ids generated for new polygons.
pub const ID_PREFIX: &str = "polygon";

/// Result alias for store transitions.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Validates a freshly built state and stamps it as a new version.
fn finish(mut state: SegmentationState) -> StoreResult<SegmentationState> {
    state.validate()?;
    state.touch();
    Ok(state)
}

/// Replaces the point list of one polygon with the output of `edit`.
fn edit_points<F>(state: &SegmentationState, id: &PolygonId, edit: F) -> StoreResult<SegmentationState>
where
    F: FnOnce(&Polygon) -> StoreResult<Vec<Point2>>,
{
    let polygon = state.polygon(id)?;
    let points = edit(polygon)?;
    let updated = polygon.with_points(points).map_err(|err| match err {
        GeometryError::TooFewPoints(_) => StoreError::TooFewPoints {
            polygon: id.clone(),
        },
        other => other.into(),
    })?;
    let mut next = state.clone();
    next.replace(id, updated)?;
    finish(next)
}
