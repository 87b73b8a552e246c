use tracing::debug;

use super::{finish, StoreResult, ID_PREFIX};
use crate::error::StoreError;
use crate::math::{Point2, Vector2};
use crate::model::{Polygon, PolygonId, PolygonKind, SegmentationState};
use crate::operations::{duplicate_with_offset, Simplify, Slice, Union};

/// Adds a polygon on top of the draw order.
///
/// # Errors
///
/// Returns `StoreError::DuplicateId` if the id is taken, or a validation
/// error if an internal polygon's parent is missing.
pub fn add_polygon(state: &SegmentationState, polygon: Polygon) -> StoreResult<SegmentationState> {
    let mut next = state.clone();
    next.push(polygon)?;
    finish(next)
}

/// Builds an external polygon from `points` under a fresh id and adds it on
/// top. Returns the new state and the id.
///
/// # Errors
///
/// Returns `StoreError::Geometry` if the points do not form a polygon.
pub fn create_polygon(
    state: &SegmentationState,
    points: Vec<Point2>,
) -> StoreResult<(SegmentationState, PolygonId)> {
    let mut next = state.clone();
    let id = next.fresh_id(ID_PREFIX);
    next.push(Polygon::new(id.clone(), points)?)?;
    debug!(polygon = %id, "created polygon");
    Ok((finish(next)?, id))
}

/// Deletes a polygon together with the holes parented to it.
///
/// # Errors
///
/// Returns `StoreError::PolygonNotFound` if the id is unknown.
pub fn delete_polygon(state: &SegmentationState, id: &PolygonId) -> StoreResult<SegmentationState> {
    state.polygon(id)?;
    let children: Vec<PolygonId> = state.children_of(id).map(|c| c.id().clone()).collect();
    let mut next = state.clone();
    next.remove(id)?;
    for child in &children {
        next.remove(child)?;
    }
    debug!(polygon = %id, holes = children.len(), "deleted polygon");
    finish(next)
}

/// Copies a polygon under a fresh id, shifted by `offset`, and places the
/// copy on top. Returns the new state and the copy's id.
///
/// # Errors
///
/// Returns `StoreError::PolygonNotFound` if the id is unknown.
pub fn duplicate_polygon(
    state: &SegmentationState,
    id: &PolygonId,
    offset: Vector2,
) -> StoreResult<(SegmentationState, PolygonId)> {
    let original = state.polygon(id)?;
    let mut next = state.clone();
    let new_id = next.fresh_id(ID_PREFIX);
    next.push(duplicate_with_offset(original, new_id.clone(), offset))?;
    Ok((finish(next)?, new_id))
}

/// Sets the display color.
///
/// # Errors
///
/// Returns `StoreError::PolygonNotFound` if the id is unknown.
pub fn set_color(
    state: &SegmentationState,
    id: &PolygonId,
    color: impl Into<String>,
) -> StoreResult<SegmentationState> {
    let mut next = state.clone();
    next.polygon_mut(id)?.set_color(Some(color.into()));
    finish(next)
}

/// Shows or hides a polygon.
///
/// # Errors
///
/// Returns `StoreError::PolygonNotFound` if the id is unknown.
pub fn set_visible(
    state: &SegmentationState,
    id: &PolygonId,
    visible: bool,
) -> StoreResult<SegmentationState> {
    let mut next = state.clone();
    next.polygon_mut(id)?.set_visible(visible);
    finish(next)
}

/// Sets or clears the class label.
///
/// # Errors
///
/// Returns `StoreError::PolygonNotFound` if the id is unknown.
pub fn set_label(
    state: &SegmentationState,
    id: &PolygonId,
    label: Option<String>,
) -> StoreResult<SegmentationState> {
    let mut next = state.clone();
    next.polygon_mut(id)?.set_label(label);
    finish(next)
}

/// Cuts a polygon in two along the segment `start → end`.
///
/// Both halves inherit the original's attributes and get fresh ids; they
/// take the original's draw position. Holes of a sliced outline are moved to
/// the half containing their first vertex.
///
/// # Errors
///
/// Returns `StoreError::PolygonNotFound` if the id is unknown, or
/// `StoreError::Geometry` if the cut is rejected.
pub fn slice_polygon(
    state: &SegmentationState,
    id: &PolygonId,
    start: Point2,
    end: Point2,
) -> StoreResult<(SegmentationState, [PolygonId; 2])> {
    let original = state.polygon(id)?;
    let (first, second) = Slice::new(original.points(), start, end).execute()?;

    let mut next = state.clone();
    let id_a = next.fresh_id(ID_PREFIX);
    let id_b = next.fresh_id(ID_PREFIX);
    let half_a = original.with_points(first)?.with_id(id_a.clone());
    let half_b = original.with_points(second)?.with_id(id_b.clone());

    if original.kind() == PolygonKind::External {
        for child in state.children_of(id) {
            let anchor = child.points()[0];
            let parent = if half_b.contains_point(&anchor) && !half_a.contains_point(&anchor) {
                &id_b
            } else {
                &id_a
            };
            next.polygon_mut(child.id())?.set_parent(Some(parent.clone()));
        }
    }

    next.replace(id, half_a)?;
    let position = next.position(&id_a).map_or(next.len(), |p| p + 1);
    next.insert_at(position, half_b)?;
    debug!(polygon = %id, first = %id_a, second = %id_b, "sliced polygon");
    Ok((finish(next)?, [id_a, id_b]))
}

/// Reduces the vertex count of a polygon with Douglas–Peucker.
///
/// A reduction that would leave fewer than 3 points is skipped and the
/// input state is returned as is.
///
/// # Errors
///
/// Returns `StoreError::PolygonNotFound` if the id is unknown.
pub fn simplify_polygon(
    state: &SegmentationState,
    id: &PolygonId,
    tolerance: f64,
) -> StoreResult<SegmentationState> {
    let polygon = state.polygon(id)?;
    let reduced = Simplify::new(polygon.points(), tolerance).execute();
    if reduced.len() == polygon.points().len() {
        return Ok(state.clone());
    }
    debug!(polygon = %id, from = polygon.points().len(), to = reduced.len(), "simplified polygon");
    let mut next = state.clone();
    next.replace(id, polygon.with_points(reduced)?)?;
    finish(next)
}

/// Merges polygon `b` into polygon `a`.
///
/// `a` keeps its id, attributes and draw position and receives the union
/// outline; `b` is removed and its holes are reparented to `a`.
///
/// # Errors
///
/// - `StoreError::PolygonNotFound` if either id is unknown
/// - `StoreError::SelfCombine` if both ids are the same
/// - `StoreError::Geometry` if the polygons do not overlap
pub fn combine_polygons(
    state: &SegmentationState,
    a: &PolygonId,
    b: &PolygonId,
) -> StoreResult<SegmentationState> {
    if a == b {
        return Err(StoreError::SelfCombine(a.clone()));
    }
    let poly_a = state.polygon(a)?;
    let poly_b = state.polygon(b)?;
    let merged = Union::new(poly_a.points(), poly_b.points()).execute()?;

    let mut next = state.clone();
    next.replace(a, poly_a.with_points(merged)?)?;
    next.remove(b)?;
    for child in state.children_of(b) {
        next.polygon_mut(child.id())?.set_parent(Some(a.clone()));
    }
    debug!(target_polygon = %a, merged = %b, "combined polygons");
    finish(next)
}
