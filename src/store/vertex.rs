use super::{edit_points, StoreResult};
use crate::error::{GeometryError, StoreError};
use crate::math::polygon_2d::{area, dedup_ring};
use crate::math::Point2;
use crate::model::{Polygon, PolygonId, SegmentationState};

fn check_index(polygon: &Polygon, index: usize, len: usize) -> StoreResult<()> {
    if index >= len {
        return Err(StoreError::VertexOutOfRange {
            polygon: polygon.id().clone(),
            index,
            len: polygon.points().len(),
        });
    }
    Ok(())
}

/// Inserts `point` before vertex `index`; `index == len` appends.
///
/// # Errors
///
/// Returns `StoreError::PolygonNotFound` or `StoreError::VertexOutOfRange`.
pub fn add_vertex(
    state: &SegmentationState,
    id: &PolygonId,
    index: usize,
    point: Point2,
) -> StoreResult<SegmentationState> {
    edit_points(state, id, |polygon| {
        check_index(polygon, index, polygon.points().len() + 1)?;
        let mut points = polygon.points().to_vec();
        points.insert(index, point);
        Ok(points)
    })
}

/// Removes vertex `index`.
///
/// # Errors
///
/// Returns `StoreError::TooFewPoints` if the polygon would drop below 3
/// points, or `StoreError::VertexOutOfRange`.
pub fn delete_vertex(
    state: &SegmentationState,
    id: &PolygonId,
    index: usize,
) -> StoreResult<SegmentationState> {
    edit_points(state, id, |polygon| {
        check_index(polygon, index, polygon.points().len())?;
        if polygon.points().len() <= 3 {
            return Err(StoreError::TooFewPoints {
                polygon: id.clone(),
            });
        }
        let mut points = polygon.points().to_vec();
        points.remove(index);
        Ok(points)
    })
}

/// Moves vertex `index` to `point`.
///
/// # Errors
///
/// Returns `StoreError::PolygonNotFound` or `StoreError::VertexOutOfRange`.
pub fn move_vertex(
    state: &SegmentationState,
    id: &PolygonId,
    index: usize,
    point: Point2,
) -> StoreResult<SegmentationState> {
    edit_points(state, id, |polygon| {
        check_index(polygon, index, polygon.points().len())?;
        let mut points = polygon.points().to_vec();
        points[index] = point;
        Ok(points)
    })
}

/// Inserts a copy of vertex `index` directly after it.
///
/// # Errors
///
/// Returns `StoreError::PolygonNotFound` or `StoreError::VertexOutOfRange`.
pub fn duplicate_vertex(
    state: &SegmentationState,
    id: &PolygonId,
    index: usize,
) -> StoreResult<SegmentationState> {
    edit_points(state, id, |polygon| {
        check_index(polygon, index, polygon.points().len())?;
        let mut points = polygon.points().to_vec();
        points.insert(index + 1, points[index]);
        Ok(points)
    })
}

/// Replaces the boundary between vertices `start` and `end` with `points`,
/// which are ordered from `start` towards `end`.
///
/// Either arc between the two anchors can be the one replaced; the outcome
/// with the larger area is kept, so drawing outside an outline grows it.
///
/// # Errors
///
/// - `StoreError::VertexOutOfRange` if an anchor is out of range
/// - `StoreError::Geometry` if both anchors are the same vertex
/// - `StoreError::TooFewPoints` if neither outcome has 3 distinct points
pub fn replace_vertex_range(
    state: &SegmentationState,
    id: &PolygonId,
    start: usize,
    end: usize,
    points: &[Point2],
) -> StoreResult<SegmentationState> {
    edit_points(state, id, |polygon| {
        let len = polygon.points().len();
        check_index(polygon, start, len)?;
        check_index(polygon, end, len)?;
        if start == end {
            return Err(GeometryError::Degenerate(
                "start and end anchors must be different vertices".into(),
            )
            .into());
        }

        let outline = polygon.points();
        // Keep end → start, new points run start → end.
        let mut keep_outer = arc(outline, end, start);
        keep_outer.extend_from_slice(points);
        // Keep start → end, new points run back end → start.
        let mut keep_inner = arc(outline, start, end);
        keep_inner.extend(points.iter().rev());

        [dedup_ring(&keep_outer), dedup_ring(&keep_inner)]
            .into_iter()
            .filter(|ring| ring.len() >= 3)
            .max_by(|a, b| area(a).total_cmp(&area(b)))
            .ok_or_else(|| StoreError::TooFewPoints {
                polygon: id.clone(),
            })
    })
}

/// Vertices from `from` to `to` inclusive, walking forward around the ring.
fn arc(points: &[Point2], from: usize, to: usize) -> Vec<Point2> {
    let n = points.len();
    let mut out = Vec::with_capacity(n);
    let mut i = from;
    loop {
        out.push(points[i]);
        if i == to {
            return out;
        }
        i = (i + 1) % n;
    }
}
