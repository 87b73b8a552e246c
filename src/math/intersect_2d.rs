use super::polygon_2d::point_in_polygon;
use super::{Point2, TOLERANCE};

/// Bounded segment-segment intersection in 2D.
///
/// Returns `(intersection_point, t, u)` where `t` is the parameter along
/// `a0 → a1` and `u` the parameter along `b0 → b1`, both in `[0, 1]`.
/// Parallel and collinear segments report no intersection.
#[must_use]
pub fn segment_segment_intersect_2d(
    a0: &Point2,
    a1: &Point2,
    b0: &Point2,
    b1: &Point2,
) -> Option<(Point2, f64, f64)> {
    let da = a1 - a0;
    let db = b1 - b0;

    let cross = da.x * db.y - da.y * db.x;
    if cross.abs() < TOLERANCE {
        return None;
    }

    let d = b0 - a0;
    let t = (d.x * db.y - d.y * db.x) / cross;
    let u = (d.x * da.y - d.y * da.x) / cross;

    // Use a small epsilon to include endpoints.
    let eps = TOLERANCE;
    if t >= -eps && t <= 1.0 + eps && u >= -eps && u <= 1.0 + eps {
        let t = t.clamp(0.0, 1.0);
        Some((a0 + da * t, t, u.clamp(0.0, 1.0)))
    } else {
        None
    }
}

/// Returns `true` if two closed polygons overlap.
///
/// Checks vertex containment both ways, then every pair of edges.
#[must_use]
pub fn polygons_intersect(a: &[Point2], b: &[Point2]) -> bool {
    if a.iter().any(|p| point_in_polygon(b, p)) || b.iter().any(|p| point_in_polygon(a, p)) {
        return true;
    }
    let (n, m) = (a.len(), b.len());
    for i in 0..n {
        let (a0, a1) = (&a[i], &a[(i + 1) % n]);
        for k in 0..m {
            if segment_segment_intersect_2d(a0, a1, &b[k], &b[(k + 1) % m]).is_some() {
                return true;
            }
        }
    }
    false
}
