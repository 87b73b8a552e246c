use super::Point2;

/// Returns the closest point to `p` on the segment `v → w`, together with
/// its parameter `t ∈ [0, 1]` along the segment.
#[must_use]
pub fn closest_point_on_segment(p: &Point2, v: &Point2, w: &Point2) -> (Point2, f64) {
    let d = w - v;
    let len_sq = d.norm_squared();

    if len_sq < 1e-20 {
        // Degenerate segment (zero length).
        return (*v, 0.0);
    }

    // Project point onto the infinite line, clamp to [0, 1].
    let t = ((p - v).dot(&d) / len_sq).clamp(0.0, 1.0);
    (v + d * t, t)
}

/// Returns the minimum distance from point `p` to the line segment `v → w`.
#[must_use]
pub fn point_to_segment_dist(p: &Point2, v: &Point2, w: &Point2) -> f64 {
    let (closest, _) = closest_point_on_segment(p, v, w);
    nalgebra::distance(p, &closest)
}

/// Finds the edge of a closed ring nearest to `p`.
///
/// Returns `(edge_index, distance)` where edge `i` runs from `points[i]` to
/// `points[(i + 1) % n]`, or `None` for rings with fewer than 2 points.
#[must_use]
pub fn nearest_edge(points: &[Point2], p: &Point2) -> Option<(usize, f64)> {
    let n = points.len();
    if n < 2 {
        return None;
    }
    let mut best: Option<(usize, f64)> = None;
    for i in 0..n {
        let d = point_to_segment_dist(p, &points[i], &points[(i + 1) % n]);
        match best {
            Some((_, bd)) if bd <= d => {}
            _ => best = Some((i, d)),
        }
    }
    best
}
