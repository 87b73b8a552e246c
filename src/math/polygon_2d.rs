use super::distance_2d::point_to_segment_dist;
use super::{Point2, TOLERANCE};

/// Computes the signed area of a closed polygon (shoelace formula).
///
/// Positive for counter-clockwise winding in a y-up frame, negative for
/// clockwise. In image coordinates (y down) the visual sense is flipped.
#[must_use]
pub fn signed_area(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    sum * 0.5
}

/// Unsigned area of a closed polygon.
#[must_use]
pub fn area(points: &[Point2]) -> f64 {
    signed_area(points).abs()
}

/// Returns `true` if the shoelace sum is negative.
#[must_use]
pub fn is_clockwise(points: &[Point2]) -> bool {
    signed_area(points) < 0.0
}

/// Sum of Euclidean edge lengths, including the closing edge.
#[must_use]
pub fn perimeter(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 2 {
        return 0.0;
    }
    (0..n)
        .map(|i| nalgebra::distance(&points[i], &points[(i + 1) % n]))
        .sum()
}

/// Even-odd point-in-polygon test.
///
/// Boundary policy is inclusive: a point within [`TOLERANCE`] of any edge
/// (vertices included) is reported as inside.
#[must_use]
pub fn point_in_polygon(points: &[Point2], p: &Point2) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    if on_boundary(points, p) {
        return true;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (&points[i], &points[j]);
        if (pi.y > p.y) != (pj.y > p.y) && p.x < (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Returns `true` if `p` lies on an edge of the closed ring.
#[must_use]
pub fn on_boundary(points: &[Point2], p: &Point2) -> bool {
    let n = points.len();
    (0..n).any(|i| point_to_segment_dist(p, &points[i], &points[(i + 1) % n]) <= TOLERANCE)
}

/// Removes consecutive duplicate vertices, including a closing duplicate of
/// the first vertex.
#[must_use]
pub fn dedup_ring(points: &[Point2]) -> Vec<Point2> {
    let mut out: Vec<Point2> = Vec::with_capacity(points.len());
    for p in points {
        let repeated = out
            .last()
            .is_some_and(|last| nalgebra::distance(last, p) <= TOLERANCE);
        if !repeated {
            out.push(*p);
        }
    }
    while out.len() > 1 {
        let (first, last) = (out[0], out[out.len() - 1]);
        if nalgebra::distance(&first, &last) > TOLERANCE {
            break;
        }
        out.pop();
    }
    out
}

/// Returns the ring with counter-clockwise (positive shoelace) winding.
#[must_use]
pub fn to_counter_clockwise(points: &[Point2]) -> Vec<Point2> {
    if is_clockwise(points) {
        points.iter().rev().copied().collect()
    } else {
        points.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn square10() -> Vec<Point2> {
        vec![p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0), p(0.0, 10.0)]
    }

    #[test]
    fn area_and_perimeter_of_square() {
        let pts = square10();
        assert_abs_diff_eq!(area(&pts), 100.0, epsilon = TOLERANCE);
        assert_abs_diff_eq!(perimeter(&pts), 40.0, epsilon = TOLERANCE);
    }

    #[test]
    fn signed_area_winding() {
        let ccw = square10();
        let cw: Vec<Point2> = ccw.iter().rev().copied().collect();
        assert_abs_diff_eq!(signed_area(&ccw), 100.0, epsilon = TOLERANCE);
        assert_abs_diff_eq!(signed_area(&cw), -100.0, epsilon = TOLERANCE);
        assert!(!is_clockwise(&ccw));
        assert!(is_clockwise(&cw));
        assert!(!is_clockwise(&to_counter_clockwise(&cw)));
    }

    #[test]
    fn signed_area_degenerate() {
        assert_abs_diff_eq!(signed_area(&[p(0.0, 0.0), p(1.0, 1.0)]), 0.0);
        assert_abs_diff_eq!(signed_area(&[]), 0.0);
        assert_abs_diff_eq!(perimeter(&[p(1.0, 1.0)]), 0.0);
    }

    #[test]
    fn point_inside_and_outside() {
        let pts = square10();
        assert!(point_in_polygon(&pts, &p(5.0, 5.0)));
        assert!(!point_in_polygon(&pts, &p(15.0, 15.0)));
        assert!(!point_in_polygon(&pts, &p(-0.5, 5.0)));
    }

    #[test]
    fn boundary_points_are_inside() {
        let pts = square10();
        // Edge midpoints on all four sides.
        assert!(point_in_polygon(&pts, &p(5.0, 0.0)));
        assert!(point_in_polygon(&pts, &p(10.0, 5.0)));
        assert!(point_in_polygon(&pts, &p(5.0, 10.0)));
        assert!(point_in_polygon(&pts, &p(0.0, 5.0)));
        // Vertices.
        assert!(point_in_polygon(&pts, &p(0.0, 0.0)));
        assert!(point_in_polygon(&pts, &p(10.0, 10.0)));
    }

    #[test]
    fn concave_polygon_notch() {
        // U shape opening upwards; the notch interior is outside.
        let u = vec![
            p(0.0, 0.0),
            p(9.0, 0.0),
            p(9.0, 9.0),
            p(6.0, 9.0),
            p(6.0, 3.0),
            p(3.0, 3.0),
            p(3.0, 9.0),
            p(0.0, 9.0),
        ];
        assert!(!point_in_polygon(&u, &p(4.5, 6.0)));
        assert!(point_in_polygon(&u, &p(1.5, 6.0)));
        assert!(point_in_polygon(&u, &p(4.5, 1.5)));
    }

    #[test]
    fn dedup_ring_drops_repeats_and_closing_point() {
        let pts = vec![
            p(0.0, 0.0),
            p(0.0, 0.0),
            p(4.0, 0.0),
            p(4.0, 4.0),
            p(0.0, 0.0),
        ];
        let ring = dedup_ring(&pts);
        assert_eq!(ring, vec![p(0.0, 0.0), p(4.0, 0.0), p(4.0, 4.0)]);
    }
}
