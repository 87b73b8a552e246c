use crate::error::GeometryError;
use crate::math::intersect_2d::{polygons_intersect, segment_segment_intersect_2d};
use crate::math::polygon_2d::{area, dedup_ring, point_in_polygon, to_counter_clockwise};
use crate::math::{Point2, TOLERANCE};

/// A vertex of a ring augmented with the crossings inserted on its edges.
#[derive(Debug, Clone, Copy)]
struct Node {
    point: Point2,
    crossing: Option<usize>,
}

/// Outer boundary of the union of two simple polygons.
///
/// Both rings are normalized to counter-clockwise winding, crossing points
/// are inserted into both, and the boundary is traced from a vertex of the
/// first ring lying outside the second, switching rings at every crossing.
/// Holes enclosed by the union are not represented in the result.
#[derive(Debug)]
pub struct Union<'a> {
    a: &'a [Point2],
    b: &'a [Point2],
}

impl<'a> Union<'a> {
    /// Creates a new `Union` operation.
    #[must_use]
    pub fn new(a: &'a [Point2], b: &'a [Point2]) -> Self {
        Self { a, b }
    }

    /// Executes the union, returning the merged ring (counter-clockwise).
    ///
    /// # Errors
    ///
    /// - `GeometryError::TooFewPoints` if either ring has fewer than 3 points
    /// - `GeometryError::NoOverlap` if the polygons are disjoint or only
    ///   touch, so that the union would not enclose less than their sum
    /// - `GeometryError::Degenerate` if the boundary cannot be traced
    pub fn execute(&self) -> Result<Vec<Point2>, GeometryError> {
        let a = to_counter_clockwise(&dedup_ring(self.a));
        let b = to_counter_clockwise(&dedup_ring(self.b));
        for ring in [&a, &b] {
            if ring.len() < 3 {
                return Err(GeometryError::TooFewPoints(ring.len()));
            }
        }

        if !polygons_intersect(&a, &b) {
            return Err(GeometryError::NoOverlap);
        }

        let (ring_a, ring_b, crossings) = augment(&a, &b);
        if crossings == 0 {
            if b.iter().all(|p| point_in_polygon(&a, p)) {
                return Ok(a);
            }
            if a.iter().all(|p| point_in_polygon(&b, p)) {
                return Ok(b);
            }
            return Err(GeometryError::NoOverlap);
        }

        let Some(start) = ring_a
            .iter()
            .position(|n| n.crossing.is_none() && !point_in_polygon(&b, &n.point))
        else {
            // Every vertex of `a` is on or inside `b`.
            return Ok(b);
        };

        let merged = dedup_ring(&trace(&ring_a, &ring_b, start, crossings)?);
        let merged_area = area(&merged);
        let (area_a, area_b) = (area(&a), area(&b));
        if merged_area > area_a + area_b - TOLERANCE {
            // Touching at a vertex or along an edge traces a pinched ring.
            return Err(GeometryError::NoOverlap);
        }
        if merged.len() < 3 || merged_area + TOLERANCE < area_a.max(area_b) {
            return Err(GeometryError::Degenerate("union boundary could not be traced".into()));
        }
        Ok(merged)
    }
}

/// Inserts every edge/edge crossing into both rings.
///
/// Returns the augmented rings and the number of crossings.
fn augment(a: &[Point2], b: &[Point2]) -> (Vec<Node>, Vec<Node>, usize) {
    let (na, nb) = (a.len(), b.len());
    let mut on_a: Vec<Vec<(f64, usize)>> = vec![Vec::new(); na];
    let mut on_b: Vec<Vec<(f64, usize)>> = vec![Vec::new(); nb];
    let mut points = Vec::new();

    for i in 0..na {
        for k in 0..nb {
            let hit = segment_segment_intersect_2d(&a[i], &a[(i + 1) % na], &b[k], &b[(k + 1) % nb]);
            let Some((point, t, u)) = hit else {
                continue;
            };
            // Edge ends are reported again as the next edge's start.
            if t > 1.0 - TOLERANCE || u > 1.0 - TOLERANCE {
                continue;
            }
            let id = points.len();
            points.push(point);
            on_a[i].push((t, id));
            on_b[k].push((u, id));
        }
    }

    let build = |ring: &[Point2], edges: &mut [Vec<(f64, usize)>]| {
        let mut nodes = Vec::with_capacity(ring.len() + points.len());
        for (vertex, crossings) in ring.iter().zip(edges.iter_mut()) {
            nodes.push(Node {
                point: *vertex,
                crossing: None,
            });
            crossings.sort_by(|x, y| x.0.total_cmp(&y.0));
            nodes.extend(crossings.iter().map(|&(_, id)| Node {
                point: points[id],
                crossing: Some(id),
            }));
        }
        nodes
    };
    let ring_a = build(a, &mut on_a);
    let ring_b = build(b, &mut on_b);
    (ring_a, ring_b, points.len())
}

/// Walks the outer boundary, switching rings at each crossing.
fn trace(
    ring_a: &[Node],
    ring_b: &[Node],
    start: usize,
    crossings: usize,
) -> Result<Vec<Point2>, GeometryError> {
    let position = |ring: &[Node]| {
        let mut pos = vec![0; crossings];
        for (i, node) in ring.iter().enumerate() {
            if let Some(id) = node.crossing {
                pos[id] = i;
            }
        }
        pos
    };
    let pos_a = position(ring_a);
    let pos_b = position(ring_b);

    let mut out = Vec::new();
    let (mut on_a, mut idx) = (true, start);
    for _ in 0..=(ring_a.len() + ring_b.len()) {
        let ring = if on_a { ring_a } else { ring_b };
        let node = ring[idx];
        out.push(node.point);
        if let Some(id) = node.crossing {
            on_a = !on_a;
            idx = if on_a { pos_a[id] } else { pos_b[id] };
        }
        let ring = if on_a { ring_a } else { ring_b };
        idx = (idx + 1) % ring.len();
        if on_a && idx == start {
            return Ok(out);
        }
    }
    Err(GeometryError::Degenerate("union boundary did not close".into()))
}
