use crate::error::GeometryError;
use crate::math::intersect_2d::segment_segment_intersect_2d;
use crate::math::polygon_2d::{area, dedup_ring, point_in_polygon};
use crate::math::{Point2, TOLERANCE};

/// A crossing of the cut segment with one boundary edge.
#[derive(Debug, Clone, Copy)]
struct Crossing {
    edge: usize,
    point: Point2,
}

/// Splits a closed polygon in two along the segment `start → end`.
///
/// The cut is the segment between the two picked points, not the infinite
/// line through them, so both points normally lie outside the polygon.
/// A crossing exactly at a vertex is attributed to the edge that starts at
/// that vertex, which keeps it from being counted twice.
#[derive(Debug)]
pub struct Slice<'a> {
    points: &'a [Point2],
    start: Point2,
    end: Point2,
}

impl<'a> Slice<'a> {
    /// Creates a new slice operation.
    #[must_use]
    pub fn new(points: &'a [Point2], start: Point2, end: Point2) -> Self {
        Self { points, start, end }
    }

    /// Executes the slice, returning the two resulting rings.
    ///
    /// The first ring runs from the first crossing (in boundary order) to the
    /// second; the other ring closes the loop.
    ///
    /// # Errors
    ///
    /// - `GeometryError::Degenerate` if the cut has zero length
    /// - `GeometryError::SliceIntersections` unless the cut crosses the
    ///   boundary exactly twice
    /// - `GeometryError::DegenerateSlice` if the chord between the crossings
    ///   runs outside the polygon, or if either side has fewer than 3
    ///   distinct points or no area
    pub fn execute(&self) -> Result<(Vec<Point2>, Vec<Point2>), GeometryError> {
        let n = self.points.len();
        if n < 3 {
            return Err(GeometryError::TooFewPoints(n));
        }
        if nalgebra::distance(&self.start, &self.end) < TOLERANCE {
            return Err(GeometryError::Degenerate("zero-length cut line".into()));
        }

        let crossings = self.crossings();
        let &[a, b] = crossings.as_slice() else {
            return Err(GeometryError::SliceIntersections {
                found: crossings.len(),
            });
        };
        // Two crossings of a concave outline can bound a chord through a notch.
        if !point_in_polygon(self.points, &nalgebra::center(&a.point, &b.point)) {
            return Err(GeometryError::DegenerateSlice);
        }

        let mut first = Vec::with_capacity(b.edge - a.edge + 2);
        first.push(a.point);
        first.extend_from_slice(&self.points[a.edge + 1..=b.edge]);
        first.push(b.point);

        let mut second = Vec::with_capacity(n - (b.edge - a.edge) + 2);
        second.push(b.point);
        second.extend_from_slice(&self.points[b.edge + 1..]);
        second.extend_from_slice(&self.points[..=a.edge]);
        second.push(a.point);

        let first = dedup_ring(&first);
        let second = dedup_ring(&second);
        for ring in [&first, &second] {
            if ring.len() < 3 || area(ring) <= TOLERANCE {
                return Err(GeometryError::DegenerateSlice);
            }
        }
        Ok((first, second))
    }

    /// Collects crossings in boundary order.
    fn crossings(&self) -> Vec<Crossing> {
        let n = self.points.len();
        let mut found = Vec::new();
        for edge in 0..n {
            let (p0, p1) = (&self.points[edge], &self.points[(edge + 1) % n]);
            if let Some((point, t, _)) = segment_segment_intersect_2d(p0, p1, &self.start, &self.end)
            {
                // The edge end is the next edge's start.
                if t > 1.0 - TOLERANCE {
                    continue;
                }
                found.push(Crossing { edge, point });
            }
        }
        found
    }
}
