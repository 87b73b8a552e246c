use crate::math::distance_2d::point_to_segment_dist;
use crate::math::Point2;

/// Douglas–Peucker vertex reduction of a closed ring.
///
/// The ring is split at vertex 0 and the vertex farthest from it, and each
/// half is reduced independently. The output never has fewer than 3 points:
/// when the reduction would go below that, the input is returned unchanged.
#[derive(Debug)]
pub struct Simplify<'a> {
    points: &'a [Point2],
    tolerance: f64,
}

impl<'a> Simplify<'a> {
    /// Creates a new simplification with the given maximum deviation.
    #[must_use]
    pub fn new(points: &'a [Point2], tolerance: f64) -> Self {
        Self { points, tolerance }
    }

    /// Executes the simplification.
    #[must_use]
    pub fn execute(&self) -> Vec<Point2> {
        let n = self.points.len();
        if n <= 3 || self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return self.points.to_vec();
        }

        let origin = self.points[0];
        let (split, farthest) = self
            .points
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, p)| (i, nalgebra::distance(&origin, p)))
            .fold((0, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });
        if farthest <= 0.0 {
            return self.points.to_vec();
        }

        let mut keep = vec![false; n];
        keep[0] = true;
        keep[split] = true;

        // Spans use unwrapped indices; index `n` is vertex 0 again.
        let mut stack = vec![(0, split), (split, n)];
        while let Some((first, last)) = stack.pop() {
            let (a, b) = (&self.points[first % n], &self.points[last % n]);
            let mut max_dist = 0.0;
            let mut max_idx = first;
            for i in first + 1..last {
                let d = point_to_segment_dist(&self.points[i % n], a, b);
                if d > max_dist {
                    max_dist = d;
                    max_idx = i;
                }
            }
            if max_dist > self.tolerance {
                keep[max_idx % n] = true;
                stack.push((first, max_idx));
                stack.push((max_idx, last));
            }
        }

        let reduced: Vec<Point2> = self
            .points
            .iter()
            .zip(&keep)
            .filter_map(|(p, &k)| k.then_some(*p))
            .collect();
        if reduced.len() < 3 {
            return self.points.to_vec();
        }
        reduced
    }
}
