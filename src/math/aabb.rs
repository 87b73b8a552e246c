use super::Point2;

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point2,
    /// Maximum corner of the bounding box.
    pub max: Point2,
}

impl Aabb {
    /// Creates a box from two corners, normalizing their order.
    #[must_use]
    pub fn new(a: Point2, b: Point2) -> Self {
        Self {
            min: Point2::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Computes the bounding box of a point list.
    ///
    /// An empty list yields a zero box at the origin.
    #[must_use]
    pub fn from_points(points: &[Point2]) -> Self {
        let Some(first) = points.first() else {
            return Self::new(Point2::origin(), Point2::origin());
        };
        let mut min = *first;
        let mut max = *first;
        for p in &points[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Self { min, max }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Returns `true` if the boxes overlap. Touching edges count as overlap.
    #[must_use]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    /// Returns `true` if `p` lies inside or on the boundary of the box.
    #[must_use]
    pub fn contains_point(&self, p: &Point2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Returns the box grown by `margin` on every side.
    #[must_use]
    pub fn expanded(&self, margin: f64) -> Self {
        Self {
            min: Point2::new(self.min.x - margin, self.min.y - margin),
            max: Point2::new(self.max.x + margin, self.max.y + margin),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    #[test]
    fn from_points_square() {
        let bb = Aabb::from_points(&[p(3.0, 1.0), p(-2.0, 4.0), p(0.0, -5.0)]);
        assert_abs_diff_eq!(bb.min.x, -2.0);
        assert_abs_diff_eq!(bb.min.y, -5.0);
        assert_abs_diff_eq!(bb.max.x, 3.0);
        assert_abs_diff_eq!(bb.max.y, 4.0);
        assert_abs_diff_eq!(bb.width(), 5.0);
        assert_abs_diff_eq!(bb.height(), 9.0);
    }

    #[test]
    fn from_points_empty_is_origin() {
        let bb = Aabb::from_points(&[]);
        assert_eq!(bb.min, Point2::origin());
        assert_eq!(bb.max, Point2::origin());
    }

    #[test]
    fn intersects_overlap_touch_and_miss() {
        let a = Aabb::new(p(0.0, 0.0), p(10.0, 10.0));
        assert!(a.intersects(&Aabb::new(p(5.0, 5.0), p(15.0, 15.0))));
        // Shared edge.
        assert!(a.intersects(&Aabb::new(p(10.0, 0.0), p(20.0, 10.0))));
        assert!(!a.intersects(&Aabb::new(p(10.5, 0.0), p(20.0, 10.0))));
        assert!(!a.intersects(&Aabb::new(p(0.0, -8.0), p(10.0, -1.0))));
    }

    #[test]
    fn new_normalizes_corners() {
        let bb = Aabb::new(p(4.0, -1.0), p(1.0, 2.0));
        assert_eq!(bb.min, p(1.0, -1.0));
        assert_eq!(bb.max, p(4.0, 2.0));
        assert!(bb.contains_point(&p(4.0, 2.0)));
        assert!(!bb.expanded(0.5).contains_point(&p(5.0, 0.0)));
        assert!(bb.expanded(1.0).contains_point(&p(5.0, 0.0)));
    }
}
