use crate::math::{Point2, Vector2};
use crate::model::{Polygon, PolygonId};

/// Translates a point list by a displacement vector.
#[derive(Debug)]
pub struct Translate<'a> {
    points: &'a [Point2],
    displacement: Vector2,
}

impl<'a> Translate<'a> {
    /// Creates a new `Translate` operation.
    #[must_use]
    pub fn new(points: &'a [Point2], displacement: Vector2) -> Self {
        Self {
            points,
            displacement,
        }
    }

    /// Executes the translation, returning the moved points.
    #[must_use]
    pub fn execute(&self) -> Vec<Point2> {
        self.points.iter().map(|p| p + self.displacement).collect()
    }
}

/// Clones `polygon` under `new_id` with every point moved by `offset`, so
/// the copy does not sit exactly on top of the original.
#[must_use]
pub fn duplicate_with_offset(polygon: &Polygon, new_id: PolygonId, offset: Vector2) -> Polygon {
    let moved = Translate::new(polygon.points(), offset).execute();
    // Translation keeps the point count and finiteness of a valid polygon.
    polygon
        .with_points(moved)
        .unwrap_or_else(|_| polygon.clone())
        .with_id(new_id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn translate_points() {
        let pts = [Point2::new(1.0, 2.0), Point2::new(-3.0, 0.5)];
        let out = Translate::new(&pts, Vector2::new(10.0, -1.0)).execute();
        assert_eq!(out, vec![Point2::new(11.0, 1.0), Point2::new(7.0, -0.5)]);
    }

    #[test]
    fn duplicate_moves_points_and_bounds() {
        let original = Polygon::new(
            "a",
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 0.0),
                Point2::new(10.0, 10.0),
            ],
        )
        .unwrap()
        .with_color("#00ff00");
        let copy = duplicate_with_offset(&original, "b".into(), Vector2::new(20.0, 20.0));
        assert_eq!(copy.id().as_str(), "b");
        assert_eq!(copy.color(), Some("#00ff00"));
        assert_eq!(copy.points()[1], Point2::new(30.0, 20.0));
        assert_abs_diff_eq!(copy.bounds().min.x, 20.0);
        assert_abs_diff_eq!(copy.area(), original.area());
    }
}
