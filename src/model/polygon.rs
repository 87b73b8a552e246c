use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::math::polygon_2d::{area, perimeter, point_in_polygon};
use crate::math::{Aabb, Point2};

/// Stable string identifier of a polygon, unique within a state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolygonId(String);

impl PolygonId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PolygonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PolygonId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for PolygonId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Whether a polygon is an object outline or a hole inside one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolygonKind {
    /// Outer boundary of an object.
    #[default]
    External,
    /// Hole inside an external polygon, linked by `parent_id`.
    Internal,
}

/// A closed outline over the image.
///
/// Fields are private so every value upholds `points.len() >= 3` and finite
/// coordinates. The bounding box is computed whenever a point list is
/// installed and reused by culling and hit testing.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    id: PolygonId,
    points: Vec<Point2>,
    kind: PolygonKind,
    parent_id: Option<PolygonId>,
    color: Option<String>,
    visible: bool,
    label: Option<String>,
    bounds: Aabb,
}

impl Polygon {
    /// Creates a visible external polygon.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::TooFewPoints` for fewer than 3 points and
    /// `GeometryError::Degenerate` for non-finite coordinates.
    pub fn new(id: impl Into<PolygonId>, points: Vec<Point2>) -> Result<Self, GeometryError> {
        check_points(&points)?;
        let bounds = Aabb::from_points(&points);
        Ok(Self {
            id: id.into(),
            points,
            kind: PolygonKind::External,
            parent_id: None,
            color: None,
            visible: true,
            label: None,
            bounds,
        })
    }

    /// Creates a visible internal polygon (hole) owned by `parent`.
    ///
    /// # Errors
    ///
    /// Same as [`Polygon::new`].
    pub fn internal(
        id: impl Into<PolygonId>,
        points: Vec<Point2>,
        parent: impl Into<PolygonId>,
    ) -> Result<Self, GeometryError> {
        let mut polygon = Self::new(id, points)?;
        polygon.kind = PolygonKind::Internal;
        polygon.parent_id = Some(parent.into());
        Ok(polygon)
    }

    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    #[must_use]
    pub fn id(&self) -> &PolygonId {
        &self.id
    }

    #[must_use]
    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    #[must_use]
    pub fn kind(&self) -> PolygonKind {
        self.kind
    }

    #[must_use]
    pub fn parent_id(&self) -> Option<&PolygonId> {
        self.parent_id.as_ref()
    }

    #[must_use]
    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Cached axis-aligned bounding box.
    #[must_use]
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    #[must_use]
    pub fn area(&self) -> f64 {
        area(&self.points)
    }

    #[must_use]
    pub fn perimeter(&self) -> f64 {
        perimeter(&self.points)
    }

    /// Point-in-polygon with inclusive boundary, rejected early by the
    /// bounding box.
    #[must_use]
    pub fn contains_point(&self, p: &Point2) -> bool {
        self.bounds.contains_point(p) && point_in_polygon(&self.points, p)
    }

    /// Returns a copy with a new point list and a recomputed bounding box.
    ///
    /// # Errors
    ///
    /// Same as [`Polygon::new`].
    pub fn with_points(&self, points: Vec<Point2>) -> Result<Self, GeometryError> {
        check_points(&points)?;
        Ok(Self {
            bounds: Aabb::from_points(&points),
            points,
            ..self.clone()
        })
    }

    /// Returns a copy under a different id.
    #[must_use]
    pub fn with_id(&self, id: PolygonId) -> Self {
        Self {
            id,
            ..self.clone()
        }
    }

    pub(crate) fn set_color(&mut self, color: Option<String>) {
        self.color = color;
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub(crate) fn set_label(&mut self, label: Option<String>) {
        self.label = label;
    }

    pub(crate) fn set_parent(&mut self, parent: Option<PolygonId>) {
        self.parent_id = parent;
    }

    /// Sets kind and parent from the wire format without checking them;
    /// state validation decides whether the combination is legal.
    pub(crate) fn set_kind(&mut self, kind: PolygonKind, parent: Option<PolygonId>) {
        self.kind = kind;
        self.parent_id = parent;
    }
}

fn check_points(points: &[Point2]) -> Result<(), GeometryError> {
    if points.len() < 3 {
        return Err(GeometryError::TooFewPoints(points.len()));
    }
    if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(GeometryError::Degenerate("non-finite coordinate".into()));
    }
    Ok(())
}
