use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use slotmap::SlotMap;

use super::polygon::{Polygon, PolygonId, PolygonKind};
use crate::error::StoreError;

slotmap::new_key_type! {
    /// Arena key of a polygon inside one [`SegmentationState`].
    pub struct PolygonKey;
}

/// The full editable polygon set of one image at one point in time.
///
/// Polygons live in an arena indexed by their string id and are kept in an
/// explicit draw order. Parent links are plain ids resolved through the
/// index, so removing a polygon can never leave a dangling reference that
/// [`SegmentationState::validate`] would not report.
///
/// Equality is structural: image id and the ordered polygon list. `version`
/// and `last_modified` are bookkeeping and take no part in it.
#[derive(Debug, Clone, Default)]
pub struct SegmentationState {
    image_id: String,
    polygons: SlotMap<PolygonKey, Polygon>,
    index: HashMap<PolygonId, PolygonKey>,
    order: Vec<PolygonKey>,
    version: u64,
    last_modified: u64,
    next_serial: u64,
}

impl SegmentationState {
    /// Creates an empty state for an image.
    #[must_use]
    pub fn new(image_id: impl Into<String>) -> Self {
        Self {
            image_id: image_id.into(),
            ..Self::default()
        }
    }

    /// Builds a state from polygons in draw order and validates it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateId` for repeated ids, or any error from
    /// [`SegmentationState::validate`].
    pub fn from_polygons(
        image_id: impl Into<String>,
        polygons: impl IntoIterator<Item = Polygon>,
    ) -> Result<Self, StoreError> {
        let mut state = Self::new(image_id);
        for polygon in polygons {
            state.push(polygon)?;
        }
        state.validate()?;
        Ok(state)
    }

    #[must_use]
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn with_last_modified(mut self, last_modified: u64) -> Self {
        self.last_modified = last_modified;
        self
    }

    #[must_use]
    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Milliseconds since the Unix epoch of the last modification.
    #[must_use]
    pub fn last_modified(&self) -> u64 {
        self.last_modified
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &PolygonId) -> bool {
        self.index.contains_key(id)
    }

    #[must_use]
    pub fn get(&self, id: &PolygonId) -> Option<&Polygon> {
        self.index.get(id).and_then(|&key| self.polygons.get(key))
    }

    /// Returns the polygon with `id`, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::PolygonNotFound` if the id is unknown.
    pub fn polygon(&self, id: &PolygonId) -> Result<&Polygon, StoreError> {
        self.get(id)
            .ok_or_else(|| StoreError::PolygonNotFound(id.clone()))
    }

    /// Draw-order position of a polygon.
    #[must_use]
    pub fn position(&self, id: &PolygonId) -> Option<usize> {
        let key = self.index.get(id)?;
        self.order.iter().position(|k| k == key)
    }

    /// Polygon at a draw-order position.
    #[must_use]
    pub fn polygon_at(&self, position: usize) -> Option<&Polygon> {
        self.order
            .get(position)
            .and_then(|&key| self.polygons.get(key))
    }

    /// Iterates polygons in draw order (bottom first).
    ///
    /// Every key in `order` is live in `polygons`; the mutators below keep
    /// the two in step.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Polygon> + ExactSizeIterator + '_ {
        self.order.iter().map(|&key| &self.polygons[key])
    }

    /// Iterates the internal polygons whose parent is `id`.
    pub fn children_of<'a>(&'a self, id: &'a PolygonId) -> impl Iterator<Item = &'a Polygon> + 'a {
        self.iter()
            .filter(move |p| p.parent_id() == Some(id))
    }

    /// Structural equality: same image and the same polygons in the same
    /// order, compared field by field.
    #[must_use]
    pub fn content_eq(&self, other: &Self) -> bool {
        self.image_id == other.image_id
            && self.order.len() == other.order.len()
            && self.iter().eq(other.iter())
    }

    /// Checks every structural invariant.
    ///
    /// # Errors
    ///
    /// - `StoreError::MissingParent` if an internal polygon's parent is absent
    /// - `StoreError::InvalidParent` if an internal polygon has no parent, its
    ///   parent is itself internal, or an external polygon has a parent
    pub fn validate(&self) -> Result<(), StoreError> {
        for polygon in self.iter() {
            match (polygon.kind(), polygon.parent_id()) {
                (PolygonKind::External, None) => {}
                (PolygonKind::External, Some(_)) => {
                    return Err(StoreError::InvalidParent {
                        polygon: polygon.id().clone(),
                        reason: "external polygons cannot have a parent",
                    });
                }
                (PolygonKind::Internal, None) => {
                    return Err(StoreError::InvalidParent {
                        polygon: polygon.id().clone(),
                        reason: "internal polygons need a parent",
                    });
                }
                (PolygonKind::Internal, Some(parent)) => {
                    let Some(parent_polygon) = self.get(parent) else {
                        return Err(StoreError::MissingParent {
                            polygon: polygon.id().clone(),
                            parent: parent.clone(),
                        });
                    };
                    if parent_polygon.kind() != PolygonKind::External {
                        return Err(StoreError::InvalidParent {
                            polygon: polygon.id().clone(),
                            reason: "parent must be an external polygon",
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Generates an id of the form `<prefix>-<n>` not used in this state.
    pub(crate) fn fresh_id(&mut self, prefix: &str) -> PolygonId {
        loop {
            self.next_serial += 1;
            let id = PolygonId::new(format!("{prefix}-{}", self.next_serial));
            if !self.contains(&id) {
                return id;
            }
        }
    }

    /// Appends a polygon on top of the draw order.
    pub(crate) fn push(&mut self, polygon: Polygon) -> Result<(), StoreError> {
        let position = self.order.len();
        self.insert_at(position, polygon)
    }

    /// Inserts a polygon at a draw-order position (clamped to the end).
    pub(crate) fn insert_at(&mut self, position: usize, polygon: Polygon) -> Result<(), StoreError> {
        if self.contains(polygon.id()) {
            return Err(StoreError::DuplicateId(polygon.id().clone()));
        }
        let id = polygon.id().clone();
        let key = self.polygons.insert(polygon);
        self.index.insert(id, key);
        self.order.insert(position.min(self.order.len()), key);
        Ok(())
    }

    /// Removes a polygon, returning it with its former draw position.
    pub(crate) fn remove(&mut self, id: &PolygonId) -> Result<(usize, Polygon), StoreError> {
        let key = self
            .index
            .remove(id)
            .ok_or_else(|| StoreError::PolygonNotFound(id.clone()))?;
        let position = self.order.iter().position(|k| *k == key).unwrap_or(0);
        self.order.retain(|k| *k != key);
        let polygon = self
            .polygons
            .remove(key)
            .ok_or_else(|| StoreError::PolygonNotFound(id.clone()))?;
        Ok((position, polygon))
    }

    /// Replaces a polygon in place. The replacement may carry a new id.
    pub(crate) fn replace(&mut self, id: &PolygonId, polygon: Polygon) -> Result<(), StoreError> {
        let key = *self
            .index
            .get(id)
            .ok_or_else(|| StoreError::PolygonNotFound(id.clone()))?;
        if polygon.id() != id {
            if self.contains(polygon.id()) {
                return Err(StoreError::DuplicateId(polygon.id().clone()));
            }
            self.index.remove(id);
            self.index.insert(polygon.id().clone(), key);
        }
        self.polygons[key] = polygon;
        Ok(())
    }

    pub(crate) fn polygon_mut(&mut self, id: &PolygonId) -> Result<&mut Polygon, StoreError> {
        let key = *self
            .index
            .get(id)
            .ok_or_else(|| StoreError::PolygonNotFound(id.clone()))?;
        self.polygons
            .get_mut(key)
            .ok_or_else(|| StoreError::PolygonNotFound(id.clone()))
    }

    /// Bumps the version and stamps the modification time.
    pub(crate) fn touch(&mut self) {
        self.version += 1;
        self.last_modified = now_millis();
    }
}

impl PartialEq for SegmentationState {
    fn eq(&self, other: &Self) -> bool {
        self.content_eq(other)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point2;

    fn square(id: &str, x: f64) -> Polygon {
        Polygon::new(
            id,
            vec![
                Point2::new(x, 0.0),
                Point2::new(x + 10.0, 0.0),
                Point2::new(x + 10.0, 10.0),
                Point2::new(x, 10.0),
            ],
        )
        .unwrap()
    }

    fn hole(id: &str, parent: &str) -> Polygon {
        Polygon::internal(
            id,
            vec![
                Point2::new(2.0, 2.0),
                Point2::new(4.0, 2.0),
                Point2::new(4.0, 4.0),
            ],
            parent,
        )
        .unwrap()
    }

    #[test]
    fn keeps_draw_order() {
        let state =
            SegmentationState::from_polygons("img", [square("b", 0.0), square("a", 20.0)]).unwrap();
        let ids: Vec<&str> = state.iter().map(|p| p.id().as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
        assert_eq!(state.position(&"a".into()), Some(1));
        assert_eq!(state.polygon_at(0).unwrap().id().as_str(), "b");
    }

    #[test]
    fn iter_walks_top_down_with_draw_indices() {
        let mut state = SegmentationState::from_polygons(
            "img",
            [square("a", 0.0), square("b", 20.0), square("c", 40.0)],
        )
        .unwrap();
        state.remove(&"b".into()).unwrap();
        assert_eq!(state.iter().len(), 2);
        let top_down: Vec<(usize, &str)> = state
            .iter()
            .enumerate()
            .rev()
            .map(|(i, p)| (i, p.id().as_str()))
            .collect();
        assert_eq!(top_down, [(1, "c"), (0, "a")]);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = SegmentationState::from_polygons("img", [square("a", 0.0), square("a", 20.0)]);
        assert_eq!(err.unwrap_err(), StoreError::DuplicateId("a".into()));
    }

    #[test]
    fn validates_parent_links() {
        assert!(SegmentationState::from_polygons("img", [square("a", 0.0), hole("h", "a")]).is_ok());

        let missing = SegmentationState::from_polygons("img", [hole("h", "zzz")]);
        assert!(matches!(missing, Err(StoreError::MissingParent { .. })));

        let nested = SegmentationState::from_polygons(
            "img",
            [square("a", 0.0), hole("h", "a"), hole("h2", "h")],
        );
        assert!(matches!(nested, Err(StoreError::InvalidParent { .. })));
    }

    #[test]
    fn equality_ignores_version_and_time() {
        let a = SegmentationState::from_polygons("img", [square("a", 0.0)]).unwrap();
        let b = a.clone().with_version(42).with_last_modified(7);
        assert_eq!(a, b);

        let other_image = SegmentationState::from_polygons("img2", [square("a", 0.0)]).unwrap();
        assert_ne!(a, other_image);
    }

    #[test]
    fn equality_is_order_sensitive() {
        let ab =
            SegmentationState::from_polygons("img", [square("a", 0.0), square("b", 20.0)]).unwrap();
        let ba =
            SegmentationState::from_polygons("img", [square("b", 20.0), square("a", 0.0)]).unwrap();
        assert_ne!(ab, ba);
    }

    #[test]
    fn remove_and_replace_keep_index_consistent() {
        let mut state =
            SegmentationState::from_polygons("img", [square("a", 0.0), square("b", 20.0)]).unwrap();
        let (pos, removed) = state.remove(&"a".into()).unwrap();
        assert_eq!(pos, 0);
        assert_eq!(removed.id().as_str(), "a");
        assert!(state.get(&"a".into()).is_none());

        state
            .replace(&"b".into(), square("c", 40.0))
            .unwrap();
        assert!(!state.contains(&"b".into()));
        assert_eq!(state.position(&"c".into()), Some(0));
    }

    #[test]
    fn fresh_ids_skip_existing() {
        let mut state =
            SegmentationState::from_polygons("img", [square("polygon-1", 0.0)]).unwrap();
        let id = state.fresh_id("polygon");
        assert_eq!(id.as_str(), "polygon-2");
        let next = state.fresh_id("polygon");
        assert_eq!(next.as_str(), "polygon-3");
    }
}
