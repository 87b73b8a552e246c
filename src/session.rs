//! The embeddable editing session.
//!
//! [`EditorSession`] owns one history, one edit-mode state machine and one
//! culler. Hosts feed it world-space [`InteractionEvent`]s and read back what
//! to draw; polygon commands issued outside the pointer flow (duplicate,
//! combine, recolor, ...) go through the same commit path.

use tracing::debug;

use crate::config::EditorConfig;
use crate::culling::{CullResult, Viewport, VisibilityCuller};
use crate::edit_mode::{EditMode, EditModeStateMachine, EventOutcome, InteractionEvent, Key};
use crate::error::{HistoryError, Result};
use crate::hit_test::{self, VertexHit};
use crate::history::{ChangeOutcome, HistoryManager, NamedSnapshot};
use crate::io;
use crate::math::Point2;
use crate::model::{PolygonId, SegmentationState};
use crate::store::{self, StoreResult};

#[derive(Debug, Clone)]
pub struct EditorSession {
    config: EditorConfig,
    history: HistoryManager,
    machine: EditModeStateMachine,
    culler: VisibilityCuller,
}

impl EditorSession {
    /// Creates a session with no state loaded.
    #[must_use]
    pub fn new(config: EditorConfig) -> Self {
        Self {
            history: HistoryManager::new(config.history.clone()),
            machine: EditModeStateMachine::new(&config),
            culler: VisibilityCuller::new(config.culling.clone()),
            config,
        }
    }

    /// Creates a session whose history starts at `state`.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::InvalidState` if `state` breaks an invariant.
    pub fn with_state(config: EditorConfig, state: SegmentationState) -> Result<Self> {
        let mut session = Self::new(config);
        session.history.commit(state)?;
        Ok(session)
    }

    /// Creates a session from a state document.
    ///
    /// # Errors
    ///
    /// Returns `FormatError` for an unreadable or invalid document.
    pub fn from_json(config: EditorConfig, image_id: &str, json: &str) -> Result<Self> {
        let state = io::load_state(image_id, json)?;
        Self::with_state(config, state)
    }

    // ── Input ──

    /// Handles one interaction event.
    ///
    /// # Errors
    ///
    /// See [`EditModeStateMachine::handle`].
    pub fn handle(&mut self, event: InteractionEvent) -> Result<EventOutcome> {
        self.machine.handle(&mut self.history, event)
    }

    /// # Errors
    ///
    /// See [`EditModeStateMachine::set_mode`].
    pub fn set_mode(&mut self, mode: EditMode) -> Result<()> {
        Ok(self.machine.set_mode(&mut self.history, mode)?)
    }

    /// # Errors
    ///
    /// See [`EditModeStateMachine::select`].
    pub fn select(&mut self, id: Option<PolygonId>) -> Result<()> {
        Ok(self.machine.select(&mut self.history, id)?)
    }

    pub fn cancel(&mut self) -> EventOutcome {
        self.machine.cancel(&mut self.history)
    }

    /// # Errors
    ///
    /// `HistoryError::DragInProgress` or `HistoryError::NothingToUndo`.
    pub fn undo(&mut self) -> Result<EventOutcome> {
        self.handle(InteractionEvent::Key(Key::Undo))
    }

    /// # Errors
    ///
    /// `HistoryError::DragInProgress` or `HistoryError::NothingToRedo`.
    pub fn redo(&mut self) -> Result<EventOutcome> {
        self.handle(InteractionEvent::Key(Key::Redo))
    }

    /// Accepts a state produced outside the session, e.g. a reload.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::InvalidState` for a state that fails
    /// validation; nothing changes in that case.
    pub fn external_update(&mut self, state: SegmentationState) -> Result<ChangeOutcome> {
        let outcome = self.history.on_external_state_change(state)?;
        self.machine.forget_stale(self.history.current());
        Ok(outcome)
    }

    // ── Polygon commands ──

    /// Applies a store transition to the current state and commits it.
    ///
    /// # Errors
    ///
    /// - `HistoryError::NoCurrentState` if nothing is loaded
    /// - `HistoryError::DragInProgress` during a vertex drag
    /// - whatever the transition returns
    pub fn apply<F>(&mut self, transition: F) -> Result<ChangeOutcome>
    where
        F: FnOnce(&SegmentationState) -> StoreResult<SegmentationState>,
    {
        let state = self.history.current().ok_or(HistoryError::NoCurrentState)?;
        let next = transition(state)?;
        let outcome = self.history.commit(next)?;
        self.machine.forget_stale(self.history.current());
        Ok(outcome)
    }

    /// Duplicates a polygon, shifted by the configured offset, and selects
    /// the copy. Returns the copy's id.
    ///
    /// # Errors
    ///
    /// See [`EditorSession::apply`] and [`store::duplicate_polygon`].
    pub fn duplicate(&mut self, id: &PolygonId) -> Result<PolygonId> {
        let state = self.history.current().ok_or(HistoryError::NoCurrentState)?;
        let (next, copy) = store::duplicate_polygon(state, id, self.config.duplicate_offset())?;
        self.history.commit(next)?;
        debug!(source = %id, copy = %copy, "duplicated polygon");
        self.select(Some(copy.clone()))?;
        Ok(copy)
    }

    /// # Errors
    ///
    /// See [`EditorSession::apply`] and [`store::delete_polygon`].
    pub fn delete(&mut self, id: &PolygonId) -> Result<ChangeOutcome> {
        self.apply(|state| store::delete_polygon(state, id))
    }

    /// Merges `b` into `a`.
    ///
    /// # Errors
    ///
    /// See [`EditorSession::apply`] and [`store::combine_polygons`].
    pub fn combine(&mut self, a: &PolygonId, b: &PolygonId) -> Result<ChangeOutcome> {
        self.apply(|state| store::combine_polygons(state, a, b))
    }

    /// # Errors
    ///
    /// See [`EditorSession::apply`] and [`store::simplify_polygon`].
    pub fn simplify(&mut self, id: &PolygonId, tolerance: f64) -> Result<ChangeOutcome> {
        self.apply(|state| store::simplify_polygon(state, id, tolerance))
    }

    /// Inserts `p` as a new vertex on the nearest visible edge within the
    /// vertex hit radius. Returns where the vertex landed, or `None` when no
    /// edge is close enough.
    ///
    /// # Errors
    ///
    /// See [`EditorSession::apply`] and [`store::add_vertex`].
    pub fn insert_vertex(&mut self, p: Point2) -> Result<Option<VertexHit>> {
        let state = self.history.current().ok_or(HistoryError::NoCurrentState)?;
        let Some(edge) = hit_test::edge_near(state, &p, self.config.vertex_hit_radius) else {
            return Ok(None);
        };
        let Some(polygon) = state.polygon_at(edge.polygon_index) else {
            return Ok(None);
        };
        let id = polygon.id().clone();
        let vertex_index = edge.edge_index + 1;
        self.apply(|state| store::add_vertex(state, &id, vertex_index, p))?;
        Ok(Some(VertexHit {
            polygon_index: edge.polygon_index,
            vertex_index,
        }))
    }

    /// # Errors
    ///
    /// See [`EditorSession::apply`] and [`store::set_color`].
    pub fn set_color(&mut self, id: &PolygonId, color: &str) -> Result<ChangeOutcome> {
        self.apply(|state| store::set_color(state, id, color))
    }

    /// # Errors
    ///
    /// See [`EditorSession::apply`] and [`store::set_visible`].
    pub fn set_visible(&mut self, id: &PolygonId, visible: bool) -> Result<ChangeOutcome> {
        self.apply(|state| store::set_visible(state, id, visible))
    }

    /// # Errors
    ///
    /// See [`EditorSession::apply`] and [`store::set_label`].
    pub fn set_label(&mut self, id: &PolygonId, label: Option<String>) -> Result<ChangeOutcome> {
        self.apply(|state| store::set_label(state, id, label))
    }

    // ── Snapshots and saving ──

    /// # Errors
    ///
    /// Returns `HistoryError::NoCurrentState` if nothing is loaded.
    pub fn create_snapshot(&mut self, label: impl Into<String>) -> Result<usize> {
        Ok(self.history.create_snapshot(label)?)
    }

    /// # Errors
    ///
    /// `HistoryError::DragInProgress` or `HistoryError::SnapshotNotFound`.
    pub fn restore_snapshot(&mut self, index: usize) -> Result<ChangeOutcome> {
        let outcome = self.history.restore_snapshot(index)?;
        self.machine.forget_stale(self.history.current());
        Ok(outcome)
    }

    pub fn delete_snapshot(&mut self, index: usize) -> Option<NamedSnapshot> {
        self.history.delete_snapshot(index)
    }

    /// Serializes the current state.
    ///
    /// # Errors
    ///
    /// `HistoryError::NoCurrentState` or `FormatError::Json`.
    pub fn save_json(&self) -> Result<String> {
        let state = self.history.current().ok_or(HistoryError::NoCurrentState)?;
        Ok(io::save_state(state)?)
    }

    /// Records that the current state has been persisted.
    pub fn mark_saved(&mut self) {
        self.history.mark_saved();
    }

    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.history.has_unsaved_changes()
    }

    // ── Rendering ──

    /// Polygons to draw in `viewport`, or `None` if nothing is loaded.
    #[must_use]
    pub fn visible_polygons(&self, viewport: &Viewport) -> Option<CullResult<'_>> {
        self.history
            .current()
            .map(|state| self.culler.cull(state, viewport))
    }

    #[must_use]
    pub fn state(&self) -> Option<&SegmentationState> {
        self.history.current()
    }

    #[must_use]
    pub fn mode(&self) -> EditMode {
        self.machine.mode()
    }

    #[must_use]
    pub fn selected(&self) -> Option<&PolygonId> {
        self.machine.selected()
    }

    #[must_use]
    pub fn temp_points(&self) -> &[Point2] {
        self.machine.temp_points()
    }

    #[must_use]
    pub fn hovered_polygon(&self) -> Option<usize> {
        self.machine.hovered_polygon()
    }

    #[must_use]
    pub fn hovered_vertex(&self) -> Option<VertexHit> {
        self.machine.hovered_vertex()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    #[must_use]
    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::{SegEditError, StoreError};
    use crate::model::Polygon;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn session() -> EditorSession {
        let a = Polygon::new("a", vec![p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0), p(0.0, 10.0)])
            .unwrap();
        let b = Polygon::new("b", vec![p(5.0, 5.0), p(15.0, 5.0), p(15.0, 15.0), p(5.0, 15.0)])
            .unwrap();
        let state = SegmentationState::from_polygons("img", [a, b]).unwrap();
        EditorSession::with_state(EditorConfig::default(), state).unwrap()
    }

    #[test]
    fn starts_clean() {
        let session = session();
        assert!(!session.has_unsaved_changes());
        assert!(!session.can_undo());
        assert_eq!(session.mode(), EditMode::View);
    }

    #[test]
    fn empty_session_rejects_commands() {
        let mut session = EditorSession::new(EditorConfig::default());
        assert!(matches!(
            session.delete(&"a".into()),
            Err(SegEditError::History(HistoryError::NoCurrentState))
        ));
        assert!(session.visible_polygons(&Viewport::new(10.0, 10.0)).is_none());
        assert_eq!(
            session.handle(InteractionEvent::PointerDown(p(1.0, 1.0))).unwrap(),
            EventOutcome::Ignored
        );
    }

    #[test]
    fn duplicate_selects_copy() {
        let mut session = session();
        let copy = session.duplicate(&"a".into()).unwrap();
        assert_eq!(session.selected(), Some(&copy));
        assert_eq!(session.mode(), EditMode::Edit);
        let copied = session.state().unwrap().polygon(&copy).unwrap();
        assert_eq!(copied.points()[0], p(20.0, 20.0));
        assert!(session.has_unsaved_changes());
    }

    #[test]
    fn combine_drops_stale_selection() {
        let mut session = session();
        session.select(Some("b".into())).unwrap();
        session.combine(&"a".into(), &"b".into()).unwrap();
        assert!(session.selected().is_none());
        assert_eq!(session.mode(), EditMode::View);
        assert_eq!(session.state().unwrap().len(), 1);
    }

    #[test]
    fn failed_command_leaves_history() {
        let mut session = session();
        let err = session.combine(&"a".into(), &"a".into()).unwrap_err();
        assert!(matches!(err, SegEditError::Store(StoreError::SelfCombine(_))));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn save_round_trip_and_checkpoint() {
        let mut session = session();
        session.set_color(&"a".into(), "#00ff00").unwrap();
        assert!(session.has_unsaved_changes());

        let json = session.save_json().unwrap();
        session.mark_saved();
        assert!(!session.has_unsaved_changes());

        let reloaded = EditorSession::from_json(EditorConfig::default(), "img", &json).unwrap();
        assert_eq!(reloaded.state(), session.state());
    }

    #[test]
    fn snapshot_restore_through_session() {
        let mut session = session();
        let snap = session.create_snapshot("original").unwrap();
        session.delete(&"a".into()).unwrap();
        session.restore_snapshot(snap).unwrap();
        assert_eq!(session.state().unwrap().len(), 2);
        assert_eq!(session.history().len(), 3);
        session.undo().unwrap();
        assert_eq!(session.state().unwrap().len(), 1);

        assert_eq!(session.delete_snapshot(snap).unwrap().label(), "original");
        assert!(session.restore_snapshot(snap).is_err());
    }

    #[test]
    fn insert_vertex_on_nearest_edge() {
        let mut session = session();
        let hit = session.insert_vertex(p(2.0, -1.0)).unwrap().unwrap();
        assert_eq!(
            hit,
            VertexHit {
                polygon_index: 0,
                vertex_index: 1
            }
        );
        let a = session.state().unwrap().polygon(&"a".into()).unwrap();
        assert_eq!(a.points().len(), 5);
        assert_eq!(a.points()[1], p(2.0, -1.0));
        assert_eq!(session.history().len(), 2);

        assert_eq!(session.insert_vertex(p(50.0, 50.0)).unwrap(), None);
        assert_eq!(session.history().len(), 2);
    }
}
