use tracing::{debug, warn};

use super::{EditMode, EventOutcome, InteractionEvent, Key};
use crate::config::EditorConfig;
use crate::error::{HistoryError, ModeError, SegEditError, StoreError};
use crate::hit_test::{self, VertexHit};
use crate::history::{ChangeOutcome, HistoryManager};
use crate::math::Point2;
use crate::model::{PolygonId, SegmentationState};
use crate::store;

type EventResult = Result<EventOutcome, SegEditError>;

#[derive(Debug, Clone, PartialEq)]
struct VertexDrag {
    polygon: PolygonId,
    vertex: usize,
}

/// Routes interaction events to store transitions and history commits.
///
/// The machine never owns polygon data: it reads the authoritative state from
/// the [`HistoryManager`] passed to each call and commits new states back to it.
#[derive(Debug, Clone)]
pub struct EditModeStateMachine {
    mode: EditMode,
    selected: Option<PolygonId>,
    /// Points placed during a modal gesture.
    temp_points: Vec<Point2>,
    /// Start vertex of an `AddPoints` gesture.
    anchor: Option<usize>,
    drag: Option<VertexDrag>,
    hovered_polygon: Option<usize>,
    hovered_vertex: Option<VertexHit>,
    close_distance: f64,
    vertex_hit_radius: f64,
}

impl Default for EditModeStateMachine {
    fn default() -> Self {
        Self::new(&EditorConfig::default())
    }
}

impl EditModeStateMachine {
    #[must_use]
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            mode: EditMode::View,
            selected: None,
            temp_points: Vec::new(),
            anchor: None,
            drag: None,
            hovered_polygon: None,
            hovered_vertex: None,
            close_distance: config.close_distance,
            vertex_hit_radius: config.vertex_hit_radius,
        }
    }

    #[must_use]
    pub fn mode(&self) -> EditMode {
        self.mode
    }

    #[must_use]
    pub fn selected(&self) -> Option<&PolygonId> {
        self.selected.as_ref()
    }

    /// Points placed so far in the current modal gesture.
    #[must_use]
    pub fn temp_points(&self) -> &[Point2] {
        &self.temp_points
    }

    /// Start vertex of an `AddPoints` gesture, once chosen.
    #[must_use]
    pub fn anchor(&self) -> Option<usize> {
        self.anchor
    }

    #[must_use]
    pub fn hovered_polygon(&self) -> Option<usize> {
        self.hovered_polygon
    }

    #[must_use]
    pub fn hovered_vertex(&self) -> Option<VertexHit> {
        self.hovered_vertex
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// `Edit` with a selection, `View` without.
    #[must_use]
    pub fn base_mode(&self) -> EditMode {
        if self.selected.is_some() {
            EditMode::Edit
        } else {
            EditMode::View
        }
    }

    /// Selects a polygon by id, or clears the selection.
    ///
    /// # Errors
    ///
    /// Returns `ModeError::StaleSelection` if the id is not in the current
    /// state.
    pub fn select(
        &mut self,
        history: &mut HistoryManager,
        id: Option<PolygonId>,
    ) -> Result<(), ModeError> {
        if let Some(id) = &id {
            if !history.current().is_some_and(|state| state.contains(id)) {
                return Err(ModeError::StaleSelection(id.clone()));
            }
        }
        self.abort_drag(history);
        self.clear_buffer();
        self.selected = id;
        self.switch(self.base_mode());
        Ok(())
    }

    /// Switches mode, abandoning any gesture in progress.
    ///
    /// # Errors
    ///
    /// - `ModeError::NoSelection` for a mode that needs a selected polygon
    /// - `ModeError::StaleSelection` if the selection no longer exists
    pub fn set_mode(&mut self, history: &mut HistoryManager, mode: EditMode) -> Result<(), ModeError> {
        if mode.needs_selection() {
            self.selection_in(history.current())?;
        }
        self.abort_drag(history);
        self.clear_buffer();
        self.switch(mode);
        Ok(())
    }

    /// Abandons the current gesture and returns to the base mode.
    ///
    /// Nothing is committed. A vertex drag is rolled back to where it
    /// started. In `Edit` or `View` the selection is cleared as well.
    pub fn cancel(&mut self, history: &mut HistoryManager) -> EventOutcome {
        self.abort_drag(history);
        self.clear_buffer();
        if !self.mode.is_modal() {
            self.selected = None;
        }
        self.switch(self.base_mode());
        EventOutcome::Cancelled
    }

    /// Handles one interaction event.
    ///
    /// # Errors
    ///
    /// - `HistoryError::DragInProgress` for undo/redo during a vertex drag
    /// - `HistoryError::NothingToUndo` / `NothingToRedo` at the history ends
    /// - `ModeError` when the mode needs a selection that is missing or stale
    /// - `StoreError` when a store transition is rejected (except slices,
    ///   which report [`EventOutcome::SliceFailed`])
    pub fn handle(&mut self, history: &mut HistoryManager, event: InteractionEvent) -> EventResult {
        match event {
            InteractionEvent::PointerDown(p) => self.pointer_down(history, p),
            InteractionEvent::PointerMove(p) => self.pointer_move(history, p),
            InteractionEvent::PointerUp(_) => Ok(self.pointer_up(history)),
            InteractionEvent::Key(Key::Escape) => Ok(self.cancel(history)),
            InteractionEvent::Key(Key::Enter) => match self.mode {
                EditMode::CreatePolygon => self.close_polygon(history),
                _ => Ok(EventOutcome::Ignored),
            },
            InteractionEvent::Key(Key::Delete) => self.delete_selected(history),
            InteractionEvent::Key(Key::Undo) => self.step_history(history, true),
            InteractionEvent::Key(Key::Redo) => self.step_history(history, false),
        }
    }

    fn pointer_down(&mut self, history: &mut HistoryManager, p: Point2) -> EventResult {
        let Some(state) = history.current() else {
            return Ok(EventOutcome::Ignored);
        };
        match self.mode {
            EditMode::View => Ok(self.select_at(state, &p)),
            EditMode::Edit => {
                let hit = self.selected.as_ref().and_then(|id| {
                    let polygon = state.get(id)?;
                    hit_test::vertex_of(polygon, &p, self.vertex_hit_radius)
                        .map(|vertex| (id.clone(), vertex))
                });
                let Some((polygon, vertex)) = hit else {
                    return Ok(self.select_at(state, &p));
                };
                debug!(polygon = %polygon, vertex, "vertex drag started");
                history.begin_drag();
                self.drag = Some(VertexDrag { polygon, vertex });
                Ok(EventOutcome::DragStarted)
            }
            EditMode::CreatePolygon => {
                let closes = self.temp_points.len() >= 3
                    && nalgebra::distance(&self.temp_points[0], &p) <= self.close_distance;
                if closes {
                    return self.close_polygon(history);
                }
                self.temp_points.push(p);
                Ok(EventOutcome::PointBuffered)
            }
            EditMode::Slice => self.slice_click(history, p),
            EditMode::AddPoints => self.add_points_click(history, p),
        }
    }

    fn pointer_move(&mut self, history: &mut HistoryManager, p: Point2) -> EventResult {
        let Some(state) = history.current() else {
            return Ok(EventOutcome::Ignored);
        };
        if let Some(drag) = &self.drag {
            let next = store::move_vertex(state, &drag.polygon, drag.vertex, p)?;
            history.on_external_state_change(next)?;
            return Ok(EventOutcome::DragUpdated);
        }

        let vertex = hit_test::vertex_at(state, &p, self.vertex_hit_radius);
        let polygon = hit_test::polygon_at(state, &p);
        if vertex == self.hovered_vertex && polygon == self.hovered_polygon {
            return Ok(EventOutcome::Ignored);
        }
        self.hovered_vertex = vertex;
        self.hovered_polygon = polygon;
        Ok(EventOutcome::HoverChanged)
    }

    fn pointer_up(&mut self, history: &mut HistoryManager) -> EventOutcome {
        if self.drag.take().is_none() {
            return EventOutcome::Ignored;
        }
        match history.end_drag() {
            ChangeOutcome::Committed => EventOutcome::Committed,
            ChangeOutcome::Unchanged | ChangeOutcome::Buffered => EventOutcome::Ignored,
        }
    }

    fn select_at(&mut self, state: &SegmentationState, p: &Point2) -> EventOutcome {
        let hit = hit_test::polygon_at(state, p)
            .and_then(|i| state.polygon_at(i))
            .map(|polygon| polygon.id().clone());
        if hit == self.selected {
            return EventOutcome::Ignored;
        }
        debug!(selected = ?hit, "selection changed");
        self.selected = hit;
        self.switch(self.base_mode());
        EventOutcome::SelectionChanged
    }

    fn close_polygon(&mut self, history: &mut HistoryManager) -> EventResult {
        if self.temp_points.len() < 3 {
            return Ok(EventOutcome::Ignored);
        }
        let Some(state) = history.current() else {
            return Ok(EventOutcome::Ignored);
        };
        let (next, id) = store::create_polygon(state, self.temp_points.clone())?;
        history.commit(next)?;
        self.clear_buffer();
        self.selected = Some(id);
        self.switch(EditMode::Edit);
        Ok(EventOutcome::Committed)
    }

    fn slice_click(&mut self, history: &mut HistoryManager, p: Point2) -> EventResult {
        let Some(state) = history.current() else {
            return Ok(EventOutcome::Ignored);
        };
        let id = self.selection_in(Some(state))?;
        let Some(&start) = self.temp_points.first() else {
            self.temp_points.push(p);
            return Ok(EventOutcome::PointBuffered);
        };

        match store::slice_polygon(state, &id, start, p) {
            Ok((next, [first, _])) => {
                history.commit(next)?;
                self.clear_buffer();
                self.selected = Some(first);
                self.switch(EditMode::Edit);
                Ok(EventOutcome::Committed)
            }
            Err(StoreError::Geometry(err)) => {
                warn!(polygon = %id, error = %err, "slice rejected");
                self.clear_buffer();
                Ok(EventOutcome::SliceFailed(err))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn add_points_click(&mut self, history: &mut HistoryManager, p: Point2) -> EventResult {
        let Some(state) = history.current() else {
            return Ok(EventOutcome::Ignored);
        };
        let id = self.selection_in(Some(state))?;
        let polygon = state.polygon(&id)?;
        let hit = hit_test::vertex_of(polygon, &p, self.vertex_hit_radius);

        match (self.anchor, hit) {
            (None, Some(vertex)) => {
                self.anchor = Some(vertex);
                Ok(EventOutcome::PointBuffered)
            }
            (None, None) => Ok(EventOutcome::Ignored),
            (Some(start), Some(end)) if start != end => {
                let next = store::replace_vertex_range(state, &id, start, end, &self.temp_points)?;
                history.commit(next)?;
                self.clear_buffer();
                self.switch(EditMode::Edit);
                Ok(EventOutcome::Committed)
            }
            (Some(_), Some(_)) => Ok(EventOutcome::Ignored),
            (Some(_), None) => {
                self.temp_points.push(p);
                Ok(EventOutcome::PointBuffered)
            }
        }
    }

    fn delete_selected(&mut self, history: &mut HistoryManager) -> EventResult {
        if self.mode != EditMode::Edit || self.drag.is_some() {
            return Ok(EventOutcome::Ignored);
        }
        let Some(state) = history.current() else {
            return Ok(EventOutcome::Ignored);
        };
        let id = self.selection_in(Some(state))?;
        let next = store::delete_polygon(state, &id)?;
        history.commit(next)?;
        self.selected = None;
        self.switch(EditMode::View);
        Ok(EventOutcome::Committed)
    }

    fn step_history(&mut self, history: &mut HistoryManager, undo: bool) -> EventResult {
        if self.drag.is_some() || history.is_dragging() {
            return Err(HistoryError::DragInProgress.into());
        }
        if self.mode.is_modal() {
            self.clear_buffer();
        }
        let outcome = if undo {
            history.undo()?;
            EventOutcome::Undone
        } else {
            history.redo()?;
            EventOutcome::Redone
        };
        self.forget_stale(history.current());
        Ok(outcome)
    }

    /// Drops selection and hover info that no longer match `state`.
    pub(crate) fn forget_stale(&mut self, state: Option<&SegmentationState>) {
        self.hovered_polygon = None;
        self.hovered_vertex = None;
        let exists = match (&self.selected, state) {
            (Some(id), Some(state)) => state.contains(id),
            _ => false,
        };
        if !exists {
            self.selected = None;
            self.anchor = None;
            if self.mode.needs_selection() {
                self.switch(EditMode::View);
            }
        }
    }

    fn selection_in(&self, state: Option<&SegmentationState>) -> Result<PolygonId, ModeError> {
        let id = self.selected.as_ref().ok_or(ModeError::NoSelection)?;
        match state {
            Some(state) if state.contains(id) => Ok(id.clone()),
            _ => Err(ModeError::StaleSelection(id.clone())),
        }
    }

    fn abort_drag(&mut self, history: &mut HistoryManager) {
        if self.drag.take().is_some() {
            debug!("vertex drag cancelled");
            history.cancel_drag();
        }
    }

    fn clear_buffer(&mut self) {
        self.temp_points.clear();
        self.anchor = None;
    }

    fn switch(&mut self, mode: EditMode) {
        if self.mode != mode {
            debug!(from = ?self.mode, to = ?mode, "mode changed");
            self.mode = mode;
        }
    }
}
