//! Snapshot-based undo/redo history.
//!
//! Every entry is a full [`SegmentationState`]. Continuous gestures are
//! bracketed with [`HistoryManager::begin_drag`] / [`HistoryManager::end_drag`]:
//! states reported in between only replace the current state, and the
//! bracket's net effect is committed as a single entry when it closes.

mod snapshot;

pub use snapshot::NamedSnapshot;

use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use crate::config::HistoryConfig;
use crate::error::HistoryError;
use crate::model::SegmentationState;

/// One committed point in the history.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    state: SegmentationState,
    label: Option<String>,
}

impl HistoryEntry {
    #[must_use]
    pub fn state(&self) -> &SegmentationState {
        &self.state
    }

    /// Label of the snapshot this entry was restored from, if any.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// What happened to a reported state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// A new history entry was appended.
    Committed,
    /// The state equals the current entry; nothing changed.
    Unchanged,
    /// A drag is in progress; the state became current without an entry.
    Buffered,
}

/// Undo/redo stack over whole segmentation states.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    /// Committed entries (oldest first).
    entries: Vec<HistoryEntry>,
    /// Position of the current entry; `None` while empty.
    index: Option<usize>,
    /// Authoritative state; differs from the current entry only mid-drag.
    current: Option<SegmentationState>,
    dragging: bool,
    drag_baseline: Option<SegmentationState>,
    snapshots: BTreeMap<usize, NamedSnapshot>,
    next_snapshot: usize,
    /// Checkpoint of the last save.
    saved: Option<SegmentationState>,
    config: HistoryConfig,
}

impl HistoryManager {
    /// Creates an empty history.
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            entries: Vec::new(),
            index: None,
            current: None,
            dragging: false,
            drag_baseline: None,
            snapshots: BTreeMap::new(),
            next_snapshot: 0,
            saved: None,
            config,
        }
    }

    /// Creates a history whose first entry is `initial`.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::InvalidState` if `initial` breaks an invariant.
    pub fn with_initial(
        initial: SegmentationState,
        config: HistoryConfig,
    ) -> Result<Self, HistoryError> {
        let mut history = Self::new(config);
        history.commit(initial)?;
        Ok(history)
    }

    /// Reports a new authoritative state from outside.
    ///
    /// Structurally equal states are ignored. While dragging, the state is
    /// buffered without creating an entry; otherwise it is committed.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::InvalidState` for a state that fails
    /// validation; history and current state are left untouched.
    pub fn on_external_state_change(
        &mut self,
        state: SegmentationState,
    ) -> Result<ChangeOutcome, HistoryError> {
        if let Err(err) = state.validate() {
            warn!(error = %err, "ignoring invalid state update");
            return Err(err.into());
        }
        if self.current.as_ref() == Some(&state) {
            return Ok(ChangeOutcome::Unchanged);
        }
        if self.dragging {
            trace!(version = state.version(), "buffered drag frame");
            self.current = Some(state);
            return Ok(ChangeOutcome::Buffered);
        }
        Ok(self.push_entry(state, None))
    }

    /// Appends `state` as a new entry, discarding any redo branch.
    ///
    /// # Errors
    ///
    /// - `HistoryError::DragInProgress` while a drag bracket is open
    /// - `HistoryError::InvalidState` if the state fails validation
    pub fn commit(&mut self, state: SegmentationState) -> Result<ChangeOutcome, HistoryError> {
        if self.dragging {
            return Err(HistoryError::DragInProgress);
        }
        state.validate()?;
        Ok(self.push_entry(state, None))
    }

    /// Steps back one entry and returns the restored state.
    ///
    /// # Errors
    ///
    /// - `HistoryError::DragInProgress` while dragging
    /// - `HistoryError::NothingToUndo` at the oldest entry
    pub fn undo(&mut self) -> Result<&SegmentationState, HistoryError> {
        if self.dragging {
            return Err(HistoryError::DragInProgress);
        }
        let target = match self.index {
            Some(i) if i > 0 => i - 1,
            _ => return Err(HistoryError::NothingToUndo),
        };
        self.index = Some(target);
        debug!(index = target, len = self.entries.len(), "undo");
        let state: &SegmentationState = self.current.insert(self.entries[target].state.clone());
        Ok(state)
    }

    /// Steps forward one entry and returns the restored state.
    ///
    /// # Errors
    ///
    /// - `HistoryError::DragInProgress` while dragging
    /// - `HistoryError::NothingToRedo` at the newest entry
    pub fn redo(&mut self) -> Result<&SegmentationState, HistoryError> {
        if self.dragging {
            return Err(HistoryError::DragInProgress);
        }
        let target = match self.index {
            Some(i) if i + 1 < self.entries.len() => i + 1,
            _ => return Err(HistoryError::NothingToRedo),
        };
        self.index = Some(target);
        debug!(index = target, len = self.entries.len(), "redo");
        let state: &SegmentationState = self.current.insert(self.entries[target].state.clone());
        Ok(state)
    }

    /// Opens or closes a drag bracket.
    pub fn set_dragging_vertex(&mut self, dragging: bool) -> ChangeOutcome {
        if dragging {
            self.begin_drag();
            ChangeOutcome::Unchanged
        } else {
            self.end_drag()
        }
    }

    /// Opens a drag bracket, remembering the current state as its baseline.
    /// Does nothing if a bracket is already open.
    pub fn begin_drag(&mut self) {
        if self.dragging {
            return;
        }
        debug!("drag started");
        self.dragging = true;
        self.drag_baseline = self.current.clone();
    }

    /// Closes the drag bracket and commits its net effect as one entry.
    ///
    /// Returns `Unchanged` if no bracket was open or the final state equals
    /// the baseline.
    pub fn end_drag(&mut self) -> ChangeOutcome {
        if !self.dragging {
            return ChangeOutcome::Unchanged;
        }
        self.dragging = false;
        let baseline = self.drag_baseline.take();
        let Some(last) = self.current.clone() else {
            return ChangeOutcome::Unchanged;
        };
        if baseline.as_ref() == Some(&last) {
            debug!("drag ended without changes");
            return ChangeOutcome::Unchanged;
        }
        debug!("drag ended");
        self.push_entry(last, None)
    }

    /// Closes the drag bracket, discarding everything since it opened.
    ///
    /// Returns the restored baseline, or `None` if no bracket was open.
    pub fn cancel_drag(&mut self) -> Option<&SegmentationState> {
        if !self.dragging {
            return None;
        }
        self.dragging = false;
        debug!("drag cancelled");
        self.current = self.drag_baseline.take();
        self.current.as_ref()
    }

    /// Stores a copy of the current state under a new registry index.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::NoCurrentState` if the history is empty.
    pub fn create_snapshot(&mut self, label: impl Into<String>) -> Result<usize, HistoryError> {
        let state = self.current.clone().ok_or(HistoryError::NoCurrentState)?;
        let index = self.next_snapshot;
        self.next_snapshot += 1;
        let snapshot = NamedSnapshot::new(label, state);
        debug!(index, label = snapshot.label(), "snapshot created");
        self.snapshots.insert(index, snapshot);
        Ok(index)
    }

    /// Applies a named snapshot as a new, undoable entry.
    ///
    /// # Errors
    ///
    /// - `HistoryError::DragInProgress` while dragging
    /// - `HistoryError::SnapshotNotFound` for an unknown index
    pub fn restore_snapshot(&mut self, index: usize) -> Result<ChangeOutcome, HistoryError> {
        if self.dragging {
            return Err(HistoryError::DragInProgress);
        }
        let snapshot = self
            .snapshots
            .get(&index)
            .ok_or(HistoryError::SnapshotNotFound(index))?;
        let label = snapshot.label().to_owned();
        let mut state = snapshot.state().clone();
        state.touch();
        debug!(index, label = %label, "restoring snapshot");
        Ok(self.push_entry(state, Some(label)))
    }

    /// Removes a named snapshot from the registry. Indices are never reused.
    pub fn delete_snapshot(&mut self, index: usize) -> Option<NamedSnapshot> {
        let removed = self.snapshots.remove(&index);
        if removed.is_some() {
            debug!(index, "snapshot deleted");
        }
        removed
    }

    /// Named snapshots in creation order.
    pub fn snapshots(&self) -> impl Iterator<Item = (usize, &NamedSnapshot)> {
        self.snapshots.iter().map(|(&i, s)| (i, s))
    }

    /// Collapses the history to the current state.
    ///
    /// Named snapshots survive unless
    /// [`HistoryConfig::clear_snapshots_on_clear`] is set.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::DragInProgress` while dragging.
    pub fn clear_history(&mut self) -> Result<(), HistoryError> {
        if self.dragging {
            return Err(HistoryError::DragInProgress);
        }
        if self.config.clear_snapshots_on_clear {
            self.snapshots.clear();
        }
        let Some(state) = self.current.clone() else {
            return Ok(());
        };
        self.entries = vec![HistoryEntry { state, label: None }];
        self.index = Some(0);
        debug!("history cleared");
        Ok(())
    }

    /// Records the current state as saved.
    pub fn mark_saved(&mut self) {
        self.saved = self.current.clone();
    }

    /// Returns `true` if the current state differs from the last save.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.current != self.saved
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.dragging && self.index.is_some_and(|i| i > 0)
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.dragging && self.index.is_some_and(|i| i + 1 < self.entries.len())
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Number of committed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of the current entry, `None` while empty.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// The authoritative state, including uncommitted drag frames.
    #[must_use]
    pub fn current(&self) -> Option<&SegmentationState> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    #[must_use]
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    fn push_entry(&mut self, state: SegmentationState, label: Option<String>) -> ChangeOutcome {
        if let Some(i) = self.index {
            if self.entries[i].state == state {
                self.current = Some(self.entries[i].state.clone());
                return ChangeOutcome::Unchanged;
            }
            // Drop the stale redo branch.
            self.entries.truncate(i + 1);
        }

        if self.saved.is_none() {
            self.saved = Some(state.clone());
        }
        self.current = Some(state.clone());
        self.entries.push(HistoryEntry { state, label });

        let max = self.config.max_entries;
        if max > 0 && self.entries.len() > max {
            let excess = self.entries.len() - max;
            self.entries.drain(..excess);
        }
        self.index = Some(self.entries.len() - 1);
        debug!(index = self.entries.len() - 1, len = self.entries.len(), "committed");
        ChangeOutcome::Committed
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point2;
    use crate::model::{Polygon, PolygonId};
    use crate::store;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

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

    fn initial() -> SegmentationState {
        SegmentationState::from_polygons("img", [square("a", 0.0)]).unwrap()
    }

    fn with_square(state: &SegmentationState, id: &str, x: f64) -> SegmentationState {
        store::add_polygon(state, square(id, x)).unwrap()
    }

    #[test]
    fn starts_empty() {
        let history = HistoryManager::default();
        assert!(history.is_empty());
        assert_eq!(history.index(), None);
        assert!(history.current().is_none());
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn first_state_becomes_entry_zero() {
        let mut history = HistoryManager::default();
        let outcome = history.on_external_state_change(initial()).unwrap();
        assert_eq!(outcome, ChangeOutcome::Committed);
        assert_eq!(history.len(), 1);
        assert_eq!(history.index(), Some(0));
        assert!(!history.has_unsaved_changes());
    }

    #[test]
    fn undo_redo_inverse() {
        init_tracing();
        let s0 = initial();
        let s1 = with_square(&s0, "b", 20.0);
        let mut history = HistoryManager::with_initial(s0.clone(), HistoryConfig::default()).unwrap();
        history.on_external_state_change(s1.clone()).unwrap();

        assert_eq!(history.undo().unwrap(), &s0);
        assert_eq!(history.redo().unwrap(), &s1);
        assert_eq!(history.current(), Some(&s1));
        assert_eq!(history.index(), Some(1));
    }

    #[test]
    fn duplicate_state_is_ignored() {
        let s0 = initial();
        let mut history = HistoryManager::with_initial(s0.clone(), HistoryConfig::default()).unwrap();
        let again = s0.clone().with_version(99);
        assert_eq!(
            history.on_external_state_change(again).unwrap(),
            ChangeOutcome::Unchanged
        );
        assert_eq!(history.commit(s0).unwrap(), ChangeOutcome::Unchanged);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn drag_commits_exactly_once() {
        init_tracing();
        let s0 = initial();
        let mut history = HistoryManager::with_initial(s0.clone(), HistoryConfig::default()).unwrap();
        let id = PolygonId::from("a");

        history.set_dragging_vertex(true);
        let mut frame = s0;
        for step in 1..=25 {
            let to = Point2::new(10.0 + f64::from(step), 10.0);
            frame = store::move_vertex(&frame, &id, 2, to).unwrap();
            assert_eq!(
                history.on_external_state_change(frame.clone()).unwrap(),
                ChangeOutcome::Buffered
            );
        }
        assert_eq!(history.len(), 1);
        assert_eq!(history.current(), Some(&frame));

        assert_eq!(history.set_dragging_vertex(false), ChangeOutcome::Committed);
        assert_eq!(history.len(), 2);
        assert_eq!(history.index(), Some(1));
        assert_eq!(history.entries()[1].state(), &frame);
    }

    #[test]
    fn drag_without_net_change_commits_nothing() {
        let s0 = initial();
        let mut history = HistoryManager::with_initial(s0.clone(), HistoryConfig::default()).unwrap();
        let id = PolygonId::from("a");
        history.begin_drag();
        let moved = store::move_vertex(&s0, &id, 2, Point2::new(50.0, 50.0)).unwrap();
        history.on_external_state_change(moved).unwrap();
        let back = store::move_vertex(&s0, &id, 2, Point2::new(10.0, 10.0)).unwrap();
        history.on_external_state_change(back).unwrap();
        assert_eq!(history.end_drag(), ChangeOutcome::Unchanged);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn undo_while_dragging_is_refused() {
        let s0 = initial();
        let mut history = HistoryManager::with_initial(s0.clone(), HistoryConfig::default()).unwrap();
        history.on_external_state_change(with_square(&s0, "b", 20.0)).unwrap();

        history.begin_drag();
        assert!(!history.can_undo());
        assert_eq!(history.undo().unwrap_err(), HistoryError::DragInProgress);
        assert_eq!(history.redo().unwrap_err(), HistoryError::DragInProgress);
        history.end_drag();
        assert!(history.undo().is_ok());
    }

    #[test]
    fn bounds_report_nothing_to_do() {
        let mut history = HistoryManager::with_initial(initial(), HistoryConfig::default()).unwrap();
        assert_eq!(history.undo().unwrap_err(), HistoryError::NothingToUndo);
        assert_eq!(history.redo().unwrap_err(), HistoryError::NothingToRedo);
        assert_eq!(
            HistoryManager::default().undo().unwrap_err(),
            HistoryError::NothingToUndo
        );
    }

    #[test]
    fn new_commit_truncates_redo_branch() {
        let s0 = initial();
        let s1 = with_square(&s0, "b", 20.0);
        let s2 = with_square(&s1, "c", 40.0);
        let mut history = HistoryManager::with_initial(s0.clone(), HistoryConfig::default()).unwrap();
        history.on_external_state_change(s1).unwrap();
        history.on_external_state_change(s2).unwrap();
        history.undo().unwrap();
        history.undo().unwrap();
        assert!(history.can_redo());

        history.on_external_state_change(with_square(&s0, "d", 60.0)).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.index(), Some(1));
        assert_eq!(history.redo().unwrap_err(), HistoryError::NothingToRedo);
    }

    #[test]
    fn invalid_state_leaves_history_untouched() {
        init_tracing();
        let s0 = initial();
        let mut history = HistoryManager::with_initial(s0.clone(), HistoryConfig::default()).unwrap();

        let mut orphan = s0.clone();
        orphan
            .push(
                Polygon::internal(
                    "h",
                    vec![
                        Point2::new(1.0, 1.0),
                        Point2::new(2.0, 1.0),
                        Point2::new(2.0, 2.0),
                    ],
                    "missing",
                )
                .unwrap(),
            )
            .unwrap();
        let err = history.on_external_state_change(orphan).unwrap_err();
        assert!(matches!(err, HistoryError::InvalidState(_)));
        assert_eq!(history.len(), 1);
        assert_eq!(history.current(), Some(&s0));

        // The next valid update goes through normally.
        let outcome = history.on_external_state_change(with_square(&s0, "b", 20.0));
        assert_eq!(outcome.unwrap(), ChangeOutcome::Committed);
    }

    #[test]
    fn cancel_drag_restores_baseline() {
        let s0 = initial();
        let mut history = HistoryManager::with_initial(s0.clone(), HistoryConfig::default()).unwrap();
        history.begin_drag();
        let moved = store::move_vertex(&s0, &"a".into(), 0, Point2::new(-5.0, -5.0)).unwrap();
        history.on_external_state_change(moved).unwrap();
        assert_eq!(history.cancel_drag(), Some(&s0));
        assert!(!history.is_dragging());
        assert_eq!(history.len(), 1);
        assert_eq!(history.cancel_drag(), None);
    }

    #[test]
    fn snapshot_restore_is_undoable() {
        let s0 = initial();
        let mut history = HistoryManager::with_initial(s0.clone(), HistoryConfig::default()).unwrap();
        let snap = history.create_snapshot("before cleanup").unwrap();
        let s1 = store::delete_polygon(&s0, &"a".into()).unwrap();
        history.on_external_state_change(s1.clone()).unwrap();

        assert_eq!(history.restore_snapshot(snap).unwrap(), ChangeOutcome::Committed);
        assert_eq!(history.len(), 3);
        assert_eq!(history.current(), Some(&s0));
        assert_eq!(history.entries()[2].label(), Some("before cleanup"));

        assert_eq!(history.undo().unwrap(), &s1);
        assert_eq!(
            history.restore_snapshot(42).unwrap_err(),
            HistoryError::SnapshotNotFound(42)
        );
    }

    #[test]
    fn deleted_snapshot_cannot_be_restored() {
        let s0 = initial();
        let mut history = HistoryManager::with_initial(s0.clone(), HistoryConfig::default()).unwrap();
        let first = history.create_snapshot("first").unwrap();
        let second = history.create_snapshot("second").unwrap();

        let removed = history.delete_snapshot(first).unwrap();
        assert_eq!(removed.label(), "first");
        assert_eq!(removed.state(), &s0);
        assert!(history.delete_snapshot(first).is_none());

        let left: Vec<usize> = history.snapshots().map(|(i, _)| i).collect();
        assert_eq!(left, [second]);
        assert_eq!(
            history.restore_snapshot(first).unwrap_err(),
            HistoryError::SnapshotNotFound(first)
        );
        assert!(history.create_snapshot("third").unwrap() > second);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn snapshots_need_a_state() {
        let mut history = HistoryManager::default();
        assert_eq!(
            history.create_snapshot("x").unwrap_err(),
            HistoryError::NoCurrentState
        );
    }

    #[test]
    fn clear_history_keeps_snapshots_by_default() {
        let s0 = initial();
        let s1 = with_square(&s0, "b", 20.0);
        let mut history = HistoryManager::with_initial(s0, HistoryConfig::default()).unwrap();
        let snap = history.create_snapshot("first").unwrap();
        history.on_external_state_change(s1.clone()).unwrap();

        history.clear_history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history.index(), Some(0));
        assert_eq!(history.current(), Some(&s1));
        assert!(!history.can_undo());
        assert_eq!(history.snapshots().count(), 1);
        assert!(history.restore_snapshot(snap).is_ok());
    }

    #[test]
    fn clear_history_can_drop_snapshots() {
        let config = HistoryConfig::default().with_clear_snapshots(true);
        let mut history = HistoryManager::with_initial(initial(), config).unwrap();
        history.create_snapshot("first").unwrap();
        history.clear_history().unwrap();
        assert_eq!(history.snapshots().count(), 0);
    }

    #[test]
    fn limit_drops_oldest_entries() {
        let mut history =
            HistoryManager::with_initial(initial(), HistoryConfig::with_limit(3)).unwrap();
        let mut state = initial();
        for i in 0..5 {
            state = with_square(&state, &format!("p{i}"), 20.0 * f64::from(i + 1));
            history.on_external_state_change(state.clone()).unwrap();
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.index(), Some(2));
        history.undo().unwrap();
        history.undo().unwrap();
        assert_eq!(history.undo().unwrap_err(), HistoryError::NothingToUndo);
    }

    #[test]
    fn unsaved_changes_follow_checkpoint() {
        let s0 = initial();
        let mut history = HistoryManager::with_initial(s0.clone(), HistoryConfig::default()).unwrap();
        history.on_external_state_change(with_square(&s0, "b", 20.0)).unwrap();
        assert!(history.has_unsaved_changes());
        history.mark_saved();
        assert!(!history.has_unsaved_changes());
        history.undo().unwrap();
        assert!(history.has_unsaved_changes());
    }
}
