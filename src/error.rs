use thiserror::Error;

use crate::model::PolygonId;

/// Top-level error type for the segmentation editor.
#[derive(Debug, Error)]
pub enum SegEditError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Mode(#[from] ModeError),

    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Errors produced by the pure geometric algorithms.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("polygon needs at least 3 points, got {0}")]
    TooFewPoints(usize),

    #[error("cut line must cross the boundary exactly twice, found {found} crossings")]
    SliceIntersections { found: usize },

    #[error("slice would produce a degenerate polygon")]
    DegenerateSlice,

    #[error("polygons do not overlap")]
    NoOverlap,

    #[error("degenerate geometry: {0}")]
    Degenerate(String),
}

/// Errors produced by polygon store transitions and state validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("polygon not found: {0}")]
    PolygonNotFound(PolygonId),

    #[error("duplicate polygon id: {0}")]
    DuplicateId(PolygonId),

    #[error("vertex {index} out of range for polygon {polygon} with {len} points")]
    VertexOutOfRange {
        polygon: PolygonId,
        index: usize,
        len: usize,
    },

    #[error("polygon {polygon} would drop below 3 points")]
    TooFewPoints { polygon: PolygonId },

    #[error("internal polygon {polygon} references missing parent {parent}")]
    MissingParent {
        polygon: PolygonId,
        parent: PolygonId,
    },

    #[error("polygon {polygon} has an invalid parent: {reason}")]
    InvalidParent {
        polygon: PolygonId,
        reason: &'static str,
    },

    #[error("cannot combine polygon {0} with itself")]
    SelfCombine(PolygonId),

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Errors produced by the undo/redo history.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HistoryError {
    #[error("cannot change history while a vertex drag is in progress")]
    DragInProgress,

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    #[error("history has no current state")]
    NoCurrentState,

    #[error("snapshot not found: {0}")]
    SnapshotNotFound(usize),

    #[error("rejected invalid state: {0}")]
    InvalidState(#[from] StoreError),
}

/// Errors produced by the edit-mode state machine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModeError {
    #[error("no polygon is selected")]
    NoSelection,

    #[error("selected polygon {0} no longer exists")]
    StaleSelection(PolygonId),
}

/// Errors produced while reading or writing the wire format.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("malformed state document: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] StoreError),
}

/// Convenience type alias for results using [`SegEditError`].
pub type Result<T> = std::result::Result<T, SegEditError>;
