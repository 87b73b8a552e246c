//! Editing modes and the events that drive them.
//!
//! The [`EditModeStateMachine`] turns primitive pointer and key events into
//! store transitions and history commits. All coordinates are world-space;
//! converting from screen space is the host's job (see
//! [`Viewport::screen_to_world`](crate::culling::Viewport::screen_to_world)).

mod machine;

pub use machine::EditModeStateMachine;

use crate::error::GeometryError;
use crate::math::Point2;

/// The single active editing mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditMode {
    /// Nothing selected; clicks select.
    #[default]
    View,
    /// A polygon is selected; its vertices can be dragged.
    Edit,
    /// Clicks place the vertices of a new polygon.
    CreatePolygon,
    /// Two clicks define a cut through the selected polygon.
    Slice,
    /// Redraws part of the selected polygon between two of its vertices.
    AddPoints,
}

impl EditMode {
    /// Modes that collect temporary points.
    #[must_use]
    pub fn is_modal(self) -> bool {
        matches!(self, Self::CreatePolygon | Self::Slice | Self::AddPoints)
    }

    /// Modes that act on the selected polygon.
    #[must_use]
    pub fn needs_selection(self) -> bool {
        matches!(self, Self::Edit | Self::Slice | Self::AddPoints)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Enter,
    Delete,
    Undo,
    Redo,
}

/// Primitive input, already in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionEvent {
    PointerDown(Point2),
    PointerMove(Point2),
    PointerUp(Point2),
    Key(Key),
}

/// What handling an event did.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// The event had no effect.
    Ignored,
    SelectionChanged,
    HoverChanged,
    /// A temporary point or anchor was recorded.
    PointBuffered,
    DragStarted,
    /// A drag frame replaced the current state without a history entry.
    DragUpdated,
    /// A new history entry was created.
    Committed,
    /// The cut was rejected; state and history are unchanged.
    SliceFailed(GeometryError),
    /// The gesture was abandoned and the base mode restored.
    Cancelled,
    Undone,
    Redone,
}
