use crate::model::SegmentationState;

/// A labelled copy of a state, kept outside the linear undo stack.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSnapshot {
    label: String,
    state: SegmentationState,
}

impl NamedSnapshot {
    #[must_use]
    pub fn new(label: impl Into<String>, state: SegmentationState) -> Self {
        Self {
            label: label.into(),
            state,
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn state(&self) -> &SegmentationState {
        &self.state
    }
}
